// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Session-level integration tests.
//!
//! Tests cover:
//! - Segment rollover on the per-session time budget
//! - Appending a new segment to an existing channel
//! - Channel manifest creation and idempotence
//! - Password policy enforcement
//! - Time anonymization

mod common;

use std::path::PathBuf;

use common::{
    assert_file_crcs, read_header, read_index_entries, sine_samples, temp_root, uniform_times,
    EPOCH_2000,
};
use mefcodec::format::constants::{
    DATA_FILE_SUFFIX, INDEX_FILE_SUFFIX, MANIFEST_ENTRY_BYTES, METADATA_FILE_SUFFIX,
    UNIVERSAL_HEADER_BYTES,
};
use mefcodec::format::metadata::decode_metadata_body;
use mefcodec::io::paths;
use mefcodec::{ChannelConfig, MefError, Session, SessionConfig};

// ============================================================================
// Test Fixtures
// ============================================================================

const SESSION_NAME: &str = "session-test";
const CHANNEL_NAME: &str = "RFa3";

fn make_session(root: PathBuf, num_secs_per_segment: i64) -> Session {
    Session::new(SessionConfig {
        root,
        session_name: SESSION_NAME.to_string(),
        num_secs_per_segment,
        ..Default::default()
    })
    .expect("create session")
}

fn channel_config() -> ChannelConfig {
    ChannelConfig {
        channel_name: CHANNEL_NAME.to_string(),
        sampling_frequency: 1000.0,
        secs_per_block: 1.0,
        block_interval: 1_000_000,
        ..Default::default()
    }
}

fn segment_file(root: &PathBuf, segment: i32, suffix: &str) -> PathBuf {
    let session_dir = paths::session_directory(root, SESSION_NAME);
    let channel_dir = paths::channel_directory(&session_dir, CHANNEL_NAME);
    let segment_dir = paths::segment_directory(&channel_dir, CHANNEL_NAME, segment);
    paths::segment_file(&segment_dir, CHANNEL_NAME, segment, suffix)
}

fn read_segment_metadata(root: &PathBuf, segment: i32) -> mefcodec::format::TimeSeriesMetadata {
    let bytes = std::fs::read(segment_file(root, segment, METADATA_FILE_SUFFIX)).unwrap();
    let (_, ts, _) = decode_metadata_body(&bytes[UNIVERSAL_HEADER_BYTES..]).unwrap();
    ts
}

// ============================================================================
// Segment Rollover
// ============================================================================

#[test]
fn test_segment_rollover_on_time_budget() {
    let (root, _guard) = temp_root();
    let session = make_session(root.clone(), 2);
    let mut channel = session.create_channel(channel_config()).unwrap();

    channel
        .write(&uniform_times(5000, 1000), &sine_samples(5000))
        .unwrap();
    channel.close().unwrap();

    let session_dir = paths::session_directory(&root, SESSION_NAME);
    let channel_dir = paths::channel_directory(&session_dir, CHANNEL_NAME);
    assert!(paths::segment_directory(&channel_dir, CHANNEL_NAME, 0).exists());
    assert!(paths::segment_directory(&channel_dir, CHANNEL_NAME, 1).exists());
    assert!(!paths::segment_directory(&channel_dir, CHANNEL_NAME, 2).exists());

    // First segment: the two blocks before the 2 s boundary.
    let seg0_entries = read_index_entries(&segment_file(&root, 0, INDEX_FILE_SUFFIX));
    assert_eq!(seg0_entries.len(), 2);
    assert_eq!(seg0_entries[0].start_sample, 0);
    assert_eq!(seg0_entries[1].start_sample, 1000);

    let seg0 = read_segment_metadata(&root, 0);
    assert_eq!(seg0.number_of_samples, 2000);
    assert_eq!(seg0.start_sample, 0);

    // Second segment picks up at sample 2000; within-segment start_samples
    // restart at zero.
    let seg1 = read_segment_metadata(&root, 1);
    assert_eq!(seg1.start_sample, 2000);
    assert_eq!(seg1.number_of_samples, 3000);
    let seg1_entries = read_index_entries(&segment_file(&root, 1, INDEX_FILE_SUFFIX));
    assert_eq!(seg1_entries.len(), 3);
    assert_eq!(seg1_entries[0].start_sample, 0);
    assert_eq!(seg1_entries[0].start_time, EPOCH_2000 + 2_000_000);
}

#[test]
fn test_rollover_preserves_level_uuid_and_numbers_headers() {
    let (root, _guard) = temp_root();
    let session = make_session(root.clone(), 2);
    let mut channel = session.create_channel(channel_config()).unwrap();

    channel
        .write(&uniform_times(5000, 1000), &sine_samples(5000))
        .unwrap();
    channel.close().unwrap();

    let seg0 = read_header(&segment_file(&root, 0, DATA_FILE_SUFFIX));
    let seg1 = read_header(&segment_file(&root, 1, DATA_FILE_SUFFIX));
    assert_eq!(seg0.level_uuid, seg1.level_uuid);
    assert_ne!(seg0.file_uuid, seg1.file_uuid);
    assert_eq!(seg0.segment_number, 0);
    assert_eq!(seg1.segment_number, 1);

    // Both finalized segments pass CRC verification.
    for segment in 0..2 {
        assert_file_crcs(&segment_file(&root, segment, METADATA_FILE_SUFFIX));
        assert_file_crcs(&segment_file(&root, segment, DATA_FILE_SUFFIX));
        assert_file_crcs(&segment_file(&root, segment, INDEX_FILE_SUFFIX));
    }
}

#[test]
fn test_zero_budget_never_rolls_over() {
    let (root, _guard) = temp_root();
    let session = make_session(root.clone(), 0);
    let mut channel = session.create_channel(channel_config()).unwrap();

    channel
        .write(&uniform_times(5000, 1000), &sine_samples(5000))
        .unwrap();
    channel.close().unwrap();

    let session_dir = paths::session_directory(&root, SESSION_NAME);
    let channel_dir = paths::channel_directory(&session_dir, CHANNEL_NAME);
    assert!(!paths::segment_directory(&channel_dir, CHANNEL_NAME, 1).exists());
    let seg0 = read_segment_metadata(&root, 0);
    assert_eq!(seg0.number_of_samples, 5000);
}

// ============================================================================
// Append
// ============================================================================

#[test]
fn test_append_seeds_from_prior_segment() {
    let (root, _guard) = temp_root();
    let session = make_session(root.clone(), 0);

    let mut channel = session
        .create_channel(ChannelConfig {
            units_conversion_factor: 0.25,
            acquisition_channel_number: 11,
            ..channel_config()
        })
        .unwrap();
    channel
        .write(&uniform_times(10_000, 1000), &sine_samples(10_000))
        .unwrap();
    channel.close().unwrap();

    let mut appended = session.append_channel(CHANNEL_NAME, 1).unwrap();
    assert_eq!(appended.segment_number(), 1);
    let resume = EPOCH_2000 + 20_000_000;
    let times: Vec<i64> = (0..1000).map(|i| resume + i * 1000).collect();
    appended.write(&times, &sine_samples(1000)).unwrap();
    appended.close().unwrap();

    let seg1 = read_segment_metadata(&root, 1);
    assert_eq!(seg1.start_sample, 10_000);
    assert_eq!(seg1.number_of_samples, 1000);
    // Channel parameters carry forward.
    assert_eq!(seg1.units_conversion_factor, 0.25);
    assert_eq!(seg1.acquisition_channel_number, 11);
    assert_eq!(seg1.sampling_frequency, 1000.0);
    assert_eq!(seg1.block_interval, 1_000_000);

    let seg0_header = read_header(&segment_file(&root, 0, METADATA_FILE_SUFFIX));
    let seg1_header = read_header(&segment_file(&root, 1, METADATA_FILE_SUFFIX));
    assert_eq!(seg0_header.level_uuid, seg1_header.level_uuid);
    assert_eq!(seg1_header.session_name, SESSION_NAME);
    assert_eq!(seg1_header.segment_number, 1);

    // The appended segment's first block is discontinuous.
    let entries = read_index_entries(&segment_file(&root, 1, INDEX_FILE_SUFFIX));
    assert_eq!(entries.len(), 1);
    assert_ne!(entries[0].flags & 0x01, 0);
}

#[test]
fn test_append_rejects_non_positive_segment_numbers() {
    let (root, _guard) = temp_root();
    let session = make_session(root.clone(), 0);
    let mut channel = session.create_channel(channel_config()).unwrap();
    channel
        .write(&uniform_times(100, 1000), &sine_samples(100))
        .unwrap();
    channel.close().unwrap();

    for n in [0, -1, -5] {
        let err = session.append_channel(CHANNEL_NAME, n).unwrap_err();
        assert!(matches!(err, MefError::InvalidSegmentNumber { .. }));
    }
    // No new segment directory was created as a side effect.
    let session_dir = paths::session_directory(&root, SESSION_NAME);
    let channel_dir = paths::channel_directory(&session_dir, CHANNEL_NAME);
    let segment_dirs = std::fs::read_dir(&channel_dir).unwrap().count();
    assert_eq!(segment_dirs, 1);
}

#[test]
fn test_append_to_missing_segment_fails() {
    let (root, _guard) = temp_root();
    let session = make_session(root, 0);
    assert!(session.append_channel("no-such-channel", 1).is_err());
}

// ============================================================================
// Manifest
// ============================================================================

#[test]
fn test_manifest_lists_each_channel_once() {
    let (root, _guard) = temp_root();
    let session = make_session(root.clone(), 0);

    for name in ["a1", "b2"] {
        let channel = session
            .create_channel(ChannelConfig {
                channel_name: name.to_string(),
                ..channel_config()
            })
            .unwrap();
        channel.close().unwrap();
    }

    let manifest = paths::manifest_file(
        &paths::session_directory(&root, SESSION_NAME),
        SESSION_NAME,
    );
    let bytes = std::fs::read(&manifest).unwrap();
    let header = read_header(&manifest);
    assert_eq!(header.number_of_entries, 2);
    assert_eq!(
        bytes.len(),
        UNIVERSAL_HEADER_BYTES + 2 * MANIFEST_ENTRY_BYTES
    );

    let first = &bytes[UNIVERSAL_HEADER_BYTES..UNIVERSAL_HEADER_BYTES + 7];
    assert_eq!(first, b"a1.timd");
    assert_file_crcs(&manifest);
}

#[test]
fn test_manifest_reregistration_is_byte_identical() {
    let (root, _guard) = temp_root();
    let session = make_session(root.clone(), 0);

    session.create_channel(channel_config()).unwrap().close().unwrap();
    let manifest = paths::manifest_file(
        &paths::session_directory(&root, SESSION_NAME),
        SESSION_NAME,
    );
    let before = std::fs::read(&manifest).unwrap();

    // Re-registering the same channel name leaves the manifest untouched.
    session.create_channel(channel_config()).unwrap().close().unwrap();
    let after = std::fs::read(&manifest).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_manifest_skipped_when_encryption_active() {
    let (root, _guard) = temp_root();
    let session = Session::new(SessionConfig {
        root: root.clone(),
        session_name: SESSION_NAME.to_string(),
        level_1_password: Some("read".to_string()),
        level_2_password: Some("write".to_string()),
        ..Default::default()
    })
    .unwrap();
    session.create_channel(channel_config()).unwrap().close().unwrap();

    let manifest = paths::manifest_file(
        &paths::session_directory(&root, SESSION_NAME),
        SESSION_NAME,
    );
    assert!(!manifest.exists());
}

// ============================================================================
// Passwords
// ============================================================================

#[test]
fn test_level_2_password_requires_level_1() {
    let (root, _guard) = temp_root();
    let err = Session::new(SessionConfig {
        root,
        level_2_password: Some("write".to_string()),
        ..Default::default()
    })
    .unwrap_err();
    assert!(matches!(err, MefError::PasswordPolicy { .. }));
}

#[test]
fn test_passwords_must_differ() {
    let (root, _guard) = temp_root();
    let err = Session::new(SessionConfig {
        root,
        level_1_password: Some("same".to_string()),
        level_2_password: Some("same".to_string()),
        ..Default::default()
    })
    .unwrap_err();
    assert!(matches!(err, MefError::PasswordPolicy { .. }));
}

#[test]
fn test_encryption_flags_and_validation_fields_are_written() {
    let (root, _guard) = temp_root();
    let session = Session::new(SessionConfig {
        root: root.clone(),
        session_name: SESSION_NAME.to_string(),
        level_1_password: Some("read".to_string()),
        level_2_password: Some("write".to_string()),
        ..Default::default()
    })
    .unwrap();
    let mut channel = session.create_channel(channel_config()).unwrap();
    channel
        .write(&uniform_times(100, 1000), &sine_samples(100))
        .unwrap();
    channel.close().unwrap();

    let meta_path = segment_file(&root, 0, METADATA_FILE_SUFFIX);
    let header = read_header(&meta_path);
    assert_ne!(header.level_1_password_validation, [0u8; 16]);
    assert_ne!(header.level_2_password_validation, [0u8; 16]);

    let bytes = std::fs::read(&meta_path).unwrap();
    let (s1, _, _) = decode_metadata_body(&bytes[UNIVERSAL_HEADER_BYTES..]).unwrap();
    assert_eq!(s1.section_2_encryption, 2);
    assert_eq!(s1.section_3_encryption, 2);
}

// ============================================================================
// Time Anonymization
// ============================================================================

#[test]
fn test_anonymized_times_fold_out_the_date() {
    let (root, _guard) = temp_root();
    let session = Session::new(SessionConfig {
        root: root.clone(),
        session_name: SESSION_NAME.to_string(),
        anonymize_output: true,
        gmt_offset: 0.0,
        ..Default::default()
    })
    .unwrap();
    let mut channel = session.create_channel(channel_config()).unwrap();

    // One hour past (UTC) midnight.
    let start = EPOCH_2000 + 3_600_000_000;
    let times: Vec<i64> = (0..1000).map(|i| start + i * 1000).collect();
    channel.write(&times, &sine_samples(1000)).unwrap();
    channel.close().unwrap();

    // Stored times are offset - t: the clock time survives, negated.
    let entries = read_index_entries(&segment_file(&root, 0, INDEX_FILE_SUFFIX));
    assert_eq!(entries[0].start_time, -3_600_000_000);

    // The offset itself is persisted in section 3 for decoders to re-apply.
    let bytes = std::fs::read(segment_file(&root, 0, METADATA_FILE_SUFFIX)).unwrap();
    let (_, _, s3) = decode_metadata_body(&bytes[UNIVERSAL_HEADER_BYTES..]).unwrap();
    assert_eq!(s3.recording_time_offset, EPOCH_2000);
}

#[test]
fn test_anonymized_rollover_crosses_descending_boundaries() {
    let (root, _guard) = temp_root();
    let session = Session::new(SessionConfig {
        root: root.clone(),
        session_name: SESSION_NAME.to_string(),
        num_secs_per_segment: 2,
        anonymize_output: true,
        ..Default::default()
    })
    .unwrap();
    let mut channel = session.create_channel(channel_config()).unwrap();
    channel
        .write(&uniform_times(5000, 1000), &sine_samples(5000))
        .unwrap();
    channel.close().unwrap();

    // Rollover still fires even though stored times decrease.
    let seg1 = read_segment_metadata(&root, 1);
    assert_eq!(seg1.start_sample, 2000);
}
