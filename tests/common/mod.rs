// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use mefcodec::core::crc;
use mefcodec::format::constants::{TIME_SERIES_INDEX_BYTES, UNIVERSAL_HEADER_BYTES};
use mefcodec::format::{TimeSeriesIndexEntry, UniversalHeader};

// ============================================================================
// Temporary Directories
// ============================================================================

/// Get a unique temporary directory for test files.
pub fn temp_dir() -> PathBuf {
    let random = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let thread_id = format!("{:?}", std::thread::current().id());
    std::env::temp_dir().join(format!(
        "mefcodec_test_{}_{}_{}",
        std::process::id(),
        thread_id,
        random
    ))
}

/// Create a temporary session root with a cleanup guard.
pub fn temp_root() -> (PathBuf, CleanupGuard) {
    let dir = temp_dir();
    fs::create_dir_all(&dir).ok();
    let guard = CleanupGuard(dir.clone());
    (dir, guard)
}

/// Cleanup guard for test temporary files.
#[derive(Debug)]
pub struct CleanupGuard(PathBuf);

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

// ============================================================================
// On-Disk Verification Helpers
// ============================================================================

/// Read and decode a file's universal header.
pub fn read_header(path: &Path) -> UniversalHeader {
    let bytes = fs::read(path).expect("read file");
    UniversalHeader::decode(&bytes).expect("decode universal header")
}

/// Assert that a file's stored header and body CRCs match the bytes on disk.
pub fn assert_file_crcs(path: &Path) {
    let bytes = fs::read(path).expect("read file");
    assert!(
        bytes.len() >= UNIVERSAL_HEADER_BYTES,
        "{} shorter than a universal header",
        path.display()
    );
    let stored_header_crc = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    let stored_body_crc = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    assert_eq!(
        stored_header_crc,
        crc::calculate(&bytes[4..UNIVERSAL_HEADER_BYTES]),
        "header CRC mismatch in {}",
        path.display()
    );
    assert_eq!(
        stored_body_crc,
        crc::calculate(&bytes[UNIVERSAL_HEADER_BYTES..]),
        "body CRC mismatch in {}",
        path.display()
    );
}

/// Read every index entry of a `.tidx` file.
pub fn read_index_entries(path: &Path) -> Vec<TimeSeriesIndexEntry> {
    let bytes = fs::read(path).expect("read index file");
    bytes[UNIVERSAL_HEADER_BYTES..]
        .chunks_exact(TIME_SERIES_INDEX_BYTES)
        .map(|chunk| TimeSeriesIndexEntry::decode(chunk).expect("decode index entry"))
        .collect()
}

/// Generate a sine test signal: `floor(20000 * sin(2*pi*10*i/1000))`.
pub fn sine_samples(n: usize) -> Vec<i32> {
    (0..n)
        .map(|i| {
            (20_000.0 * (2.0 * std::f64::consts::PI * 10.0 * i as f64 / 1000.0).sin()).floor()
                as i32
        })
        .collect()
}

/// Timestamps starting at 2000-01-01 00:00:00 UTC with a fixed period.
pub fn uniform_times(n: usize, period_us: i64) -> Vec<i64> {
    (0..n as i64).map(|i| EPOCH_2000 + i * period_us).collect()
}

/// 2000-01-01 00:00:00 UTC in µs since the Unix epoch.
pub const EPOCH_2000: i64 = 946_684_800_000_000;
