// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! The channel writer state machine.
//!
//! One `ChannelWriter` owns one channel's streaming state: the raw sample
//! accumulation buffer, the RED codec scratch, the three open segment files
//! and their universal headers, and every aggregate the metadata file
//! reports at close. It drives
//! `initialize -> (write)* -> flush -> rollover -> close`.
//!
//! # Block scheduling
//!
//! `block_boundary` is a phase-locked schedule advancing by exactly the
//! block interval, independent of per-sample jitter; `block_hdr_time`
//! records the actual time of the first sample of the block being
//! accumulated. A timestamp gap of `DISCONTINUITY_THRESHOLD` or more forces
//! a flush and resets the phase; crossing the boundary flushes and advances
//! the phase by one interval.
//!
//! Input timestamps must be monotone non-decreasing per channel; the writer
//! never reorders them.

use std::path::PathBuf;
use std::sync::Arc;

use crate::codec::red::{bit_shift_in_place, find_extrema, RedCodec};
use crate::core::{MefError, Result};
use crate::format::constants::{
    DISCONTINUITY_THRESHOLD, METADATA_FILE_SUFFIX, MICROS_PER_SEC, TIME_SERIES_INDEX_BYTES,
    UNIVERSAL_HEADER_BYTES, UUID_BYTES, UUTC_NO_ENTRY,
};
use crate::format::index::TimeSeriesIndexEntry;
use crate::format::metadata::{
    decode_metadata_body, MetadataSection1, MetadataSection3, TimeSeriesMetadata,
};
use crate::format::universal_header::UniversalHeader;
use crate::io::paths;
use crate::io::segment::{SegmentFiles, SegmentIdentity};
use crate::session::{ChannelConfig, PasswordData, SessionConfig, SessionState};

/// Streaming writer for one channel of a session.
#[derive(Debug)]
pub struct ChannelWriter {
    session_cfg: SessionConfig,
    cfg: ChannelConfig,
    password: PasswordData,
    state: Arc<SessionState>,
    channel_dir: PathBuf,
    level_uuid: [u8; UUID_BYTES],

    files: SegmentFiles,
    section1: MetadataSection1,
    meta: TimeSeriesMetadata,
    section3: MetadataSection3,

    codec: RedCodec,
    raw: Vec<i32>,
    raw_capacity: usize,

    /// Time of the first sample of the block being accumulated
    block_hdr_time: Option<i64>,
    /// Phase-locked scheduling anchor, advanced by one interval per flush
    block_boundary: i64,
    /// Previous sample timestamp, for discontinuity detection
    last_timestamp: i64,
    /// Tags the next emitted block; true after init, flush, and gaps
    discontinuity_flag: bool,

    /// Cumulative sample index within the current segment
    start_sample: i64,
    contiguous_blocks: i64,
    contiguous_samples: i64,
    contiguous_bytes: i64,

    /// Offset-domain time at which the next segment begins, if rotating
    next_segment_start_time: Option<i64>,
}

impl ChannelWriter {
    /// Create a channel at segment 0: directory hierarchy, file trio with
    /// fresh UUIDs, and streaming state primed so the first block is
    /// flagged discontinuous.
    pub(crate) fn initialize(
        session_cfg: SessionConfig,
        cfg: ChannelConfig,
        password: PasswordData,
        state: Arc<SessionState>,
    ) -> Result<Self> {
        let session_dir = paths::session_directory(&session_cfg.root, &session_cfg.session_name);
        let channel_dir = paths::channel_directory(&session_dir, &cfg.channel_name);
        std::fs::create_dir_all(&channel_dir).map_err(|e| {
            MefError::io(
                format!("create channel directory {}", channel_dir.display()),
                e.to_string(),
            )
        })?;

        let section1 = MetadataSection1 {
            section_2_encryption: if password.encryption_active {
                crate::format::constants::LEVEL_2_ENCRYPTION
            } else {
                0
            },
            section_3_encryption: if password.encryption_active {
                crate::format::constants::LEVEL_2_ENCRYPTION
            } else {
                0
            },
        };

        let mut meta = TimeSeriesMetadata::new(cfg.sampling_frequency, cfg.block_interval);
        meta.channel_description = cfg.channel_description.clone();
        meta.reference_description = cfg.reference_description.clone();
        meta.units_conversion_factor = cfg.units_conversion_factor;
        meta.units_description = cfg.units_description.clone();
        meta.low_frequency_filter_setting = cfg.low_frequency_filter_setting;
        meta.high_frequency_filter_setting = cfg.high_frequency_filter_setting;
        meta.notch_filter_frequency_setting = cfg.notch_filter_frequency_setting;
        meta.ac_line_frequency = cfg.ac_line_frequency;
        meta.acquisition_channel_number = cfg.acquisition_channel_number;

        let section3 = MetadataSection3 {
            recording_time_offset: 0,
            dst_start_time: 0,
            dst_end_time: 0,
            gmt_offset: state.gmt_offset_secs(),
            subject_name_1: session_cfg.subject_name_1.clone(),
            subject_name_2: session_cfg.subject_name_2.clone(),
            subject_id: session_cfg.subject_id.clone(),
            recording_location: session_cfg.recording_location.clone(),
        };

        // 2x margin over the nominal samples per block, for sample-rate
        // drift and residual samples near a forced flush.
        let raw_capacity = ((2.0 * cfg.secs_per_block * cfg.sampling_frequency).ceil() as usize)
            .max(1);

        let level_uuid = *uuid::Uuid::new_v4().as_bytes();
        let identity = SegmentIdentity {
            session_name: &session_cfg.session_name,
            channel_name: &cfg.channel_name,
            anonymized_name: &session_cfg.anonymized_name,
            segment_number: 0,
            level_uuid,
            password: &password,
        };
        let files = SegmentFiles::create(&channel_dir, &identity, &section1, &meta, &section3)?;

        Ok(Self {
            session_cfg,
            codec: RedCodec::allocate(raw_capacity),
            raw: Vec::with_capacity(raw_capacity),
            raw_capacity,
            cfg,
            password,
            state,
            channel_dir,
            level_uuid,
            files,
            section1,
            meta,
            section3,
            block_hdr_time: None,
            block_boundary: 0,
            last_timestamp: 0,
            discontinuity_flag: true,
            start_sample: 0,
            contiguous_blocks: 0,
            contiguous_samples: 0,
            contiguous_bytes: 0,
            next_segment_start_time: None,
        })
    }

    /// Open segment `segment_number` of an existing channel, seeded from
    /// the prior segment's metadata.
    pub(crate) fn append(
        session_cfg: SessionConfig,
        channel_name: &str,
        segment_number: i32,
        password: PasswordData,
        state: Arc<SessionState>,
    ) -> Result<Self> {
        if segment_number <= 0 {
            return Err(MefError::invalid_segment(segment_number));
        }

        let session_dir = paths::session_directory(&session_cfg.root, &session_cfg.session_name);
        let channel_dir = paths::channel_directory(&session_dir, channel_name);
        let prev_dir = paths::segment_directory(&channel_dir, channel_name, segment_number - 1);
        let prev_metadata = paths::segment_file(
            &prev_dir,
            channel_name,
            segment_number - 1,
            METADATA_FILE_SUFFIX,
        );

        let bytes = std::fs::read(&prev_metadata).map_err(|e| {
            MefError::io(format!("read {}", prev_metadata.display()), e.to_string())
        })?;
        let prev_header = UniversalHeader::decode(&bytes).map_err(|e| {
            MefError::metadata_parse(prev_metadata.display().to_string(), e.to_string())
        })?;
        let (prev_s1, prev_ts, prev_s3) = decode_metadata_body(&bytes[UNIVERSAL_HEADER_BYTES..])
            .map_err(|e| {
                MefError::metadata_parse(prev_metadata.display().to_string(), e.to_string())
            })?;

        if prev_s1.section_2_encryption != 0 && !password.encryption_active {
            return Err(MefError::password(
                "appending to an encrypted channel requires its level 2 password",
            ));
        }

        // Carry the channel parameters forward, advance the sample origin.
        let mut meta = prev_ts.clone();
        meta.reset_for_segment(prev_ts.start_sample + prev_ts.number_of_samples);

        let cfg = ChannelConfig {
            channel_name: channel_name.to_string(),
            acquisition_channel_number: prev_ts.acquisition_channel_number,
            sampling_frequency: prev_ts.sampling_frequency,
            secs_per_block: prev_ts.block_interval as f64 / MICROS_PER_SEC as f64,
            block_interval: prev_ts.block_interval,
            bit_shift: false,
            units_conversion_factor: prev_ts.units_conversion_factor,
            units_description: prev_ts.units_description.clone(),
            channel_description: prev_ts.channel_description.clone(),
            reference_description: prev_ts.reference_description.clone(),
            low_frequency_filter_setting: prev_ts.low_frequency_filter_setting,
            high_frequency_filter_setting: prev_ts.high_frequency_filter_setting,
            notch_filter_frequency_setting: prev_ts.notch_filter_frequency_setting,
            ac_line_frequency: prev_ts.ac_line_frequency,
        };

        let raw_capacity = ((2.0 * cfg.secs_per_block * cfg.sampling_frequency).ceil() as usize)
            .max(1);

        let identity = SegmentIdentity {
            session_name: &prev_header.session_name,
            channel_name,
            anonymized_name: &prev_header.anonymized_name,
            segment_number,
            level_uuid: prev_header.level_uuid,
            password: &password,
        };
        let files = SegmentFiles::create(&channel_dir, &identity, &prev_s1, &meta, &prev_s3)?;

        Ok(Self {
            session_cfg,
            codec: RedCodec::allocate(raw_capacity),
            raw: Vec::with_capacity(raw_capacity),
            raw_capacity,
            cfg,
            password,
            state,
            channel_dir,
            level_uuid: prev_header.level_uuid,
            files,
            section1: prev_s1,
            meta,
            section3: prev_s3,
            block_hdr_time: None,
            block_boundary: 0,
            last_timestamp: 0,
            discontinuity_flag: true,
            start_sample: 0,
            contiguous_blocks: 0,
            contiguous_samples: 0,
            contiguous_bytes: 0,
            next_segment_start_time: None,
        })
    }

    /// Channel base name.
    pub fn channel_name(&self) -> &str {
        &self.cfg.channel_name
    }

    /// Current segment number.
    pub fn segment_number(&self) -> i32 {
        self.files.segment_number
    }

    /// Ingest sorted `(timestamp, sample)` pairs.
    ///
    /// Flushes a block whenever a timestamp gap reaches the discontinuity
    /// threshold or the accumulated wall clock crosses the block interval.
    /// Zero packets is a no-op.
    pub fn write(&mut self, packet_times: &[i64], samples: &[i32]) -> Result<()> {
        if packet_times.len() != samples.len() {
            return Err(MefError::usage(format!(
                "timestamp and sample counts differ: {} vs {}",
                packet_times.len(),
                samples.len()
            )));
        }

        for (&t, &sample) in packet_times.iter().zip(samples.iter()) {
            if self.block_hdr_time.is_none() {
                self.block_hdr_time = Some(t);
                self.block_boundary = t;
            }

            let gap = (t - self.last_timestamp).abs();
            let elapsed = t - self.block_boundary;
            if gap >= DISCONTINUITY_THRESHOLD || elapsed >= self.cfg.block_interval {
                if !self.raw.is_empty() {
                    self.emit_block(true)?;
                }
                if gap >= DISCONTINUITY_THRESHOLD {
                    // Forced flush: the next block restarts the phase.
                    self.discontinuity_flag = true;
                    self.block_boundary = t;
                } else {
                    self.discontinuity_flag = false;
                    self.block_boundary += self.cfg.block_interval;
                }
                self.block_hdr_time = Some(t);
            }

            if self.raw.len() == self.raw_capacity {
                // Sample-rate drift overran the 2x margin; emit what we
                // have and continue the block at this sample.
                self.emit_block(true)?;
                self.discontinuity_flag = false;
                self.block_hdr_time = Some(t);
            }

            self.raw.push(sample);
            self.last_timestamp = t;
        }
        Ok(())
    }

    /// Force-emit any buffered samples and mark the next block
    /// discontinuous. Safe to call repeatedly; an empty buffer is a no-op.
    pub fn flush(&mut self) -> Result<()> {
        self.emit_block(false)?;
        self.discontinuity_flag = true;
        self.block_hdr_time = None;
        self.block_boundary = 0;
        Ok(())
    }

    /// Emit trailing samples, persist final metadata and headers, and close
    /// the file trio.
    pub fn close(mut self) -> Result<()> {
        self.emit_block(false)?;
        self.section3.recording_time_offset = self.state.recording_time_offset();
        self.files
            .update_metadata(&self.section1, &self.meta, &self.section3)?;
        tracing::debug!(
            channel = %self.cfg.channel_name,
            segment = self.files.segment_number,
            samples = self.meta.number_of_samples,
            blocks = self.meta.number_of_blocks,
            "channel closed"
        );
        self.files.close()
    }

    /// Compress and write the buffered samples as one RED block with its
    /// index entry, updating every aggregate and rewriting metadata and
    /// headers.
    fn emit_block(&mut self, check_segment: bool) -> Result<()> {
        if self.raw.is_empty() {
            return Ok(());
        }

        if self.cfg.bit_shift {
            bit_shift_in_place(&mut self.raw);
        }

        let hdr_time_true = self.block_hdr_time.unwrap_or(self.last_timestamp);
        let start_time = self.state.offset_time(hdr_time_true);
        let discontinuity = self.discontinuity_flag;
        let info = self.codec.encode(&self.raw, start_time, discontinuity)?;

        if check_segment && self.session_cfg.num_secs_per_segment > 0 {
            self.check_for_new_segment(start_time)?;
        }

        let file_offset = self.files.data.append(self.codec.compressed())? as i64;

        let (raw_min, raw_max) = find_extrema(&self.raw);
        self.meta.widen_native_extrema(raw_min, raw_max);
        self.meta.note_block(
            info.number_of_samples,
            info.block_bytes,
            info.difference_bytes,
            discontinuity,
        );

        if discontinuity {
            self.contiguous_blocks = 1;
            self.contiguous_samples = i64::from(info.number_of_samples);
            self.contiguous_bytes = i64::from(info.block_bytes);
        } else {
            self.contiguous_blocks += 1;
            self.contiguous_samples += i64::from(info.number_of_samples);
            self.contiguous_bytes += i64::from(info.block_bytes);
        }
        self.meta.push_contiguous(
            self.contiguous_blocks,
            self.contiguous_samples,
            self.contiguous_bytes,
        );

        let end_true = hdr_time_true
            + ((f64::from(info.number_of_samples) / self.cfg.sampling_frequency)
                * MICROS_PER_SEC as f64)
                .ceil() as i64;
        let end_time = self.state.offset_time(end_true);

        self.files
            .data
            .header
            .record_entry(i64::from(info.block_bytes), start_time, end_time);

        let entry = TimeSeriesIndexEntry {
            file_offset,
            start_time,
            start_sample: self.start_sample,
            number_of_samples: info.number_of_samples,
            block_bytes: info.block_bytes,
            maximum_sample_value: raw_max,
            minimum_sample_value: raw_min,
            flags: info.flags,
        };
        self.files.index.append(&entry.encode())?;
        self.files
            .index
            .header
            .record_entry(TIME_SERIES_INDEX_BYTES as i64, start_time, end_time);

        // The metadata header mirrors the segment's temporal bounds; its
        // entry count stays at one.
        if self.files.metadata.header.start_time == UUTC_NO_ENTRY {
            self.files.metadata.header.start_time = start_time;
        }
        self.files.metadata.header.end_time = end_time;
        self.meta.recording_duration =
            (self.files.metadata.header.end_time - self.files.metadata.header.start_time).abs();

        self.start_sample += i64::from(info.number_of_samples);
        self.section3.recording_time_offset = self.state.recording_time_offset();
        self.files
            .update_metadata(&self.section1, &self.meta, &self.section3)?;

        self.raw.clear();
        Ok(())
    }

    /// Roll to a new segment if the pending block's start time has crossed
    /// the scheduled boundary. With anonymized output, stored times decrease
    /// as true time increases, so the comparison and the schedule step both
    /// flip sign.
    fn check_for_new_segment(&mut self, block_start_time: i64) -> Result<()> {
        let duration = self.session_cfg.num_secs_per_segment * MICROS_PER_SEC;
        let step = if self.state.anonymize_output() {
            -duration
        } else {
            duration
        };
        match self.next_segment_start_time {
            None => {
                self.next_segment_start_time = Some(block_start_time + step);
            }
            Some(boundary) => {
                let crossed = if self.state.anonymize_output() {
                    block_start_time <= boundary
                } else {
                    block_start_time >= boundary
                };
                if crossed {
                    self.start_new_segment()?;
                    self.next_segment_start_time = Some(boundary + step);
                }
            }
        }
        Ok(())
    }

    /// Finalize and close the current trio, then open the next segment with
    /// fresh file UUIDs, the same level UUID, and an advanced sample origin.
    fn start_new_segment(&mut self) -> Result<()> {
        self.section3.recording_time_offset = self.state.recording_time_offset();
        self.files
            .update_metadata(&self.section1, &self.meta, &self.section3)?;
        tracing::debug!(
            channel = %self.cfg.channel_name,
            segment = self.files.segment_number,
            samples = self.meta.number_of_samples,
            blocks = self.meta.number_of_blocks,
            "segment complete, rolling over"
        );

        let next_number = self.files.segment_number + 1;
        self.meta
            .reset_for_segment(self.meta.start_sample + self.meta.number_of_samples);

        let identity = SegmentIdentity {
            session_name: &self.session_cfg.session_name,
            channel_name: &self.cfg.channel_name,
            anonymized_name: &self.session_cfg.anonymized_name,
            segment_number: next_number,
            level_uuid: self.level_uuid,
            password: &self.password,
        };
        let new_files = SegmentFiles::create(
            &self.channel_dir,
            &identity,
            &self.section1,
            &self.meta,
            &self.section3,
        )?;
        let old = std::mem::replace(&mut self.files, new_files);
        old.close()?;

        self.start_sample = 0;
        self.contiguous_blocks = 0;
        self.contiguous_samples = 0;
        self.contiguous_bytes = 0;
        Ok(())
    }
}
