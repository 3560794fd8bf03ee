// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Time-series index entries: one fixed-width entry per RED block.
//!
//! # Layout (little-endian, 56 bytes)
//!
//! | off | len | field |
//! |-----|-----|-------|
//! | 0   | 8   | file_offset into the data file |
//! | 8   | 8   | block start_time (i64 µUTC, offset-applied) |
//! | 16  | 8   | start_sample (cumulative within the segment) |
//! | 24  | 4   | number_of_samples |
//! | 28  | 4   | block_bytes |
//! | 32  | 4   | maximum_sample_value (i32) |
//! | 36  | 4   | minimum_sample_value (i32) |
//! | 40  | 4   | reserved (zero) |
//! | 44  | 1   | flags |
//! | 45  | 11  | protected + discretionary (zero) |
//!
//! Entries are packed field by field; nothing here relies on ambient struct
//! layout or padding.

use byteorder::{LittleEndian, ReadBytesExt};

use crate::core::{MefError, Result};
use crate::format::constants::TIME_SERIES_INDEX_BYTES;

/// One index entry, mirroring one RED block in the data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSeriesIndexEntry {
    /// Byte offset of the block's first compressed byte in the data file
    pub file_offset: i64,
    /// Timestamp of the block's first sample (offset-applied)
    pub start_time: i64,
    /// Cumulative sample index of the block's first sample within the segment
    pub start_sample: i64,
    /// Samples in the block
    pub number_of_samples: u32,
    /// Total block size including its header
    pub block_bytes: u32,
    /// Largest raw sample value in the block
    pub maximum_sample_value: i32,
    /// Smallest raw sample value in the block
    pub minimum_sample_value: i32,
    /// Block flags (bit 0 = discontinuity)
    pub flags: u8,
}

impl TimeSeriesIndexEntry {
    /// Serialize the entry to its 56-byte on-disk form.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(TIME_SERIES_INDEX_BYTES);
        buf.extend_from_slice(&self.file_offset.to_le_bytes());
        buf.extend_from_slice(&self.start_time.to_le_bytes());
        buf.extend_from_slice(&self.start_sample.to_le_bytes());
        buf.extend_from_slice(&self.number_of_samples.to_le_bytes());
        buf.extend_from_slice(&self.block_bytes.to_le_bytes());
        buf.extend_from_slice(&self.maximum_sample_value.to_le_bytes());
        buf.extend_from_slice(&self.minimum_sample_value.to_le_bytes());
        buf.extend_from_slice(&[0u8; 4]);
        buf.push(self.flags);
        buf.resize(TIME_SERIES_INDEX_BYTES, 0);
        buf
    }

    /// Parse an entry from its on-disk form.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < TIME_SERIES_INDEX_BYTES {
            return Err(MefError::metadata_parse(
                "index entry",
                format!("short entry: {} bytes", buf.len()),
            ));
        }
        let mut cursor = buf;
        let file_offset = cursor.read_i64::<LittleEndian>()?;
        let start_time = cursor.read_i64::<LittleEndian>()?;
        let start_sample = cursor.read_i64::<LittleEndian>()?;
        let number_of_samples = cursor.read_u32::<LittleEndian>()?;
        let block_bytes = cursor.read_u32::<LittleEndian>()?;
        let maximum_sample_value = cursor.read_i32::<LittleEndian>()?;
        let minimum_sample_value = cursor.read_i32::<LittleEndian>()?;
        let _reserved = cursor.read_u32::<LittleEndian>()?;
        let flags = buf[44];
        Ok(Self {
            file_offset,
            start_time,
            start_sample,
            number_of_samples,
            block_bytes,
            maximum_sample_value,
            minimum_sample_value,
            flags,
        })
    }
}
