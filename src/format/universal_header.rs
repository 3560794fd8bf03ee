// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! The universal header: a fixed 1024-byte preamble on every session file.
//!
//! # Layout (little-endian)
//!
//! | off | len | field |
//! |-----|-----|-------|
//! | 0   | 4   | header_CRC (covers bytes 4..1024) |
//! | 4   | 4   | body_CRC (covers bytes 1024..EOF) |
//! | 8   | 5   | file type string (4 chars + NUL) |
//! | 13  | 1   | mef_version_major |
//! | 14  | 1   | mef_version_minor |
//! | 15  | 1   | byte_order_code (1 = little-endian) |
//! | 16  | 8   | start_time (i64 µUTC) |
//! | 24  | 8   | end_time (i64 µUTC) |
//! | 32  | 8   | number_of_entries |
//! | 40  | 8   | maximum_entry_size |
//! | 48  | 4   | segment_number (negative sentinels above segment level) |
//! | 52  | 256 | channel_name (NUL-padded) |
//! | 308 | 256 | session_name (NUL-padded) |
//! | 564 | 256 | anonymized_name (NUL-padded) |
//! | 820 | 16  | level_UUID |
//! | 836 | 16  | file_UUID |
//! | 852 | 16  | provenance_UUID |
//! | 868 | 16  | level_1_password_validation_field |
//! | 884 | 16  | level_2_password_validation_field |
//! | 900 | 60  | protected_region (zero) |
//! | 960 | 64  | discretionary_region (zero) |
//!
//! The header CRC is recomputed and rewritten after every payload write so
//! that a closed file always satisfies
//! `header_CRC == CRC(bytes[4..1024])` and `body_CRC == CRC(bytes[1024..])`.

use byteorder::{LittleEndian, ReadBytesExt};

use crate::core::{crc, MefError, Result};
use crate::format::constants::{
    CHANNEL_LEVEL_SEGMENT_NUMBER, LITTLE_ENDIAN_CODE, MEF_VERSION_MAJOR, MEF_VERSION_MINOR,
    NAME_BYTES, TYPE_STRING_BYTES, UNIVERSAL_HEADER_BYTES, UUID_BYTES, UUTC_NO_ENTRY,
};

/// In-memory universal header state for one open file.
///
/// The struct is the single source of truth for the file's preamble; the
/// on-disk copy is refreshed from it via [`UniversalHeader::encode`] after
/// every payload write.
#[derive(Debug, Clone)]
pub struct UniversalHeader {
    /// CRC of header bytes 4..1024; refreshed by `encode`
    pub header_crc: u32,
    /// Running CRC over every payload byte written to the body
    pub body_crc: u32,
    /// Four-character file type ("tmet", "tdat", "tidx", "rdat", "ridx", "mefd")
    pub type_string: String,
    /// Format major version
    pub mef_version_major: u8,
    /// Format minor version
    pub mef_version_minor: u8,
    /// Byte order code (1 = little-endian)
    pub byte_order_code: u8,
    /// Earliest entry time, `UUTC_NO_ENTRY` until the first entry lands
    pub start_time: i64,
    /// Latest entry time, `UUTC_NO_ENTRY` until the first entry lands
    pub end_time: i64,
    /// Number of payload entries in the body
    pub number_of_entries: i64,
    /// Largest single entry written so far, in bytes
    pub maximum_entry_size: i64,
    /// Segment number, or a negative level sentinel
    pub segment_number: i32,
    /// Channel base name
    pub channel_name: String,
    /// Session name
    pub session_name: String,
    /// Anonymized subject name
    pub anonymized_name: String,
    /// Shared by all files of one level (the three files of a segment)
    pub level_uuid: [u8; UUID_BYTES],
    /// Unique per file
    pub file_uuid: [u8; UUID_BYTES],
    /// Tracks the original file across copies; equals `file_uuid` at creation
    pub provenance_uuid: [u8; UUID_BYTES],
    /// Level 1 password validation field (zero when no password)
    pub level_1_password_validation: [u8; UUID_BYTES],
    /// Level 2 password validation field (zero when no password)
    pub level_2_password_validation: [u8; UUID_BYTES],
}

impl UniversalHeader {
    /// Create a fresh header with a new file UUID and "no entry" sentinels.
    pub fn new(type_string: &str, session_name: &str, channel_name: &str) -> Self {
        let file_uuid = *uuid::Uuid::new_v4().as_bytes();
        Self {
            header_crc: crc::CRC_START,
            body_crc: crc::CRC_START,
            type_string: type_string.to_string(),
            mef_version_major: MEF_VERSION_MAJOR,
            mef_version_minor: MEF_VERSION_MINOR,
            byte_order_code: LITTLE_ENDIAN_CODE,
            start_time: UUTC_NO_ENTRY,
            end_time: UUTC_NO_ENTRY,
            number_of_entries: 0,
            maximum_entry_size: 0,
            segment_number: CHANNEL_LEVEL_SEGMENT_NUMBER,
            channel_name: channel_name.to_string(),
            session_name: session_name.to_string(),
            anonymized_name: String::new(),
            level_uuid: [0; UUID_BYTES],
            file_uuid,
            provenance_uuid: file_uuid,
            level_1_password_validation: [0; UUID_BYTES],
            level_2_password_validation: [0; UUID_BYTES],
        }
    }

    /// Serialize the header to its 1024-byte on-disk form, recomputing the
    /// header CRC last so it covers every other field.
    pub fn encode(&mut self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(UNIVERSAL_HEADER_BYTES);

        // CRC fields first; the header CRC is patched in below.
        buf.extend_from_slice(&[0u8; 4]);
        buf.extend_from_slice(&self.body_crc.to_le_bytes());

        write_type_string(&mut buf, &self.type_string);
        buf.push(self.mef_version_major);
        buf.push(self.mef_version_minor);
        buf.push(self.byte_order_code);

        buf.extend_from_slice(&self.start_time.to_le_bytes());
        buf.extend_from_slice(&self.end_time.to_le_bytes());
        buf.extend_from_slice(&self.number_of_entries.to_le_bytes());
        buf.extend_from_slice(&self.maximum_entry_size.to_le_bytes());
        buf.extend_from_slice(&self.segment_number.to_le_bytes());

        write_padded_name(&mut buf, &self.channel_name);
        write_padded_name(&mut buf, &self.session_name);
        write_padded_name(&mut buf, &self.anonymized_name);

        buf.extend_from_slice(&self.level_uuid);
        buf.extend_from_slice(&self.file_uuid);
        buf.extend_from_slice(&self.provenance_uuid);
        buf.extend_from_slice(&self.level_1_password_validation);
        buf.extend_from_slice(&self.level_2_password_validation);

        // Protected + discretionary regions
        buf.resize(UNIVERSAL_HEADER_BYTES, 0);

        self.header_crc = crc::calculate(&buf[4..]);
        buf[0..4].copy_from_slice(&self.header_crc.to_le_bytes());

        debug_assert_eq!(buf.len(), UNIVERSAL_HEADER_BYTES);
        buf
    }

    /// Parse a header from its on-disk form, verifying the header CRC.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < UNIVERSAL_HEADER_BYTES {
            return Err(MefError::metadata_parse(
                "universal header",
                format!("short header: {} bytes", buf.len()),
            ));
        }

        let mut cursor = &buf[..];
        let header_crc = cursor.read_u32::<LittleEndian>()?;
        let computed = crc::calculate(&buf[4..UNIVERSAL_HEADER_BYTES]);
        if header_crc != computed {
            return Err(MefError::metadata_parse(
                "universal header",
                format!("header CRC mismatch: stored {header_crc:#010x}, computed {computed:#010x}"),
            ));
        }

        let body_crc = cursor.read_u32::<LittleEndian>()?;

        let type_string = read_nul_terminated(&buf[8..8 + TYPE_STRING_BYTES]);
        let mef_version_major = buf[13];
        let mef_version_minor = buf[14];
        let byte_order_code = buf[15];

        let mut cursor = &buf[16..];
        let start_time = cursor.read_i64::<LittleEndian>()?;
        let end_time = cursor.read_i64::<LittleEndian>()?;
        let number_of_entries = cursor.read_i64::<LittleEndian>()?;
        let maximum_entry_size = cursor.read_i64::<LittleEndian>()?;
        let segment_number = cursor.read_i32::<LittleEndian>()?;

        let channel_name = read_nul_terminated(&buf[52..52 + NAME_BYTES]);
        let session_name = read_nul_terminated(&buf[308..308 + NAME_BYTES]);
        let anonymized_name = read_nul_terminated(&buf[564..564 + NAME_BYTES]);

        let mut level_uuid = [0u8; UUID_BYTES];
        level_uuid.copy_from_slice(&buf[820..836]);
        let mut file_uuid = [0u8; UUID_BYTES];
        file_uuid.copy_from_slice(&buf[836..852]);
        let mut provenance_uuid = [0u8; UUID_BYTES];
        provenance_uuid.copy_from_slice(&buf[852..868]);
        let mut level_1_password_validation = [0u8; UUID_BYTES];
        level_1_password_validation.copy_from_slice(&buf[868..884]);
        let mut level_2_password_validation = [0u8; UUID_BYTES];
        level_2_password_validation.copy_from_slice(&buf[884..900]);

        Ok(Self {
            header_crc,
            body_crc,
            type_string,
            mef_version_major,
            mef_version_minor,
            byte_order_code,
            start_time,
            end_time,
            number_of_entries,
            maximum_entry_size,
            segment_number,
            channel_name,
            session_name,
            anonymized_name,
            level_uuid,
            file_uuid,
            provenance_uuid,
            level_1_password_validation,
            level_2_password_validation,
        })
    }

    /// Record an entry write: bump the entry count, widen the maximum entry
    /// size, and extend the temporal bounds.
    pub fn record_entry(&mut self, entry_bytes: i64, start_time: i64, end_time: i64) {
        self.number_of_entries += 1;
        if entry_bytes > self.maximum_entry_size {
            self.maximum_entry_size = entry_bytes;
        }
        if self.start_time == UUTC_NO_ENTRY {
            self.start_time = start_time;
        }
        self.end_time = end_time;
    }
}

/// Write a type string as 4 characters + NUL.
fn write_type_string(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    let mut field = [0u8; TYPE_STRING_BYTES];
    let n = bytes.len().min(TYPE_STRING_BYTES - 1);
    field[..n].copy_from_slice(&bytes[..n]);
    buf.extend_from_slice(&field);
}

/// Write a name as a NUL-padded fixed-width field, truncating to fit.
fn write_padded_name(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    let mut field = [0u8; NAME_BYTES];
    let n = bytes.len().min(NAME_BYTES - 1);
    field[..n].copy_from_slice(&bytes[..n]);
    buf.extend_from_slice(&field);
}

/// Read a NUL-terminated string out of a fixed-width field.
pub(crate) fn read_nul_terminated(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> UniversalHeader {
        let mut uh = UniversalHeader::new("tdat", "session", "chan-01");
        uh.start_time = 946_684_800_000_000;
        uh.end_time = 946_684_801_000_000;
        uh.number_of_entries = 3;
        uh.maximum_entry_size = 512;
        uh.segment_number = 0;
        uh.level_uuid = [7; UUID_BYTES];
        uh
    }

    #[test]
    fn test_encode_is_exactly_header_sized() {
        let bytes = sample_header().encode();
        assert_eq!(bytes.len(), UNIVERSAL_HEADER_BYTES);
    }

    #[test]
    fn test_header_crc_covers_tail() {
        let bytes = sample_header().encode();
        let stored = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        assert_eq!(stored, crc::calculate(&bytes[4..]));
    }

    #[test]
    fn test_round_trip() {
        let mut uh = sample_header();
        let bytes = uh.encode();
        let parsed = UniversalHeader::decode(&bytes).unwrap();
        assert_eq!(parsed.type_string, "tdat");
        assert_eq!(parsed.session_name, "session");
        assert_eq!(parsed.channel_name, "chan-01");
        assert_eq!(parsed.start_time, uh.start_time);
        assert_eq!(parsed.end_time, uh.end_time);
        assert_eq!(parsed.number_of_entries, 3);
        assert_eq!(parsed.maximum_entry_size, 512);
        assert_eq!(parsed.segment_number, 0);
        assert_eq!(parsed.level_uuid, uh.level_uuid);
        assert_eq!(parsed.file_uuid, uh.file_uuid);
    }

    #[test]
    fn test_decode_rejects_corrupted_header() {
        let mut bytes = sample_header().encode();
        bytes[100] ^= 0xFF;
        assert!(UniversalHeader::decode(&bytes).is_err());
    }

    #[test]
    fn test_record_entry_updates_bounds() {
        let mut uh = UniversalHeader::new("tidx", "s", "c");
        assert_eq!(uh.start_time, UUTC_NO_ENTRY);
        uh.record_entry(56, 1_000, 2_000);
        assert_eq!(uh.start_time, 1_000);
        assert_eq!(uh.end_time, 2_000);
        assert_eq!(uh.number_of_entries, 1);
        uh.record_entry(40, 500, 3_000);
        // Start is captured once, end always follows the latest entry.
        assert_eq!(uh.start_time, 1_000);
        assert_eq!(uh.end_time, 3_000);
        assert_eq!(uh.maximum_entry_size, 56);
    }
}
