// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Annotation record kinds and their on-disk forms.
//!
//! Records are session-level annotations appended to `<session>.rdat`, each
//! mirrored by a fixed-width entry in `<session>.ridx`. A record on disk is
//! `(header, body, pad)`: the body is padded to the next 16-byte multiple so
//! it can later be encrypted in place with a block cipher. All embedded
//! strings are NUL-padded fixed-width fields, making every record
//! byte-deterministic for a given input.
//!
//! # Record header (24 bytes)
//!
//! | off | len | field |
//! |-----|-----|-------|
//! | 0   | 4   | record_CRC (covers header bytes 4..24, body, and pad) |
//! | 4   | 5   | type string (4 chars + NUL) |
//! | 9   | 1   | version_major |
//! | 10  | 1   | version_minor |
//! | 11  | 1   | encryption (i8) |
//! | 12  | 4   | bytes (body + pad) |
//! | 16  | 8   | time (i64 µUTC, offset-applied) |
//!
//! # Record index entry (24 bytes)
//!
//! | off | len | field |
//! |-----|-----|-------|
//! | 0   | 5   | type string (4 chars + NUL) |
//! | 5   | 1   | version_major |
//! | 6   | 1   | version_minor |
//! | 7   | 1   | encryption (i8) |
//! | 8   | 8   | file_offset of the record header in `.rdat` |
//! | 16  | 8   | time (i64 µUTC, offset-applied) |

use crate::format::constants::{
    RECORD_BODY_ALIGNMENT, RECORD_HEADER_BYTES, RECORD_INDEX_BYTES, RECORD_VERSION_MAJOR,
    RECORD_VERSION_MINOR, TYPE_STRING_BYTES,
};

/// Fixed body size of a `Seiz` record.
pub const SEIZ_BODY_BYTES: usize = 224;
/// Fixed body size of a `Curs` record.
pub const CURS_BODY_BYTES: usize = 64;
/// Fixed body size of an `Epoc` record.
pub const EPOC_BODY_BYTES: usize = 192;

const SEIZ_MARKER_NAME_BYTES: usize = 32;
const SEIZ_ANNOTATION_BYTES: usize = 128;
const CURS_NAME_BYTES: usize = 32;
const EPOC_TYPE_BYTES: usize = 32;
const EPOC_TEXT_BYTES: usize = 128;

/// Serialization interface shared by all record bodies.
pub trait RecordBody {
    /// Unpadded body size in bytes.
    fn bytes(&self) -> usize;

    /// Append the body's on-disk form to `buf`.
    fn write_into(&self, buf: &mut Vec<u8>);
}

/// Seizure marker body (fixed 224 bytes).
#[derive(Debug, Clone, Default)]
pub struct SeizRecord {
    /// Earliest onset across channels, µUTC
    pub earliest_onset: i64,
    /// Latest offset across channels, µUTC
    pub latest_offset: i64,
    /// Seizure duration, µs
    pub duration: i64,
    /// Channels participating in the event
    pub number_of_channels: i32,
    /// Site-specific onset classification code
    pub onset_code: i32,
    /// Primary marker label
    pub marker_name_1: String,
    /// Secondary marker label
    pub marker_name_2: String,
    /// Free-text annotation
    pub annotation: String,
}

impl RecordBody for SeizRecord {
    fn bytes(&self) -> usize {
        SEIZ_BODY_BYTES
    }

    fn write_into(&self, buf: &mut Vec<u8>) {
        let base = buf.len();
        buf.extend_from_slice(&self.earliest_onset.to_le_bytes());
        buf.extend_from_slice(&self.latest_offset.to_le_bytes());
        buf.extend_from_slice(&self.duration.to_le_bytes());
        buf.extend_from_slice(&self.number_of_channels.to_le_bytes());
        buf.extend_from_slice(&self.onset_code.to_le_bytes());
        write_fixed_str(buf, &self.marker_name_1, SEIZ_MARKER_NAME_BYTES);
        write_fixed_str(buf, &self.marker_name_2, SEIZ_MARKER_NAME_BYTES);
        write_fixed_str(buf, &self.annotation, SEIZ_ANNOTATION_BYTES);
        debug_assert_eq!(buf.len() - base, SEIZ_BODY_BYTES);
    }
}

/// Cursor marker body (fixed 64 bytes).
#[derive(Debug, Clone, Default)]
pub struct CursRecord {
    /// Caller-assigned cursor identifier
    pub id_number: i64,
    /// Timestamp of the annotated trace sample, µUTC
    pub trace_timestamp: i64,
    /// Latency relative to the trace timestamp, µs
    pub latency: i64,
    /// Cursor amplitude in native units
    pub value: f64,
    /// Cursor label
    pub name: String,
}

impl RecordBody for CursRecord {
    fn bytes(&self) -> usize {
        CURS_BODY_BYTES
    }

    fn write_into(&self, buf: &mut Vec<u8>) {
        let base = buf.len();
        buf.extend_from_slice(&self.id_number.to_le_bytes());
        buf.extend_from_slice(&self.trace_timestamp.to_le_bytes());
        buf.extend_from_slice(&self.latency.to_le_bytes());
        buf.extend_from_slice(&self.value.to_le_bytes());
        write_fixed_str(buf, &self.name, CURS_NAME_BYTES);
        debug_assert_eq!(buf.len() - base, CURS_BODY_BYTES);
    }
}

/// Epoch marker body (fixed 192 bytes).
#[derive(Debug, Clone, Default)]
pub struct EpocRecord {
    /// Caller-assigned epoch identifier
    pub id_number: i64,
    /// Epoch start, µUTC
    pub timestamp: i64,
    /// Epoch end, µUTC
    pub end_timestamp: i64,
    /// Epoch duration, µs
    pub duration: i64,
    /// Epoch classification label
    pub epoch_type: String,
    /// Free-text description
    pub text: String,
}

impl RecordBody for EpocRecord {
    fn bytes(&self) -> usize {
        EPOC_BODY_BYTES
    }

    fn write_into(&self, buf: &mut Vec<u8>) {
        let base = buf.len();
        buf.extend_from_slice(&self.id_number.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&self.end_timestamp.to_le_bytes());
        buf.extend_from_slice(&self.duration.to_le_bytes());
        write_fixed_str(buf, &self.epoch_type, EPOC_TYPE_BYTES);
        write_fixed_str(buf, &self.text, EPOC_TEXT_BYTES);
        debug_assert_eq!(buf.len() - base, EPOC_BODY_BYTES);
    }
}

/// An annotation record: the accepted kind set is exactly these four.
#[derive(Debug, Clone)]
pub enum Record {
    /// Free-text note (NUL-terminated)
    Note(String),
    /// Seizure marker
    Seiz(SeizRecord),
    /// Cursor marker
    Curs(CursRecord),
    /// Epoch marker
    Epoc(EpocRecord),
}

impl Record {
    /// Four-character type string written into header and index entry.
    pub fn type_string(&self) -> &'static str {
        match self {
            Record::Note(_) => "Note",
            Record::Seiz(_) => "Seiz",
            Record::Curs(_) => "Curs",
            Record::Epoc(_) => "Epoc",
        }
    }

    /// Unpadded body size in bytes.
    pub fn body_bytes(&self) -> usize {
        match self {
            Record::Note(text) => text.as_bytes().len() + 1,
            Record::Seiz(body) => body.bytes(),
            Record::Curs(body) => body.bytes(),
            Record::Epoc(body) => body.bytes(),
        }
    }

    /// Append the body's on-disk form to `buf` (without pad).
    pub fn write_body(&self, buf: &mut Vec<u8>) {
        match self {
            Record::Note(text) => {
                buf.extend_from_slice(text.as_bytes());
                buf.push(0);
            }
            Record::Seiz(body) => body.write_into(buf),
            Record::Curs(body) => body.write_into(buf),
            Record::Epoc(body) => body.write_into(buf),
        }
    }
}

/// Pad bytes needed to bring `body_len` to the next 16-byte multiple.
pub fn record_pad(body_len: usize) -> usize {
    (RECORD_BODY_ALIGNMENT - body_len % RECORD_BODY_ALIGNMENT) % RECORD_BODY_ALIGNMENT
}

/// Serialize a record header with the CRC field zeroed; the writer computes
/// the CRC over header bytes 4..24, body, and pad, then patches it in.
pub fn encode_record_header(
    type_string: &str,
    encryption: i8,
    body_plus_pad: u32,
    time: i64,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(RECORD_HEADER_BYTES);
    buf.extend_from_slice(&[0u8; 4]);
    write_type_string(&mut buf, type_string);
    buf.push(RECORD_VERSION_MAJOR);
    buf.push(RECORD_VERSION_MINOR);
    buf.push(encryption as u8);
    buf.extend_from_slice(&body_plus_pad.to_le_bytes());
    buf.extend_from_slice(&time.to_le_bytes());
    debug_assert_eq!(buf.len(), RECORD_HEADER_BYTES);
    buf
}

/// Serialize a record index entry.
pub fn encode_record_index_entry(
    type_string: &str,
    encryption: i8,
    file_offset: i64,
    time: i64,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(RECORD_INDEX_BYTES);
    write_type_string(&mut buf, type_string);
    buf.push(RECORD_VERSION_MAJOR);
    buf.push(RECORD_VERSION_MINOR);
    buf.push(encryption as u8);
    buf.extend_from_slice(&file_offset.to_le_bytes());
    buf.extend_from_slice(&time.to_le_bytes());
    debug_assert_eq!(buf.len(), RECORD_INDEX_BYTES);
    buf
}

fn write_type_string(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    let mut field = [0u8; TYPE_STRING_BYTES];
    let n = bytes.len().min(TYPE_STRING_BYTES - 1);
    field[..n].copy_from_slice(&bytes[..n]);
    buf.extend_from_slice(&field);
}

fn write_fixed_str(buf: &mut Vec<u8>, s: &str, width: usize) {
    let base = buf.len();
    let bytes = s.as_bytes();
    let n = bytes.len().min(width - 1);
    buf.extend_from_slice(&bytes[..n]);
    buf.resize(base + width, 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_body_sizes_are_aligned() {
        assert_eq!(SEIZ_BODY_BYTES % 16, 0);
        assert_eq!(CURS_BODY_BYTES % 16, 0);
        assert_eq!(EPOC_BODY_BYTES % 16, 0);
    }

    #[test]
    fn test_record_pad() {
        assert_eq!(record_pad(0), 0);
        assert_eq!(record_pad(1), 15);
        assert_eq!(record_pad(6), 10); // "hello\0"
        assert_eq!(record_pad(16), 0);
        assert_eq!(record_pad(17), 15);
    }

    #[test]
    fn test_note_body_is_nul_terminated() {
        let record = Record::Note("hello".to_string());
        assert_eq!(record.body_bytes(), 6);
        let mut buf = Vec::new();
        record.write_body(&mut buf);
        assert_eq!(buf, b"hello\0");
    }

    #[test]
    fn test_bodies_are_byte_deterministic() {
        let body = CursRecord {
            id_number: 1,
            trace_timestamp: 2,
            latency: 3,
            value: 4.5,
            name: "spike".to_string(),
        };
        let mut a = Vec::new();
        let mut b = Vec::new();
        body.write_into(&mut a);
        body.write_into(&mut b);
        assert_eq!(a, b);
        assert_eq!(a.len(), CURS_BODY_BYTES);
        // String tail is zero, not uninitialized.
        assert!(a[32 + "spike".len()..].iter().all(|&x| x == 0));
    }

    #[test]
    fn test_seiz_and_epoc_sizes() {
        let mut buf = Vec::new();
        SeizRecord::default().write_into(&mut buf);
        assert_eq!(buf.len(), SEIZ_BODY_BYTES);
        buf.clear();
        EpocRecord::default().write_into(&mut buf);
        assert_eq!(buf.len(), EPOC_BODY_BYTES);
    }

    #[test]
    fn test_record_header_layout() {
        let header = encode_record_header("Note", 0, 16, 946_684_800_000_000);
        assert_eq!(header.len(), RECORD_HEADER_BYTES);
        assert_eq!(&header[4..9], b"Note\0");
        assert_eq!(header[9], RECORD_VERSION_MAJOR);
        assert_eq!(header[10], RECORD_VERSION_MINOR);
        assert_eq!(u32::from_le_bytes(header[12..16].try_into().unwrap()), 16);
        assert_eq!(
            i64::from_le_bytes(header[16..24].try_into().unwrap()),
            946_684_800_000_000
        );
    }

    #[test]
    fn test_record_index_entry_layout() {
        let entry = encode_record_index_entry("Seiz", 0, 1024, 7);
        assert_eq!(entry.len(), RECORD_INDEX_BYTES);
        assert_eq!(&entry[0..5], b"Seiz\0");
        assert_eq!(i64::from_le_bytes(entry[8..16].try_into().unwrap()), 1024);
        assert_eq!(i64::from_le_bytes(entry[16..24].try_into().unwrap()), 7);
    }
}
