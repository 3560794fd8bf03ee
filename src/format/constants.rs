// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! On-disk layout constants for MEF 3.0 session files.
//!
//! Sizes and offsets for the universal header, time-series index entries,
//! metadata sections, and annotation records, plus the directory and file
//! name suffixes of the session hierarchy. All multi-byte fields on disk
//! are little-endian.

/// MEF format version written into every universal header.
pub const MEF_VERSION_MAJOR: u8 = 3;
/// MEF format minor version.
pub const MEF_VERSION_MINOR: u8 = 0;

/// Byte order code: 1 = little-endian.
pub const LITTLE_ENDIAN_CODE: u8 = 1;

/// Size of the universal header that begins every file.
pub const UNIVERSAL_HEADER_BYTES: usize = 1024;

/// Fixed-size name fields in the universal header (including NUL padding).
pub const NAME_BYTES: usize = 256;

/// Length of a file type string on disk (four characters plus NUL).
pub const TYPE_STRING_BYTES: usize = 5;

/// UUID field width.
pub const UUID_BYTES: usize = 16;

/// Password validation field width.
pub const PASSWORD_VALIDATION_FIELD_BYTES: usize = 16;

/// Sentinel for "no timestamp recorded yet" in i64 µUTC fields.
pub const UUTC_NO_ENTRY: i64 = i64::MIN;

/// Sentinel segment number for channel-level files.
pub const CHANNEL_LEVEL_SEGMENT_NUMBER: i32 = -1;
/// Sentinel segment number for session-level files (records).
pub const SESSION_LEVEL_SEGMENT_NUMBER: i32 = -2;
/// Sentinel segment number for the channel manifest.
pub const MANIFEST_SEGMENT_NUMBER: i32 = -3;

/// Timestamp gap that forces a discontinuous block (0.1 s).
pub const DISCONTINUITY_THRESHOLD: i64 = 100_000;

/// Microseconds per second.
pub const MICROS_PER_SEC: i64 = 1_000_000;
/// Microseconds per day, used when folding the recording time offset.
pub const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SEC;

// === Time-series index entries ===

/// Total size of one index entry, including reserved tail bytes.
pub const TIME_SERIES_INDEX_BYTES: usize = 56;

// === Metadata sections ===

/// Section 1: encryption flags and reserved identity bytes.
pub const METADATA_SECTION_1_BYTES: usize = 256;
/// Section 2: time-series channel parameters and per-segment statistics.
pub const METADATA_SECTION_2_BYTES: usize = 2048;
/// Section 3: subject identity and recording time offset data.
pub const METADATA_SECTION_3_BYTES: usize = 1024;
/// Metadata file body size (sections 1-3, after the universal header).
pub const METADATA_BODY_BYTES: usize =
    METADATA_SECTION_1_BYTES + METADATA_SECTION_2_BYTES + METADATA_SECTION_3_BYTES;
/// Metadata file size on disk.
pub const METADATA_FILE_BYTES: usize = UNIVERSAL_HEADER_BYTES + METADATA_BODY_BYTES;

/// Encryption level written into section 1 flags when a level-2 password
/// is present (0 = unencrypted).
pub const LEVEL_2_ENCRYPTION: i8 = 2;

// === RED blocks ===

/// Fixed RED block header size; the range-coded difference stream follows.
pub const RED_BLOCK_HEADER_BYTES: usize = 288;
/// Offset of the symbol-count table inside the block header.
pub const RED_BLOCK_STATISTICS_OFFSET: usize = 32;
/// Discontinuity bit in the RED block flags byte.
pub const RED_FLAG_DISCONTINUITY: u8 = 0x01;

// === Annotation records ===

/// Fixed record header size in `.rdat` files.
pub const RECORD_HEADER_BYTES: usize = 24;
/// Fixed record index entry size in `.ridx` files.
pub const RECORD_INDEX_BYTES: usize = 24;
/// Record bodies are padded to this alignment so they can be encrypted
/// in place with a 16-byte block cipher.
pub const RECORD_BODY_ALIGNMENT: usize = 16;

/// Annotation record version written into record headers.
pub const RECORD_VERSION_MAJOR: u8 = 1;
/// Annotation record minor version.
pub const RECORD_VERSION_MINOR: u8 = 0;

// === Manifest ===

/// Width of one zero-padded channel entry in the session manifest.
pub const MANIFEST_ENTRY_BYTES: usize = 256;

// === Directory and file suffixes ===

/// Session directory suffix (also the manifest file suffix).
pub const SESSION_DIRECTORY_SUFFIX: &str = "mefd";
/// Time-series channel directory suffix.
pub const CHANNEL_DIRECTORY_SUFFIX: &str = "timd";
/// Segment directory suffix.
pub const SEGMENT_DIRECTORY_SUFFIX: &str = "segd";
/// Time-series metadata file suffix.
pub const METADATA_FILE_SUFFIX: &str = "tmet";
/// Time-series data file suffix.
pub const DATA_FILE_SUFFIX: &str = "tdat";
/// Time-series index file suffix.
pub const INDEX_FILE_SUFFIX: &str = "tidx";
/// Record data file suffix.
pub const RECORD_DATA_SUFFIX: &str = "rdat";
/// Record index file suffix.
pub const RECORD_INDEX_SUFFIX: &str = "ridx";

// === File type strings (written into universal headers) ===

/// Type string for metadata files.
pub const METADATA_TYPE_STRING: &str = "tmet";
/// Type string for data files.
pub const DATA_TYPE_STRING: &str = "tdat";
/// Type string for index files.
pub const INDEX_TYPE_STRING: &str = "tidx";
/// Type string for record data files.
pub const RECORD_DATA_TYPE_STRING: &str = "rdat";
/// Type string for record index files.
pub const RECORD_INDEX_TYPE_STRING: &str = "ridx";
/// Type string for the channel manifest.
pub const MANIFEST_TYPE_STRING: &str = "mefd";
