// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Metadata file sections: identity/encryption flags, time-series channel
//! parameters, and subject info.
//!
//! The metadata file body is three fixed-size sections written back-to-back
//! after the universal header and rewritten in full after every block.
//!
//! # Section 1 (256 bytes)
//!
//! | off | len | field |
//! |-----|-----|-------|
//! | 0   | 1   | section_2_encryption (i8, 0 = none, 2 = level 2) |
//! | 1   | 1   | section_3_encryption (i8) |
//! | 2   | 254 | protected (zero) |
//!
//! # Section 2 (2048 bytes, time-series channel parameters)
//!
//! | off | len | field |
//! |-----|-----|-------|
//! | 0    | 512 | channel_description (NUL-padded) |
//! | 512  | 256 | reference_description (NUL-padded) |
//! | 768  | 8   | recording_duration (i64 µs) |
//! | 776  | 8   | sampling_frequency (f64 Hz) |
//! | 784  | 8   | low_frequency_filter_setting (f64 Hz) |
//! | 792  | 8   | high_frequency_filter_setting (f64 Hz) |
//! | 800  | 8   | notch_filter_frequency_setting (f64 Hz) |
//! | 808  | 8   | AC_line_frequency (f64 Hz) |
//! | 816  | 8   | units_conversion_factor (f64) |
//! | 824  | 32  | units_description (NUL-padded) |
//! | 856  | 8   | maximum_native_sample_value (f64, NaN = no entry) |
//! | 864  | 8   | minimum_native_sample_value (f64, NaN = no entry) |
//! | 872  | 8   | start_sample (i64, absolute within the channel) |
//! | 880  | 8   | number_of_samples (i64) |
//! | 888  | 8   | number_of_blocks (i64) |
//! | 896  | 8   | maximum_block_bytes (i64) |
//! | 904  | 4   | maximum_block_samples (u32) |
//! | 908  | 4   | maximum_difference_bytes (u32) |
//! | 912  | 8   | block_interval (i64 µs) |
//! | 920  | 8   | number_of_discontinuities (i64) |
//! | 928  | 8   | maximum_contiguous_blocks (i64) |
//! | 936  | 8   | maximum_contiguous_block_bytes (i64) |
//! | 944  | 8   | maximum_contiguous_samples (i64) |
//! | 952  | 4   | acquisition_channel_number (i32) |
//! | 956  | 1092| reserved (zero) |
//!
//! # Section 3 (1024 bytes, subject info)
//!
//! | off | len | field |
//! |-----|-----|-------|
//! | 0   | 8   | recording_time_offset (i64 µs) |
//! | 8   | 8   | DST_start_time (i64) |
//! | 16  | 8   | DST_end_time (i64) |
//! | 24  | 4   | GMT_offset (i32 seconds) |
//! | 28  | 4   | reserved |
//! | 32  | 128 | subject_name_1 (NUL-padded) |
//! | 160 | 128 | subject_name_2 (NUL-padded) |
//! | 288 | 128 | subject_ID (NUL-padded) |
//! | 416 | 128 | recording_location (NUL-padded) |
//! | 544 | 480 | reserved (zero) |

use byteorder::{LittleEndian, ReadBytesExt};

use crate::core::{MefError, Result};
use crate::format::constants::{
    METADATA_BODY_BYTES, METADATA_SECTION_1_BYTES, METADATA_SECTION_2_BYTES,
    METADATA_SECTION_3_BYTES,
};
use crate::format::universal_header::read_nul_terminated;

const DESCRIPTION_BYTES: usize = 512;
const REFERENCE_BYTES: usize = 256;
const UNITS_DESCRIPTION_BYTES: usize = 32;
const SUBJECT_FIELD_BYTES: usize = 128;

/// Section 1: encryption flags for the sections that follow.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataSection1 {
    /// Encryption level of section 2 (0 = none)
    pub section_2_encryption: i8,
    /// Encryption level of section 3 (0 = none)
    pub section_3_encryption: i8,
}

/// Section 2: immutable channel parameters plus per-segment aggregates.
///
/// The aggregate fields are updated in memory after every emitted block and
/// persisted by `update_metadata`.
#[derive(Debug, Clone)]
pub struct TimeSeriesMetadata {
    /// Free-text channel description
    pub channel_description: String,
    /// Free-text reference electrode description
    pub reference_description: String,
    /// `|end_time - start_time|` of the segment
    pub recording_duration: i64,
    /// Nominal sampling frequency in Hz
    pub sampling_frequency: f64,
    /// Low-pass filter cutoff, Hz
    pub low_frequency_filter_setting: f64,
    /// High-pass filter cutoff, Hz
    pub high_frequency_filter_setting: f64,
    /// Notch filter frequency, Hz
    pub notch_filter_frequency_setting: f64,
    /// AC line frequency, Hz
    pub ac_line_frequency: f64,
    /// Raw-sample to native-unit scale factor; negative flips min/max
    pub units_conversion_factor: f64,
    /// Native unit name (e.g. "microvolts")
    pub units_description: String,
    /// Largest native sample value seen; NaN until the first block
    pub maximum_native_sample_value: f64,
    /// Smallest native sample value seen; NaN until the first block
    pub minimum_native_sample_value: f64,
    /// Absolute sample index of this segment's first sample within the channel
    pub start_sample: i64,
    /// Samples written to this segment
    pub number_of_samples: i64,
    /// Blocks written to this segment
    pub number_of_blocks: i64,
    /// Largest block in bytes
    pub maximum_block_bytes: i64,
    /// Largest block in samples
    pub maximum_block_samples: u32,
    /// Largest difference stream in bytes
    pub maximum_difference_bytes: u32,
    /// Nominal wall-clock per block, µs
    pub block_interval: i64,
    /// Blocks flagged discontinuous
    pub number_of_discontinuities: i64,
    /// Longest run of contiguous blocks
    pub maximum_contiguous_blocks: i64,
    /// Byte total of the largest contiguous run
    pub maximum_contiguous_block_bytes: i64,
    /// Sample total of the largest contiguous run
    pub maximum_contiguous_samples: i64,
    /// Hardware acquisition channel number
    pub acquisition_channel_number: i32,
}

impl TimeSeriesMetadata {
    /// Fresh per-segment aggregates with "no entry" sentinels.
    pub fn new(sampling_frequency: f64, block_interval: i64) -> Self {
        Self {
            channel_description: String::new(),
            reference_description: String::new(),
            recording_duration: 0,
            sampling_frequency,
            low_frequency_filter_setting: 0.0,
            high_frequency_filter_setting: 0.0,
            notch_filter_frequency_setting: 0.0,
            ac_line_frequency: 0.0,
            units_conversion_factor: 1.0,
            units_description: String::new(),
            maximum_native_sample_value: f64::NAN,
            minimum_native_sample_value: f64::NAN,
            start_sample: 0,
            number_of_samples: 0,
            number_of_blocks: 0,
            maximum_block_bytes: 0,
            maximum_block_samples: 0,
            maximum_difference_bytes: 0,
            block_interval,
            number_of_discontinuities: 0,
            maximum_contiguous_blocks: 0,
            maximum_contiguous_block_bytes: 0,
            maximum_contiguous_samples: 0,
            acquisition_channel_number: 0,
        }
    }

    /// Fold one emitted block into the per-segment aggregates.
    pub fn note_block(
        &mut self,
        samples: u32,
        block_bytes: u32,
        difference_bytes: u32,
        discontinuity: bool,
    ) {
        self.number_of_samples += i64::from(samples);
        self.number_of_blocks += 1;
        self.maximum_block_bytes = self.maximum_block_bytes.max(i64::from(block_bytes));
        self.maximum_block_samples = self.maximum_block_samples.max(samples);
        self.maximum_difference_bytes = self.maximum_difference_bytes.max(difference_bytes);
        if discontinuity {
            self.number_of_discontinuities += 1;
        }
    }

    /// Push a contiguous-run accumulator into the run maxima.
    pub fn push_contiguous(&mut self, blocks: i64, samples: i64, bytes: i64) {
        self.maximum_contiguous_blocks = self.maximum_contiguous_blocks.max(blocks);
        self.maximum_contiguous_samples = self.maximum_contiguous_samples.max(samples);
        self.maximum_contiguous_block_bytes = self.maximum_contiguous_block_bytes.max(bytes);
    }

    /// Widen the native extrema with one block's raw extrema.
    ///
    /// Native values are raw values scaled by the units conversion factor;
    /// a negative factor swaps the roles of min and max. NaN means no value
    /// seen yet; the first block initializes both bounds.
    pub fn widen_native_extrema(&mut self, raw_min: i32, raw_max: i32) {
        let a = f64::from(raw_min) * self.units_conversion_factor;
        let b = f64::from(raw_max) * self.units_conversion_factor;
        let (lo, hi) = if self.units_conversion_factor < 0.0 {
            (b, a)
        } else {
            (a, b)
        };
        self.minimum_native_sample_value = if self.minimum_native_sample_value.is_nan() {
            lo
        } else {
            self.minimum_native_sample_value.min(lo)
        };
        self.maximum_native_sample_value = if self.maximum_native_sample_value.is_nan() {
            hi
        } else {
            self.maximum_native_sample_value.max(hi)
        };
    }

    /// Reset the per-segment aggregates for a fresh segment starting at
    /// `start_sample`, keeping the immutable channel parameters.
    pub fn reset_for_segment(&mut self, start_sample: i64) {
        self.recording_duration = 0;
        self.maximum_native_sample_value = f64::NAN;
        self.minimum_native_sample_value = f64::NAN;
        self.start_sample = start_sample;
        self.number_of_samples = 0;
        self.number_of_blocks = 0;
        self.maximum_block_bytes = 0;
        self.maximum_block_samples = 0;
        self.maximum_difference_bytes = 0;
        self.number_of_discontinuities = 0;
        self.maximum_contiguous_blocks = 0;
        self.maximum_contiguous_block_bytes = 0;
        self.maximum_contiguous_samples = 0;
    }
}

/// Section 3: subject identity and time anonymization data.
#[derive(Debug, Clone, Default)]
pub struct MetadataSection3 {
    /// Per-session constant subtracted from timestamps when anonymizing
    pub recording_time_offset: i64,
    /// Daylight saving start, µUTC (0 = unused)
    pub dst_start_time: i64,
    /// Daylight saving end, µUTC (0 = unused)
    pub dst_end_time: i64,
    /// Recording site offset from GMT, seconds
    pub gmt_offset: i32,
    /// Subject given name
    pub subject_name_1: String,
    /// Subject family name
    pub subject_name_2: String,
    /// Subject identifier
    pub subject_id: String,
    /// Recording site
    pub recording_location: String,
}

/// Pack the three sections into the metadata file body.
pub fn encode_metadata_body(
    s1: &MetadataSection1,
    ts: &TimeSeriesMetadata,
    s3: &MetadataSection3,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(METADATA_BODY_BYTES);

    // Section 1
    buf.push(s1.section_2_encryption as u8);
    buf.push(s1.section_3_encryption as u8);
    buf.resize(METADATA_SECTION_1_BYTES, 0);

    // Section 2
    let s2_base = buf.len();
    write_fixed_str(&mut buf, &ts.channel_description, DESCRIPTION_BYTES);
    write_fixed_str(&mut buf, &ts.reference_description, REFERENCE_BYTES);
    buf.extend_from_slice(&ts.recording_duration.to_le_bytes());
    buf.extend_from_slice(&ts.sampling_frequency.to_le_bytes());
    buf.extend_from_slice(&ts.low_frequency_filter_setting.to_le_bytes());
    buf.extend_from_slice(&ts.high_frequency_filter_setting.to_le_bytes());
    buf.extend_from_slice(&ts.notch_filter_frequency_setting.to_le_bytes());
    buf.extend_from_slice(&ts.ac_line_frequency.to_le_bytes());
    buf.extend_from_slice(&ts.units_conversion_factor.to_le_bytes());
    write_fixed_str(&mut buf, &ts.units_description, UNITS_DESCRIPTION_BYTES);
    buf.extend_from_slice(&ts.maximum_native_sample_value.to_le_bytes());
    buf.extend_from_slice(&ts.minimum_native_sample_value.to_le_bytes());
    buf.extend_from_slice(&ts.start_sample.to_le_bytes());
    buf.extend_from_slice(&ts.number_of_samples.to_le_bytes());
    buf.extend_from_slice(&ts.number_of_blocks.to_le_bytes());
    buf.extend_from_slice(&ts.maximum_block_bytes.to_le_bytes());
    buf.extend_from_slice(&ts.maximum_block_samples.to_le_bytes());
    buf.extend_from_slice(&ts.maximum_difference_bytes.to_le_bytes());
    buf.extend_from_slice(&ts.block_interval.to_le_bytes());
    buf.extend_from_slice(&ts.number_of_discontinuities.to_le_bytes());
    buf.extend_from_slice(&ts.maximum_contiguous_blocks.to_le_bytes());
    buf.extend_from_slice(&ts.maximum_contiguous_block_bytes.to_le_bytes());
    buf.extend_from_slice(&ts.maximum_contiguous_samples.to_le_bytes());
    buf.extend_from_slice(&ts.acquisition_channel_number.to_le_bytes());
    buf.resize(s2_base + METADATA_SECTION_2_BYTES, 0);

    // Section 3
    let s3_base = buf.len();
    buf.extend_from_slice(&s3.recording_time_offset.to_le_bytes());
    buf.extend_from_slice(&s3.dst_start_time.to_le_bytes());
    buf.extend_from_slice(&s3.dst_end_time.to_le_bytes());
    buf.extend_from_slice(&s3.gmt_offset.to_le_bytes());
    buf.extend_from_slice(&[0u8; 4]);
    write_fixed_str(&mut buf, &s3.subject_name_1, SUBJECT_FIELD_BYTES);
    write_fixed_str(&mut buf, &s3.subject_name_2, SUBJECT_FIELD_BYTES);
    write_fixed_str(&mut buf, &s3.subject_id, SUBJECT_FIELD_BYTES);
    write_fixed_str(&mut buf, &s3.recording_location, SUBJECT_FIELD_BYTES);
    buf.resize(s3_base + METADATA_SECTION_3_BYTES, 0);

    debug_assert_eq!(buf.len(), METADATA_BODY_BYTES);
    buf
}

/// Parse a metadata file body back into its three sections.
///
/// This is the minimal segment-metadata reader the append path needs; it is
/// not a general MEF reader.
pub fn decode_metadata_body(
    buf: &[u8],
) -> Result<(MetadataSection1, TimeSeriesMetadata, MetadataSection3)> {
    if buf.len() < METADATA_BODY_BYTES {
        return Err(MefError::metadata_parse(
            "metadata body",
            format!("short body: {} bytes", buf.len()),
        ));
    }

    let s1 = MetadataSection1 {
        section_2_encryption: buf[0] as i8,
        section_3_encryption: buf[1] as i8,
    };

    let s2 = &buf[METADATA_SECTION_1_BYTES..METADATA_SECTION_1_BYTES + METADATA_SECTION_2_BYTES];
    let channel_description = read_nul_terminated(&s2[0..DESCRIPTION_BYTES]);
    let reference_description =
        read_nul_terminated(&s2[DESCRIPTION_BYTES..DESCRIPTION_BYTES + REFERENCE_BYTES]);
    let mut cursor = &s2[DESCRIPTION_BYTES + REFERENCE_BYTES..];
    let recording_duration = cursor.read_i64::<LittleEndian>()?;
    let sampling_frequency = cursor.read_f64::<LittleEndian>()?;
    let low_frequency_filter_setting = cursor.read_f64::<LittleEndian>()?;
    let high_frequency_filter_setting = cursor.read_f64::<LittleEndian>()?;
    let notch_filter_frequency_setting = cursor.read_f64::<LittleEndian>()?;
    let ac_line_frequency = cursor.read_f64::<LittleEndian>()?;
    let units_conversion_factor = cursor.read_f64::<LittleEndian>()?;
    let units_description = read_nul_terminated(&cursor[..UNITS_DESCRIPTION_BYTES]);
    cursor = &cursor[UNITS_DESCRIPTION_BYTES..];
    let maximum_native_sample_value = cursor.read_f64::<LittleEndian>()?;
    let minimum_native_sample_value = cursor.read_f64::<LittleEndian>()?;
    let start_sample = cursor.read_i64::<LittleEndian>()?;
    let number_of_samples = cursor.read_i64::<LittleEndian>()?;
    let number_of_blocks = cursor.read_i64::<LittleEndian>()?;
    let maximum_block_bytes = cursor.read_i64::<LittleEndian>()?;
    let maximum_block_samples = cursor.read_u32::<LittleEndian>()?;
    let maximum_difference_bytes = cursor.read_u32::<LittleEndian>()?;
    let block_interval = cursor.read_i64::<LittleEndian>()?;
    let number_of_discontinuities = cursor.read_i64::<LittleEndian>()?;
    let maximum_contiguous_blocks = cursor.read_i64::<LittleEndian>()?;
    let maximum_contiguous_block_bytes = cursor.read_i64::<LittleEndian>()?;
    let maximum_contiguous_samples = cursor.read_i64::<LittleEndian>()?;
    let acquisition_channel_number = cursor.read_i32::<LittleEndian>()?;

    let ts = TimeSeriesMetadata {
        channel_description,
        reference_description,
        recording_duration,
        sampling_frequency,
        low_frequency_filter_setting,
        high_frequency_filter_setting,
        notch_filter_frequency_setting,
        ac_line_frequency,
        units_conversion_factor,
        units_description,
        maximum_native_sample_value,
        minimum_native_sample_value,
        start_sample,
        number_of_samples,
        number_of_blocks,
        maximum_block_bytes,
        maximum_block_samples,
        maximum_difference_bytes,
        block_interval,
        number_of_discontinuities,
        maximum_contiguous_blocks,
        maximum_contiguous_block_bytes,
        maximum_contiguous_samples,
        acquisition_channel_number,
    };

    let s3_bytes = &buf[METADATA_SECTION_1_BYTES + METADATA_SECTION_2_BYTES..METADATA_BODY_BYTES];
    let mut cursor = &s3_bytes[..];
    let recording_time_offset = cursor.read_i64::<LittleEndian>()?;
    let dst_start_time = cursor.read_i64::<LittleEndian>()?;
    let dst_end_time = cursor.read_i64::<LittleEndian>()?;
    let gmt_offset = cursor.read_i32::<LittleEndian>()?;
    let subject_name_1 = read_nul_terminated(&s3_bytes[32..32 + SUBJECT_FIELD_BYTES]);
    let subject_name_2 = read_nul_terminated(&s3_bytes[160..160 + SUBJECT_FIELD_BYTES]);
    let subject_id = read_nul_terminated(&s3_bytes[288..288 + SUBJECT_FIELD_BYTES]);
    let recording_location = read_nul_terminated(&s3_bytes[416..416 + SUBJECT_FIELD_BYTES]);

    let s3 = MetadataSection3 {
        recording_time_offset,
        dst_start_time,
        dst_end_time,
        gmt_offset,
        subject_name_1,
        subject_name_2,
        subject_id,
        recording_location,
    };

    Ok((s1, ts, s3))
}

/// Write a NUL-padded fixed-width string field, truncating to fit.
fn write_fixed_str(buf: &mut Vec<u8>, s: &str, width: usize) {
    let base = buf.len();
    let bytes = s.as_bytes();
    let n = bytes.len().min(width - 1);
    buf.extend_from_slice(&bytes[..n]);
    buf.resize(base + width, 0);
}
