// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! RED (Range Encoded Differences) block codec.
//!
//! A block is a self-describing unit: a fixed header carrying the block's
//! identity and the symbol statistics, followed by the range-coded
//! difference stream. One block per index entry.
//!
//! # Block layout (little-endian)
//!
//! | off | len | field |
//! |-----|-----|-------|
//! | 0   | 4   | block_CRC (covers bytes 4..block_bytes) |
//! | 4   | 1   | flags (bit 0 = discontinuity) |
//! | 5   | 3   | protected (zero) |
//! | 8   | 8   | start_time (i64 µUTC, offset-applied) |
//! | 16  | 4   | number_of_samples |
//! | 20  | 4   | difference_bytes |
//! | 24  | 4   | block_bytes (header + coded stream) |
//! | 28  | 4   | reserved (zero) |
//! | 32  | 256 | scaled symbol counts |
//! | 288 | …   | range-coded difference stream |
//!
//! # Difference stream
//!
//! The first sample is stored as 4 literal little-endian bytes. Each
//! following sample is stored as its delta from the previous one: a single
//! byte for deltas in `[-127, 127]`, otherwise the escape byte `0x80`
//! followed by the 4-byte little-endian delta.
//!
//! # Entropy stage
//!
//! A 32-bit carry-less range coder driven by the per-block byte histogram.
//! Counts are scaled to fit one byte each (nonzero counts stay nonzero), so
//! the cumulative total stays below 2^16 and the coder never underflows.

use crate::core::{crc, MefError, Result};
use crate::format::constants::{
    RED_BLOCK_HEADER_BYTES, RED_BLOCK_STATISTICS_OFFSET, RED_FLAG_DISCONTINUITY,
};

/// Escape byte introducing a 4-byte delta in the difference stream.
const ESCAPE_BYTE: u8 = 0x80;

const RC_TOP: u32 = 1 << 24;
const RC_BOTTOM: u32 = 1 << 16;

/// Header fields of an encoded block, returned by [`RedCodec::encode`].
#[derive(Debug, Clone, Copy)]
pub struct RedBlockInfo {
    /// Timestamp of the block's first sample (offset-applied)
    pub start_time: i64,
    /// Samples in the block
    pub number_of_samples: u32,
    /// Size of the raw difference stream before entropy coding
    pub difference_bytes: u32,
    /// Total block size: header plus coded stream
    pub block_bytes: u32,
    /// Block flags (bit 0 = discontinuity)
    pub flags: u8,
}

impl RedBlockInfo {
    /// Whether the block was flagged discontinuous.
    pub fn discontinuity(&self) -> bool {
        self.flags & RED_FLAG_DISCONTINUITY != 0
    }
}

/// RED block encoder with reusable scratch buffers.
///
/// One codec instance is owned by one channel writer; nothing is shared
/// across channels.
#[derive(Debug, Default)]
pub struct RedCodec {
    diff_buf: Vec<u8>,
    out_buf: Vec<u8>,
}

impl RedCodec {
    /// Create a codec with scratch sized for blocks of up to `max_samples`.
    pub fn allocate(max_samples: usize) -> Self {
        // Worst-case difference stream: 4 literal bytes plus a 5-byte
        // escape sequence per remaining sample.
        let diff_cap = 4 + max_samples.saturating_sub(1) * 5;
        Self {
            diff_buf: Vec::with_capacity(diff_cap),
            out_buf: Vec::with_capacity(RED_BLOCK_HEADER_BYTES + diff_cap),
        }
    }

    /// Encode one block. The compressed bytes are available from
    /// [`RedCodec::compressed`] until the next call.
    pub fn encode(
        &mut self,
        samples: &[i32],
        start_time: i64,
        discontinuity: bool,
    ) -> Result<RedBlockInfo> {
        if samples.is_empty() {
            return Err(MefError::encode("RED", "empty sample buffer"));
        }

        self.build_difference_stream(samples);

        // Per-block histogram, scaled so every count fits one byte and the
        // total stays below 2^16.
        let mut counts = [0u64; 256];
        for &b in &self.diff_buf {
            counts[b as usize] += 1;
        }
        let max_count = counts.iter().copied().max().unwrap_or(0);
        let mut scaled = [0u32; 256];
        for (s, &c) in scaled.iter_mut().zip(counts.iter()) {
            if c > 0 {
                *s = if max_count > 255 {
                    ((c * 255 + max_count - 1) / max_count).max(1) as u32
                } else {
                    c as u32
                };
            }
        }
        let mut cumulative = [0u32; 256];
        let mut total = 0u32;
        for (cum, &s) in cumulative.iter_mut().zip(scaled.iter()) {
            *cum = total;
            total += s;
        }

        // Assemble header with CRC patched last.
        self.out_buf.clear();
        let flags = if discontinuity {
            RED_FLAG_DISCONTINUITY
        } else {
            0
        };
        self.out_buf.extend_from_slice(&[0u8; 4]);
        self.out_buf.push(flags);
        self.out_buf.extend_from_slice(&[0u8; 3]);
        self.out_buf.extend_from_slice(&start_time.to_le_bytes());
        self.out_buf
            .extend_from_slice(&(samples.len() as u32).to_le_bytes());
        self.out_buf
            .extend_from_slice(&(self.diff_buf.len() as u32).to_le_bytes());
        self.out_buf.extend_from_slice(&[0u8; 4]); // block_bytes, patched below
        self.out_buf.extend_from_slice(&[0u8; 4]);
        debug_assert_eq!(self.out_buf.len(), RED_BLOCK_STATISTICS_OFFSET);
        for &s in &scaled {
            self.out_buf.push(s.min(255) as u8);
        }
        debug_assert_eq!(self.out_buf.len(), RED_BLOCK_HEADER_BYTES);

        // Entropy stage.
        let mut rc = RangeEncoder::new();
        for &b in &self.diff_buf {
            rc.encode_symbol(
                cumulative[b as usize],
                scaled[b as usize],
                total,
                &mut self.out_buf,
            );
        }
        rc.finish(&mut self.out_buf);

        let block_bytes = self.out_buf.len() as u32;
        self.out_buf[24..28].copy_from_slice(&block_bytes.to_le_bytes());
        let block_crc = crc::calculate(&self.out_buf[4..]);
        self.out_buf[0..4].copy_from_slice(&block_crc.to_le_bytes());

        Ok(RedBlockInfo {
            start_time,
            number_of_samples: samples.len() as u32,
            difference_bytes: self.diff_buf.len() as u32,
            block_bytes,
            flags,
        })
    }

    /// The most recently encoded block's bytes.
    pub fn compressed(&self) -> &[u8] {
        &self.out_buf
    }

    fn build_difference_stream(&mut self, samples: &[i32]) {
        self.diff_buf.clear();
        self.diff_buf.extend_from_slice(&samples[0].to_le_bytes());
        for pair in samples.windows(2) {
            let delta = i64::from(pair[1]) - i64::from(pair[0]);
            if (-127..=127).contains(&delta) {
                self.diff_buf.push(delta as i8 as u8);
            } else {
                self.diff_buf.push(ESCAPE_BYTE);
                self.diff_buf
                    .extend_from_slice(&pair[1].wrapping_sub(pair[0]).to_le_bytes());
            }
        }
    }
}

/// Scan a sample vector for its extrema.
pub fn find_extrema(samples: &[i32]) -> (i32, i32) {
    let mut min = i32::MAX;
    let mut max = i32::MIN;
    for &s in samples {
        min = min.min(s);
        max = max.max(s);
    }
    (min, max)
}

/// Divide each sample by 4 with half-away-from-zero rounding, truncating the
/// two least-significant bits of 18-bit acquisition hardware.
pub fn bit_shift_in_place(samples: &mut [i32]) {
    for s in samples.iter_mut() {
        *s = if *s >= 0 { (*s + 2) / 4 } else { (*s - 2) / 4 };
    }
}

/// Carry-less 32-bit range coder (encode side).
struct RangeEncoder {
    low: u32,
    range: u32,
}

impl RangeEncoder {
    fn new() -> Self {
        Self {
            low: 0,
            range: u32::MAX,
        }
    }

    fn encode_symbol(&mut self, cum: u32, cnt: u32, total: u32, out: &mut Vec<u8>) {
        let r = self.range / total;
        self.low = self.low.wrapping_add(r * cum);
        self.range = r * cnt;
        loop {
            if (self.low ^ self.low.wrapping_add(self.range)) >= RC_TOP {
                if self.range >= RC_BOTTOM {
                    break;
                }
                // Underflow: clamp the range to the current bottom segment.
                self.range = self.low.wrapping_neg() & (RC_BOTTOM - 1);
            }
            out.push((self.low >> 24) as u8);
            self.low = self.low.wrapping_shl(8);
            self.range = self.range.wrapping_shl(8);
        }
    }

    fn finish(&mut self, out: &mut Vec<u8>) {
        for _ in 0..4 {
            out.push((self.low >> 24) as u8);
            self.low = self.low.wrapping_shl(8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_samples(n: usize) -> Vec<i32> {
        (0..n)
            .map(|i| (20_000.0 * (2.0 * std::f64::consts::PI * 10.0 * i as f64 / 1000.0).sin()) as i32)
            .collect()
    }

    #[test]
    fn test_encode_populates_header_fields() {
        let samples = sine_samples(1000);
        let mut codec = RedCodec::allocate(2000);
        let info = codec.encode(&samples, 946_684_800_000_000, true).unwrap();

        assert_eq!(info.number_of_samples, 1000);
        assert!(info.discontinuity());
        assert_eq!(info.block_bytes as usize, codec.compressed().len());
        assert!(info.block_bytes as usize > RED_BLOCK_HEADER_BYTES);

        let bytes = codec.compressed();
        assert_eq!(bytes[4], RED_FLAG_DISCONTINUITY);
        assert_eq!(
            i64::from_le_bytes(bytes[8..16].try_into().unwrap()),
            946_684_800_000_000
        );
        assert_eq!(u32::from_le_bytes(bytes[16..20].try_into().unwrap()), 1000);
        assert_eq!(
            u32::from_le_bytes(bytes[24..28].try_into().unwrap()),
            info.block_bytes
        );
    }

    #[test]
    fn test_block_crc_covers_tail() {
        let samples = sine_samples(100);
        let mut codec = RedCodec::allocate(100);
        codec.encode(&samples, 0, false).unwrap();
        let bytes = codec.compressed();
        let stored = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        assert_eq!(stored, crc::calculate(&bytes[4..]));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let samples = sine_samples(500);
        let mut a = RedCodec::allocate(500);
        let mut b = RedCodec::allocate(500);
        a.encode(&samples, 7, false).unwrap();
        b.encode(&samples, 7, false).unwrap();
        assert_eq!(a.compressed(), b.compressed());
    }

    #[test]
    fn test_smooth_signal_compresses() {
        let samples = sine_samples(1000);
        let mut codec = RedCodec::allocate(1000);
        let info = codec.encode(&samples, 0, false).unwrap();
        // Small deltas code to fewer bytes than the raw 4 bytes per sample.
        assert!((info.block_bytes as usize) < samples.len() * 4);
    }

    #[test]
    fn test_large_deltas_use_escape_sequences() {
        let samples = vec![0, 1_000_000, -1_000_000, 1_000_000];
        let mut codec = RedCodec::allocate(4);
        let info = codec.encode(&samples, 0, false).unwrap();
        // 4 literal bytes + 3 escape sequences of 5 bytes each.
        assert_eq!(info.difference_bytes, 4 + 3 * 5);
    }

    #[test]
    fn test_single_sample_block() {
        let mut codec = RedCodec::allocate(16);
        let info = codec.encode(&[42], 1, true).unwrap();
        assert_eq!(info.number_of_samples, 1);
        assert_eq!(info.difference_bytes, 4);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let mut codec = RedCodec::allocate(16);
        assert!(codec.encode(&[], 0, false).is_err());
    }

    #[test]
    fn test_find_extrema() {
        assert_eq!(find_extrema(&[3, -7, 12, 0]), (-7, 12));
        assert_eq!(find_extrema(&[5]), (5, 5));
    }

    #[test]
    fn test_bit_shift_rounds_half_away_from_zero() {
        let mut samples = vec![2, -2, 6, -6, 3, -3, 4, -4, 1, -1];
        bit_shift_in_place(&mut samples);
        assert_eq!(samples, vec![1, -1, 2, -2, 1, -1, 1, -1, 0, 0]);
    }
}
