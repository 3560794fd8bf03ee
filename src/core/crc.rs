// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CRC-32 primitive used for header, body, and block checksums.
//!
//! Every on-disk file carries a header CRC and a body CRC in its universal
//! header, and every RED block carries its own CRC. All three use the same
//! primitive, exposed here as `start` / `update` / `calculate` so the
//! incremental body CRC and the one-shot header CRC share one code path.

/// Initial CRC accumulator value (CRC of the empty byte string).
pub const CRC_START: u32 = 0;

/// Begin an incremental CRC computation.
#[inline]
pub fn start() -> u32 {
    CRC_START
}

/// Fold `buf` into a running CRC.
#[inline]
pub fn update(prev: u32, buf: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(prev);
    hasher.update(buf);
    hasher.finalize()
}

/// One-shot CRC of `buf`.
#[inline]
pub fn calculate(buf: &[u8]) -> u32 {
    crc32fast::hash(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incremental_matches_one_shot() {
        let data = b"range encoded differences";
        let mut crc = start();
        for chunk in data.chunks(7) {
            crc = update(crc, chunk);
        }
        assert_eq!(crc, calculate(data));
    }

    #[test]
    fn test_empty_is_start_value() {
        assert_eq!(calculate(&[]), CRC_START);
    }
}
