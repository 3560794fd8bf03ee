// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Block codecs.
//!
//! Currently one codec: RED (Range Encoded Differences), the MEF 3.0
//! time-series block format.

pub mod red;

pub use red::{bit_shift_in_place, find_extrema, RedBlockInfo, RedCodec};
