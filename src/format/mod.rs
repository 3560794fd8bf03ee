// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! On-disk byte layouts for MEF 3.0 session files.
//!
//! Everything in this module is a pure byte-layout concern: the universal
//! header preamble, time-series index entries, metadata sections, annotation
//! records, and the layout constants they share. File handles and writer
//! state machines live in [`crate::io`].

pub mod constants;
pub mod index;
pub mod metadata;
pub mod records;
pub mod universal_header;

pub use index::TimeSeriesIndexEntry;
pub use metadata::{MetadataSection1, MetadataSection3, TimeSeriesMetadata};
pub use records::{CursRecord, EpocRecord, Record, RecordBody, SeizRecord};
pub use universal_header::UniversalHeader;
