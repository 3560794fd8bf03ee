// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Mefcodec
//!
//! Streaming writer library for MEF 3.0 (Multiscale Electrophysiology
//! Format) time-series sessions.
//!
//! The library accepts sorted `(timestamp, sample)` pairs per channel and
//! produces on-disk session directories of per-channel, per-segment file
//! trios: metadata, RED-compressed data blocks, and an index entry per
//! block. It also appends session-level annotation records (notes, seizure
//! markers, cursors, epochs) and maintains a channel manifest for
//! third-party viewers.
//!
//! - **[`Session`]** - Entry point; validates passwords, owns shared state
//! - **[`io::ChannelWriter`]** - Streaming channel state machine
//! - **[`io::RecordWriter`]** - Append-only annotation writer
//! - **[`codec::RedCodec`]** - RED block codec (difference + range coding)
//!
//! ## Example: writing a channel
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use mefcodec::{ChannelConfig, Session, SessionConfig};
//!
//! let session = Session::new(SessionConfig {
//!     root: "/data".into(),
//!     session_name: "patient-042".to_string(),
//!     ..Default::default()
//! })?;
//! let mut channel = session.create_channel(ChannelConfig {
//!     channel_name: "LTd1".to_string(),
//!     sampling_frequency: 1000.0,
//!     ..Default::default()
//! })?;
//!
//! let times: Vec<i64> = (0..1000).map(|i| 946_684_800_000_000 + i * 1000).collect();
//! let samples: Vec<i32> = (0..1000).map(|i| (i % 100) as i32).collect();
//! channel.write(&times, &samples)?;
//! channel.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: annotations
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use mefcodec::{Record, Session, SessionConfig};
//!
//! let session = Session::new(SessionConfig::default())?;
//! let mut records = session.records()?;
//! records.write_record(946_684_800_000_000, &Record::Note("sleep onset".to_string()))?;
//! records.close()?;
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use core::{MefError, Result};

// On-disk byte layouts
pub mod format;

// Block codecs
pub mod codec;

// File containers and writer state machines
pub mod io;

// Session configuration and shared state
pub mod session;

// Re-export the public writing surface
pub use format::records::{CursRecord, EpocRecord, Record, RecordBody, SeizRecord};
pub use io::{ChannelWriter, RecordWriter};
pub use session::{ChannelConfig, PasswordData, Session, SessionConfig, SessionState};
