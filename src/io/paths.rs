// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Session directory hierarchy.
//!
//! ```text
//! <root>/<session>.mefd/
//!     <session>.mefd                    channel manifest
//!     <session>.rdat                    annotation record data
//!     <session>.ridx                    annotation record index
//!     <channel>.timd/
//!         <channel>-NNNNNN.segd/
//!             <channel>-NNNNNN.tmet     segment metadata
//!             <channel>-NNNNNN.tdat     RED block data
//!             <channel>-NNNNNN.tidx     block index
//! ```

use std::path::{Path, PathBuf};

use crate::format::constants::{
    CHANNEL_DIRECTORY_SUFFIX, RECORD_DATA_SUFFIX, RECORD_INDEX_SUFFIX, SEGMENT_DIRECTORY_SUFFIX,
    SESSION_DIRECTORY_SUFFIX,
};

/// `<root>/<session>.mefd`
pub fn session_directory(root: &Path, session_name: &str) -> PathBuf {
    root.join(format!("{session_name}.{SESSION_DIRECTORY_SUFFIX}"))
}

/// `<session dir>/<channel>.timd`
pub fn channel_directory(session_dir: &Path, channel_name: &str) -> PathBuf {
    session_dir.join(format!("{channel_name}.{CHANNEL_DIRECTORY_SUFFIX}"))
}

/// `<channel>-NNNNNN`: the shared base name of a segment's directory and
/// files.
pub fn segment_name(channel_name: &str, segment_number: i32) -> String {
    format!("{channel_name}-{segment_number:06}")
}

/// `<channel dir>/<channel>-NNNNNN.segd`
pub fn segment_directory(channel_dir: &Path, channel_name: &str, segment_number: i32) -> PathBuf {
    channel_dir.join(format!(
        "{}.{SEGMENT_DIRECTORY_SUFFIX}",
        segment_name(channel_name, segment_number)
    ))
}

/// `<segment dir>/<channel>-NNNNNN.<suffix>`
pub fn segment_file(
    segment_dir: &Path,
    channel_name: &str,
    segment_number: i32,
    suffix: &str,
) -> PathBuf {
    segment_dir.join(format!(
        "{}.{suffix}",
        segment_name(channel_name, segment_number)
    ))
}

/// `<session dir>/<session>.rdat`
pub fn record_data_file(session_dir: &Path, session_name: &str) -> PathBuf {
    session_dir.join(format!("{session_name}.{RECORD_DATA_SUFFIX}"))
}

/// `<session dir>/<session>.ridx`
pub fn record_index_file(session_dir: &Path, session_name: &str) -> PathBuf {
    session_dir.join(format!("{session_name}.{RECORD_INDEX_SUFFIX}"))
}

/// `<session dir>/<session>.mefd` (the manifest file inside the session
/// directory of the same suffix)
pub fn manifest_file(session_dir: &Path, session_name: &str) -> PathBuf {
    session_dir.join(format!("{session_name}.{SESSION_DIRECTORY_SUFFIX}"))
}
