// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! The session channel manifest.
//!
//! `<session>.mefd` inside the session directory lists every channel
//! directory name as a zero-padded fixed-width entry, for third-party
//! viewers that cannot walk the directory tree. Registration is idempotent:
//! re-registering an existing channel leaves the file byte-identical.
//! Sessions with encryption active skip the manifest entirely.

use std::path::Path;

use crate::core::{MefError, Result};
use crate::format::constants::{
    CHANNEL_DIRECTORY_SUFFIX, MANIFEST_ENTRY_BYTES, MANIFEST_SEGMENT_NUMBER, MANIFEST_TYPE_STRING,
    UNIVERSAL_HEADER_BYTES,
};
use crate::format::universal_header::UniversalHeader;
use crate::io::mef_file::MefFile;
use crate::io::paths;
use crate::session::{PasswordData, SessionState};

/// Zero-padded manifest entry for a channel directory name.
fn manifest_entry(channel_name: &str) -> Vec<u8> {
    let name = format!("{channel_name}.{CHANNEL_DIRECTORY_SUFFIX}");
    let mut entry = name.into_bytes();
    entry.truncate(MANIFEST_ENTRY_BYTES - 1);
    entry.resize(MANIFEST_ENTRY_BYTES, 0);
    entry
}

/// Register a channel directory in the session manifest, creating the
/// manifest on first use.
pub(crate) fn register_channel(
    session_dir: &Path,
    session_name: &str,
    channel_name: &str,
    anonymized_name: &str,
    state: &SessionState,
    password: &PasswordData,
) -> Result<()> {
    if password.encryption_active {
        return Ok(());
    }

    let _guard = state.manifest_guard();
    let path = paths::manifest_file(session_dir, session_name);
    let entry = manifest_entry(channel_name);

    if !path.exists() {
        let mut header = UniversalHeader::new(MANIFEST_TYPE_STRING, session_name, "");
        header.anonymized_name = anonymized_name.to_string();
        header.segment_number = MANIFEST_SEGMENT_NUMBER;
        let mut file = MefFile::create(path, header)?;
        file.append(&entry)?;
        file.header.number_of_entries = 1;
        file.header.maximum_entry_size = MANIFEST_ENTRY_BYTES as i64;
        file.rewrite_header()?;
        file.flush()?;
        return Ok(());
    }

    // Linear scan for a byte-exact match; a hit means nothing to do.
    let bytes = std::fs::read(&path)
        .map_err(|e| MefError::io(format!("read {}", path.display()), e.to_string()))?;
    if bytes.len() < UNIVERSAL_HEADER_BYTES {
        return Err(MefError::metadata_parse(
            path.display().to_string(),
            "truncated manifest".to_string(),
        ));
    }
    if bytes[UNIVERSAL_HEADER_BYTES..]
        .chunks_exact(MANIFEST_ENTRY_BYTES)
        .any(|existing| existing == entry.as_slice())
    {
        return Ok(());
    }

    let mut file = MefFile::open_existing(path)?;
    file.append(&entry)?;
    file.header.number_of_entries += 1;
    file.header.maximum_entry_size = file.header.maximum_entry_size.max(MANIFEST_ENTRY_BYTES as i64);
    file.rewrite_header()?;
    file.flush()?;
    Ok(())
}
