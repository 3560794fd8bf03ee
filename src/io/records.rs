// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! The annotation writer state machine.
//!
//! Two append-only files per session: `<session>.rdat` holds
//! `(header, body, pad)` record tuples, `<session>.ridx` one fixed-width
//! index entry per record. Both carry universal headers whose CRCs, entry
//! counts, and temporal bounds are refreshed after every record.
//!
//! Creating a writer for a session whose `.rdat` already exists resumes
//! appending at EOF of both files.

use std::path::Path;
use std::sync::Arc;

use crate::core::{crc, Result};
use crate::format::constants::{
    RECORD_DATA_TYPE_STRING, RECORD_INDEX_BYTES, RECORD_INDEX_TYPE_STRING,
    SESSION_LEVEL_SEGMENT_NUMBER,
};
use crate::format::records::{encode_record_header, encode_record_index_entry, record_pad, Record};
use crate::format::universal_header::UniversalHeader;
use crate::io::mef_file::MefFile;
use crate::io::paths;
use crate::session::{PasswordData, SessionState};

/// Append-only writer for session-level annotation records.
pub struct RecordWriter {
    state: Arc<SessionState>,
    rdat: MefFile,
    ridx: MefFile,
    body_scratch: Vec<u8>,
}

impl RecordWriter {
    /// Open the session's record pair, creating headers-only files if the
    /// `.rdat` does not exist yet.
    pub(crate) fn create(
        session_dir: &Path,
        session_name: &str,
        anonymized_name: &str,
        password: &PasswordData,
        state: Arc<SessionState>,
    ) -> Result<Self> {
        let rdat_path = paths::record_data_file(session_dir, session_name);
        let ridx_path = paths::record_index_file(session_dir, session_name);

        let (rdat, ridx) = if rdat_path.exists() {
            (
                MefFile::open_existing(rdat_path)?,
                MefFile::open_existing(ridx_path)?,
            )
        } else {
            let level_uuid = *uuid::Uuid::new_v4().as_bytes();
            let new_header = |type_string: &str| {
                let mut header = UniversalHeader::new(type_string, session_name, "");
                header.anonymized_name = anonymized_name.to_string();
                header.segment_number = SESSION_LEVEL_SEGMENT_NUMBER;
                header.level_uuid = level_uuid;
                header.level_1_password_validation = password.level_1_validation;
                header.level_2_password_validation = password.level_2_validation;
                header
            };
            (
                MefFile::create(rdat_path, new_header(RECORD_DATA_TYPE_STRING))?,
                MefFile::create(ridx_path, new_header(RECORD_INDEX_TYPE_STRING))?,
            )
        };

        Ok(Self {
            state,
            rdat,
            ridx,
            body_scratch: Vec::new(),
        })
    }

    /// Append one record and its index entry, then refresh both universal
    /// headers in place.
    pub fn write_record(&mut self, timestamp: i64, record: &Record) -> Result<()> {
        let type_string = record.type_string();
        let body_len = record.body_bytes();
        let pad = record_pad(body_len);
        let time = self.state.offset_time(timestamp);

        // Record body encryption is outside the writer core; records are
        // written with encryption level 0.
        let mut header = encode_record_header(type_string, 0, (body_len + pad) as u32, time);

        self.body_scratch.clear();
        record.write_body(&mut self.body_scratch);
        self.body_scratch.resize(body_len + pad, 0);

        let mut record_crc = crc::update(crc::start(), &header[4..]);
        record_crc = crc::update(record_crc, &self.body_scratch);
        header[0..4].copy_from_slice(&record_crc.to_le_bytes());

        let file_offset = self.rdat.append(&header)? as i64;
        self.rdat.append(&self.body_scratch)?;

        let entry = encode_record_index_entry(type_string, 0, file_offset, time);
        self.ridx.append(&entry)?;

        let total = (header.len() + self.body_scratch.len()) as i64;
        self.rdat.header.record_entry(total, time, time);
        self.ridx
            .header
            .record_entry(RECORD_INDEX_BYTES as i64, time, time);

        self.rdat.rewrite_header()?;
        self.ridx.rewrite_header()?;
        Ok(())
    }

    /// Number of records written to the pair over its lifetime.
    pub fn record_count(&self) -> i64 {
        self.rdat.header.number_of_entries
    }

    /// Flush and close both files.
    pub fn close(mut self) -> Result<()> {
        self.rdat.flush()?;
        self.ridx.flush()?;
        tracing::debug!(records = self.rdat.header.number_of_entries, "record writer closed");
        Ok(())
    }
}
