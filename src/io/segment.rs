// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! The segment file trio: metadata, data, and index.
//!
//! Every segment of a channel is three cooperating files that share a
//! segment number and a level UUID but carry distinct file UUIDs. The data
//! file is an append stream of RED blocks, the index file an append stream
//! of fixed-width entries pointing into it, and the metadata file a
//! fixed-size body rewritten in place after every block.

use std::path::{Path, PathBuf};

use crate::core::{MefError, Result};
use crate::format::constants::{
    DATA_FILE_SUFFIX, DATA_TYPE_STRING, INDEX_FILE_SUFFIX, INDEX_TYPE_STRING, METADATA_BODY_BYTES,
    METADATA_FILE_SUFFIX, METADATA_TYPE_STRING, UUID_BYTES,
};
use crate::format::metadata::{
    encode_metadata_body, MetadataSection1, MetadataSection3, TimeSeriesMetadata,
};
use crate::format::universal_header::UniversalHeader;
use crate::io::mef_file::MefFile;
use crate::io::paths;
use crate::session::PasswordData;

/// Identity shared by the three files of one segment.
pub(crate) struct SegmentIdentity<'a> {
    pub session_name: &'a str,
    pub channel_name: &'a str,
    pub anonymized_name: &'a str,
    pub segment_number: i32,
    pub level_uuid: [u8; UUID_BYTES],
    pub password: &'a PasswordData,
}

/// The three open files of the current segment.
#[derive(Debug)]
pub struct SegmentFiles {
    /// Segment number shared by the trio
    pub segment_number: i32,
    /// Segment directory
    pub directory: PathBuf,
    /// Metadata file (fixed-size body, rewritten in place)
    pub metadata: MefFile,
    /// RED block stream
    pub data: MefFile,
    /// Index entry stream
    pub index: MefFile,
}

impl SegmentFiles {
    /// Create the segment directory and its three files, writing the
    /// initial metadata body and all universal headers.
    pub(crate) fn create(
        channel_dir: &Path,
        identity: &SegmentIdentity<'_>,
        s1: &MetadataSection1,
        ts: &TimeSeriesMetadata,
        s3: &MetadataSection3,
    ) -> Result<Self> {
        let directory =
            paths::segment_directory(channel_dir, identity.channel_name, identity.segment_number);
        std::fs::create_dir_all(&directory).map_err(|e| {
            MefError::io(
                format!("create segment directory {}", directory.display()),
                e.to_string(),
            )
        })?;

        let mut metadata = MefFile::create(
            paths::segment_file(
                &directory,
                identity.channel_name,
                identity.segment_number,
                METADATA_FILE_SUFFIX,
            ),
            new_header(METADATA_TYPE_STRING, identity),
        )?;
        let data = MefFile::create(
            paths::segment_file(
                &directory,
                identity.channel_name,
                identity.segment_number,
                DATA_FILE_SUFFIX,
            ),
            new_header(DATA_TYPE_STRING, identity),
        )?;
        let index = MefFile::create(
            paths::segment_file(
                &directory,
                identity.channel_name,
                identity.segment_number,
                INDEX_FILE_SUFFIX,
            ),
            new_header(INDEX_TYPE_STRING, identity),
        )?;

        // The metadata file holds exactly one entry: its fixed-size body.
        metadata.rewrite_body(&encode_metadata_body(s1, ts, s3))?;
        metadata.header.number_of_entries = 1;
        metadata.header.maximum_entry_size = METADATA_BODY_BYTES as i64;
        metadata.rewrite_header()?;

        Ok(Self {
            segment_number: identity.segment_number,
            directory,
            metadata,
            data,
            index,
        })
    }

    /// Persist the metadata body and refresh all three universal headers,
    /// leaving the data and index cursors at their append positions.
    pub fn update_metadata(
        &mut self,
        s1: &MetadataSection1,
        ts: &TimeSeriesMetadata,
        s3: &MetadataSection3,
    ) -> Result<()> {
        self.metadata.rewrite_body(&encode_metadata_body(s1, ts, s3))?;
        self.metadata.rewrite_header()?;
        self.data.rewrite_header()?;
        self.index.rewrite_header()?;
        Ok(())
    }

    /// Flush all three files.
    pub fn close(mut self) -> Result<()> {
        self.metadata.flush()?;
        self.data.flush()?;
        self.index.flush()?;
        Ok(())
    }
}

fn new_header(type_string: &str, identity: &SegmentIdentity<'_>) -> UniversalHeader {
    let mut header =
        UniversalHeader::new(type_string, identity.session_name, identity.channel_name);
    header.anonymized_name = identity.anonymized_name.to_string();
    header.segment_number = identity.segment_number;
    header.level_uuid = identity.level_uuid;
    header.level_1_password_validation = identity.password.level_1_validation;
    header.level_2_password_validation = identity.password.level_2_validation;
    header
}
