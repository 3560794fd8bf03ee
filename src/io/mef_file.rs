// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! A universal-headered file container.
//!
//! Wraps one file handle together with its in-memory universal header, the
//! running body CRC, and the append cursor. Payload writes go through
//! [`MefFile::append`] so the body CRC and cursor can never drift from the
//! bytes on disk; header rewrites seek to offset 0 and restore the cursor
//! afterwards.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::core::{crc, MefError, Result};
use crate::format::constants::UNIVERSAL_HEADER_BYTES;
use crate::format::universal_header::UniversalHeader;

/// One open session file: handle, universal header, body CRC, append cursor.
#[derive(Debug)]
pub struct MefFile {
    file: File,
    path: PathBuf,
    /// In-memory universal header; the on-disk copy is refreshed by
    /// [`MefFile::rewrite_header`]
    pub header: UniversalHeader,
    /// Next payload write position
    pub append_offset: u64,
}

impl MefFile {
    /// Create the file (truncating any existing one) and write its
    /// universal header.
    pub fn create(path: PathBuf, mut header: UniversalHeader) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| MefError::io(format!("create {}", path.display()), e.to_string()))?;
        let encoded = header.encode();
        file.write_all(&encoded)
            .map_err(|e| MefError::io(format!("write header {}", path.display()), e.to_string()))?;
        Ok(Self {
            file,
            path,
            header,
            append_offset: UNIVERSAL_HEADER_BYTES as u64,
        })
    }

    /// Open an existing file, decode its universal header, and position the
    /// append cursor at EOF.
    pub fn open_existing(path: PathBuf) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| MefError::io(format!("open {}", path.display()), e.to_string()))?;
        let mut header_bytes = vec![0u8; UNIVERSAL_HEADER_BYTES];
        file.read_exact(&mut header_bytes)
            .map_err(|e| MefError::io(format!("read header {}", path.display()), e.to_string()))?;
        let header = UniversalHeader::decode(&header_bytes)
            .map_err(|e| MefError::metadata_parse(path.display().to_string(), e.to_string()))?;
        let append_offset = file
            .seek(SeekFrom::End(0))
            .map_err(|e| MefError::io(format!("seek {}", path.display()), e.to_string()))?;
        Ok(Self {
            file,
            path,
            header,
            append_offset,
        })
    }

    /// File path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append payload bytes, folding them into the body CRC. Returns the
    /// offset the bytes were written at.
    pub fn append(&mut self, bytes: &[u8]) -> Result<u64> {
        let offset = self.append_offset;
        self.file
            .write_all(bytes)
            .map_err(|e| MefError::io(format!("append {}", self.path.display()), e.to_string()))?;
        self.header.body_crc = crc::update(self.header.body_crc, bytes);
        self.append_offset += bytes.len() as u64;
        Ok(offset)
    }

    /// Rewrite the body in place directly after the universal header,
    /// recomputing the body CRC from scratch. Used by metadata files, whose
    /// body is a fixed-size structure rather than an append stream.
    pub fn rewrite_body(&mut self, body: &[u8]) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(UNIVERSAL_HEADER_BYTES as u64))
            .map_err(|e| MefError::io(format!("seek {}", self.path.display()), e.to_string()))?;
        self.file
            .write_all(body)
            .map_err(|e| MefError::io(format!("write body {}", self.path.display()), e.to_string()))?;
        self.header.body_crc = crc::calculate(body);
        self.append_offset = (UNIVERSAL_HEADER_BYTES + body.len()) as u64;
        Ok(())
    }

    /// Recompute the header CRC, rewrite the universal header in place, and
    /// restore the cursor to the append position.
    pub fn rewrite_header(&mut self) -> Result<()> {
        let encoded = self.header.encode();
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|e| MefError::io(format!("seek {}", self.path.display()), e.to_string()))?;
        self.file.write_all(&encoded).map_err(|e| {
            MefError::io(format!("rewrite header {}", self.path.display()), e.to_string())
        })?;
        self.file
            .seek(SeekFrom::Start(self.append_offset))
            .map_err(|e| MefError::io(format!("seek {}", self.path.display()), e.to_string()))?;
        Ok(())
    }

    /// Flush buffered writes to the OS.
    pub fn flush(&mut self) -> Result<()> {
        self.file
            .flush()
            .map_err(|e| MefError::io(format!("flush {}", self.path.display()), e.to_string()))
    }
}
