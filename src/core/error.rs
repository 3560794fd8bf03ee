// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for mefcodec.
//!
//! Provides error types for session writing operations:
//! - File and directory I/O
//! - Password policy validation
//! - Segment metadata parsing (append path)
//! - Writer usage violations
//! - Block encoding

use std::fmt;

/// Errors that can occur while writing a MEF 3.0 session.
#[derive(Debug, Clone)]
pub enum MefError {
    /// I/O failure; partial files may be left on disk with stale headers
    Io {
        /// What was being done when the error occurred
        context: String,
        /// Error message from the OS
        message: String,
    },

    /// Password policy violation at initialize
    PasswordPolicy {
        /// Which rule was violated
        reason: String,
    },

    /// Append was requested with a non-positive segment number
    InvalidSegmentNumber {
        /// The rejected segment number
        segment_number: i32,
    },

    /// A prior segment's metadata file could not be parsed
    MetadataParse {
        /// Path of the metadata file
        path: String,
        /// What was wrong with it
        reason: String,
    },

    /// API misuse (e.g. write before initialize, mismatched slice lengths)
    Usage {
        /// Description of the misuse
        message: String,
    },

    /// Block or record encoding error
    Encode {
        /// Encoder context (e.g. "RED", "record")
        context: String,
        /// Error message
        message: String,
    },
}

impl MefError {
    /// Create an I/O error.
    pub fn io(context: impl Into<String>, message: impl Into<String>) -> Self {
        MefError::Io {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a password policy error.
    pub fn password(reason: impl Into<String>) -> Self {
        MefError::PasswordPolicy {
            reason: reason.into(),
        }
    }

    /// Create an invalid segment number error.
    pub fn invalid_segment(segment_number: i32) -> Self {
        MefError::InvalidSegmentNumber { segment_number }
    }

    /// Create a metadata parse error.
    pub fn metadata_parse(path: impl Into<String>, reason: impl Into<String>) -> Self {
        MefError::MetadataParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        MefError::Usage {
            message: message.into(),
        }
    }

    /// Create an encoding error.
    pub fn encode(context: impl Into<String>, message: impl Into<String>) -> Self {
        MefError::Encode {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            MefError::Io { context, message } => {
                vec![("context", context.clone()), ("message", message.clone())]
            }
            MefError::PasswordPolicy { reason } => vec![("reason", reason.clone())],
            MefError::InvalidSegmentNumber { segment_number } => {
                vec![("segment_number", segment_number.to_string())]
            }
            MefError::MetadataParse { path, reason } => {
                vec![("path", path.clone()), ("reason", reason.clone())]
            }
            MefError::Usage { message } => vec![("message", message.clone())],
            MefError::Encode { context, message } => {
                vec![("context", context.clone()), ("message", message.clone())]
            }
        }
    }
}

impl fmt::Display for MefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MefError::Io { context, message } => {
                write!(f, "I/O error in {context}: {message}")
            }
            MefError::PasswordPolicy { reason } => {
                write!(f, "Password policy violation: {reason}")
            }
            MefError::InvalidSegmentNumber { segment_number } => {
                write!(f, "Invalid segment number: {segment_number} (must be > 0)")
            }
            MefError::MetadataParse { path, reason } => {
                write!(f, "Failed to parse segment metadata '{path}': {reason}")
            }
            MefError::Usage { message } => {
                write!(f, "Usage error: {message}")
            }
            MefError::Encode { context, message } => {
                write!(f, "{context} encode error: {message}")
            }
        }
    }
}

impl std::error::Error for MefError {}

impl From<std::io::Error> for MefError {
    fn from(err: std::io::Error) -> Self {
        MefError::Io {
            context: "file".to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for mefcodec operations.
pub type Result<T> = std::result::Result<T, MefError>;
