// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Session-level configuration and shared state.
//!
//! A [`Session`] is the entry point of the library: it validates the
//! password policy once, owns the state every channel of the session
//! shares (the lazily derived recording time offset and the manifest
//! lock), and hands out channel, record, and manifest writers.
//!
//! # Example
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
//!
//! let mut channel = session.create_channel(ChannelConfig {
//!     channel_name: "LTd1".to_string(),
//!     sampling_frequency: 1000.0,
//!     ..Default::default()
//! })?;
//! channel.write(&[946_684_800_000_000], &[42])?;
//! channel.close()?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use sha2::{Digest, Sha256};

use crate::core::{MefError, Result};
use crate::format::constants::{MICROS_PER_DAY, MICROS_PER_SEC, PASSWORD_VALIDATION_FIELD_BYTES};
use crate::io::channel::ChannelWriter;
use crate::io::records::RecordWriter;
use crate::io::{manifest, paths};

/// Session-wide configuration, fixed for the session's lifetime.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory under which the session directory is created
    pub root: PathBuf,
    /// Session name (becomes `<name>.mefd`)
    pub session_name: String,
    /// Anonymized subject name written into universal headers
    pub anonymized_name: String,
    /// Segment rollover budget in seconds; 0 = unlimited segments
    pub num_secs_per_segment: i64,
    /// Recording site offset from GMT, in hours
    pub gmt_offset: f64,
    /// Subtract a recording time offset from all stored timestamps
    pub anonymize_output: bool,
    /// Level 1 password (required if a level 2 password is given)
    pub level_1_password: Option<String>,
    /// Level 2 password; enables section 2/3 encryption flags
    pub level_2_password: Option<String>,
    /// Subject given name (metadata section 3)
    pub subject_name_1: String,
    /// Subject family name (metadata section 3)
    pub subject_name_2: String,
    /// Subject identifier (metadata section 3)
    pub subject_id: String,
    /// Recording site (metadata section 3)
    pub recording_location: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            session_name: "session".to_string(),
            anonymized_name: String::new(),
            num_secs_per_segment: 0,
            gmt_offset: 0.0,
            anonymize_output: false,
            level_1_password: None,
            level_2_password: None,
            subject_name_1: String::new(),
            subject_name_2: String::new(),
            subject_id: String::new(),
            recording_location: String::new(),
        }
    }
}

/// Per-channel configuration, fixed at channel creation.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Channel base name (becomes `<name>.timd`)
    pub channel_name: String,
    /// Hardware acquisition channel number
    pub acquisition_channel_number: i32,
    /// Nominal sampling frequency, Hz
    pub sampling_frequency: f64,
    /// Nominal seconds of signal per RED block
    pub secs_per_block: f64,
    /// Wall-clock scheduling period per block, µs
    pub block_interval: i64,
    /// Divide samples by 4 before compression (18-bit acquisition hardware)
    pub bit_shift: bool,
    /// Raw-sample to native-unit scale factor
    pub units_conversion_factor: f64,
    /// Native unit name
    pub units_description: String,
    /// Free-text channel description
    pub channel_description: String,
    /// Free-text reference electrode description
    pub reference_description: String,
    /// Low-pass filter cutoff, Hz
    pub low_frequency_filter_setting: f64,
    /// High-pass filter cutoff, Hz
    pub high_frequency_filter_setting: f64,
    /// Notch filter frequency, Hz
    pub notch_filter_frequency_setting: f64,
    /// AC line frequency, Hz
    pub ac_line_frequency: f64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            channel_name: "channel".to_string(),
            acquisition_channel_number: 0,
            sampling_frequency: 1000.0,
            secs_per_block: 1.0,
            block_interval: MICROS_PER_SEC,
            bit_shift: false,
            units_conversion_factor: 1.0,
            units_description: String::new(),
            channel_description: String::new(),
            reference_description: String::new(),
            low_frequency_filter_setting: 0.0,
            high_frequency_filter_setting: 0.0,
            notch_filter_frequency_setting: 0.0,
            ac_line_frequency: 0.0,
        }
    }
}

/// Password validation fields and key seeds derived at initialize.
///
/// Payload encryption itself is outside the writer core; the builder only
/// enforces the password policy and produces the validation fields written
/// into universal headers.
#[derive(Debug, Clone, Default)]
pub struct PasswordData {
    /// Level 1 validation field (zero when no password)
    pub level_1_validation: [u8; PASSWORD_VALIDATION_FIELD_BYTES],
    /// Level 2 validation field (zero when no password)
    pub level_2_validation: [u8; PASSWORD_VALIDATION_FIELD_BYTES],
    /// Whether metadata sections 2/3 are flagged encrypted
    pub encryption_active: bool,
}

impl PasswordData {
    /// Validate the password policy and derive validation fields.
    ///
    /// Rules: a level 2 password requires a level 1 password, and the two
    /// must differ.
    pub fn build(level_1: Option<&str>, level_2: Option<&str>) -> Result<Self> {
        if level_2.is_some() && level_1.is_none() {
            return Err(MefError::password(
                "level 2 password requires a level 1 password",
            ));
        }
        if let (Some(l1), Some(l2)) = (level_1, level_2) {
            if l1 == l2 {
                return Err(MefError::password(
                    "level 1 and level 2 passwords must differ",
                ));
            }
        }
        let mut data = PasswordData {
            encryption_active: level_2.is_some(),
            ..Default::default()
        };
        if let Some(l1) = level_1 {
            data.level_1_validation = derive_validation_field(1, l1);
        }
        if let Some(l2) = level_2 {
            data.level_2_validation = derive_validation_field(2, l2);
        }
        Ok(data)
    }
}

/// Derive a 16-byte validation field from a password, domain-separated by
/// level.
fn derive_validation_field(level: u8, password: &str) -> [u8; PASSWORD_VALIDATION_FIELD_BYTES] {
    let mut hasher = Sha256::new();
    hasher.update([level]);
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();
    let mut field = [0u8; PASSWORD_VALIDATION_FIELD_BYTES];
    field.copy_from_slice(&digest[..PASSWORD_VALIDATION_FIELD_BYTES]);
    field
}

/// State shared by every writer of one session.
///
/// The recording time offset is derived exactly once, from the first block
/// or record timestamp seen across all channels; the `OnceLock` makes the
/// lazy initialization safe under concurrent channel threads.
#[derive(Debug)]
pub struct SessionState {
    anonymize_output: bool,
    gmt_offset_secs: i32,
    recording_time_offset: OnceLock<i64>,
    manifest_lock: Mutex<()>,
}

impl SessionState {
    pub(crate) fn new(anonymize_output: bool, gmt_offset_hours: f64) -> Self {
        Self {
            anonymize_output,
            gmt_offset_secs: (gmt_offset_hours * 3600.0) as i32,
            recording_time_offset: OnceLock::new(),
            manifest_lock: Mutex::new(()),
        }
    }

    /// Whether stored timestamps have the recording time offset applied.
    pub fn anonymize_output(&self) -> bool {
        self.anonymize_output
    }

    /// Recording site offset from GMT, seconds.
    pub fn gmt_offset_secs(&self) -> i32 {
        self.gmt_offset_secs
    }

    /// The session's recording time offset, or 0 if none has been derived.
    pub fn recording_time_offset(&self) -> i64 {
        self.recording_time_offset.get().copied().unwrap_or(0)
    }

    /// Convert a true timestamp to its stored form.
    ///
    /// With anonymization off this is the identity. With it on, the first
    /// call derives the session offset from the timestamp (folded to local
    /// midnight so the clock time survives but the date does not), and every
    /// stored time becomes `offset - t`: offset times are negative and
    /// decrease as true time increases.
    pub fn offset_time(&self, t: i64) -> i64 {
        if !self.anonymize_output {
            return t;
        }
        let offset = *self.recording_time_offset.get_or_init(|| {
            let local = t + i64::from(self.gmt_offset_secs) * MICROS_PER_SEC;
            t - local.rem_euclid(MICROS_PER_DAY)
        });
        offset - t
    }

    /// Serialize manifest access across concurrently created channels.
    pub(crate) fn manifest_guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.manifest_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A MEF 3.0 session: the factory for channel, record, and manifest writers.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    password: PasswordData,
    state: Arc<SessionState>,
}

impl Session {
    /// Validate the configuration and create the session directory.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let password = PasswordData::build(
            config.level_1_password.as_deref(),
            config.level_2_password.as_deref(),
        )?;
        let session_dir = paths::session_directory(&config.root, &config.session_name);
        std::fs::create_dir_all(&session_dir).map_err(|e| {
            MefError::io(
                format!("create session directory {}", session_dir.display()),
                e.to_string(),
            )
        })?;
        let state = Arc::new(SessionState::new(config.anonymize_output, config.gmt_offset));
        Ok(Self {
            config,
            password,
            state,
        })
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Password validation data derived at session creation.
    pub fn password(&self) -> &PasswordData {
        &self.password
    }

    /// Shared session state (time offset, manifest lock).
    pub fn state(&self) -> Arc<SessionState> {
        Arc::clone(&self.state)
    }

    /// Create a new channel starting at segment 0, registering it in the
    /// session manifest.
    pub fn create_channel(&self, channel: ChannelConfig) -> Result<ChannelWriter> {
        let writer = ChannelWriter::initialize(
            self.config.clone(),
            channel,
            self.password.clone(),
            self.state(),
        )?;
        manifest::register_channel(
            &paths::session_directory(&self.config.root, &self.config.session_name),
            &self.config.session_name,
            writer.channel_name(),
            &self.config.anonymized_name,
            &self.state,
            &self.password,
        )?;
        Ok(writer)
    }

    /// Open a new segment of an existing channel, seeded from the prior
    /// segment's metadata.
    pub fn append_channel(
        &self,
        channel_name: &str,
        segment_number: i32,
    ) -> Result<ChannelWriter> {
        ChannelWriter::append(
            self.config.clone(),
            channel_name,
            segment_number,
            self.password.clone(),
            self.state(),
        )
    }

    /// Open the session's annotation record writer, creating or resuming
    /// the `.rdat`/`.ridx` pair.
    pub fn records(&self) -> Result<RecordWriter> {
        RecordWriter::create(
            &paths::session_directory(&self.config.root, &self.config.session_name),
            &self.config.session_name,
            &self.config.anonymized_name,
            &self.password,
            self.state(),
        )
    }
}
