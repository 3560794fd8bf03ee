// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Mefcodec CLI
//!
//! Generate synthetic MEF 3.0 test sessions.
//!
//! ## Usage
//!
//! ```sh
//! # Write a two-channel, ten-second sine session
//! mefcodec synth /tmp/out --session demo --channels 2 --seconds 10
//!
//! # Segment rollover every 2 seconds, with a gap in the middle
//! mefcodec synth /tmp/out --secs-per-segment 2 --gap-at 5
//! ```

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use mefcodec::{ChannelConfig, Record, Session, SessionConfig};

/// Mefcodec - MEF 3.0 session writer toolkit
#[derive(Parser, Clone)]
#[command(name = "mefcodec")]
#[command(about = "MEF 3.0 streaming writer toolkit", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "ArcheBase")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Clone)]
enum Commands {
    /// Write a synthetic sine-wave session with annotations
    Synth(SynthCmd),
}

/// Synthetic session generator
#[derive(Args, Clone)]
struct SynthCmd {
    /// Output directory (the session directory is created inside it)
    root: PathBuf,

    /// Session name
    #[arg(long, default_value = "synthetic")]
    session: String,

    /// Number of channels to write
    #[arg(long, default_value_t = 1)]
    channels: usize,

    /// Seconds of signal per channel
    #[arg(long, default_value_t = 10)]
    seconds: u64,

    /// Sampling frequency in Hz
    #[arg(long, default_value_t = 1000.0)]
    sampling_frequency: f64,

    /// Sine frequency in Hz
    #[arg(long, default_value_t = 10.0)]
    sine_frequency: f64,

    /// Segment rollover budget in seconds (0 = single segment)
    #[arg(long, default_value_t = 0)]
    secs_per_segment: i64,

    /// Insert a half-second timestamp gap after this many seconds
    #[arg(long)]
    gap_at: Option<u64>,

    /// Recording start time, µs since epoch (default: now)
    #[arg(long)]
    start: Option<i64>,
}

impl SynthCmd {
    fn run(&self) -> Result<()> {
        let start = self
            .start
            .unwrap_or_else(|| chrono::Utc::now().timestamp_micros());

        let session = Session::new(SessionConfig {
            root: self.root.clone(),
            session_name: self.session.clone(),
            num_secs_per_segment: self.secs_per_segment,
            ..Default::default()
        })?;

        let period_us = (1_000_000.0 / self.sampling_frequency).round() as i64;
        let total = (self.seconds as f64 * self.sampling_frequency) as usize;
        let gap_after = self
            .gap_at
            .map(|s| (s as f64 * self.sampling_frequency) as usize);

        for ch in 0..self.channels {
            let mut channel = session.create_channel(ChannelConfig {
                channel_name: format!("synth-{ch:02}"),
                acquisition_channel_number: ch as i32,
                sampling_frequency: self.sampling_frequency,
                units_description: "microvolts".to_string(),
                ..Default::default()
            })?;

            let mut times = Vec::with_capacity(total);
            let mut samples = Vec::with_capacity(total);
            let mut t = start;
            for i in 0..total {
                if gap_after == Some(i) {
                    t += 500_000;
                }
                times.push(t);
                let phase = 2.0 * std::f64::consts::PI * self.sine_frequency * i as f64
                    / self.sampling_frequency;
                samples.push((20_000.0 * phase.sin()) as i32);
                t += period_us;
            }
            channel.write(&times, &samples)?;
            channel.close()?;
            println!("wrote channel synth-{ch:02}: {total} samples");
        }

        let mut records = session.records()?;
        records.write_record(start, &Record::Note("synthetic session start".to_string()))?;
        records.write_record(
            start + (self.seconds as i64) * 1_000_000,
            &Record::Note("synthetic session end".to_string()),
        )?;
        let count = records.record_count();
        records.close()?;
        println!("wrote {count} annotation records");

        Ok(())
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Synth(cmd) => cmd.run(),
    }
}

fn main() {
    let result = run();

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
