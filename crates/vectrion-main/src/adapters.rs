// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of VectrION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! File-based ingestion and transport adapters.
//!
//! The collectors on site refresh a JSON snapshot file; the dashboard
//! reads the published command record back. Both ends stay decoupled
//! from the engine behind the core seam traits.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use vectrion_core::{CommandSink, TelemetrySource};
use vectrion_types::{CommandRecord, TelemetrySnapshot};

/// Reads the latest telemetry snapshot from a JSON file
#[derive(Debug, Clone)]
pub struct FileTelemetrySource {
    path: PathBuf,
}

impl FileTelemetrySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TelemetrySource for FileTelemetrySource {
    fn name(&self) -> &str {
        "telemetry-file"
    }

    fn fetch(&self) -> Result<TelemetrySnapshot> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("reading telemetry from {}", self.path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing telemetry from {}", self.path.display()))
    }
}

/// Publishes the command record as a JSON file (atomic replace)
#[derive(Debug, Clone)]
pub struct FileCommandSink {
    path: PathBuf,
}

impl FileCommandSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CommandSink for FileCommandSink {
    fn name(&self) -> &str {
        "command-file"
    }

    fn deliver(&self, record: &CommandRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }

        let json = serde_json::to_string_pretty(record).context("serializing command record")?;
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &json)
            .with_context(|| format!("writing {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}
