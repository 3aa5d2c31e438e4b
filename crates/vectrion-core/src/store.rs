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

//! Named-blob persistence.
//!
//! Each key maps to one JSON file under the data directory. Writes go
//! through a temp file and rename so a crash mid-write can never leave a
//! half-updated blob; the previous value survives instead.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use vectrion_types::EnergyState;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Well-known blob keys
pub mod keys {
    use vectrion_types::EnergyState;

    pub const CURRENT_STATE: &str = "current_state";
    pub const EXPORT_HISTORY: &str = "export_history";
    pub const TARGET_CACHE: &str = "target_cache";
    pub const EVENT_LOG: &str = "event_log";
    pub const HWS_STATUS: &str = "hws_status";
    pub const HWS_LAST_OFF_TIME: &str = "hws_last_off_time";
    pub const LAST_DAILY_SUMMARY_DATE: &str = "last_daily_summary_date";
    pub const LAST_LOG_CLEANUP: &str = "last_log_cleanup";

    /// Key of a pending debounced transition request
    pub fn debounce_request(from: EnergyState, to: EnergyState) -> String {
        format!("state_change_request:{}_to_{}", from.as_str(), to.as_str())
    }
}

/// Blob store rooted at a data directory
#[derive(Debug, Clone)]
pub struct PersistentStore {
    root: PathBuf,
}

impl PersistentStore {
    /// Open (and create if needed) a store at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        // ':' appears in the debounce keys; keep filenames portable
        let file = key.replace(':', "_");
        self.root.join(format!("{file}.json"))
    }

    /// Load a blob; `Ok(None)` when the key has never been written
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.blob_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Durably write a blob (temp file + rename)
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.blob_path(key);
        let temp_path = path.with_extension("tmp");
        let json = serde_json::to_string_pretty(value)?;

        fs::write(&temp_path, &json)?;
        fs::rename(&temp_path, &path)?;

        debug!("Persisted blob '{}' ({} bytes)", key, json.len());
        Ok(())
    }

    /// Remove a blob; missing keys are not an error
    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.blob_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists(&self, key: &str) -> bool {
        self.blob_path(key).exists()
    }

    /// Load every persisted debounce request, keyed by directed state pair
    pub fn load_debounce_requests(
        &self,
    ) -> Result<Vec<((EnergyState, EnergyState), i64)>> {
        let mut pending = Vec::new();
        for &from in EnergyState::all() {
            for &to in EnergyState::all() {
                if from == to {
                    continue;
                }
                let key = keys::debounce_request(from, to);
                if let Some(started_ms) = self.load::<i64>(&key)? {
                    pending.push(((from, to), started_ms));
                }
            }
        }
        Ok(pending)
    }
}
