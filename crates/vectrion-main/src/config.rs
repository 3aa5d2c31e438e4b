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

//! Application configuration.
//!
//! Load order: `config.toml` (development), then `config.json`
//! (container deployments), then built-in defaults. Every field has a
//! serde default, so a partial file only overrides what it names.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use vectrion_types::EngineConfig;

/// Per-deployment paths and I/O settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSettings {
    /// Directory for the persistent blob store
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// File the ingestion collaborator refreshes with the latest snapshot
    #[serde(default = "default_telemetry_path")]
    pub telemetry_path: String,

    /// File the command record is published to each tick
    #[serde(default = "default_command_path")]
    pub command_path: String,
}

fn default_data_dir() -> String {
    "./data".to_string()
}
fn default_telemetry_path() -> String {
    "./data/telemetry.json".to_string()
}
fn default_command_path() -> String {
    "./data/command.json".to_string()
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            telemetry_path: default_telemetry_path(),
            command_path: default_command_path(),
        }
    }
}

/// Top-level configuration file shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub control: EngineConfig,

    #[serde(default)]
    pub system: SystemSettings,
}

impl AppConfig {
    /// Reject configurations the engine cannot run sanely on.
    pub fn validate(&self) -> Result<()> {
        let c = &self.control;
        let mut errors: Vec<String> = Vec::new();

        if c.night_start_hour > 23 || c.night_end_hour > 23 {
            errors.push(format!(
                "night window hours must be 0-23 (got {}-{})",
                c.night_start_hour, c.night_end_hour
            ));
        }
        if !(0.0..=100.0).contains(&c.min_soc_threshold)
            || !(0.0..=100.0).contains(&c.max_soc_threshold)
        {
            errors.push("SOC thresholds must be 0-100%".to_string());
        }
        if c.min_soc_threshold >= c.max_soc_threshold {
            errors.push(format!(
                "min_soc_threshold {} must sit below max_soc_threshold {}",
                c.min_soc_threshold, c.max_soc_threshold
            ));
        }
        if !(0.0..=100.0).contains(&c.evening_self_consume_soc_threshold) {
            errors.push("evening_self_consume_soc_threshold must be 0-100%".to_string());
        }
        if c.min_generation_to_stay_export_w >= c.min_generation_for_export_w {
            errors.push(format!(
                "hysteresis inverted: stay threshold {} W must sit below entry threshold {} W",
                c.min_generation_to_stay_export_w, c.min_generation_for_export_w
            ));
        }
        if c.catchup_days == 0 {
            errors.push("catchup_days must be at least 1".to_string());
        }
        if c.state_change_debounce_time_min == 0 {
            errors.push("state_change_debounce_time_min must be at least 1".to_string());
        }
        if c.max_log_entries < 10 {
            errors.push("max_log_entries must be at least 10".to_string());
        }
        if !(-12..=14).contains(&c.local_offset_hours) {
            errors.push(format!(
                "local_offset_hours {} outside -12..=14",
                c.local_offset_hours
            ));
        }
        if c.update_interval_secs == 0 {
            errors.push("update_interval_secs must be at least 1".to_string());
        }
        if let Some((month, kwh)) = c
            .monthly_targets
            .iter()
            .find(|(m, kwh)| !(1..=12).contains(*m) || **kwh <= 0.0)
        {
            errors.push(format!(
                "monthly_targets entry {month} -> {kwh} is not a valid month/kWh pair"
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("configuration invalid: {}", errors.join("; "))
        }
    }

    /// Write the current configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("serializing configuration")?;
        std::fs::write(path.as_ref(), toml_str)
            .with_context(|| format!("writing {}", path.as_ref().display()))?;
        Ok(())
    }
}

/// Load configuration from the conventional locations.
pub fn load_config() -> Result<AppConfig> {
    // config.toml for development setups
    if let Ok(config_str) = std::fs::read_to_string("config.toml") {
        let config: AppConfig =
            toml::from_str(&config_str).context("Failed to parse config.toml")?;
        info!("Loaded configuration from config.toml");
        return Ok(config);
    }

    // config.json for container deployments
    if let Ok(config_str) = std::fs::read_to_string("config.json") {
        let config: AppConfig =
            serde_json::from_str(&config_str).context("Failed to parse config.json")?;
        info!("Loaded configuration from config.json");
        return Ok(config);
    }

    info!("No configuration file found; using built-in defaults");
    let config = AppConfig::default();
    if config.save("config.toml").is_ok() {
        info!("Wrote default configuration to config.toml for editing");
    }
    Ok(config)
}
