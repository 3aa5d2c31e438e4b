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

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fallback daily target when a month is missing from the seasonal table (kWh)
pub const DEFAULT_STATIC_TARGET_KWH: f32 = 25.0;

/// How the adaptive calculator raises the target when under-performing.
///
/// The two forms come from different field deployments; deficit recovery
/// is the default and the one the scenario tests pin down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CatchupStrategy {
    /// static + (total window deficit / catchup_days), capped at 2x the static target
    #[default]
    DeficitRecovery,
    /// static + aggressiveness x daily shortfall, capped at 1.5x the static target
    Aggressiveness,
}

/// Engine configuration.
///
/// Thresholds are in the unit their suffix names; durations carry their
/// unit in the field name. Every field has a serde default so a partial
/// config file only overrides what it mentions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SOC at which the battery counts as full (%)
    #[serde(default = "default_max_soc")]
    pub max_soc_threshold: f32,

    /// SOC floor for the battery-protection override (%)
    #[serde(default = "default_min_soc")]
    pub min_soc_threshold: f32,

    /// Rated power of the hot-water element (W)
    #[serde(default = "default_hws_power_rating")]
    pub hws_power_rating_w: u32,

    /// SOC drop below max_soc that switches the HWS off (%)
    #[serde(default = "default_hws_soc_drop")]
    pub hws_soc_drop_threshold: f32,

    /// Generation below which the HWS switches off (W)
    #[serde(default = "default_hws_generation_drop")]
    pub hws_generation_drop_threshold_w: i32,

    /// Minimum off-time before the HWS may re-engage (minutes)
    #[serde(default = "default_hws_cooldown")]
    pub hws_cooldown_period_min: u32,

    /// Deep-shortfall ratio for override rule 4 (%)
    #[serde(default = "default_export_target_percentage")]
    pub export_target_percentage: f32,

    /// Battery power above which the battery counts as charging (W)
    #[serde(default = "default_battery_charging_threshold")]
    pub battery_charging_threshold_w: i32,

    /// Battery power that counts as charging strongly (W)
    #[serde(default = "default_strong_charging_threshold")]
    pub strong_charging_threshold_w: i32,

    /// Generation needed to enter EXPORT_PRIORITY (W)
    #[serde(default = "default_min_generation_for_export")]
    pub min_generation_for_export_w: i32,

    /// Generation needed to stay in EXPORT_PRIORITY (W); lower than the
    /// entry threshold so the boundary does not oscillate
    #[serde(default = "default_min_generation_to_stay_export")]
    pub min_generation_to_stay_export_w: i32,

    /// SOC above which low-sun evenings go to SELF_CONSUME (%)
    #[serde(default = "default_evening_soc")]
    pub evening_self_consume_soc_threshold: f32,

    /// How long a debounced transition request must persist (minutes)
    #[serde(default = "default_debounce_time")]
    pub state_change_debounce_time_min: u32,

    /// Grid export above which a near-zero generation reading is treated
    /// as a stale sensor (W)
    #[serde(default = "default_significant_export")]
    pub significant_export_threshold_w: i32,

    /// Local hour the night window opens (0-23)
    #[serde(default = "default_night_start")]
    pub night_start_hour: u32,

    /// Local hour the night window closes (0-23)
    #[serde(default = "default_night_end")]
    pub night_end_hour: u32,

    /// Days over which a deficit is recovered
    #[serde(default = "default_catchup_days")]
    pub catchup_days: u32,

    /// Shortfall multiplier for the legacy catch-up strategy
    #[serde(default = "default_catchup_aggressiveness")]
    pub catchup_aggressiveness: f32,

    #[serde(default)]
    pub catchup_strategy: CatchupStrategy,

    /// Event-log capacity before oldest-first truncation
    #[serde(default = "default_max_log_entries")]
    pub max_log_entries: usize,

    /// Entries older than this are dropped by the age cleanup (days)
    #[serde(default = "default_log_max_age_days")]
    pub log_max_age_days: i64,

    /// Minimum spacing between age cleanups (hours)
    #[serde(default = "default_log_cleanup_interval")]
    pub log_cleanup_interval_hours: i64,

    /// Fixed local-time offset from UTC (hours)
    #[serde(default = "default_local_offset")]
    pub local_offset_hours: i32,

    /// Tick period of the external scheduler (seconds); used for the
    /// next_check field of the command record
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,

    /// Seasonal daily export schedule, month (1-12) to kWh
    #[serde(default = "default_monthly_targets", with = "month_keys")]
    pub monthly_targets: BTreeMap<u32, f32>,
}

fn default_max_soc() -> f32 {
    99.0
}
fn default_min_soc() -> f32 {
    25.0
}
fn default_hws_power_rating() -> u32 {
    3000
}
fn default_hws_soc_drop() -> f32 {
    5.0
}
fn default_hws_generation_drop() -> i32 {
    1500
}
fn default_hws_cooldown() -> u32 {
    30
}
fn default_export_target_percentage() -> f32 {
    40.0
}
fn default_battery_charging_threshold() -> i32 {
    50
}
fn default_strong_charging_threshold() -> i32 {
    1000
}
fn default_min_generation_for_export() -> i32 {
    500
}
fn default_min_generation_to_stay_export() -> i32 {
    300
}
fn default_evening_soc() -> f32 {
    30.0
}
fn default_debounce_time() -> u32 {
    5
}
fn default_significant_export() -> i32 {
    2000
}
fn default_night_start() -> u32 {
    22
}
fn default_night_end() -> u32 {
    6
}
fn default_catchup_days() -> u32 {
    5
}
fn default_catchup_aggressiveness() -> f32 {
    1.5
}
fn default_max_log_entries() -> usize {
    500
}
fn default_log_max_age_days() -> i64 {
    14
}
fn default_log_cleanup_interval() -> i64 {
    6
}
fn default_local_offset() -> i32 {
    10
}
fn default_update_interval() -> u64 {
    30
}

/// Month keys cross serde as strings so the table survives TOML, whose
/// table keys are always strings.
mod month_keys {
    use serde::de::{Deserialize, Deserializer, Error};
    use serde::ser::Serializer;
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<u32, f32>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(map.iter().map(|(month, kwh)| (month.to_string(), *kwh)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<u32, f32>, D::Error> {
        let raw = BTreeMap::<String, f32>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, kwh)| {
                key.parse::<u32>()
                    .map(|month| (month, kwh))
                    .map_err(|_| Error::custom(format!("invalid month key '{key}'")))
            })
            .collect()
    }
}

/// East-coast residential schedule: export peaks over summer, bottoms out
/// mid-winter. Sites with different arrays override this table wholesale.
fn default_monthly_targets() -> BTreeMap<u32, f32> {
    BTreeMap::from([
        (1, 30.0),
        (2, 28.0),
        (3, 26.0),
        (4, 22.0),
        (5, 18.0),
        (6, 15.0),
        (7, 16.0),
        (8, 19.0),
        (9, 23.0),
        (10, 26.0),
        (11, 28.0),
        (12, 30.0),
    ])
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_soc_threshold: 99.0,
            min_soc_threshold: 25.0,
            hws_power_rating_w: 3000,
            hws_soc_drop_threshold: 5.0,
            hws_generation_drop_threshold_w: 1500,
            hws_cooldown_period_min: 30,
            export_target_percentage: 40.0,
            battery_charging_threshold_w: 50,
            strong_charging_threshold_w: 1000,
            min_generation_for_export_w: 500,
            min_generation_to_stay_export_w: 300,
            evening_self_consume_soc_threshold: 30.0,
            state_change_debounce_time_min: 5,
            significant_export_threshold_w: 2000,
            night_start_hour: 22,
            night_end_hour: 6,
            catchup_days: 5,
            catchup_aggressiveness: 1.5,
            catchup_strategy: CatchupStrategy::DeficitRecovery,
            max_log_entries: 500,
            log_max_age_days: 14,
            log_cleanup_interval_hours: 6,
            monthly_targets: default_monthly_targets(),
            local_offset_hours: 10,
            update_interval_secs: 30,
        }
    }
}

impl EngineConfig {
    /// Seasonal target for a month, falling back when the table has a hole
    pub fn monthly_target_for(&self, month: u32) -> f32 {
        self.monthly_targets
            .get(&month)
            .copied()
            .unwrap_or(DEFAULT_STATIC_TARGET_KWH)
    }

    /// Debounce window in milliseconds
    pub fn debounce_ms(&self) -> i64 {
        i64::from(self.state_change_debounce_time_min) * 60_000
    }

    /// HWS cooldown in milliseconds
    pub fn hws_cooldown_ms(&self) -> i64 {
        i64::from(self.hws_cooldown_period_min) * 60_000
    }

    /// Excess generation needed before LOAD_MANAGEMENT engages (W)
    pub fn hws_activation_excess_w(&self) -> i32 {
        (0.8 * self.hws_power_rating_w as f32) as i32
    }
}
