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

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating states of the energy-management engine.
///
/// `ExportPriority` is the first-run default: the inverter runs with ESS
/// mode off so surplus PV flows to the grid instead of the battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnergyState {
    /// Push surplus PV to the grid until the daily export target is met
    #[default]
    ExportPriority,
    /// ESS mode on with a zero grid set-point; surplus PV charges the battery
    BatteryStorage,
    /// Battery full and excess still available; divert into the hot-water load
    LoadManagement,
    /// Cover the house load from battery, neither importing nor exporting
    SelfConsume,
    /// Inverter powered down; entered only by the last-resort failure path
    SafeMode,
}

impl EnergyState {
    /// Wire/persistence name of the state (matches the serde rename)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExportPriority => "EXPORT_PRIORITY",
            Self::BatteryStorage => "BATTERY_STORAGE",
            Self::LoadManagement => "LOAD_MANAGEMENT",
            Self::SelfConsume => "SELF_CONSUME",
            Self::SafeMode => "SAFE_MODE",
        }
    }

    /// List all engine states
    pub fn all() -> &'static [EnergyState] {
        &[
            Self::ExportPriority,
            Self::BatteryStorage,
            Self::LoadManagement,
            Self::SelfConsume,
            Self::SafeMode,
        ]
    }
}

impl fmt::Display for EnergyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EnergyState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "EXPORT_PRIORITY" => Ok(Self::ExportPriority),
            "BATTERY_STORAGE" => Ok(Self::BatteryStorage),
            "LOAD_MANAGEMENT" => Ok(Self::LoadManagement),
            "SELF_CONSUME" => Ok(Self::SelfConsume),
            "SAFE_MODE" => Ok(Self::SafeMode),
            _ => Err(anyhow::anyhow!(
                "Unknown engine state: '{}'. Known states: {}",
                s,
                Self::all()
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}
