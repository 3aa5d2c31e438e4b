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

/// Inverter mode register value for normal operation
pub const INVERTER_MODE_ON: i32 = 3;
/// Inverter mode register value for powered-down
pub const INVERTER_MODE_OFF: i32 = 4;

/// Reported state label when the master switch is off. Not an engine
/// state; the persisted state machine is untouched while disabled.
pub const DISABLED_STATE: &str = "DISABLED";

/// Actuation outputs for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandActions {
    /// Energy-storage-system mode switch on the inverter
    pub set_ess_mode: bool,

    /// Grid power set-point (W); `None` leaves the set-point alone
    pub grid_setpoint: Option<i32>,

    /// Hot-water-system contactor
    pub enable_hws: bool,

    /// Inverter mode register (3 = on, 4 = off)
    pub inverter_mode: i32,
}

/// Observability block of the command record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandStatus {
    /// Daily export target in force (kWh)
    pub export_target: f32,

    /// Export so far today (kWh)
    pub daily_export: f32,

    pub target_reached: bool,

    /// SOC clamped to 0-100
    pub battery_soc: f32,

    /// Power flowing to the grid, zero when importing (W)
    pub excess_generation: i32,

    pub battery_power: i32,

    pub battery_protection_active: bool,
}

/// Debugging block of the command record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDebug {
    /// Human-readable explanation of the state decision
    pub state_reason: String,

    /// Local timestamp of the next scheduled tick
    pub next_check: String,
}

/// Complete per-tick output handed to the transport collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Local ISO-8601 timestamp of the tick
    pub timestamp: String,

    /// Engine state label, or "DISABLED"
    pub current_state: String,

    pub actions: CommandActions,

    pub status: CommandStatus,

    pub debug: CommandDebug,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_setpoint_serializes_as_null() {
        let actions = CommandActions {
            set_ess_mode: false,
            grid_setpoint: None,
            enable_hws: false,
            inverter_mode: INVERTER_MODE_ON,
        };
        let json = serde_json::to_value(&actions).unwrap();
        assert!(json["grid_setpoint"].is_null());
    }

    #[test]
    fn test_record_roundtrip() {
        let record = CommandRecord {
            timestamp: "2025-07-10T14:30:00+10:00".to_string(),
            current_state: "BATTERY_STORAGE".to_string(),
            actions: CommandActions {
                set_ess_mode: true,
                grid_setpoint: Some(0),
                enable_hws: false,
                inverter_mode: INVERTER_MODE_ON,
            },
            status: CommandStatus {
                export_target: 23.5,
                daily_export: 23.6,
                target_reached: true,
                battery_soc: 60.0,
                excess_generation: 1500,
                battery_power: 2000,
                battery_protection_active: false,
            },
            debug: CommandDebug {
                state_reason: "daily export target reached".to_string(),
                next_check: "2025-07-10T14:30:30+10:00".to_string(),
            },
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: CommandRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.actions.grid_setpoint, Some(0));
        assert!(back.status.target_reached);
    }
}
