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

//! State-to-command mapping and the hot-water sub-controller.
//!
//! The command table is fixed per state; the only conditional output is
//! the HWS contactor, which carries its own cooldown so a marginal solar
//! day cannot cycle the element.

use vectrion_types::command::{INVERTER_MODE_OFF, INVERTER_MODE_ON};
use vectrion_types::{CommandActions, EnergyState, EngineConfig};

/// What happened to the HWS contactor this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwsOutcome {
    pub enable: bool,
    pub turned_on: bool,
    pub turned_off: bool,
}

impl HwsOutcome {
    fn hold(enable: bool) -> Self {
        Self {
            enable,
            turned_on: false,
            turned_off: false,
        }
    }
}

/// Drive the HWS contactor for this tick.
///
/// Only LOAD_MANAGEMENT may energise it; every other state forces it off
/// (and records the off-edge so the cooldown starts).
pub fn hws_control(
    next_state: EnergyState,
    soc: f32,
    generation_w: i32,
    prior_on: bool,
    now_ms: i64,
    last_off_ms: i64,
    config: &EngineConfig,
) -> HwsOutcome {
    if next_state != EnergyState::LoadManagement {
        if prior_on {
            return HwsOutcome {
                enable: false,
                turned_on: false,
                turned_off: true,
            };
        }
        return HwsOutcome::hold(false);
    }

    let soc_in_band = soc > config.max_soc_threshold - config.hws_soc_drop_threshold;
    let generation_in_band = generation_w >= config.hws_generation_drop_threshold_w;
    let cooldown_expired = now_ms - last_off_ms >= config.hws_cooldown_ms();

    if !prior_on && cooldown_expired && soc_in_band && generation_in_band {
        return HwsOutcome {
            enable: true,
            turned_on: true,
            turned_off: false,
        };
    }

    if prior_on && (!soc_in_band || !generation_in_band) {
        return HwsOutcome {
            enable: false,
            turned_on: false,
            turned_off: true,
        };
    }

    HwsOutcome::hold(prior_on)
}

/// The fixed actuation table for a state
pub fn command_for(state: EnergyState, enable_hws: bool) -> CommandActions {
    match state {
        EnergyState::ExportPriority => CommandActions {
            set_ess_mode: false,
            grid_setpoint: None,
            enable_hws: false,
            inverter_mode: INVERTER_MODE_ON,
        },
        EnergyState::BatteryStorage => CommandActions {
            set_ess_mode: true,
            grid_setpoint: Some(0),
            enable_hws: false,
            inverter_mode: INVERTER_MODE_ON,
        },
        EnergyState::LoadManagement => CommandActions {
            set_ess_mode: true,
            grid_setpoint: Some(0),
            enable_hws,
            inverter_mode: INVERTER_MODE_ON,
        },
        EnergyState::SelfConsume => CommandActions {
            set_ess_mode: true,
            grid_setpoint: Some(0),
            enable_hws: false,
            inverter_mode: INVERTER_MODE_ON,
        },
        EnergyState::SafeMode => CommandActions {
            set_ess_mode: false,
            grid_setpoint: None,
            enable_hws: false,
            inverter_mode: INVERTER_MODE_OFF,
        },
    }
}
