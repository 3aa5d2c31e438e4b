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

//! Telemetry bounds checking.
//!
//! A reading outside these envelopes means a sensor or ingestion fault,
//! not a plant condition; the tick degrades to a no-op command and the
//! state machine holds until readings come back sane.

use vectrion_types::TelemetrySnapshot;

/// SOC readings drift a little past the nominal range on some BMS firmware
const SOC_MIN_PCT: f32 = -5.0;
const SOC_MAX_PCT: f32 = 105.0;

/// No residential feed runs anywhere near this
const POWER_LIMIT_W: i32 = 50_000;

const DAILY_EXPORT_MAX_KWH: f32 = 200.0;

/// Check a snapshot against the plausibility envelopes.
///
/// Returns every violated bound so the log entry names them all.
pub fn validate(snapshot: &TelemetrySnapshot) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let soc = snapshot.battery_soc_pct;
    if !(SOC_MIN_PCT..=SOC_MAX_PCT).contains(&soc) {
        errors.push(format!(
            "battery SOC {soc}% outside [{SOC_MIN_PCT}, {SOC_MAX_PCT}]"
        ));
    }

    if snapshot.generation_w.abs() > POWER_LIMIT_W {
        errors.push(format!(
            "generation {} W exceeds ±{POWER_LIMIT_W} W",
            snapshot.generation_w
        ));
    }
    if snapshot.grid_power_w.abs() > POWER_LIMIT_W {
        errors.push(format!(
            "grid power {} W exceeds ±{POWER_LIMIT_W} W",
            snapshot.grid_power_w
        ));
    }
    if snapshot.battery_power_w.abs() > POWER_LIMIT_W {
        errors.push(format!(
            "battery power {} W exceeds ±{POWER_LIMIT_W} W",
            snapshot.battery_power_w
        ));
    }

    let daily_kwh = snapshot.daily_export_kwh();
    if !(0.0..=DAILY_EXPORT_MAX_KWH).contains(&daily_kwh) {
        errors.push(format!(
            "daily export {daily_kwh} kWh outside [0, {DAILY_EXPORT_MAX_KWH}]"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sane() -> TelemetrySnapshot {
        TelemetrySnapshot {
            daily_export_wh: 12_000.0,
            grid_power_w: -1500,
            generation_w: 3000,
            battery_soc_pct: 60.0,
            battery_power_w: 2000,
            inverter_mode: 3,
            enabled: true,
        }
    }

    #[test]
    fn test_sane_snapshot_passes() {
        assert!(validate(&sane()).is_ok());
    }

    #[test]
    fn test_soc_drift_tolerated_at_bounds() {
        let mut s = sane();
        s.battery_soc_pct = -5.0;
        assert!(validate(&s).is_ok());
        s.battery_soc_pct = 105.0;
        assert!(validate(&s).is_ok());
        s.battery_soc_pct = 105.1;
        assert!(validate(&s).is_err());
    }

    #[test]
    fn test_power_envelope() {
        let mut s = sane();
        s.grid_power_w = -50_000;
        assert!(validate(&s).is_ok());
        s.grid_power_w = -50_001;
        assert!(validate(&s).is_err());
    }

    #[test]
    fn test_negative_daily_export_rejected() {
        let mut s = sane();
        s.daily_export_wh = -1.0;
        assert!(validate(&s).is_err());
    }

    #[test]
    fn test_all_violations_reported() {
        let s = TelemetrySnapshot {
            daily_export_wh: 300_000.0,
            grid_power_w: 60_000,
            generation_w: -60_000,
            battery_soc_pct: 140.0,
            battery_power_w: 60_000,
            inverter_mode: 3,
            enabled: true,
        };
        let errors = validate(&s).unwrap_err();
        assert_eq!(errors.len(), 5);
    }
}
