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

//! Adaptive daily export target.
//!
//! A rolling window of up to 30 daily records is compared against the
//! seasonal schedule for the current month. The window crosses month
//! boundaries without reset, so the target stays continuous on the 1st.
//! The adjustment is asymmetric on purpose: a shortfall is clawed back
//! over a few days, an overshoot is eased off by only 30% of the excess.

use chrono::{DateTime, Utc};
use tracing::debug;

use vectrion_types::history::MAX_WINDOW_DAYS;
use vectrion_types::{
    AdaptiveTargetResult, AdjustmentReason, CatchupStrategy, EngineConfig, ExportHistory,
};

/// Minimum history days before the adaptive adjustment engages
pub const MIN_ROLLING_DAYS: usize = 3;

/// Fraction of the overshoot removed when cooling down
const COOLDOWN_FACTOR: f32 = 0.3;

/// Floor of the cooled-down target, as a fraction of the static target
const COOLDOWN_FLOOR_RATIO: f32 = 0.8;

/// Under-/over-performance dead band on the performance ratio
const UNDER_PERFORMANCE_RATIO: f32 = 0.9;
const OVER_PERFORMANCE_RATIO: f32 = 1.1;

/// Evaluate the adaptive target for the given month.
///
/// The result always carries a usable `adjusted_target`; with fewer than
/// [`MIN_ROLLING_DAYS`] of history it is simply the static monthly value
/// and the caller must not cache the result.
pub fn calculate(
    history: &ExportHistory,
    month: u32,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> AdaptiveTargetResult {
    let static_target = config.monthly_target_for(month);
    let rolling_days = history.len().min(MAX_WINDOW_DAYS);
    let rolling_total = history.export_sum_last(rolling_days);
    let has_mixed_months = history.months_in_last(rolling_days).len() > 1;

    if rolling_days < MIN_ROLLING_DAYS {
        return AdaptiveTargetResult {
            base_target: static_target,
            static_monthly_target: static_target,
            performance_ratio: 1.0,
            adjusted_target: static_target,
            rolling_days,
            rolling_export_total: rolling_total,
            has_mixed_months,
            adjustment_reason: AdjustmentReason::InsufficientHistory,
            calculated_at: now,
        };
    }

    let base_target = rolling_total / rolling_days as f32;
    let performance_ratio = base_target / static_target;

    let (adjusted_target, adjustment_reason) = if performance_ratio < UNDER_PERFORMANCE_RATIO {
        catch_up(base_target, static_target, rolling_days, rolling_total, config)
    } else if performance_ratio > OVER_PERFORMANCE_RATIO {
        cool_down(base_target, static_target)
    } else {
        (static_target, AdjustmentReason::OnTrack)
    };

    debug!(
        "Adaptive target for month {}: base {:.2}, static {:.2}, ratio {:.3} -> {:.2} ({})",
        month, base_target, static_target, performance_ratio, adjusted_target, adjustment_reason
    );

    AdaptiveTargetResult {
        base_target,
        static_monthly_target: static_target,
        performance_ratio,
        adjusted_target,
        rolling_days,
        rolling_export_total: rolling_total,
        has_mixed_months,
        adjustment_reason,
        calculated_at: now,
    }
}

fn catch_up(
    base_target: f32,
    static_target: f32,
    rolling_days: usize,
    rolling_total: f32,
    config: &EngineConfig,
) -> (f32, AdjustmentReason) {
    match config.catchup_strategy {
        CatchupStrategy::DeficitRecovery => {
            let total_deficit = static_target * rolling_days as f32 - rolling_total;
            let catchup_per_day = total_deficit / config.catchup_days.max(1) as f32;
            let raw = static_target + catchup_per_day;
            let cap = 2.0 * static_target;
            if raw > cap {
                (cap, AdjustmentReason::CatchUpCapped)
            } else {
                (raw, AdjustmentReason::CatchUp)
            }
        }
        CatchupStrategy::Aggressiveness => {
            let shortfall_per_day = static_target - base_target;
            let raw = static_target + config.catchup_aggressiveness * shortfall_per_day;
            let cap = 1.5 * static_target;
            if raw > cap {
                (cap, AdjustmentReason::CatchUpCapped)
            } else {
                (raw, AdjustmentReason::CatchUp)
            }
        }
    }
}

fn cool_down(base_target: f32, static_target: f32) -> (f32, AdjustmentReason) {
    let cooldown = (base_target - static_target) * COOLDOWN_FACTOR;
    let raw = static_target - cooldown;
    let floor = COOLDOWN_FLOOR_RATIO * static_target;
    if raw < floor {
        (floor, AdjustmentReason::CoolDownFloored)
    } else {
        (raw, AdjustmentReason::CoolDown)
    }
}
