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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which branch of the adaptive-target calculation produced the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    /// Fewer than three days of history; static monthly target in force
    InsufficientHistory,
    /// Performance ratio within the 0.9-1.1 dead band
    OnTrack,
    /// Under-performing; target raised to recover the deficit
    CatchUp,
    /// Under-performing; raise hit the configured cap
    CatchUpCapped,
    /// Over-performing; target eased off
    CoolDown,
    /// Over-performing; ease-off hit the 0.8x static floor
    CoolDownFloored,
}

impl fmt::Display for AdjustmentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InsufficientHistory => "insufficient_history",
            Self::OnTrack => "on_track",
            Self::CatchUp => "catch_up",
            Self::CatchUpCapped => "catch_up_capped",
            Self::CoolDown => "cool_down",
            Self::CoolDownFloored => "cool_down_floored",
        };
        write!(f, "{s}")
    }
}

/// Output of one adaptive-target evaluation, cached across ticks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveTargetResult {
    /// Mean daily export over the rolling window (kWh)
    pub base_target: f32,

    /// Seasonal schedule value for the current month (kWh)
    pub static_monthly_target: f32,

    /// base_target / static_monthly_target
    pub performance_ratio: f32,

    /// Daily target in force for this tick (kWh)
    pub adjusted_target: f32,

    /// Number of history days the window actually covered
    pub rolling_days: usize,

    /// Total export over the window (kWh)
    pub rolling_export_total: f32,

    /// Whether the window spans more than one calendar month
    pub has_mixed_months: bool,

    pub adjustment_reason: AdjustmentReason,

    pub calculated_at: DateTime<Utc>,
}
