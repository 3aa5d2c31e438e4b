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

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of an event-log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    StateChange,
    BatteryProtection,
    HwsEvent,
    Debounce,
    DataProtection,
    DailySummary,
    PerformanceAlert,
    SystemInfo,
    System,
    Error,
    Warning,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StateChange => "STATE_CHANGE",
            Self::BatteryProtection => "BATTERY_PROTECTION",
            Self::HwsEvent => "HWS_EVENT",
            Self::Debounce => "DEBOUNCE",
            Self::DataProtection => "DATA_PROTECTION",
            Self::DailySummary => "DAILY_SUMMARY",
            Self::PerformanceAlert => "PERFORMANCE_ALERT",
            Self::SystemInfo => "SYSTEM_INFO",
            Self::System => "SYSTEM",
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity of an event-log entry, ordered low to critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPriority {
    Low,
    Normal,
    High,
    Critical,
}

impl fmt::Display for EventPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// One entry of the persisted append-only event log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Monotonically increasing id, unique within the log's lifetime
    pub id: u64,

    /// Local ISO-8601 timestamp with the configured fixed offset
    pub timestamp: String,

    #[serde(rename = "type")]
    pub event_type: EventType,

    pub priority: EventPriority,

    pub message: String,

    /// Schema-free attachment; shape depends on the event type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Local calendar date, used by age-based cleanup
    pub date: NaiveDate,
}
