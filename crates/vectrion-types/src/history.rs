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

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Maximum number of days kept in the rolling export window
pub const MAX_WINDOW_DAYS: usize = 30;

/// Export result for a single local calendar day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRecord {
    /// Local calendar date of the record
    pub date: NaiveDate,

    /// Grid export observed for the day (kWh)
    pub export_kwh: f32,

    /// Adjusted daily target in force when the record was written (kWh)
    pub target_kwh: f32,

    /// When the record was written
    pub recorded_at: DateTime<Utc>,
}

/// Rolling window of daily export records.
///
/// Invariants: at most one record per local date, ascending by date,
/// never more than `max_days` entries. A record, once written for a date,
/// is never overwritten; the first observation of the day wins. The
/// window slides across month boundaries without reset, which is what
/// keeps the adaptive target continuous on the 1st of a month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportHistory {
    records: VecDeque<DailyRecord>,

    #[serde(default = "default_max_days")]
    max_days: usize,
}

fn default_max_days() -> usize {
    MAX_WINDOW_DAYS
}

impl Default for ExportHistory {
    fn default() -> Self {
        Self::new(MAX_WINDOW_DAYS)
    }
}

impl ExportHistory {
    /// Create an empty history bounded to `max_days` entries
    pub fn new(max_days: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(max_days),
            max_days,
        }
    }

    /// Record a day's export, write-once per date.
    ///
    /// Returns `true` if a new record was written, `false` if the date was
    /// already present (the existing record is left untouched).
    pub fn record_once(
        &mut self,
        date: NaiveDate,
        export_kwh: f32,
        target_kwh: f32,
        recorded_at: DateTime<Utc>,
    ) -> bool {
        if self.contains(date) {
            return false;
        }

        let record = DailyRecord {
            date,
            export_kwh,
            target_kwh,
            recorded_at,
        };

        // Normal operation appends in date order; a backfilled or
        // clock-skewed record still has to land in its sorted position.
        let pos = self
            .records
            .iter()
            .position(|r| r.date > date)
            .unwrap_or(self.records.len());
        self.records.insert(pos, record);

        while self.records.len() > self.max_days {
            self.records.pop_front();
        }
        true
    }

    /// The record for a date, if one was written
    pub fn get(&self, date: NaiveDate) -> Option<&DailyRecord> {
        self.records.iter().find(|r| r.date == date)
    }

    /// Whether a record exists for the given date
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.get(date).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, oldest first
    pub fn records(&self) -> impl Iterator<Item = &DailyRecord> {
        self.records.iter()
    }

    /// The most recent `n` records, oldest first
    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &DailyRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip)
    }

    /// Sum of export over the most recent `n` records (kWh)
    pub fn export_sum_last(&self, n: usize) -> f32 {
        self.last_n(n).map(|r| r.export_kwh).sum()
    }

    /// Distinct calendar months appearing in the most recent `n` records
    pub fn months_in_last(&self, n: usize) -> BTreeSet<u32> {
        self.last_n(n).map(|r| r.date.month()).collect()
    }
}
