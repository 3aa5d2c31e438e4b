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

//! Fixed-offset local clock.
//!
//! The installation is single-site, so local time is a configured fixed
//! offset from UTC rather than a timezone-database lookup. All instants
//! are taken from a `NowSource` so tests and simulations can drive time.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Timelike, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of the current instant
pub trait NowSource: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Wall-clock source for production
#[derive(Debug, Default)]
pub struct SystemNow;

impl NowSource for SystemNow {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven source for tests and offline simulation
#[derive(Debug)]
pub struct ManualNow {
    epoch_ms: AtomicI64,
}

impl ManualNow {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            epoch_ms: AtomicI64::new(start.timestamp_millis()),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        self.epoch_ms
            .store(instant.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.epoch_ms
            .fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl NowSource for ManualNow {
    fn now_utc(&self) -> DateTime<Utc> {
        let ms = self.epoch_ms.load(Ordering::SeqCst);
        Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
    }
}

/// Fixed-offset local clock over a pluggable instant source
#[derive(Clone)]
pub struct Clock {
    offset: FixedOffset,
    source: Arc<dyn NowSource>,
}

impl Clock {
    pub fn new(local_offset_hours: i32, source: Arc<dyn NowSource>) -> Result<Self> {
        let offset = FixedOffset::east_opt(local_offset_hours * 3600)
            .with_context(|| format!("Invalid local offset: {local_offset_hours}h"))?;
        Ok(Self { offset, source })
    }

    /// Production clock on the system wall clock
    pub fn system(local_offset_hours: i32) -> Result<Self> {
        Self::new(local_offset_hours, Arc::new(SystemNow))
    }

    pub fn now_utc(&self) -> DateTime<Utc> {
        self.source.now_utc()
    }

    pub fn now_local(&self) -> DateTime<FixedOffset> {
        self.source.now_utc().with_timezone(&self.offset)
    }

    /// Current local calendar date
    pub fn today(&self) -> NaiveDate {
        self.now_local().date_naive()
    }

    /// Current local hour, 0-23
    pub fn local_hour(&self) -> u32 {
        self.now_local().hour()
    }

    /// Milliseconds since the Unix epoch
    pub fn epoch_ms(&self) -> i64 {
        self.source.now_utc().timestamp_millis()
    }

    /// Local ISO-8601 timestamp of now, with the configured offset
    pub fn local_iso(&self) -> String {
        self.now_local().format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    }

    /// Local ISO-8601 rendering of an arbitrary UTC instant
    pub fn local_iso_from(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.offset)
            .format("%Y-%m-%dT%H:%M:%S%:z")
            .to_string()
    }

    /// Whether the current local hour falls in the night window.
    ///
    /// The window wraps midnight when `start > end` (the usual shape,
    /// e.g. 22-6); a non-wrapping configuration is honoured as a plain
    /// half-open range.
    pub fn is_night(&self, start_hour: u32, end_hour: u32) -> bool {
        let hour = self.local_hour();
        if start_hour <= end_hour {
            hour >= start_hour && hour < end_hour
        } else {
            hour >= start_hour || hour < end_hour
        }
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock").field("offset", &self.offset).finish()
    }
}
