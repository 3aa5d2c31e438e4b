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

//! Bounded append-only event log.
//!
//! This is the engine's own persisted log, distinct from tracing output:
//! the dashboard reads it back, so entries are classified and prioritised
//! rather than free-form. Appends truncate oldest-first past capacity;
//! an age sweep runs opportunistically, at most once per cleanup
//! interval.

use chrono::Duration;
use serde_json::Value;
use tracing::{debug, info, warn};

use vectrion_types::{EventPriority, EventType, LogEntry};

use crate::clock::Clock;

#[derive(Debug)]
pub struct EventLog {
    entries: Vec<LogEntry>,
    next_id: u64,
    max_entries: usize,
    max_age_days: i64,
    cleanup_interval_hours: i64,
    last_cleanup_ms: i64,
}

impl EventLog {
    pub fn new(max_entries: usize, max_age_days: i64, cleanup_interval_hours: i64) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            max_entries,
            max_age_days,
            cleanup_interval_hours,
            last_cleanup_ms: 0,
        }
    }

    /// Rebuild from persisted entries and cleanup bookkeeping
    pub fn from_parts(
        entries: Vec<LogEntry>,
        last_cleanup_ms: i64,
        max_entries: usize,
        max_age_days: i64,
        cleanup_interval_hours: i64,
    ) -> Self {
        let next_id = entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        Self {
            entries,
            next_id,
            max_entries,
            max_age_days,
            cleanup_interval_hours,
            last_cleanup_ms,
        }
    }

    /// Append an entry, running the age sweep first when it is due.
    /// Returns the id of the new entry.
    pub fn append(
        &mut self,
        clock: &Clock,
        event_type: EventType,
        priority: EventPriority,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> u64 {
        self.maybe_cleanup(clock);

        let message = message.into();
        match priority {
            EventPriority::Critical | EventPriority::High => {
                warn!("[{}] {}", event_type, message);
            }
            EventPriority::Normal => info!("[{}] {}", event_type, message),
            EventPriority::Low => debug!("[{}] {}", event_type, message),
        }

        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(LogEntry {
            id,
            timestamp: clock.local_iso(),
            event_type,
            priority,
            message,
            data,
            date: clock.today(),
        });

        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
        id
    }

    fn maybe_cleanup(&mut self, clock: &Clock) {
        let now_ms = clock.epoch_ms();
        let interval_ms = self.cleanup_interval_hours * 3_600_000;
        if now_ms - self.last_cleanup_ms < interval_ms {
            return;
        }

        let cutoff = clock.today() - Duration::days(self.max_age_days);
        let before = self.entries.len();
        self.entries.retain(|e| e.date >= cutoff);
        let dropped = before - self.entries.len();
        if dropped > 0 {
            debug!("Event-log age sweep dropped {} entries", dropped);
        }
        self.last_cleanup_ms = now_ms;
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_cleanup_ms(&self) -> i64 {
        self.last_cleanup_ms
    }

    /// Most recent entry of a given type, if any
    pub fn last_of_type(&self, event_type: EventType) -> Option<&LogEntry> {
        self.entries.iter().rev().find(|e| e.event_type == event_type)
    }
}
