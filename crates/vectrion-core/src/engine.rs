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

//! Tick orchestration.
//!
//! One `tick` is one indivisible computation: read the persisted state,
//! validate the snapshot, refresh history and target, decide the
//! transition, drive the actuator, persist, return the command record.
//! A panic barrier turns any internal failure into a SAFE_MODE command:
//! an unhandled fault must switch the inverter off, never leave it
//! uncontrolled.

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use serde_json::json;
use std::any::Any;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use tracing::{error, info};

use vectrion_types::command::{DISABLED_STATE, INVERTER_MODE_ON};
use vectrion_types::{
    AdaptiveTargetResult, CommandActions, CommandDebug, CommandRecord, CommandStatus, EnergyState,
    EngineConfig, EventPriority, EventType, ExportHistory, LogEntry, TelemetrySnapshot,
};

use crate::actuator;
use crate::clock::Clock;
use crate::event_log::EventLog;
use crate::store::{keys, PersistentStore};
use crate::target;
use crate::transition::{self, DebounceRegistry, TransitionContext};
use crate::validator;

pub struct Engine {
    config: EngineConfig,
    store: PersistentStore,
    clock: Clock,

    state: EnergyState,
    hws_on: bool,
    hws_last_off_ms: i64,
    registry: DebounceRegistry,
    history: ExportHistory,
    target_cache: Option<AdaptiveTargetResult>,
    log: EventLog,
    last_summary_date: Option<NaiveDate>,

    /// Debounce keys currently on disk, for removal syncing
    persisted_requests: HashSet<(EnergyState, EnergyState)>,
}

impl Engine {
    /// Build an engine from the durable store, recovering whatever state
    /// the last process left behind.
    pub fn new(config: EngineConfig, store: PersistentStore, clock: Clock) -> Result<Self> {
        let entries: Vec<LogEntry> = store
            .load(keys::EVENT_LOG)
            .context("loading event log")?
            .unwrap_or_default();
        let last_cleanup_ms: i64 = store
            .load(keys::LAST_LOG_CLEANUP)
            .context("loading log-cleanup marker")?
            .unwrap_or(0);
        let mut log = EventLog::from_parts(
            entries,
            last_cleanup_ms,
            config.max_log_entries,
            config.log_max_age_days,
            config.log_cleanup_interval_hours,
        );

        let state = match store
            .load::<String>(keys::CURRENT_STATE)
            .context("loading engine state")?
        {
            None => {
                info!("No persisted state; starting in {}", EnergyState::default());
                EnergyState::default()
            }
            Some(raw) => match EnergyState::from_str(&raw) {
                Ok(state) => state,
                Err(_) => {
                    log.append(
                        &clock,
                        EventType::System,
                        EventPriority::High,
                        format!("Persisted state '{raw}' not recognised; resetting to EXPORT_PRIORITY"),
                        Some(json!({"stored": raw})),
                    );
                    EnergyState::default()
                }
            },
        };

        let registry_entries = store
            .load_debounce_requests()
            .context("loading debounce requests")?;
        let persisted_requests: HashSet<_> =
            registry_entries.iter().map(|(pair, _)| *pair).collect();

        Ok(Self {
            state,
            hws_on: store.load(keys::HWS_STATUS)?.unwrap_or(false),
            hws_last_off_ms: store.load(keys::HWS_LAST_OFF_TIME)?.unwrap_or(0),
            registry: DebounceRegistry::from_entries(registry_entries),
            history: store.load(keys::EXPORT_HISTORY)?.unwrap_or_default(),
            target_cache: store.load(keys::TARGET_CACHE)?,
            last_summary_date: store.load(keys::LAST_DAILY_SUMMARY_DATE)?,
            log,
            persisted_requests,
            config,
            store,
            clock,
        })
    }

    pub fn state(&self) -> EnergyState {
        self.state
    }

    pub fn hws_on(&self) -> bool {
        self.hws_on
    }

    pub fn history(&self) -> &ExportHistory {
        &self.history
    }

    pub fn target_cache(&self) -> Option<&AdaptiveTargetResult> {
        self.target_cache.as_ref()
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Run one tick. Never panics outward: any internal failure yields
    /// the SAFE_MODE command instead.
    pub fn tick(&mut self, snapshot: &TelemetrySnapshot) -> CommandRecord {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.tick_inner(snapshot)));
        match outcome {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => self.failsafe(snapshot, format!("tick failed: {e:#}")),
            Err(panic) => self.failsafe(snapshot, format!("tick panicked: {}", panic_text(panic))),
        }
    }

    fn tick_inner(&mut self, snapshot: &TelemetrySnapshot) -> Result<CommandRecord> {
        if !snapshot.enabled {
            return Ok(self.disabled_record(snapshot));
        }

        if let Err(errors) = validator::validate(snapshot) {
            return self.degraded_record(snapshot, errors);
        }

        let now = self.clock.now_utc();
        let now_ms = self.clock.epoch_ms();
        let today = self.clock.today();
        let month = today.month();
        let daily_kwh = snapshot.daily_export_kwh();

        // First tick of a local day writes the day's record; later ticks
        // leave it alone.
        let provisional_target = self
            .target_cache
            .as_ref()
            .map(|t| t.adjusted_target)
            .unwrap_or_else(|| self.config.monthly_target_for(month));
        self.history
            .record_once(today, daily_kwh, provisional_target, now);

        let target = target::calculate(&self.history, month, &self.config, now);
        if target.rolling_days >= target::MIN_ROLLING_DAYS {
            self.target_cache = Some(target.clone());
        }
        let target_kwh = target.adjusted_target;
        let target_reached = daily_kwh >= target_kwh;

        let ctx = TransitionContext {
            current: self.state,
            snapshot,
            target_kwh,
            target_reached,
            is_night: self
                .clock
                .is_night(self.config.night_start_hour, self.config.night_end_hour),
            now_ms,
            hws_on: self.hws_on,
        };
        let decision = transition::decide(
            &ctx,
            &self.config,
            &mut self.registry,
            &mut self.log,
            &self.clock,
        );

        if decision.next_state != self.state {
            self.log.append(
                &self.clock,
                EventType::StateChange,
                EventPriority::Normal,
                format!("{} -> {}: {}", self.state, decision.next_state, decision.reason),
                Some(json!({
                    "from": self.state.as_str(),
                    "to": decision.next_state.as_str(),
                })),
            );
            self.state = decision.next_state;
        }

        let hws = actuator::hws_control(
            self.state,
            snapshot.battery_soc_pct,
            snapshot.generation_w,
            self.hws_on,
            now_ms,
            self.hws_last_off_ms,
            &self.config,
        );
        if hws.turned_on {
            self.log.append(
                &self.clock,
                EventType::HwsEvent,
                EventPriority::Normal,
                format!(
                    "TURNED_ON: diverting {} W excess into hot water",
                    snapshot.excess_generation_w()
                ),
                None,
            );
        }
        if hws.turned_off {
            self.log.append(
                &self.clock,
                EventType::HwsEvent,
                EventPriority::Normal,
                format!(
                    "TURNED_OFF: SOC {:.1}%, generation {} W",
                    snapshot.battery_soc_pct, snapshot.generation_w
                ),
                None,
            );
            self.hws_last_off_ms = now_ms;
        }
        self.hws_on = hws.enable;

        let actions = actuator::command_for(self.state, self.hws_on);

        self.maybe_daily_summary(today, daily_kwh, target_kwh);
        self.persist_all()?;

        Ok(CommandRecord {
            timestamp: self.clock.local_iso(),
            current_state: self.state.as_str().to_string(),
            actions,
            status: self.status_block(snapshot, target_kwh, target_reached),
            debug: CommandDebug {
                state_reason: decision.reason,
                next_check: self.clock.local_iso_from(
                    now + Duration::seconds(self.config.update_interval_secs as i64),
                ),
            },
        })
    }

    /// Daily performance summary, at most once per summarized date.
    ///
    /// Hour 23 closes out the running day with the live accumulator.
    /// Hours 0 and 1 are the catch-up window for a missed 23:00 tick;
    /// by then the accumulator has reset at local midnight, so the
    /// closed day is rebuilt from its history record instead. The
    /// once-per-date budget is keyed on the day being summarized, never
    /// on the freshly started one.
    fn maybe_daily_summary(&mut self, today: NaiveDate, daily_kwh: f32, target_kwh: f32) {
        let (summary_date, summary_export, summary_target) = match self.clock.local_hour() {
            23 => (today, daily_kwh, target_kwh),
            0 | 1 => {
                let yesterday = match today.pred_opt() {
                    Some(date) => date,
                    None => return,
                };
                match self.history.get(yesterday) {
                    Some(record) => (yesterday, record.export_kwh, record.target_kwh),
                    None => return, // nothing recorded for the closed day
                }
            }
            _ => return,
        };
        if self.last_summary_date == Some(summary_date) {
            return;
        }

        let ratio = if summary_target > 0.0 {
            summary_export / summary_target
        } else {
            1.0
        };
        self.log.append(
            &self.clock,
            EventType::DailySummary,
            EventPriority::Normal,
            format!(
                "Daily summary for {summary_date}: exported {:.1} of {:.1} kWh ({:.0}%)",
                summary_export,
                summary_target,
                ratio * 100.0
            ),
            Some(json!({
                "date": summary_date.to_string(),
                "daily_export_kwh": summary_export,
                "target_kwh": summary_target,
                "ratio": ratio,
            })),
        );
        if ratio < self.config.export_target_percentage / 100.0 {
            self.log.append(
                &self.clock,
                EventType::PerformanceAlert,
                EventPriority::High,
                format!(
                    "Day {summary_date} closed at {:.0}% of the export target ({:.1} of {:.1} kWh)",
                    ratio * 100.0,
                    summary_export,
                    summary_target
                ),
                None,
            );
        }
        self.last_summary_date = Some(summary_date);
    }

    /// Write every dirty blob. Each write is atomic on its own; the
    /// sequencing guarantee the engine needs is only that everything is
    /// durable before the tick returns.
    fn persist_all(&mut self) -> Result<()> {
        let store = &self.store;
        store
            .save(keys::CURRENT_STATE, &self.state.as_str())
            .context("persisting state")?;
        store
            .save(keys::EXPORT_HISTORY, &self.history)
            .context("persisting history")?;
        if let Some(cache) = &self.target_cache {
            store
                .save(keys::TARGET_CACHE, cache)
                .context("persisting target cache")?;
        }
        store
            .save(keys::EVENT_LOG, &self.log.entries())
            .context("persisting event log")?;
        store
            .save(keys::LAST_LOG_CLEANUP, &self.log.last_cleanup_ms())
            .context("persisting cleanup marker")?;
        store
            .save(keys::HWS_STATUS, &self.hws_on)
            .context("persisting HWS status")?;
        store
            .save(keys::HWS_LAST_OFF_TIME, &self.hws_last_off_ms)
            .context("persisting HWS off time")?;
        if let Some(date) = &self.last_summary_date {
            store
                .save(keys::LAST_DAILY_SUMMARY_DATE, date)
                .context("persisting summary date")?;
        }

        // Sync the per-pair debounce blobs with the in-memory registry
        let live: HashSet<(EnergyState, EnergyState)> =
            self.registry.entries().map(|(pair, _)| pair).collect();
        for pair in self.persisted_requests.difference(&live) {
            store.remove(&keys::debounce_request(pair.0, pair.1))?;
        }
        for (pair, started_ms) in self.registry.entries() {
            store.save(&keys::debounce_request(pair.0, pair.1), &started_ms)?;
        }
        self.persisted_requests = live;
        Ok(())
    }

    fn status_block(
        &self,
        snapshot: &TelemetrySnapshot,
        target_kwh: f32,
        target_reached: bool,
    ) -> CommandStatus {
        CommandStatus {
            export_target: target_kwh,
            daily_export: snapshot.daily_export_kwh(),
            target_reached,
            battery_soc: snapshot.soc_clamped(),
            excess_generation: snapshot.excess_generation_w(),
            battery_power: snapshot.battery_power_w,
            battery_protection_active: snapshot.battery_soc_pct <= self.config.min_soc_threshold
                && snapshot.battery_power_w < 0,
        }
    }

    /// Effective target without running the calculator, for the paths
    /// that do not advance the engine.
    fn resting_target(&self) -> f32 {
        self.target_cache
            .as_ref()
            .map(|t| t.adjusted_target)
            .unwrap_or_else(|| self.config.monthly_target_for(self.clock.today().month()))
    }

    fn disabled_record(&self, snapshot: &TelemetrySnapshot) -> CommandRecord {
        let target_kwh = self.resting_target();
        CommandRecord {
            timestamp: self.clock.local_iso(),
            current_state: DISABLED_STATE.to_string(),
            actions: CommandActions {
                set_ess_mode: false,
                grid_setpoint: None,
                enable_hws: false,
                inverter_mode: INVERTER_MODE_ON,
            },
            status: self.status_block(snapshot, target_kwh, snapshot.daily_export_kwh() >= target_kwh),
            debug: CommandDebug {
                state_reason: "energy management disabled by master switch".to_string(),
                next_check: self.clock.local_iso_from(
                    self.clock.now_utc()
                        + Duration::seconds(self.config.update_interval_secs as i64),
                ),
            },
        }
    }

    /// Validation failure: hold the state machine, drop to a passive
    /// command. The inverter stays on; powering down is reserved for
    /// SAFE_MODE itself.
    fn degraded_record(
        &mut self,
        snapshot: &TelemetrySnapshot,
        errors: Vec<String>,
    ) -> Result<CommandRecord> {
        let detail = errors.join("; ");
        self.log.append(
            &self.clock,
            EventType::Error,
            EventPriority::High,
            format!("Telemetry rejected: {detail}"),
            Some(json!({"errors": errors})),
        );
        self.store
            .save(keys::EVENT_LOG, &self.log.entries())
            .context("persisting event log")?;
        self.store
            .save(keys::LAST_LOG_CLEANUP, &self.log.last_cleanup_ms())
            .context("persisting cleanup marker")?;

        let target_kwh = self.resting_target();
        Ok(CommandRecord {
            timestamp: self.clock.local_iso(),
            current_state: self.state.as_str().to_string(),
            actions: CommandActions {
                set_ess_mode: false,
                grid_setpoint: None,
                enable_hws: false,
                inverter_mode: INVERTER_MODE_ON,
            },
            status: self.status_block(snapshot, target_kwh, false),
            debug: CommandDebug {
                state_reason: format!("telemetry validation failed: {detail}"),
                next_check: self.clock.local_iso_from(
                    self.clock.now_utc()
                        + Duration::seconds(self.config.update_interval_secs as i64),
                ),
            },
        })
    }

    /// Last-resort output: anything unhandled turns the inverter off.
    fn failsafe(&mut self, snapshot: &TelemetrySnapshot, message: String) -> CommandRecord {
        error!("{message}");
        self.log.append(
            &self.clock,
            EventType::Error,
            EventPriority::Critical,
            message.clone(),
            None,
        );
        // Best effort; the failure may well be the store itself
        let _ = self.store.save(keys::EVENT_LOG, &self.log.entries());

        CommandRecord {
            timestamp: self.clock.local_iso(),
            current_state: EnergyState::SafeMode.as_str().to_string(),
            actions: actuator::command_for(EnergyState::SafeMode, false),
            status: self.status_block(snapshot, self.resting_target(), false),
            debug: CommandDebug {
                state_reason: message,
                next_check: self.clock.local_iso_from(
                    self.clock.now_utc()
                        + Duration::seconds(self.config.update_interval_secs as i64),
                ),
            },
        }
    }
}

fn panic_text(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
