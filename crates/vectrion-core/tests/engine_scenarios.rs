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

//! End-to-end engine scenarios: full ticks against a temp-dir store with
//! a hand-driven clock.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

use vectrion_core::clock::ManualNow;
use vectrion_core::store::keys;
use vectrion_core::{Clock, Engine, PersistentStore};
use vectrion_types::{
    EnergyState, EngineConfig, EventPriority, EventType, ExportHistory, TelemetrySnapshot,
};

fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// July config pinned to a 23.5 kWh/day schedule
fn july_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.monthly_targets.insert(7, 23.5);
    config
}

struct Rig {
    _dir: TempDir,
    store: PersistentStore,
    source: Arc<ManualNow>,
    config: EngineConfig,
}

impl Rig {
    /// Noon local time (+10:00) on 2025-07-10
    fn midday() -> Self {
        Self::at("2025-07-10T02:00:00Z")
    }

    fn at(start: &str) -> Self {
        let dir = tempdir().unwrap();
        let store = PersistentStore::open(dir.path()).unwrap();
        Self {
            _dir: dir,
            store,
            source: Arc::new(ManualNow::new(utc(start))),
            config: july_config(),
        }
    }

    fn clock(&self) -> Clock {
        Clock::new(self.config.local_offset_hours, self.source.clone()).unwrap()
    }

    fn seed_state(&self, state: EnergyState) {
        self.store.save(keys::CURRENT_STATE, &state.as_str()).unwrap();
    }

    fn seed_history(&self, days: &[(NaiveDate, f32)]) {
        let mut history = ExportHistory::default();
        for (date, kwh) in days {
            history.record_once(*date, *kwh, 23.5, utc("2025-07-01T00:00:00Z"));
        }
        self.store.save(keys::EXPORT_HISTORY, &history).unwrap();
    }

    fn engine(&self) -> Engine {
        Engine::new(self.config.clone(), self.store.clone(), self.clock()).unwrap()
    }

    fn advance(&self, by: Duration) {
        self.source.advance(by);
    }
}

fn five_days_at_24() -> Vec<(NaiveDate, f32)> {
    (5..=9).map(|d| (day(2025, 7, d), 24.0)).collect()
}

fn has_entry(engine: &Engine, event_type: EventType, priority: EventPriority) -> bool {
    engine
        .event_log()
        .entries()
        .iter()
        .any(|e| e.event_type == event_type && e.priority == priority)
}

#[test]
fn scenario_reach_daily_target_enters_storage() {
    let rig = Rig::midday();
    rig.seed_history(&five_days_at_24());
    let mut engine = rig.engine();

    let record = engine.tick(&TelemetrySnapshot {
        daily_export_wh: 23_600.0,
        grid_power_w: -1500,
        generation_w: 3000,
        battery_soc_pct: 60.0,
        battery_power_w: 2000,
        inverter_mode: 3,
        enabled: true,
    });

    assert_eq!(engine.state(), EnergyState::BatteryStorage);
    assert_eq!(record.current_state, "BATTERY_STORAGE");
    assert!(record.actions.set_ess_mode);
    assert_eq!(record.actions.grid_setpoint, Some(0));
    assert_eq!(record.actions.inverter_mode, 3);
    assert!(!record.actions.enable_hws);
    assert!(record.status.target_reached);
    assert!((record.status.export_target - 23.5).abs() < 0.01);
}

#[test]
fn scenario_battery_protection_bypasses_debounce() {
    let rig = Rig::midday();
    rig.seed_state(EnergyState::BatteryStorage);
    let mut engine = rig.engine();

    let record = engine.tick(&TelemetrySnapshot {
        daily_export_wh: 5_000.0,
        grid_power_w: 400,
        generation_w: 0,
        battery_soc_pct: 22.0,
        battery_power_w: -300,
        inverter_mode: 3,
        enabled: true,
    });

    // One tick, no debounce wait
    assert_eq!(engine.state(), EnergyState::ExportPriority);
    assert!(has_entry(&engine, EventType::BatteryProtection, EventPriority::Critical));
    assert!(!record.actions.set_ess_mode);
    assert_eq!(record.actions.inverter_mode, 3);
    assert!(record.status.battery_protection_active);
}

#[test]
fn scenario_debounced_reset_requires_persistence() {
    let rig = Rig::midday();
    rig.seed_state(EnergyState::SelfConsume);
    let mut engine = rig.engine();

    let snapshot = TelemetrySnapshot {
        daily_export_wh: 5_000.0,
        grid_power_w: -500,
        generation_w: 800,
        battery_soc_pct: 55.0,
        battery_power_w: 1200,
        inverter_mode: 3,
        enabled: true,
    };

    // Tick A: request starts, state holds
    engine.tick(&snapshot);
    assert_eq!(engine.state(), EnergyState::SelfConsume);
    assert!(has_entry(&engine, EventType::Debounce, EventPriority::Normal));

    // Tick B at +4 min: still holding
    rig.advance(Duration::minutes(4));
    engine.tick(&snapshot);
    assert_eq!(engine.state(), EnergyState::SelfConsume);

    // Tick C at +5 min: approved
    rig.advance(Duration::minutes(1));
    engine.tick(&snapshot);
    assert_eq!(engine.state(), EnergyState::ExportPriority);
    let approved = engine
        .event_log()
        .entries()
        .iter()
        .any(|e| e.event_type == EventType::Debounce && e.message.contains("approved"));
    assert!(approved);
}

#[test]
fn scenario_hysteresis_retains_export_priority() {
    let rig = Rig::midday();
    let mut engine = rig.engine();

    // 350 W is under the 500 W entry threshold but above the 300 W stay
    // threshold; nothing may move
    engine.tick(&TelemetrySnapshot {
        daily_export_wh: 10_000.0,
        grid_power_w: -200,
        generation_w: 350,
        battery_soc_pct: 70.0,
        battery_power_w: 80,
        inverter_mode: 3,
        enabled: true,
    });
    assert_eq!(engine.state(), EnergyState::ExportPriority);
    assert!(!has_entry(&engine, EventType::Debounce, EventPriority::Normal));

    // Generation and charge drop below the stay thresholds: the exit is
    // requested, then approved after the debounce hold
    let fading = TelemetrySnapshot {
        daily_export_wh: 10_000.0,
        grid_power_w: -100,
        generation_w: 250,
        battery_soc_pct: 70.0,
        battery_power_w: 30,
        inverter_mode: 3,
        enabled: true,
    };
    rig.advance(Duration::seconds(30));
    engine.tick(&fading);
    assert_eq!(engine.state(), EnergyState::ExportPriority);

    rig.advance(Duration::minutes(5));
    engine.tick(&fading);
    assert_eq!(engine.state(), EnergyState::SelfConsume);
}

#[test]
fn scenario_stale_generation_sensor_holds_state() {
    let rig = Rig::midday();
    let mut engine = rig.engine();

    let record = engine.tick(&TelemetrySnapshot {
        daily_export_wh: 10_000.0,
        grid_power_w: -3500,
        generation_w: 100,
        battery_soc_pct: 70.0,
        battery_power_w: 500,
        inverter_mode: 3,
        enabled: true,
    });

    assert_eq!(engine.state(), EnergyState::ExportPriority);
    assert!(has_entry(&engine, EventType::DataProtection, EventPriority::High));
    // The meter, not the stuck sensor, is what the status reports against
    assert_eq!(record.status.excess_generation, 3500);
}

#[test]
fn scenario_load_management_drives_hws() {
    let rig = Rig::midday();
    rig.seed_state(EnergyState::BatteryStorage);
    let mut engine = rig.engine();

    // Battery full, strong excess, HWS last off well over 30 minutes ago
    let record = engine.tick(&TelemetrySnapshot {
        daily_export_wh: 24_000.0,
        grid_power_w: -2600,
        generation_w: 4000,
        battery_soc_pct: 99.0,
        battery_power_w: 0,
        inverter_mode: 3,
        enabled: true,
    });

    assert_eq!(engine.state(), EnergyState::LoadManagement);
    assert!(record.actions.enable_hws);
    assert!(engine.hws_on());
    let turned_on = engine
        .event_log()
        .entries()
        .iter()
        .any(|e| e.event_type == EventType::HwsEvent && e.message.contains("TURNED_ON"));
    assert!(turned_on);

    // Generation collapses: load drops, state returns to storage
    rig.advance(Duration::seconds(30));
    let record = engine.tick(&TelemetrySnapshot {
        daily_export_wh: 24_000.0,
        grid_power_w: -100,
        generation_w: 800,
        battery_soc_pct: 99.0,
        battery_power_w: 0,
        inverter_mode: 3,
        enabled: true,
    });

    assert_eq!(engine.state(), EnergyState::BatteryStorage);
    assert!(!record.actions.enable_hws);
    assert!(!engine.hws_on());
    let turned_off = engine
        .event_log()
        .entries()
        .iter()
        .any(|e| e.event_type == EventType::HwsEvent && e.message.contains("TURNED_OFF"));
    assert!(turned_off);
}

#[test]
fn hws_cooldown_blocks_quick_restart() {
    let rig = Rig::midday();
    rig.seed_state(EnergyState::BatteryStorage);
    let mut engine = rig.engine();

    let strong = TelemetrySnapshot {
        daily_export_wh: 24_000.0,
        grid_power_w: -2600,
        generation_w: 4000,
        battery_soc_pct: 99.0,
        battery_power_w: 0,
        inverter_mode: 3,
        enabled: true,
    };
    let weak = TelemetrySnapshot {
        generation_w: 800,
        grid_power_w: -100,
        ..strong.clone()
    };

    engine.tick(&strong);
    assert!(engine.hws_on());

    rig.advance(Duration::minutes(1));
    engine.tick(&weak); // element off, cooldown starts
    assert!(!engine.hws_on());

    // Excess returns ten minutes later: cooldown must still hold it off
    rig.advance(Duration::minutes(10));
    let record = engine.tick(&strong);
    assert!(!record.actions.enable_hws);

    // Past the 30-minute cooldown it may engage again
    rig.advance(Duration::minutes(25));
    let record = engine.tick(&strong);
    assert!(record.actions.enable_hws);
}

#[test]
fn enable_hws_implies_load_management() {
    let rig = Rig::midday();
    rig.seed_state(EnergyState::BatteryStorage);
    let mut engine = rig.engine();

    let mut soc: f32 = 60.0;
    let mut records = Vec::new();
    for i in 0..20 {
        soc = (soc + 5.0).min(99.0);
        let record = engine.tick(&TelemetrySnapshot {
            daily_export_wh: 24_000.0,
            grid_power_w: -2600,
            generation_w: 4000,
            battery_soc_pct: soc,
            battery_power_w: if soc < 99.0 { 1500 } else { 0 },
            inverter_mode: 3,
            enabled: true,
        });
        records.push(record);
        rig.advance(Duration::seconds(30 + i));
    }

    for record in &records {
        if record.actions.enable_hws {
            assert_eq!(record.current_state, "LOAD_MANAGEMENT");
        }
        // Reported SOC stays clamped
        assert!((0.0..=100.0).contains(&record.status.battery_soc));
    }
}
