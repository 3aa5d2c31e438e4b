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

//! Fixed-interval tick loop.
//!
//! The engine itself is a pure tick; this loop is the scheduler around
//! it. Ticks never overlap because the loop is strictly serial, and a
//! failed fetch skips the tick rather than feeding the engine stale
//! garbage.

use anyhow::Result;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use vectrion_core::{CommandSink, Engine, TelemetrySource};

pub fn run_loop(
    engine: &mut Engine,
    source: &dyn TelemetrySource,
    sink: &dyn CommandSink,
    interval: Duration,
    once: bool,
) -> Result<()> {
    info!(
        "Tick loop running every {:.0} s (source: {}, sink: {})",
        interval.as_secs_f32(),
        source.name(),
        sink.name()
    );

    loop {
        match source.fetch() {
            Ok(snapshot) => {
                let record = engine.tick(&snapshot);
                debug!(
                    "Tick complete: {} ({})",
                    record.current_state, record.debug.state_reason
                );
                if let Err(e) = sink.deliver(&record) {
                    warn!("Failed to publish command record: {e:#}");
                }
            }
            Err(e) => {
                warn!("Telemetry unavailable, skipping tick: {e:#}");
            }
        }

        if once {
            return Ok(());
        }
        thread::sleep(interval);
    }
}
