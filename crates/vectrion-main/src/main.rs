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

mod adapters;
mod config;
mod runner;
mod version;

use anyhow::Result;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use vectrion_core::{Clock, Engine, PersistentStore};

use adapters::{FileCommandSink, FileTelemetrySource};

fn main() -> Result<()> {
    // Handle command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut once = false;
    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" => {
                println!("VectrION - Residential Export Trajectory Controller");
                println!("Version: {}", version::VERSION);
                println!();
                println!("Usage: vectrion [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help    Print this help message");
                println!("  -v, --version Print version");
                println!("      --once    Run a single tick and exit");
                return Ok(());
            }
            "--version" | "-v" => {
                println!("{}", version::VERSION);
                return Ok(());
            }
            "--once" => {
                once = true;
            }
            other => {
                eprintln!("Unknown option: {other} (see --help)");
                std::process::exit(2);
            }
        }
    }

    // Initialize tracing with env filter support
    // Respects RUST_LOG environment variable
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let app_config = config::load_config()?;
    app_config.validate()?;

    info!("🚀 Starting VectrION {}", version::VERSION);
    info!("📋 Configuration Summary:");
    info!(
        "   Battery SOC: {}%-{}%",
        app_config.control.min_soc_threshold, app_config.control.max_soc_threshold
    );
    info!(
        "   Export thresholds: enter {} W / stay {} W",
        app_config.control.min_generation_for_export_w,
        app_config.control.min_generation_to_stay_export_w
    );
    info!(
        "   HWS: {} W element, {} min cooldown",
        app_config.control.hws_power_rating_w, app_config.control.hws_cooldown_period_min
    );
    info!(
        "   Debounce: {} min; night window {}-{}h local (UTC{:+})",
        app_config.control.state_change_debounce_time_min,
        app_config.control.night_start_hour,
        app_config.control.night_end_hour,
        app_config.control.local_offset_hours
    );
    info!("   Update interval: {}s", app_config.control.update_interval_secs);
    info!("   Data directory: {}", app_config.system.data_dir);

    let store = PersistentStore::open(&app_config.system.data_dir)?;
    let clock = Clock::system(app_config.control.local_offset_hours)?;

    let source = FileTelemetrySource::new(&app_config.system.telemetry_path);
    let sink = FileCommandSink::new(&app_config.system.command_path);

    let interval = Duration::from_secs(app_config.control.update_interval_secs);
    let mut engine = Engine::new(app_config.control, store, clock)?;
    info!("✅ Engine recovered; starting in {}", engine.state());

    runner::run_loop(&mut engine, &source, &sink, interval, once)
}
