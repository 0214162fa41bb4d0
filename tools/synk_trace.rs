// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Trace one AMPA instance through a fixed-step run.
//!
//! Prints `t Ron Roff g i` for instance 0 after every step, as text columns
//! or JSON lines (`--json`).

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use synk::config::{
    apply_cli_overrides, apply_environment_overrides, load_config, ConfigError, SynkConfig,
};
use synk::mechanism::models::ampa::slot;
use synk::mechanism::InstanceId;
use synk::observability::{debug_flags_help, init_logging, parse_debug_flags};
use synk::AmpaNetworkBuilder;

/// Trace instance 0 of an AMPA population through a fixed-step run.
///
/// Without --config the configuration file is searched for as usual and
/// defaults are used when none exists.
#[derive(Parser, Debug)]
#[command(name = "synk_trace", version, after_help = debug_flags_help())]
struct Args {
    /// Configuration file (synk_configuration.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of instances in the population
    #[arg(long, default_value_t = 1)]
    instances: usize,

    /// Spike time (ms) delivered to instance 0; repeatable
    #[arg(long = "spike")]
    spikes: Vec<f64>,

    /// Print JSON lines instead of text columns
    #[arg(long)]
    json: bool,

    /// Write rolling log files under this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Time step (ms)
    #[arg(long)]
    dt: Option<f64>,

    /// Stop time (ms)
    #[arg(long)]
    tstop: Option<f64>,

    /// host, accelerator or auto
    #[arg(long)]
    backend: Option<String>,

    /// auto, atomic or shadow
    #[arg(long)]
    accumulation: Option<String>,

    /// buffered or immediate
    #[arg(long)]
    event_mode: Option<String>,

    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    /// Overrides in the key form `apply_cli_overrides` reads
    fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        let numbers = [("dt", self.dt), ("tstop", self.tstop)];
        for (key, value) in numbers {
            if let Some(value) = value {
                overrides.insert(key.to_string(), value.to_string());
            }
        }
        let strings = [
            ("backend", &self.backend),
            ("accumulation", &self.accumulation),
            ("event_mode", &self.event_mode),
            ("log_level", &self.log_level),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                overrides.insert(key.to_string(), value.clone());
            }
        }
        overrides
    }
}

fn resolve_config(args: &Args) -> Result<SynkConfig> {
    let overrides = args.overrides();
    match load_config(args.config.as_deref(), Some(&overrides)) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) if args.config.is_none() => {
            let mut config = SynkConfig::default();
            apply_environment_overrides(&mut config)?;
            apply_cli_overrides(&mut config, &overrides)?;
            Ok(config)
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Serialize)]
struct TraceRow {
    t: f64,
    ron: f64,
    roff: f64,
    g: f64,
    i: f64,
}

fn main() -> Result<()> {
    // --debug-<crate> flags are read by parse_debug_flags
    let args = Args::parse_from(env::args().filter(|arg| !arg.starts_with("--debug-")));
    let config = resolve_config(&args).context("Failed to load configuration")?;

    let _guard = init_logging(
        &parse_debug_flags(),
        &config.logging.level,
        args.log_dir.clone(),
        None,
    )?;

    let mut network = AmpaNetworkBuilder::new(config)
        .instances(args.instances)
        .build()?;
    for &t in &args.spikes {
        network.spike(0, t)?;
    }

    let tstop = network.tstop;
    let sim = &mut network.simulation;
    let dt = sim.kernel().dt();
    let instance = InstanceId(0);

    if !args.json {
        println!("t\tRon\tRoff\tg\ti");
    }
    while sim.t() < tstop - 0.5 * dt {
        sim.step()?;
        let kernel = sim.kernel();
        let row = TraceRow {
            t: sim.t(),
            ron: kernel.state(instance, slot::RON)?,
            roff: kernel.state(instance, slot::ROFF)?,
            g: kernel.state(instance, slot::G)?,
            i: kernel.state(instance, slot::I)?,
        };
        if args.json {
            println!("{}", serde_json::to_string(&row)?);
        } else {
            println!(
                "{:.4}\t{:.6}\t{:.6}\t{:.6}\t{:.6}",
                row.t, row.ron, row.roff, row.g, row.i
            );
        }
    }

    let stats = sim.kernel().stats();
    info!(
        target: "synk-trace",
        "Done after {} steps: {} events delivered, {} stale, stats={}",
        stats.steps,
        stats.events_delivered,
        stats.stale_events,
        serde_json::to_string(&stats)?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_spikes_and_overrides() {
        let args = Args::try_parse_from([
            "synk_trace",
            "--spike",
            "0.5",
            "--spike",
            "1.25",
            "--dt",
            "0.01",
            "--event-mode",
            "immediate",
        ])
        .unwrap();
        assert_eq!(args.spikes, vec![0.5, 1.25]);
        assert_eq!(args.instances, 1);

        let overrides = args.overrides();
        assert_eq!(overrides.get("dt").map(String::as_str), Some("0.01"));
        assert_eq!(overrides.get("event_mode").map(String::as_str), Some("immediate"));
        assert!(!overrides.contains_key("tstop"));
    }

    #[test]
    fn test_bad_number_is_typed_error() {
        let err = Args::try_parse_from(["synk_trace", "--spike", "soon"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
