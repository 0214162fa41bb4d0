// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later ones winning:
//! 1. TOML file (base values)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, SynkConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "synk_configuration.toml";

/// Find the Synk configuration file
///
/// Search order:
/// 1. `SYNK_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Parent directories, up to 5 levels
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("SYNK_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by SYNK_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Synk configuration file '{}' not found in any of these locations:\n{}\n\nSet SYNK_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found, contains invalid TOML, or an
/// override carries an unparsable number
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<SynkConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: SynkConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config)?;
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    Ok(config)
}

fn parse_f64(key: &str, value: &str) -> ConfigResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidValue(format!("{} = '{}' is not a number", key, value)))
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `SYNK_DT` -> `simulation.dt`
/// - `SYNK_TSTOP` -> `simulation.tstop`
/// - `SYNK_BACKEND` -> `backend.kind`
/// - `SYNK_ACCUMULATION` -> `backend.accumulation`
/// - `SYNK_EVENT_MODE` -> `events.mode`
/// - `SYNK_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut SynkConfig) -> ConfigResult<()> {
    if let Ok(value) = env::var("SYNK_DT") {
        config.simulation.dt = parse_f64("SYNK_DT", &value)?;
    }
    if let Ok(value) = env::var("SYNK_TSTOP") {
        config.simulation.tstop = parse_f64("SYNK_TSTOP", &value)?;
    }
    if let Ok(value) = env::var("SYNK_BACKEND") {
        config.backend.kind = value;
    }
    if let Ok(value) = env::var("SYNK_ACCUMULATION") {
        config.backend.accumulation = value;
    }
    if let Ok(value) = env::var("SYNK_EVENT_MODE") {
        config.events.mode = value;
    }
    if let Ok(value) = env::var("SYNK_LOG_LEVEL") {
        config.logging.level = value;
    }
    Ok(())
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"dt": "0.01", "backend": "host"}`)
pub fn apply_cli_overrides(
    config: &mut SynkConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    if let Some(value) = cli_args.get("dt") {
        config.simulation.dt = parse_f64("dt", value)?;
    }
    if let Some(value) = cli_args.get("tstop") {
        config.simulation.tstop = parse_f64("tstop", value)?;
    }
    if let Some(value) = cli_args.get("backend") {
        config.backend.kind = value.clone();
    }
    if let Some(value) = cli_args.get("accumulation") {
        config.backend.accumulation = value.clone();
    }
    if let Some(value) = cli_args.get("event_mode") {
        config.events.mode = value.clone();
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    Ok(())
}
