// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `synk_configuration.toml`.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SynkConfig {
    pub simulation: SimulationConfig,
    pub ampa: AmpaConfig,
    pub backend: BackendSection,
    pub events: EventsConfig,
    pub logging: LoggingConfig,
}

/// Fixed-step driver settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Step size in ms
    pub dt: f64,
    /// Stop time in ms
    pub tstop: f64,
    /// Temperature in degrees Celsius
    pub celsius: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 0.025,
            tstop: 5.0,
            celsius: 6.3,
        }
    }
}

/// AMPA synapse rate constants
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AmpaConfig {
    /// Forward binding rate (/ms)
    pub alpha: f64,
    /// Backward unbinding rate (/ms)
    pub beta: f64,
    /// Transmitter pulse duration (ms)
    pub cdur: f64,
    /// Reversal potential (mV)
    pub erev: f64,
    pub ron0: f64,
    pub roff0: f64,
}

impl Default for AmpaConfig {
    fn default() -> Self {
        Self {
            alpha: 0.94,
            beta: 0.18,
            cdur: 0.3,
            erev: 0.0,
            ron0: 0.0,
            roff0: 0.0,
        }
    }
}

/// Backend selection
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendSection {
    /// `host`, `accelerator` or `auto`
    pub kind: String,
    pub accelerator_instance_threshold: usize,
    /// `auto`, `atomic` or `shadow`
    pub accumulation: String,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            kind: "auto".to_string(),
            accelerator_instance_threshold: 10_000,
            accumulation: "auto".to_string(),
        }
    }
}

/// Event delivery settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// `buffered` or `immediate`
    pub mode: String,
    pub receive_capacity: usize,
    pub send_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            mode: "buffered".to_string(),
            receive_capacity: 64,
            send_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Record the voltage and conductance used by each instance
    pub record_cell_state: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            record_cell_state: false,
        }
    }
}
