// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Checks value ranges and enumerated strings before the umbrella crate turns
//! a configuration into kernel types.

use crate::{ConfigError, ConfigResult, SynkConfig};

const BACKEND_KINDS: [&str; 5] = ["host", "cpu", "accelerator", "parallel", "auto"];
const ACCUMULATION_KINDS: [&str; 3] = ["auto", "atomic", "shadow"];
const EVENT_MODES: [&str; 2] = ["buffered", "immediate"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    NonPositive { field: String, value: f64 },
    NonFinite { field: String, value: f64 },
    UnknownVariant { field: String, value: String, expected: &'static [&'static str] },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositive { field, value } => {
                write!(f, "{} = {} must be positive", field, value)
            }
            Self::NonFinite { field, value } => {
                write!(f, "{} = {} must be finite", field, value)
            }
            Self::UnknownVariant {
                field,
                value,
                expected,
            } => {
                write!(
                    f,
                    "{} = '{}' is not one of: {}",
                    field,
                    value,
                    expected.join(", ")
                )
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// All violations are collected and reported together.
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation
pub fn validate_config(config: &SynkConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_simulation(config, &mut errors);
    validate_rates(config, &mut errors);
    validate_variants(config, &mut errors);
    validate_capacities(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn require_positive(field: &str, value: f64, errors: &mut Vec<ConfigValidationError>) {
    if !value.is_finite() {
        errors.push(ConfigValidationError::NonFinite {
            field: field.to_string(),
            value,
        });
    } else if value <= 0.0 {
        errors.push(ConfigValidationError::NonPositive {
            field: field.to_string(),
            value,
        });
    }
}

fn require_finite(field: &str, value: f64, errors: &mut Vec<ConfigValidationError>) {
    if !value.is_finite() {
        errors.push(ConfigValidationError::NonFinite {
            field: field.to_string(),
            value,
        });
    }
}

fn validate_simulation(config: &SynkConfig, errors: &mut Vec<ConfigValidationError>) {
    require_positive("simulation.dt", config.simulation.dt, errors);
    require_finite("simulation.celsius", config.simulation.celsius, errors);
    if !config.simulation.tstop.is_finite() || config.simulation.tstop < 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "simulation.tstop".to_string(),
            reason: format!("{} must be finite and non-negative", config.simulation.tstop),
        });
    }
}

fn validate_rates(config: &SynkConfig, errors: &mut Vec<ConfigValidationError>) {
    let ampa = &config.ampa;
    require_finite("ampa.alpha", ampa.alpha, errors);
    require_finite("ampa.beta", ampa.beta, errors);
    if ampa.alpha < 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "ampa.alpha".to_string(),
            reason: format!("{} must not be negative", ampa.alpha),
        });
    }
    // Beta alone drives the Roff decay and the release relaxation
    require_positive("ampa.beta", ampa.beta, errors);
    require_positive("ampa.cdur", ampa.cdur, errors);
    require_finite("ampa.erev", ampa.erev, errors);
    require_finite("ampa.ron0", ampa.ron0, errors);
    require_finite("ampa.roff0", ampa.roff0, errors);
}

fn check_variant(
    field: &str,
    value: &str,
    expected: &'static [&'static str],
    errors: &mut Vec<ConfigValidationError>,
) {
    if !expected.contains(&value.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::UnknownVariant {
            field: field.to_string(),
            value: value.to_string(),
            expected,
        });
    }
}

fn validate_variants(config: &SynkConfig, errors: &mut Vec<ConfigValidationError>) {
    check_variant("backend.kind", &config.backend.kind, &BACKEND_KINDS, errors);
    check_variant(
        "backend.accumulation",
        &config.backend.accumulation,
        &ACCUMULATION_KINDS,
        errors,
    );
    check_variant("events.mode", &config.events.mode, &EVENT_MODES, errors);
}

fn validate_capacities(config: &SynkConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.events.receive_capacity == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "events.receive_capacity".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if config.events.send_capacity == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "events.send_capacity".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if config.backend.accelerator_instance_threshold == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "backend.accelerator_instance_threshold".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&SynkConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_violation() {
        let mut config = SynkConfig::default();
        config.simulation.dt = 0.0;
        config.ampa.beta = -0.18;
        config.backend.kind = "gpu".to_string();
        config.events.send_capacity = 0;

        let err = validate_config(&config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("simulation.dt"));
        assert!(message.contains("ampa.beta"));
        assert!(message.contains("backend.kind = 'gpu'"));
        assert!(message.contains("events.send_capacity"));
    }

    #[test]
    fn test_variants_are_case_insensitive() {
        let mut config = SynkConfig::default();
        config.backend.kind = "Accelerator".to_string();
        config.backend.accumulation = "SHADOW".to_string();
        config.events.mode = "Immediate".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_nan_rate_rejected() {
        let mut config = SynkConfig::default();
        config.ampa.alpha = f64::NAN;
        let mut errors = Vec::new();
        validate_rates(&config, &mut errors);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigValidationError::NonFinite { field, .. } if field == "ampa.alpha")));
    }

    #[test]
    fn test_zero_alpha_allowed() {
        let mut config = SynkConfig::default();
        config.ampa.alpha = 0.0;
        assert!(validate_config(&config).is_ok());
    }
}
