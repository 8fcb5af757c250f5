// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Ensures configuration values are consistent and within valid ranges
//! before any capture host is contacted.

use crate::{ConfigError, ConfigResult, SynccConfig};

/// Largest timeout accepted in `[timeouts]`
pub const MAX_TIMEOUT_MS: u64 = i32::MAX as u64;

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    UnknownProfile { profile: String },
    MissingRequired { field: String },
    InvalidPort { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownProfile { profile } => {
                write!(f, "network.profile '{}' has no entry in network.profiles", profile)
            }
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidPort { field } => write!(f, "Port {} must be non-zero", field),
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &SynccConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_network(config, &mut errors);
    validate_plugins(config, &mut errors);
    validate_value_ranges(config, &mut errors);

    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

fn validate_network(config: &SynccConfig, errors: &mut Vec<ConfigValidationError>) {
    match config.network.profiles.get(&config.network.profile) {
        None => errors.push(ConfigValidationError::UnknownProfile {
            profile: config.network.profile.clone(),
        }),
        Some(profile) => {
            if profile.master.is_empty() {
                errors.push(ConfigValidationError::MissingRequired {
                    field: format!("network.profiles.{}.master", config.network.profile),
                });
            }
            if profile.slave.is_empty() {
                errors.push(ConfigValidationError::MissingRequired {
                    field: format!("network.profiles.{}.slave", config.network.profile),
                });
            }
        }
    }

    if config.network.master_port == 0 {
        errors.push(ConfigValidationError::InvalidPort {
            field: "network.master_port".to_string(),
        });
    }
    if config.network.slave_port == 0 {
        errors.push(ConfigValidationError::InvalidPort {
            field: "network.slave_port".to_string(),
        });
    }
}

fn validate_plugins(config: &SynccConfig, errors: &mut Vec<ConfigValidationError>) {
    for (host, plugins) in [("master", &config.plugins.master), ("slave", &config.plugins.slave)] {
        for (index, plugin) in plugins.iter().enumerate() {
            if plugin.name.trim().is_empty() {
                errors.push(ConfigValidationError::MissingRequired {
                    field: format!("plugins.{}[{}].name", host, index),
                });
            }
        }
    }
}

fn validate_value_ranges(config: &SynccConfig, errors: &mut Vec<ConfigValidationError>) {
    if !(config.calibration.max_accuracy > 0.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "calibration.max_accuracy".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    if !(config.calibration.max_precision > 0.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "calibration.max_precision".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    // ZMQ takes timeouts as a C int of milliseconds
    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.probe_ms", timeouts.probe_ms),
        ("timeouts.control_reply_ms", timeouts.control_reply_ms),
        ("timeouts.publish_ms", timeouts.publish_ms),
        ("timeouts.telemetry_ms", timeouts.telemetry_ms),
    ] {
        if value > MAX_TIMEOUT_MS {
            errors.push(ConfigValidationError::InvalidValue {
                field: field.to_string(),
                reason: format!("{} ms exceeds the maximum of {} ms", value, MAX_TIMEOUT_MS),
            });
        }
    }
    if !(2..=4).contains(&config.procedure.start_stage) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "procedure.start_stage".to_string(),
            reason: "must be 2 (calibration), 3 (stimuli) or 4 (free conversation)".to_string(),
        });
    }
    if config.procedure.segments.iter().any(|s| s.trim().is_empty()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "procedure.segments".to_string(),
            reason: "segment names cannot be empty".to_string(),
        });
    }
}
