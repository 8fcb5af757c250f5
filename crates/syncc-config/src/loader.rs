// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, SynccConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Configuration file name searched for on disk
pub const CONFIG_FILE_NAME: &str = "syncc_configuration.toml";

/// Find the configuration file
///
/// Search order:
/// 1. `SYNCC_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("SYNCC_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by SYNCC_CONFIG_PATH not found: {}",
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

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet SYNCC_CONFIG_PATH environment variable to specify custom location.",
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
/// Returns error if config file is not found or contains invalid TOML.
/// Validation is a separate step, see [`crate::validate_config`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<SynccConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: SynccConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `SYNCC_NETWORK_PROFILE` -> `network.profile`
/// - `SYNCC_MASTER_ADDRESS` -> master address of the selected profile
/// - `SYNCC_SLAVE_ADDRESS` -> slave address of the selected profile
/// - `SYNCC_MASTER_PORT` -> `network.master_port`
/// - `SYNCC_SLAVE_PORT` -> `network.slave_port`
/// - `SYNCC_CONTROL_REPLY_MS` -> `timeouts.control_reply_ms`
/// - `SYNCC_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut SynccConfig) {
    let overrides: HashMap<String, String> = [
        ("SYNCC_NETWORK_PROFILE", "network_profile"),
        ("SYNCC_MASTER_ADDRESS", "master_address"),
        ("SYNCC_SLAVE_ADDRESS", "slave_address"),
        ("SYNCC_MASTER_PORT", "master_port"),
        ("SYNCC_SLAVE_PORT", "slave_port"),
        ("SYNCC_CONTROL_REPLY_MS", "control_reply_ms"),
        ("SYNCC_LOG_LEVEL", "log_level"),
    ]
    .iter()
    .filter_map(|(var, key)| env::var(var).ok().map(|value| (key.to_string(), value)))
    .collect();

    apply_cli_overrides(config, &overrides);
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - Map of overrides, e.g. `{"master_address": "10.0.0.2", "master_port": "50020"}`
///
/// The profile is switched before addresses are applied, so an address
/// override always lands in the profile that ends up selected.
pub fn apply_cli_overrides(config: &mut SynccConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("network_profile") {
        config.network.profile = value.clone();
    }

    let profile_name = config.network.profile.clone();
    if let Some(value) = cli_args.get("master_address") {
        config
            .network
            .profiles
            .entry(profile_name.clone())
            .or_default()
            .master = value.clone();
    }
    if let Some(value) = cli_args.get("slave_address") {
        config
            .network
            .profiles
            .entry(profile_name)
            .or_default()
            .slave = value.clone();
    }

    if let Some(port) = parse_override(cli_args, "master_port") {
        config.network.master_port = port;
    }
    if let Some(port) = parse_override(cli_args, "slave_port") {
        config.network.slave_port = port;
    }
    if let Some(ms) = parse_override(cli_args, "control_reply_ms") {
        config.timeouts.control_reply_ms = ms;
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    if let Some(value) = cli_args.get("debug_mode") {
        config.procedure.debug_mode = value.to_lowercase() == "true" || value == "1";
    }
    if let Some(stage) = parse_override(cli_args, "start_stage") {
        config.procedure.start_stage = stage;
    }
}

/// Typed override value; an unparseable value is reported and ignored
fn parse_override<T: FromStr>(cli_args: &HashMap<String, String>, key: &str) -> Option<T> {
    let value = cli_args.get(key)?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(
                "[CONFIG] Ignoring override {}='{}': not a valid {}",
                key,
                value,
                std::any::type_name::<T>()
            );
            None
        }
    }
}
