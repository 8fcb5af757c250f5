// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # syncc configuration
//!
//! Type-safe configuration for the two-host eye-tracking procedure:
//! - TOML file parsing (`syncc_configuration.toml`)
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! ## Usage
//!
//! ```rust,no_run
//! use syncc_config::{load_config, validate_config};
//!
//! let config = load_config(None, None).expect("Failed to load config");
//! validate_config(&config).expect("Invalid config");
//!
//! let (master, slave) = config.endpoints().expect("Unknown network profile");
//! println!("Master capture host: {}:{}", master.address, master.port);
//! println!("Slave capture host: {}:{}", slave.address, slave.port);
//! ```
//!
//! The configuration is built once at process start and passed by reference
//! into the transport and session layers; nothing reads it from globals.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{apply_cli_overrides, apply_environment_overrides, find_config_file, load_config};
pub use types::*;
pub use validation::{validate_config, ConfigValidationError};

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Unknown network profile: {0}")]
    UnknownProfile(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
