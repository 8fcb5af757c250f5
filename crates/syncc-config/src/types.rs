// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `syncc_configuration.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::{ConfigError, ConfigResult};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SynccConfig {
    pub network: NetworkConfig,
    pub plugins: PluginsConfig,
    pub timeouts: TimeoutsConfig,
    pub calibration: CalibrationConfig,
    pub clock: ClockConfig,
    pub procedure: ProcedureConfig,
    pub logging: LoggingConfig,
}

impl SynccConfig {
    /// Resolve the (master, slave) endpoints from the selected network profile
    pub fn endpoints(&self) -> ConfigResult<(Endpoint, Endpoint)> {
        let profile = self.network.active_profile()?;
        Ok((
            Endpoint::new(Role::Master, profile.master.clone(), self.network.master_port),
            Endpoint::new(Role::Slave, profile.slave.clone(), self.network.slave_port),
        ))
    }

    /// Plugins to start on the host with the given role
    pub fn plugins_for(&self, role: Role) -> &[PluginSpec] {
        match role {
            Role::Master => &self.plugins.master,
            Role::Slave => &self.plugins.slave,
        }
    }
}

/// Which capture host an endpoint refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Supplies the authoritative clock for annotation timestamps
    Master,
    Slave,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Master => "master",
            Role::Slave => "slave",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "master" => Ok(Role::Master),
            "slave" => Ok(Role::Slave),
            other => Err(ConfigError::ValidationError(format!(
                "role must be 'master' or 'slave', got '{}'",
                other
            ))),
        }
    }
}

/// One remote capture host. Immutable once resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub role: Role,
    pub address: String,
    /// Control (request/reply) port
    pub port: u16,
}

impl Endpoint {
    pub fn new(role: Role, address: impl Into<String>, port: u16) -> Self {
        Self {
            role,
            address: address.into(),
            port,
        }
    }

    /// ZMQ address of the control channel
    pub fn control_address(&self) -> String {
        self.tcp_address(self.port)
    }

    /// ZMQ address for another port on the same host
    pub fn tcp_address(&self, port: u16) -> String {
        format!("tcp://{}:{}", self.address, port)
    }
}

/// Capture host addressing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Name of the entry in `profiles` to use
    pub profile: String,
    pub master_port: u16,
    pub slave_port: u16,
    pub profiles: BTreeMap<String, NetworkProfile>,
}

impl NetworkConfig {
    pub fn active_profile(&self) -> ConfigResult<&NetworkProfile> {
        self.profiles
            .get(&self.profile)
            .ok_or_else(|| ConfigError::UnknownProfile(self.profile.clone()))
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(
            "hotspot_msi".to_string(),
            NetworkProfile {
                master: "127.0.0.1".to_string(),
                slave: "192.168.137.100".to_string(),
            },
        );
        Self {
            profile: "hotspot_msi".to_string(),
            master_port: 50020,
            slave_port: 50020,
            profiles,
        }
    }
}

/// A named (master, slave) address pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkProfile {
    pub master: String,
    pub slave: String,
}

/// A plugin argument value. Capture hosts accept strings and floats.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PluginArg {
    Float(f64),
    Text(String),
}

impl From<f64> for PluginArg {
    fn from(value: f64) -> Self {
        PluginArg::Float(value)
    }
}

impl From<&str> for PluginArg {
    fn from(value: &str) -> Self {
        PluginArg::Text(value.to_string())
    }
}

/// A plugin to start on a capture host during session setup
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PluginSpec {
    pub name: String,
    #[serde(default)]
    pub args: BTreeMap<String, PluginArg>,
}

impl PluginSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: BTreeMap::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<PluginArg>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

/// Plugins started on each host, in order
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PluginsConfig {
    pub master: Vec<PluginSpec>,
    pub slave: Vec<PluginSpec>,
}

impl PluginsConfig {
    fn defaults_for(base_bias: f64, node_name: &str, group_member: &str) -> Vec<PluginSpec> {
        vec![
            PluginSpec::new("Annotation_Capture"),
            PluginSpec::new("Time_Sync")
                .with_arg("base_bias", base_bias)
                .with_arg("node_name", node_name),
            PluginSpec::new("Log_History"),
            PluginSpec::new("Pupil_Groups")
                .with_arg("name", group_member)
                .with_arg("active_group", "ET_exp"),
        ]
    }
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            master: Self::defaults_for(1.1, "sync_master", "master_pupil"),
            slave: Self::defaults_for(1.0, "sync_slave", "slave_pupil"),
        }
    }
}

/// Network timeouts in milliseconds (0 = block forever)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub probe_ms: u64,
    pub control_reply_ms: u64,
    pub publish_ms: u64,
    pub telemetry_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            probe_ms: 2000,
            control_reply_ms: 10_000,
            publish_ms: 1000,
            telemetry_ms: 0,
        }
    }
}

/// Calibration acceptance thresholds, degrees of visual angle
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub max_accuracy: f64,
    pub max_precision: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            max_accuracy: 0.5,
            max_precision: 0.1,
        }
    }
}

/// Remote clock handling
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Value sent with the `T` command to both hosts during setup
    pub sync_offset: f64,
}

/// Procedure sequencing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcedureConfig {
    /// Stimulus segment names, each bracketed by start_/stop_ annotations
    pub segments: Vec<String>,
    pub shuffle_segments: bool,
    /// Skip calibration against the capture hosts
    pub debug_mode: bool,
    /// 2 = calibration, 3 = stimuli, 4 = free conversation
    pub start_stage: u8,
    /// Number of free conversations in stage 4
    pub free_conversations: usize,
    /// Countdown shown before each free conversation, seconds
    pub free_conversation_countdown_s: u64,
    /// Length of each free conversation, seconds
    pub free_conversation_length_s: u64,
}

impl Default for ProcedureConfig {
    fn default() -> Self {
        Self {
            segments: vec!["m1".to_string(), "m2".to_string(), "m3".to_string()],
            shuffle_segments: true,
            debug_mode: false,
            start_stage: 2,
            free_conversations: 2,
            free_conversation_countdown_s: 30,
            free_conversation_length_s: 180,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_dir: PathBuf,
    pub retention_days: u64,
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("./logs"),
            retention_days: 30,
            retention_runs: 10,
        }
    }
}
