// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # syncc-observability
//!
//! Logging setup shared by every syncc binary, with per-crate debug flag
//! support. Library crates only emit `tracing` events; the binary calls
//! [`init_logging`] once at startup.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known syncc crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "syncc-config",
    "syncc-transports",
    "syncc-pupil",
    "syncc-runner",
];

/// Tracing target for a crate name (`syncc-pupil` -> `syncc_pupil`)
pub fn crate_target(crate_name: &str) -> String {
    crate_name.replace('-', "_")
}
