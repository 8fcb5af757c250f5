//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-syncc-pupil`, `--debug-syncc-transports`, etc.
//! to raise a single crate to debug level.

use std::collections::HashMap;
use std::env;

use crate::{crate_target, KNOWN_CRATES};

/// Per-crate debug flags
///
/// # Example
/// ```rust
/// use syncc_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-syncc-pupil".to_string()]);
/// assert!(flags.is_enabled("syncc-pupil"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CrateDebugFlags {
    pub enabled_crates: HashMap<String, bool>,
}

impl CrateDebugFlags {
    /// Parse debug flags from command-line arguments
    ///
    /// Looks for arguments matching `--debug-{crate-name}` pattern.
    /// Also supports `--debug-all` to enable all crates.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = CrateDebugFlags::default();

        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
                continue;
            }
            if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enable(crate_name);
            }
        }

        flags
    }

    pub fn enable(&mut self, crate_name: &str) {
        self.enabled_crates.insert(crate_name.to_string(), true);
    }

    pub fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enable(crate_name);
        }
    }

    /// Check if debug is enabled for a specific crate
    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains_key(crate_name)
    }

    /// Check if debug is enabled for any crate
    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// Create an `EnvFilter` directive string from the flags
    ///
    /// Format: `"syncc_pupil=debug,info"`, or just the base level if none enabled.
    pub fn to_filter_string(&self, base_level: &str) -> String {
        let mut crates: Vec<&String> = self.enabled_crates.keys().collect();
        crates.sort();

        let mut filters: Vec<String> = crates
            .into_iter()
            .map(|name| format!("{}=debug", crate_target(name)))
            .collect();
        filters.push(base_level.to_string());
        filters.join(",")
    }
}

/// Parse debug flags from the process arguments and `SYNCC_DEBUG`
///
/// `SYNCC_DEBUG` is a comma-separated list of crate names, or `all`.
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());

    if let Ok(env_var) = env::var("SYNCC_DEBUG") {
        if env_var == "all" {
            flags.enable_all();
        } else {
            env_var
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .for_each(|name| flags.enable(name));
        }
    }

    flags
}

/// Generate help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  SYNCC_DEBUG={{crate-name}}[,{{crate-name}}]  Enable debug for crates (comma-separated)
  SYNCC_DEBUG=all                               Enable debug for all crates
"#,
        KNOWN_CRATES.join(", ")
    )
}
