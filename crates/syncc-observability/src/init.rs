// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization
//!
//! Console output for the operator, plus JSON log files for the recorded run:
//! one combined file and one per known crate, inside a timestamped folder.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::crate_target;

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Keeps the non-blocking file writers alive; logs are flushed on drop
pub struct LoggingGuard {
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: PathBuf,
}

impl LoggingGuard {
    /// Get the log directory path of this run
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

/// Initialize logging with file output and console output
///
/// Creates a timestamped folder structure:
/// ```text
/// ./logs/
///   └── run_20250101_120000/
///       ├── syncc-pupil.log
///       ├── syncc-transports.log
///       └── syncc.log (combined)
/// ```
///
/// # Arguments
/// * `debug_flags` - Per-crate debug flags
/// * `base_level` - Level for everything not raised by a flag (e.g. `"info"`)
/// * `log_dir` - Base directory for logs
/// * `retention_days` - Keep logs for N days
/// * `retention_runs` - Keep N most recent runs
pub fn init_logging(
    debug_flags: &CrateDebugFlags,
    base_level: &str,
    log_dir: &Path,
    retention_days: u64,
    retention_runs: usize,
) -> Result<LoggingGuard> {
    let timestamp = Utc::now().format(RUN_TIMESTAMP_FORMAT);
    let run_folder = log_dir.join(format!("{}{}", RUN_PREFIX, timestamp));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

    cleanup_old_logs(log_dir, retention_days, retention_runs, Some(&run_folder))?;

    let filter = debug_flags.to_filter_string(base_level);

    let mut layers = Vec::new();
    let mut file_guards = Vec::new();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(EnvFilter::new(&filter));
    layers.push(console_layer.boxed());

    for crate_name in crate::KNOWN_CRATES {
        let file_appender = rolling::daily(&run_folder, format!("{}.log", crate_name));
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        file_guards.push(guard);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .with_filter(EnvFilter::new(format!("{}=debug", crate_target(crate_name))))
            .boxed();
        layers.push(file_layer);
    }

    let combined_appender = rolling::daily(&run_folder, "syncc.log");
    let (combined_non_blocking, combined_guard) = tracing_appender::non_blocking(combined_appender);
    file_guards.push(combined_guard);

    let combined_layer = tracing_subscriber::fmt::layer()
        .with_writer(combined_non_blocking)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(EnvFilter::new(&filter))
        .boxed();
    layers.push(combined_layer);

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(LoggingGuard {
        _file_guards: file_guards,
        log_dir: run_folder,
    })
}

/// Console-only logging, for short-lived subcommands
pub fn init_console_logging(debug_flags: &CrateDebugFlags, base_level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(debug_flags.to_filter_string(base_level)))
        .with_target(false)
        .finish()
        .try_init()
        .context("A global tracing subscriber is already installed")?;
    Ok(())
}

/// Remove run folders older than `retention_days`, then trim to the newest
/// `retention_runs`. `keep` is never removed.
pub fn cleanup_old_logs(
    base_log_dir: &Path,
    retention_days: u64,
    retention_runs: usize,
    keep: Option<&Path>,
) -> Result<()> {
    if !base_log_dir.exists() {
        return Ok(());
    }

    let cutoff_date = Utc::now() - chrono::Duration::days(retention_days as i64);

    let mut runs: Vec<(PathBuf, DateTime<Utc>)> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)? {
        let path = entry?.path();
        if !path.is_dir() || Some(path.as_path()) == keep {
            continue;
        }
        if let Some(dt) = parse_run_timestamp(&path) {
            runs.push((path, dt));
        }
    }

    // Oldest first
    runs.sort_by_key(|(_, dt)| *dt);

    let (expired, mut retained): (Vec<_>, Vec<_>) =
        runs.into_iter().partition(|(_, dt)| *dt < cutoff_date);

    // The current run counts towards the limit
    let limit = retention_runs.saturating_sub(usize::from(keep.is_some()));
    let overflow = retained.len().saturating_sub(limit);
    let mut to_remove = expired;
    to_remove.extend(retained.drain(..overflow));

    for (path, _) in to_remove {
        if let Err(e) = std::fs::remove_dir_all(&path) {
            eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            );
        }
    }

    Ok(())
}

fn parse_run_timestamp(path: &Path) -> Option<DateTime<Utc>> {
    let name = path.file_name()?.to_str()?;
    let stamp = name.strip_prefix(RUN_PREFIX)?;
    NaiveDateTime::parse_from_str(stamp, RUN_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
