// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

use syncc_config::{Role, SynccConfig};
use syncc_observability::{debug_flags_help, init_console_logging, init_logging, parse_debug_flags};
use syncc_pupil::{probe_endpoint, CalibrationDecision, Session};
use syncc_runner::{
    load_configuration, random_participant_id, session_name, Procedure, StdinOperator,
};

/// Publish channels connect in the background; anything sent before the
/// handshake completes is dropped by the socket
const PUBLISH_SETTLE: Duration = Duration::from_millis(500);

/// syncc - synchronized recording on two Pupil Capture hosts
#[derive(Parser, Debug)]
#[command(name = "syncc", version, author, long_about = None, after_help = debug_flags_help())]
struct Cli {
    /// Path to syncc_configuration.toml (searched for when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Network profile to use
    #[arg(long, global = true)]
    profile: Option<String>,

    #[arg(long, global = true)]
    master_address: Option<String>,

    #[arg(long, global = true)]
    slave_address: Option<String>,

    #[arg(long, global = true)]
    master_port: Option<u16>,

    #[arg(long, global = true)]
    slave_port: Option<u16>,

    /// Base log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Set up both hosts and run the experiment procedure
    Run {
        /// Participant id (random six digits when omitted)
        #[arg(long)]
        participant: Option<String>,

        /// First stage to run: 2 calibration, 3 stimuli, 4 free conversation
        #[arg(long)]
        start_stage: Option<u8>,

        /// Skip calibration against the hosts
        #[arg(long)]
        skip_calibration: bool,
    },

    /// Check that both hosts are reachable
    Check,

    /// Calibrate one host
    Calibrate {
        #[arg(long)]
        host: Role,
    },

    /// Annotate both recordings with the master clock
    Annotate { label: String },

    /// Start or stop recording on both hosts
    Record {
        #[command(subcommand)]
        action: RecordAction,
    },
}

#[derive(Subcommand, Debug)]
enum RecordAction {
    Start {
        /// Recording folder name (derived from the participant id when omitted)
        #[arg(long)]
        session_name: Option<String>,

        #[arg(long)]
        participant: Option<String>,
    },
    Stop,
}

impl Cli {
    /// Overrides in the key format of the configuration loader
    fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                overrides.insert(key.to_string(), value);
            }
        };

        put("network_profile", self.profile.clone());
        put("master_address", self.master_address.clone());
        put("slave_address", self.slave_address.clone());
        put("master_port", self.master_port.map(|p| p.to_string()));
        put("slave_port", self.slave_port.map(|p| p.to_string()));
        put("log_level", self.log_level.clone());

        if let Command::Run {
            start_stage,
            skip_calibration,
            ..
        } = &self.command
        {
            put("start_stage", start_stage.map(|s| s.to_string()));
            if *skip_calibration {
                put("debug_mode", Some("true".to_string()));
            }
        }

        overrides
    }
}

fn main() {
    let debug_flags = parse_debug_flags();
    // Per-crate debug flags are not clap arguments
    let cli = Cli::parse_from(std::env::args().filter(|arg| !arg.starts_with("--debug-")));

    let config = match load_configuration(cli.config.as_deref(), &cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    // File logs only for full runs; the guard flushes them on exit
    let logging = match &cli.command {
        Command::Run { .. } => init_logging(
            &debug_flags,
            &config.logging.level,
            &config.logging.log_dir,
            config.logging.retention_days,
            config.logging.retention_runs,
        )
        .map(Some),
        _ => init_console_logging(&debug_flags, &config.logging.level).map(|_| None),
    };
    let _guard = match logging {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            process::exit(2);
        }
    };

    if let Err(e) = execute(cli.command, &config) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn execute(command: Command, config: &SynccConfig) -> Result<()> {
    match command {
        Command::Run { participant, .. } => run_procedure(config, participant),
        Command::Check => check_hosts(config),
        Command::Calibrate { host } => {
            let session = Session::connect(config)?;
            let outcome = session.calibrate(host, &mut StdinOperator::stdin())?;
            if outcome.decision == CalibrationDecision::AcceptedWithOverride {
                warn!("{} calibration accepted by operator override", host);
            }
            println!(
                "{}: accuracy {} precision {} after {} attempt(s)",
                host, outcome.result.accuracy, outcome.result.precision, outcome.attempts
            );
            Ok(())
        }
        Command::Annotate { label } => {
            let session = Session::connect(config)?;
            thread::sleep(PUBLISH_SETTLE);
            let trigger = session.annotate(&label)?;
            println!("{} @ {}", trigger.label, trigger.timestamp);
            Ok(())
        }
        Command::Record { action } => {
            let session = Session::connect(config)?;
            match action {
                RecordAction::Start {
                    session_name: name,
                    participant,
                } => {
                    let name = name.unwrap_or_else(|| {
                        let participant = participant
                            .unwrap_or_else(|| random_participant_id(&mut rand::thread_rng()));
                        session_name(&participant, &Local::now())
                    });
                    session.start_recording(&name)?;
                    println!("Recording {}", name);
                }
                RecordAction::Stop => session.stop_recording()?,
            }
            Ok(())
        }
    }
}

fn check_hosts(config: &SynccConfig) -> Result<()> {
    let (master, slave) = config.endpoints()?;
    let timeout = Duration::from_millis(config.timeouts.probe_ms);

    let mut unreachable = Vec::new();
    for endpoint in [&master, &slave] {
        match probe_endpoint(endpoint, timeout) {
            Ok(()) => println!("{}: {}:{} reachable", endpoint.role, endpoint.address, endpoint.port),
            Err(e) => {
                error!("{}", e);
                unreachable.push(endpoint.role);
            }
        }
    }

    if !unreachable.is_empty() {
        bail!(
            "Unreachable: {}",
            unreachable
                .iter()
                .map(Role::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}

fn run_procedure(config: &SynccConfig, participant: Option<String>) -> Result<()> {
    let mut rng = rand::thread_rng();
    let participant = participant.unwrap_or_else(|| random_participant_id(&mut rng));
    let name = session_name(&participant, &Local::now());
    info!("Participant {}, session {}", participant, name);

    let mut session = Session::establish(config).context("Session setup failed")?;

    let procedure = Procedure::new(&session, &config.procedure, name);
    let report = procedure
        .run(&mut StdinOperator::stdin(), &mut rng)
        .with_context(|| format!("Procedure '{}' aborted", procedure.session_name()))?;

    for (role, outcome) in &report.calibrations {
        info!(
            "{}: accuracy {} precision {} ({:?})",
            role, outcome.result.accuracy, outcome.result.precision, outcome.decision
        );
    }
    info!(
        "Segments: {}; free conversations: {}",
        report.segment_order.join(", "),
        report.conversations
    );

    session.close();
    Ok(())
}
