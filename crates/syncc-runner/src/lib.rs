// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # syncc-runner
//!
//! Operator console for a two-host eye-tracking session: configuration
//! loading, session naming, the staged experiment procedure, and the
//! line-based operator prompts the `syncc` binary uses.

pub mod configuration;
pub mod naming;
pub mod operator;
pub mod procedure;

pub use configuration::load_configuration;
pub use naming::{random_participant_id, session_name};
pub use operator::{ConsoleOperator, StdinOperator};
pub use procedure::{
    CaptureControl, Operator, Procedure, ProcedureReport, Segment, SegmentRunner, Stage,
};

use syncc_pupil::PupilError;

/// Result type for procedure operations
pub type RunnerResult<T> = Result<T, RunnerError>;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error(transparent)]
    Pupil(#[from] PupilError),

    #[error("Operator console I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown stage {0}; expected 2 (calibration), 3 (stimuli) or 4 (free conversation)")]
    UnknownStage(u8),
}
