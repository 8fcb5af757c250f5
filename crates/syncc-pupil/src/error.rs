//! Error types for the capture-host protocol

use syncc_config::{ConfigError, Role};
use syncc_transports::TransportError;

/// Result type for protocol operations
pub type PupilResult<T> = Result<T, PupilError>;

/// Everything that can go wrong while talking to a capture host.
///
/// Only [`PupilError::DecisionInputClosed`] and calibration threshold
/// failures are handled locally; every other variant is fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum PupilError {
    /// Reachability probe failed before any channel was opened
    #[error("{role}: Cannot find Pupil Capture at {address} ({reason})")]
    Unreachable {
        role: Role,
        address: String,
        reason: String,
    },

    /// Nothing arrived within the configured timeout: a control reply, or
    /// telemetry on the `logging` topic
    #[error("No reply to '{request}' within {timeout_ms} ms")]
    Timeout { request: String, timeout_ms: u64 },

    /// A reply arrived but does not have the expected shape
    #[error("Malformed reply to '{request}': {reply:?}")]
    Malformed { request: String, reply: String },

    /// Calibration telemetry that cannot be interpreted
    #[error("Malformed calibration telemetry: {0}")]
    MalformedTelemetry(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// The operator input stream ended while a decision was pending
    #[error("Operator decision input closed")]
    DecisionInputClosed,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<rmp_serde::encode::Error> for PupilError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        PupilError::Serialization(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for PupilError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        PupilError::Serialization(err.to_string())
    }
}
