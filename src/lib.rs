//! # syncc
//!
//! Drives two Pupil Capture eye-tracking hosts as one recording: a master
//! host that owns the clock and a slave host that follows it. Both hosts
//! receive the same notifications, the same time offset, and the same
//! master-timestamped annotations, so their recordings line up.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! syncc = "0.1"  # Default: protocol + logging
//! ```
//!
//! ## Feature Flags
//!
//! - **`pupil`** (default): control, annotation and calibration protocol
//! - **`observability`** (default): console and per-run file logging
//! - **`transports`**: ZMQ sockets and the TCP probe without the protocol
//!
//! Configuration is always available.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use syncc::prelude::*;
//!
//! let config = load_config(None, None)?;
//! validate_config(&config)?;
//!
//! let session = Session::establish(&config)?;
//! session.start_recording("2025_01_01_et_1200_123456")?;
//! let trigger = session.annotate("start_m1")?;
//! println!("{} at {}", trigger.label, trigger.timestamp);
//! session.stop_recording()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: syncc-config, syncc-observability          │
//! │  (TOML + env + CLI configuration, logging setup)        │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  I/O: syncc-transports                                  │
//! │  (ZMQ REQ/PUB/SUB clients, TCP reachability probe)      │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Protocol: syncc-pupil                                  │
//! │  (notifications, commands, annotations, calibration)    │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application: syncc-runner (`syncc` binary)             │
//! │  (operator console, staged procedure)                   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

pub use syncc_config as config;

#[cfg(feature = "observability")]
pub use syncc_observability as observability;

#[cfg(feature = "transports")]
pub use syncc_transports as transports;

#[cfg(feature = "pupil")]
pub use syncc_pupil as pupil;

/// Prelude - commonly used types and functions
pub mod prelude {
    pub use crate::config::{load_config, validate_config, Endpoint, Role, SynccConfig};

    #[cfg(feature = "pupil")]
    pub use crate::pupil::{
        CalibrationDecision, CalibrationOutcome, CalibrationResult, DecisionSource, PupilError,
        RetryDecision, Session, Trigger,
    };
}
