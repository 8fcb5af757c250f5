// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # syncc-pupil
//!
//! Protocol core for recording with two Pupil Capture hosts at once.
//! One host is the master and supplies the clock for every annotation.
//!
//! - [`control`]: notifications and single-letter commands over request/reply
//! - [`annotation`]: identical timestamped triggers published to both hosts
//! - [`calibration`]: calibration state machine with an operator retry loop
//! - [`session`]: reachability probe, port discovery and channel lifecycle
//!
//! ## Example
//!
//! ```no_run
//! use syncc_config::{load_config, Role};
//! use syncc_pupil::Session;
//!
//! let config = load_config(None, None)?;
//! let session = Session::establish(&config)?;
//!
//! session.start_recording("2025_01_01_et_1200_123456")?;
//! session.annotate("start_m1")?;
//! session.annotate("stop_m1")?;
//! session.stop_recording()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod annotation;
pub mod calibration;
pub mod control;
pub mod error;
pub mod message;
pub mod session;

#[cfg(test)]
mod mock;

pub use annotation::{publish, send_annotation};
pub use calibration::{
    CalibrationDecision, CalibrationMonitor, CalibrationOutcome, CalibrationPolicy,
    CalibrationResult, CalibrationState, DecisionSource, RetryDecision,
};
pub use control::{ControlChannel, PortKind};
pub use error::{PupilError, PupilResult};
pub use message::{LogRecord, Notification, Trigger};
pub use session::{connect_host, open_session, probe_endpoint, HostLink, Session};

pub use syncc_config::{Endpoint, Role};
