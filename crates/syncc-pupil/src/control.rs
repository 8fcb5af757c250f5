// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Control protocol over a host's request/reply channel
//!
//! Every operation is exactly one round trip: send, then block for the
//! single string reply. Nothing is pipelined.

use std::time::{Duration, Instant};
use syncc_config::Role;
use syncc_transports::{RequestReplyClient, TransportError};
use tracing::{debug, info};

use crate::error::{PupilError, PupilResult};
use crate::message::{encode, Notification};

/// Ask for the host's current clock value
pub const CMD_TIME: &str = "t";
/// Start a calibration
pub const CMD_CALIBRATE: &str = "C";
/// Stop recording
pub const CMD_STOP_RECORDING: &str = "r";
/// Query the port the host subscribes on (clients publish there)
pub const CMD_PUB_PORT: &str = "PUB_PORT";
/// Query the port the host publishes on (clients subscribe there)
pub const CMD_SUB_PORT: &str = "SUB_PORT";

/// Which auxiliary port to ask a host for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Publish,
    Subscribe,
}

impl PortKind {
    pub fn command(&self) -> &'static str {
        match self {
            PortKind::Publish => CMD_PUB_PORT,
            PortKind::Subscribe => CMD_SUB_PORT,
        }
    }
}

/// Control channel to one capture host
pub struct ControlChannel<C: RequestReplyClient> {
    client: C,
    role: Role,
    reply_timeout_ms: u64,
}

impl<C: RequestReplyClient> ControlChannel<C> {
    /// `reply_timeout_ms` of 0 blocks forever on every reply
    pub fn new(client: C, role: Role, reply_timeout_ms: u64) -> Self {
        Self {
            client,
            role,
            reply_timeout_ms,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// Send a notification as `[notify.<subject>, msgpack payload]` and
    /// return the host's reply verbatim
    pub fn notify(&self, notification: &Notification) -> PupilResult<String> {
        let topic = notification.topic();
        let payload = encode(notification)?;

        let reply = self.round_trip(&topic, &[topic.as_bytes(), &payload])?;
        info!("[{}] {} -> {}", self.role, topic, reply);
        Ok(reply)
    }

    /// Send a single-frame command and return the reply verbatim
    pub fn command(&self, command: &str) -> PupilResult<String> {
        let reply = self.round_trip(command, &[command.as_bytes()])?;
        debug!("[{}] '{}' -> {}", self.role, command, reply);
        Ok(reply)
    }

    /// Current value of the host clock, in seconds
    pub fn current_time(&self) -> PupilResult<f64> {
        let reply = self.command(CMD_TIME)?;
        reply.trim().parse::<f64>().map_err(|_| PupilError::Malformed {
            request: CMD_TIME.to_string(),
            reply,
        })
    }

    /// Wall-clock duration of one `t` round trip
    pub fn round_trip_delay(&self) -> PupilResult<Duration> {
        let started = Instant::now();
        self.current_time()?;
        Ok(started.elapsed())
    }

    /// Reset the host clock to `value`; returns the acknowledgement
    pub fn set_time(&self, value: f64) -> PupilResult<String> {
        // Debug formatting keeps the decimal point: "T 0.0", not "T 0"
        self.command(&format!("T {:?}", value))
    }

    pub fn start_calibration(&self) -> PupilResult<String> {
        self.command(CMD_CALIBRATE)
    }

    pub fn stop_recording(&self) -> PupilResult<String> {
        self.command(CMD_STOP_RECORDING)
    }

    /// Ask for one of the host's auxiliary ports
    pub fn query_port(&self, kind: PortKind) -> PupilResult<u16> {
        let request = kind.command();
        let reply = self.command(request)?;
        match reply.trim().parse::<u16>() {
            Ok(port) if port != 0 => Ok(port),
            _ => Err(PupilError::Malformed {
                request: request.to_string(),
                reply,
            }),
        }
    }

    fn round_trip(&self, request: &str, frames: &[&[u8]]) -> PupilResult<String> {
        let bytes = self
            .client
            .request_timeout(frames, self.reply_timeout_ms)
            .map_err(|e| match e {
                TransportError::Timeout => PupilError::Timeout {
                    request: request.to_string(),
                    timeout_ms: self.reply_timeout_ms,
                },
                other => PupilError::Transport(other),
            })?;

        String::from_utf8(bytes).map_err(|e| PupilError::Malformed {
            request: request.to_string(),
            reply: String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}
