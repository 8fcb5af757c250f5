// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! ZMQ REQ pattern (client-side request-reply)
//!
//! REQ sockets enforce lockstep: send, receive, send, receive. Capture hosts
//! answer on a single-threaded REP socket, so requests are never pipelined.
//! After a timed-out request the socket is left waiting for a reply that may
//! never come; callers treat a timeout as fatal for the channel.

use super::{connect_socket, wait_readable};
use crate::common::{ClientConfig, TransportError, TransportResult};
use crate::traits::{RequestReplyClient, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Control channel to one capture host
pub struct ZmqReq {
    context: Arc<zmq::Context>,
    config: ClientConfig,
    socket: Mutex<Option<zmq::Socket>>,
}

impl ZmqReq {
    pub fn new(context: Arc<zmq::Context>, config: ClientConfig) -> TransportResult<Self> {
        config.validate()?;
        Ok(Self {
            context,
            config,
            socket: Mutex::new(None),
        })
    }

    /// With a private context
    pub fn with_address(address: impl Into<String>) -> TransportResult<Self> {
        Self::new(Arc::new(zmq::Context::new()), ClientConfig::new(address))
    }

    fn check_size(&self, frames: &[&[u8]]) -> TransportResult<()> {
        if let Some(max_size) = self.config.max_message_size {
            let size: usize = frames.iter().map(|f| f.len()).sum();
            if size > max_size {
                return Err(TransportError::MessageTooLarge { size, max_size });
            }
        }
        Ok(())
    }
}

impl Transport for ZmqReq {
    fn start(&mut self) -> TransportResult<()> {
        let mut slot = self.socket.lock();
        if slot.is_some() {
            return Err(TransportError::AlreadyRunning);
        }

        let config = &self.config;
        *slot = Some(connect_socket(
            &self.context,
            zmq::REQ,
            &config.address,
            |socket| {
                socket.set_sndhwm(config.send_hwm)?;
                socket.set_rcvhwm(config.recv_hwm)?;
                Ok(())
            },
        )?);

        info!("[ZMQ-REQ] Connected to {}", config.address);
        Ok(())
    }

    fn stop(&mut self) -> TransportResult<()> {
        if self.socket.lock().take().is_some() {
            debug!("[ZMQ-REQ] Closed {}", self.config.address);
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.socket.lock().is_some()
    }

    fn transport_type(&self) -> &str {
        "zmq-req"
    }

    fn address(&self) -> &str {
        &self.config.address
    }
}

impl RequestReplyClient for ZmqReq {
    fn request_timeout(&self, frames: &[&[u8]], timeout_ms: u64) -> TransportResult<Vec<u8>> {
        let slot = self.socket.lock();
        let socket = slot.as_ref().ok_or(TransportError::NotRunning)?;

        let Some((last, leading)) = frames.split_last() else {
            return Err(TransportError::InvalidMessage(
                "Request must contain at least one frame".to_string(),
            ));
        };
        self.check_size(frames)?;

        for frame in leading {
            socket
                .send(*frame, zmq::SNDMORE)
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        }
        socket
            .send(*last, 0)
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;

        wait_readable(socket, timeout_ms)?;

        let mut reply = socket
            .recv_multipart(0)
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
        if reply.len() != 1 {
            return Err(TransportError::InvalidMessage(format!(
                "Expected a single-frame reply, got {} frames",
                reply.len()
            )));
        }
        Ok(reply.remove(0))
    }
}
