// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! ZMQ PUB pattern in connect mode
//!
//! Capture hosts expose a bound subscriber port on their message bus; this
//! socket connects to it and injects messages. A PUB socket drops messages
//! when no peer is connected or the high water mark is reached, so
//! publishing never waits for the remote side.

use super::connect_socket;
use crate::common::{ClientConfig, TransportError, TransportResult};
use crate::traits::{Publisher, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Publish channel into one capture host's message bus
pub struct ZmqPub {
    context: Arc<zmq::Context>,
    config: ClientConfig,
    socket: Mutex<Option<zmq::Socket>>,
}

impl ZmqPub {
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
}

impl Transport for ZmqPub {
    fn start(&mut self) -> TransportResult<()> {
        let mut slot = self.socket.lock();
        if slot.is_some() {
            return Err(TransportError::AlreadyRunning);
        }

        let config = &self.config;
        let send_timeout = config.send_timeout_ms()?;
        *slot = Some(connect_socket(
            &self.context,
            zmq::PUB,
            &config.address,
            |socket| {
                socket.set_sndhwm(config.send_hwm)?;
                socket.set_sndtimeo(send_timeout)?;
                Ok(())
            },
        )?);

        info!("[ZMQ-PUB] Connected to {}", config.address);
        Ok(())
    }

    fn stop(&mut self) -> TransportResult<()> {
        if self.socket.lock().take().is_some() {
            debug!("[ZMQ-PUB] Closed {}", self.config.address);
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.socket.lock().is_some()
    }

    fn transport_type(&self) -> &str {
        "zmq-pub"
    }

    fn address(&self) -> &str {
        &self.config.address
    }
}

impl Publisher for ZmqPub {
    fn publish(&self, topic: &[u8], data: &[u8]) -> TransportResult<()> {
        let slot = self.socket.lock();
        let socket = slot.as_ref().ok_or(TransportError::NotRunning)?;

        if let Some(max_size) = self.config.max_message_size {
            if data.len() > max_size {
                return Err(TransportError::MessageTooLarge {
                    size: data.len(),
                    max_size,
                });
            }
        }

        socket
            .send_multipart([topic, data], 0)
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }
}
