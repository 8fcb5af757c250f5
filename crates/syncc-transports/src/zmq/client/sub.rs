//! ZMQ SUB pattern (client-side publish-subscribe)
//!
//! Receives a capture host's bus traffic, filtered by topic prefix. Host
//! messages are `[topic, payload]`, sometimes followed by extra frames
//! that are dropped here.

use super::{connect_socket, wait_readable};
use crate::common::{ClientConfig, TransportError, TransportResult};
use crate::traits::{Subscriber, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Telemetry channel from one capture host
pub struct ZmqSub {
    context: Arc<zmq::Context>,
    config: ClientConfig,
    socket: Mutex<Option<zmq::Socket>>,
}

impl ZmqSub {
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

impl Transport for ZmqSub {
    fn start(&mut self) -> TransportResult<()> {
        let mut slot = self.socket.lock();
        if slot.is_some() {
            return Err(TransportError::AlreadyRunning);
        }

        let config = &self.config;
        *slot = Some(connect_socket(
            &self.context,
            zmq::SUB,
            &config.address,
            |socket| Ok(socket.set_rcvhwm(config.recv_hwm)?),
        )?);

        info!("[ZMQ-SUB] Connected to {}", config.address);
        Ok(())
    }

    fn stop(&mut self) -> TransportResult<()> {
        if self.socket.lock().take().is_some() {
            debug!("[ZMQ-SUB] Closed {}", self.config.address);
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.socket.lock().is_some()
    }

    fn transport_type(&self) -> &str {
        "zmq-sub"
    }

    fn address(&self) -> &str {
        &self.config.address
    }
}

impl Subscriber for ZmqSub {
    fn subscribe(&mut self, topic: &[u8]) -> TransportResult<()> {
        let slot = self.socket.lock();
        let socket = slot.as_ref().ok_or(TransportError::NotRunning)?;

        socket.set_subscribe(topic)?;
        debug!(
            "[ZMQ-SUB] Filtering {} to '{}'",
            self.config.address,
            String::from_utf8_lossy(topic)
        );
        Ok(())
    }

    fn receive_timeout(&self, timeout_ms: u64) -> TransportResult<(Vec<u8>, Vec<u8>)> {
        let slot = self.socket.lock();
        let socket = slot.as_ref().ok_or(TransportError::NotRunning)?;

        wait_readable(socket, timeout_ms)?;

        let frames = socket
            .recv_multipart(0)
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
        let mut frames = frames.into_iter();
        match (frames.next(), frames.next()) {
            (Some(topic), Some(payload)) => Ok((topic, payload)),
            _ => Err(TransportError::InvalidMessage(
                "Expected [topic, payload], got a single frame".to_string(),
            )),
        }
    }
}
