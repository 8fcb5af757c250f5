//! Client socket configuration

use std::time::Duration;

use super::{TransportError, TransportResult};

/// Settings for one socket connecting to a capture host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Address to connect to, e.g. `tcp://127.0.0.1:50020`
    pub address: String,

    /// Send timeout (None = block)
    pub timeout: Option<Duration>,

    pub send_hwm: i32,
    pub recv_hwm: i32,

    /// Largest outgoing message accepted (None = unlimited)
    pub max_message_size: Option<usize>,
}

impl ClientConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: None,
            send_hwm: 1000,
            recv_hwm: 1000,
            max_message_size: Some(10 * 1024 * 1024),
        }
    }

    /// Timeout from milliseconds, where 0 means block forever
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = Some(size);
        self
    }

    /// Send timeout in the form ZMQ takes it: milliseconds, -1 to block
    pub fn send_timeout_ms(&self) -> TransportResult<i32> {
        match self.timeout {
            None => Ok(-1),
            Some(timeout) => i32::try_from(timeout.as_millis()).map_err(|_| {
                TransportError::InvalidConfig(format!(
                    "send timeout of {} ms exceeds {} ms",
                    timeout.as_millis(),
                    i32::MAX
                ))
            }),
        }
    }

    pub fn validate(&self) -> TransportResult<()> {
        if self.address.is_empty() {
            return Err(TransportError::InvalidConfig(
                "Address cannot be empty".to_string(),
            ));
        }
        if self.max_message_size == Some(0) {
            return Err(TransportError::InvalidConfig(
                "Maximum message size must be greater than 0".to_string(),
            ));
        }
        self.send_timeout_ms().map(|_| ())
    }
}
