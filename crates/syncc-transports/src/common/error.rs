//! Common error types for all transports

/// Result type alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport-agnostic error type
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    #[error("Host {address} unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Transport is not running")]
    NotRunning,

    #[error("Transport is already running")]
    AlreadyRunning,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Message too large: {size} bytes (max: {max_size})")]
    MessageTooLarge { size: usize, max_size: usize },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[cfg(feature = "zmq-client")]
    #[error("ZMQ error: {0}")]
    Zmq(zmq::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "zmq-client")]
impl From<zmq::Error> for TransportError {
    fn from(err: zmq::Error) -> Self {
        match err {
            zmq::Error::EAGAIN => Self::Timeout,
            _ => Self::Zmq(err),
        }
    }
}
