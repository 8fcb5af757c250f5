//! # syncc-transports
//!
//! Transport layer for talking to eye-tracking capture hosts.
//!
//! ## Features
//!
//! ### ZMQ (ZeroMQ), client side
//! - **REQ**: lockstep request/reply control channel
//! - **PUB**: connects to a host's publish port to inject messages
//! - **SUB**: connects to a host's subscribe port to receive telemetry
//!
//! ### Reachability
//! - [`probe`]: plain TCP connect used before any ZMQ socket is created,
//!   because ZMQ connects lazily and would never report a missing host
//!
//! ## Example: request/reply
//!
//! ```no_run
//! use syncc_transports::zmq::client::ZmqReq;
//! use syncc_transports::traits::{Transport, RequestReplyClient};
//!
//! let mut control = ZmqReq::with_address("tcp://127.0.0.1:50020")?;
//! control.start()?;
//!
//! let reply = control.request_timeout(&[b"t"], 5000)?;
//! println!("Remote time: {}", String::from_utf8_lossy(&reply));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Example: subscribe
//!
//! ```no_run
//! use syncc_transports::zmq::client::ZmqSub;
//! use syncc_transports::traits::{Transport, Subscriber};
//!
//! let mut subscriber = ZmqSub::with_address("tcp://127.0.0.1:50022")?;
//! subscriber.start()?;
//! subscriber.subscribe(b"logging")?;
//!
//! let (topic, data) = subscriber.receive_timeout(0)?;
//! println!("{}: {} bytes", String::from_utf8_lossy(&topic), data.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod common;
pub mod probe;
pub mod traits;

#[cfg(feature = "zmq-client")]
pub mod zmq;

pub use common::{ClientConfig, TransportError, TransportResult};
pub use probe::probe;
pub use traits::{Publisher, RequestReplyClient, Subscriber, Transport};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::common::*;
    pub use crate::probe::probe;
    pub use crate::traits::*;

    #[cfg(feature = "zmq-client")]
    pub use crate::zmq::client::*;
}
