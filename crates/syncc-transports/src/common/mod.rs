//! Common types and utilities for all transports

pub mod config;
pub mod error;

pub use config::ClientConfig;
pub use error::{TransportError, TransportResult};
