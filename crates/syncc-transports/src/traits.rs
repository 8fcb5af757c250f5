// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Transport trait definitions
//!
//! The protocol layer is written against these traits only, so it can be
//! driven by ZMQ sockets in production and by scripted in-memory peers in
//! tests.

use crate::common::TransportResult;

/// Base transport trait - implemented by all transports
pub trait Transport: Send + Sync {
    /// Start the transport (create and connect the socket)
    fn start(&mut self) -> TransportResult<()>;

    /// Stop the transport. Safe to call on a transport that never started.
    fn stop(&mut self) -> TransportResult<()>;

    /// Check if transport is running
    fn is_running(&self) -> bool;

    /// Get transport name/type
    fn transport_type(&self) -> &str;

    /// Address the transport connects to
    fn address(&self) -> &str;
}

/// Request-Reply pattern (client side)
///
/// Strict lockstep: every request is followed by exactly one blocking
/// receive before the next request may be sent.
pub trait RequestReplyClient: Transport {
    /// Send a request made of one or more frames and wait up to `timeout_ms`
    /// (0 = forever) for a single-frame reply
    fn request_timeout(&self, frames: &[&[u8]], timeout_ms: u64) -> TransportResult<Vec<u8>>;
}

/// Publish-Subscribe pattern (publisher side)
pub trait Publisher: Transport {
    /// Publish a two-frame message: topic, then data. Never waits for a reply.
    fn publish(&self, topic: &[u8], data: &[u8]) -> TransportResult<()>;
}

/// Publish-Subscribe pattern (subscriber side)
pub trait Subscriber: Transport {
    /// Subscribe to a topic prefix
    fn subscribe(&mut self, topic: &[u8]) -> TransportResult<()>;

    /// Receive with timeout (0 = forever); returns (topic, data)
    fn receive_timeout(&self, timeout_ms: u64) -> TransportResult<(Vec<u8>, Vec<u8>)>;
}
