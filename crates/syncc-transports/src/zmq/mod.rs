// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! ZMQ transport implementations
//!
//! Client-side sockets only; the capture hosts own the bound ends.
//! - **Request-Reply**: REQ
//! - **Publish**: PUB (connect mode)
//! - **Subscribe**: SUB
//!
//! All sockets of one host share an `Arc<zmq::Context>`.

pub mod client;

pub use client::{ZmqPub, ZmqReq, ZmqSub};
