// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Loopback stand-in for a Pupil Capture host

#![allow(dead_code)]

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Serialize)]
struct LogLine<'a> {
    topic: &'a str,
    name: &'a str,
    levelname: &'a str,
    msg: String,
}

/// Fake capture host: REP control socket plus the two bus sockets.
///
/// All sockets bind to ephemeral loopback ports.
pub struct FakeCapture {
    pub control_port: u16,
    pub pub_port: u16,
    pub sub_port: u16,
    requests: Arc<Mutex<Vec<Vec<Vec<u8>>>>>,
    annotations: Arc<Mutex<Vec<(Vec<u8>, Vec<u8>)>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

fn bound_port(socket: &zmq::Socket) -> u16 {
    let endpoint = socket.get_last_endpoint().unwrap().unwrap();
    endpoint.rsplit(':').next().unwrap().parse().unwrap()
}

impl FakeCapture {
    /// `calibrations` are the (accuracy, precision) pairs reported for each
    /// successive "C" command
    pub fn start(clock: f64, calibrations: Vec<(f64, f64)>) -> Self {
        let context = zmq::Context::new();

        let control = context.socket(zmq::REP).unwrap();
        control.bind("tcp://127.0.0.1:*").unwrap();
        // Host side of our publish channel
        let inbound = context.socket(zmq::SUB).unwrap();
        inbound.bind("tcp://127.0.0.1:*").unwrap();
        inbound.set_subscribe(b"").unwrap();
        // Host side of our subscribe channel
        let outbound = context.socket(zmq::PUB).unwrap();
        outbound.bind("tcp://127.0.0.1:*").unwrap();

        let control_port = bound_port(&control);
        let pub_port = bound_port(&inbound);
        let sub_port = bound_port(&outbound);

        let requests = Arc::new(Mutex::new(Vec::new()));
        let annotations = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let requests = Arc::clone(&requests);
            let annotations = Arc::clone(&annotations);
            let stop = Arc::clone(&stop);
            let mut calibrations: VecDeque<(f64, f64)> = calibrations.into();

            thread::spawn(move || {
                let _context = context;
                while !stop.load(Ordering::Relaxed) {
                    let mut items = [
                        control.as_poll_item(zmq::POLLIN),
                        inbound.as_poll_item(zmq::POLLIN),
                    ];
                    zmq::poll(&mut items, 50).unwrap();
                    let control_ready = items[0].is_readable();
                    let inbound_ready = items[1].is_readable();

                    if inbound_ready {
                        let mut parts = inbound.recv_multipart(0).unwrap();
                        if parts.len() == 2 {
                            let data = parts.pop().unwrap();
                            let topic = parts.pop().unwrap();
                            annotations.lock().push((topic, data));
                        }
                    }

                    if control_ready {
                        let frames = control.recv_multipart(0).unwrap();
                        let command = String::from_utf8_lossy(&frames[0]).into_owned();
                        requests.lock().push(frames);

                        let reply = match command.as_str() {
                            "PUB_PORT" => pub_port.to_string(),
                            "SUB_PORT" => sub_port.to_string(),
                            "t" => format!("{}", clock),
                            "C" => "calibration started".to_string(),
                            "r" => "OK".to_string(),
                            c if c.starts_with("T ") => "Timesync successful.".to_string(),
                            c if c.starts_with("notify.") => {
                                "Notification received.".to_string()
                            }
                            _ => "Unknown command.".to_string(),
                        };
                        control.send(reply.as_str(), 0).unwrap();

                        if command == "C" {
                            let (accuracy, precision) =
                                calibrations.pop_front().unwrap_or((0.3, 0.05));
                            thread::sleep(Duration::from_millis(50));
                            publish_log(&outbound, "Starting calibration".to_string());
                            publish_log(
                                &outbound,
                                format!("Angular accuracy: {}. Used 98 of 100 samples.", accuracy),
                            );
                            publish_log(
                                &outbound,
                                format!(
                                    "Angular precision: {}. Used 97 of 100 samples.",
                                    precision
                                ),
                            );
                        }
                    }
                }
            })
        };

        Self {
            control_port,
            pub_port,
            sub_port,
            requests,
            annotations,
            stop,
            handle: Some(handle),
        }
    }

    /// Control requests received so far, frames joined by '|', payload frames
    /// shown as `<bin>`
    pub fn request_log(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|frames| {
                let mut text = String::from_utf8_lossy(&frames[0]).into_owned();
                if frames.len() > 1 {
                    text.push_str("|<bin>");
                }
                text
            })
            .collect()
    }

    pub fn raw_requests(&self) -> Vec<Vec<Vec<u8>>> {
        self.requests.lock().clone()
    }

    /// Wait up to `timeout` for `count` annotations
    pub fn wait_for_annotations(&self, count: usize, timeout: Duration) -> Vec<(Vec<u8>, Vec<u8>)> {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if self.annotations.lock().len() >= count {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        self.annotations.lock().clone()
    }
}

fn publish_log(socket: &zmq::Socket, msg: String) {
    let payload = rmp_serde::to_vec_named(&LogLine {
        topic: "logging.info",
        name: "accuracy_visualizer",
        levelname: "INFO",
        msg,
    })
    .unwrap();
    socket.send("logging.info", zmq::SNDMORE).unwrap();
    socket.send(payload, 0).unwrap();
}

impl Drop for FakeCapture {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
