//! Scripted in-memory peers for unit tests

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use syncc_transports::{
    Publisher, RequestReplyClient, Subscriber, Transport, TransportError, TransportResult,
};

/// Request/reply peer answering from a fixed script; an exhausted script
/// behaves like a silent host
pub struct ScriptedReq {
    replies: Mutex<VecDeque<Vec<u8>>>,
    requests: Mutex<Vec<Vec<Vec<u8>>>>,
    outstanding: Mutex<usize>,
    max_outstanding: Mutex<usize>,
    running: bool,
}

impl ScriptedReq {
    pub fn new(replies: &[&str]) -> Self {
        Self::with_raw_replies(replies.iter().map(|r| r.as_bytes().to_vec()).collect())
    }

    pub fn with_raw_replies(replies: Vec<Vec<u8>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            outstanding: Mutex::new(0),
            max_outstanding: Mutex::new(0),
            running: true,
        }
    }

    pub fn requests(&self) -> Vec<Vec<Vec<u8>>> {
        self.requests.lock().clone()
    }

    /// Request frames decoded as text, one string per request (frames joined by '|')
    pub fn request_log(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|frames| {
                frames
                    .iter()
                    .map(|f| String::from_utf8_lossy(f).into_owned())
                    .collect::<Vec<_>>()
                    .join("|")
            })
            .collect()
    }

    pub fn max_outstanding(&self) -> usize {
        *self.max_outstanding.lock()
    }
}

impl Transport for ScriptedReq {
    fn start(&mut self) -> TransportResult<()> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> TransportResult<()> {
        self.running = false;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn transport_type(&self) -> &str {
        "scripted-req"
    }

    fn address(&self) -> &str {
        "inproc://scripted"
    }
}

impl RequestReplyClient for ScriptedReq {
    fn request_timeout(&self, frames: &[&[u8]], _timeout_ms: u64) -> TransportResult<Vec<u8>> {
        {
            let mut outstanding = self.outstanding.lock();
            if *outstanding > 0 {
                return Err(TransportError::SendFailed(
                    "request sent while a reply is pending".to_string(),
                ));
            }
            *outstanding += 1;
            let mut max = self.max_outstanding.lock();
            *max = (*max).max(*outstanding);
        }

        self.requests
            .lock()
            .push(frames.iter().map(|f| f.to_vec()).collect());

        match self.replies.lock().pop_front() {
            Some(reply) => {
                *self.outstanding.lock() -= 1;
                Ok(reply)
            }
            // Lockstep is broken for good after a missing reply
            None => Err(TransportError::Timeout),
        }
    }
}

/// Host names in the order their publishers sent
pub type PublishJournal = Arc<Mutex<Vec<&'static str>>>;

/// Publisher that records every message
#[derive(Default)]
pub struct RecordingPub {
    published: Mutex<Vec<(Vec<u8>, Vec<u8>)>>,
    journal: Option<(&'static str, PublishJournal)>,
}

impl RecordingPub {
    /// Also append `host` to `journal` on every publish
    pub fn journaled(host: &'static str, journal: &PublishJournal) -> Self {
        Self {
            published: Mutex::default(),
            journal: Some((host, Arc::clone(journal))),
        }
    }

    pub fn published(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.published.lock().clone()
    }
}

impl Transport for RecordingPub {
    fn start(&mut self) -> TransportResult<()> {
        Ok(())
    }

    fn stop(&mut self) -> TransportResult<()> {
        Ok(())
    }

    fn is_running(&self) -> bool {
        true
    }

    fn transport_type(&self) -> &str {
        "recording-pub"
    }

    fn address(&self) -> &str {
        "inproc://recording"
    }
}

impl Publisher for RecordingPub {
    fn publish(&self, topic: &[u8], data: &[u8]) -> TransportResult<()> {
        self.published.lock().push((topic.to_vec(), data.to_vec()));
        if let Some((host, journal)) = &self.journal {
            journal.lock().push(*host);
        }
        Ok(())
    }
}

/// Subscriber delivering a fixed sequence of messages; an exhausted
/// sequence times out
#[derive(Default)]
pub struct ScriptedSub {
    messages: Mutex<VecDeque<(Vec<u8>, Vec<u8>)>>,
}

impl ScriptedSub {
    pub fn new(messages: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            messages: Mutex::new(messages.into()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.messages.lock().len()
    }
}

impl Transport for ScriptedSub {
    fn start(&mut self) -> TransportResult<()> {
        Ok(())
    }

    fn stop(&mut self) -> TransportResult<()> {
        Ok(())
    }

    fn is_running(&self) -> bool {
        true
    }

    fn transport_type(&self) -> &str {
        "scripted-sub"
    }

    fn address(&self) -> &str {
        "inproc://scripted"
    }
}

impl Subscriber for ScriptedSub {
    fn subscribe(&mut self, _topic: &[u8]) -> TransportResult<()> {
        Ok(())
    }

    fn receive_timeout(&self, _timeout_ms: u64) -> TransportResult<(Vec<u8>, Vec<u8>)> {
        self.messages.lock().pop_front().ok_or(TransportError::Timeout)
    }
}
