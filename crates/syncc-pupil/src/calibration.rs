// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Calibration monitor
//!
//! Drives calibration of one host until an attempt is accepted:
//!
//! ```text
//! Idle ──"C"──▶ AwaitingMetrics ──both known──▶ Evaluating ──pass──▶ Accepted
//!                     ▲                              │
//!                     │                         fail │ operator
//!                     └────"C"──── Retrying ◀── "y" ─┤
//!                                                    └── "n" ──▶ Accepted (override)
//! ```
//!
//! Metrics arrive as free-text host log records on the subscribe channel.
//! A metric value of exactly 0.0 is indistinguishable from "not received
//! yet"; such a reading keeps the monitor waiting.

use syncc_config::CalibrationConfig;
use syncc_transports::{RequestReplyClient, Subscriber, TransportError};
use tracing::{debug, info, warn};

use crate::control::ControlChannel;
use crate::error::{PupilError, PupilResult};
use crate::message::{decode, LogRecord, LOGGING_TOPIC};

/// Marker preceding the accuracy value in host log text
pub const ACCURACY_MARKER: &str = "Angular accuracy";
/// Marker preceding the precision value in host log text
pub const PRECISION_MARKER: &str = "Angular precision";

/// Position of the value among the whitespace-separated tokens,
/// e.g. "Angular accuracy: 0.42 deg"
const METRIC_TOKEN_INDEX: usize = 2;

/// Monitor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    Idle,
    /// Waiting for accuracy and precision, in either order
    AwaitingMetrics,
    Evaluating,
    Retrying,
    Accepted(CalibrationDecision),
}

/// Outcome of evaluating one complete attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationDecision {
    /// Both metrics within threshold
    Accepted,
    /// Operator continued despite a failing measurement
    AcceptedWithOverride,
    /// Operator asked for another attempt
    Retry,
}

/// Operator answer to a failing attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Continue,
}

/// Source of operator decisions.
///
/// Called once per failing attempt; blocks until the operator answers.
pub trait DecisionSource {
    fn await_decision(&mut self, result: &CalibrationResult) -> PupilResult<RetryDecision>;
}

/// Angular accuracy and precision in degrees; 0.0 means not yet received
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CalibrationResult {
    pub accuracy: f64,
    pub precision: f64,
}

impl CalibrationResult {
    pub fn is_complete(&self) -> bool {
        self.accuracy != 0.0 && self.precision != 0.0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Capture any metric carried by `text` that is still unknown.
    ///
    /// Returns true if a metric was captured.
    pub fn absorb(&mut self, text: &str) -> PupilResult<bool> {
        let mut captured = false;
        if self.accuracy == 0.0 {
            if let Some(value) = extract_metric(text, ACCURACY_MARKER)? {
                self.accuracy = value;
                captured = true;
            }
        }
        if self.precision == 0.0 {
            if let Some(value) = extract_metric(text, PRECISION_MARKER)? {
                self.precision = value;
                captured = true;
            }
        }
        Ok(captured)
    }
}

/// Parse the metric value from `text` if it contains `marker`.
///
/// The value is the third whitespace-separated token; a trailing '.' or ','
/// from the host's sentence punctuation is ignored.
pub fn extract_metric(text: &str, marker: &str) -> PupilResult<Option<f64>> {
    if !text.contains(marker) {
        return Ok(None);
    }

    let token = text
        .split_whitespace()
        .nth(METRIC_TOKEN_INDEX)
        .ok_or_else(|| PupilError::MalformedTelemetry(text.to_string()))?;

    token
        .trim_end_matches(['.', ','])
        .parse::<f64>()
        .map(Some)
        .map_err(|_| PupilError::MalformedTelemetry(text.to_string()))
}

/// Acceptance thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPolicy {
    pub max_accuracy: f64,
    pub max_precision: f64,
}

impl Default for CalibrationPolicy {
    fn default() -> Self {
        Self::from(&CalibrationConfig::default())
    }
}

impl From<&CalibrationConfig> for CalibrationPolicy {
    fn from(config: &CalibrationConfig) -> Self {
        Self {
            max_accuracy: config.max_accuracy,
            max_precision: config.max_precision,
        }
    }
}

impl CalibrationPolicy {
    /// Both thresholds are strict
    pub fn passes(&self, result: &CalibrationResult) -> bool {
        result.accuracy < self.max_accuracy && result.precision < self.max_precision
    }
}

/// Terminal output of a monitor run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationOutcome {
    pub result: CalibrationResult,
    /// `Accepted` or `AcceptedWithOverride`
    pub decision: CalibrationDecision,
    pub attempts: u32,
}

/// Drives calibration attempts on one host to a terminal decision
pub struct CalibrationMonitor {
    policy: CalibrationPolicy,
    telemetry_timeout_ms: u64,
    state: CalibrationState,
    result: CalibrationResult,
    attempts: u32,
}

impl CalibrationMonitor {
    /// `telemetry_timeout_ms` of 0 waits forever for each telemetry message
    pub fn new(policy: CalibrationPolicy, telemetry_timeout_ms: u64) -> Self {
        Self {
            policy,
            telemetry_timeout_ms,
            state: CalibrationState::Idle,
            result: CalibrationResult::default(),
            attempts: 0,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn result(&self) -> CalibrationResult {
        self.result
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Run attempts until one is accepted or overridden.
    ///
    /// `telemetry` is borrowed for the duration of the run only.
    pub fn run<C, S, D>(
        &mut self,
        control: &ControlChannel<C>,
        telemetry: &S,
        decisions: &mut D,
    ) -> PupilResult<CalibrationOutcome>
    where
        C: RequestReplyClient,
        S: Subscriber + ?Sized,
        D: DecisionSource + ?Sized,
    {
        let role = control.role();
        self.result.reset();
        self.attempts = 0;

        loop {
            self.begin_attempt(control)?;

            while !self.result.is_complete() {
                let (topic, payload) = self.next_telemetry(telemetry)?;
                self.observe(&topic, &payload)?;
            }

            self.state = CalibrationState::Evaluating;
            info!(
                "[CALIBRATION] {} attempt {}: accuracy {} precision {}",
                role, self.attempts, self.result.accuracy, self.result.precision
            );

            let decision = self.evaluate(decisions)?;
            match decision {
                CalibrationDecision::Retry => {
                    info!("[CALIBRATION] {}: retrying", role);
                    self.state = CalibrationState::Retrying;
                    self.result.reset();
                }
                accepted => {
                    if accepted == CalibrationDecision::AcceptedWithOverride {
                        warn!(
                            "[CALIBRATION] {}: continuing with failing calibration (accuracy {} precision {})",
                            role, self.result.accuracy, self.result.precision
                        );
                    } else {
                        info!("[CALIBRATION] {}: accepted", role);
                    }
                    self.state = CalibrationState::Accepted(accepted);
                    return Ok(CalibrationOutcome {
                        result: self.result,
                        decision: accepted,
                        attempts: self.attempts,
                    });
                }
            }
        }
    }

    fn next_telemetry<S: Subscriber + ?Sized>(&self, telemetry: &S) -> PupilResult<(Vec<u8>, Vec<u8>)> {
        telemetry
            .receive_timeout(self.telemetry_timeout_ms)
            .map_err(|e| match e {
                TransportError::Timeout => PupilError::Timeout {
                    request: LOGGING_TOPIC.to_string(),
                    timeout_ms: self.telemetry_timeout_ms,
                },
                other => PupilError::Transport(other),
            })
    }

    fn begin_attempt<C: RequestReplyClient>(&mut self, control: &ControlChannel<C>) -> PupilResult<()> {
        let reply = control.start_calibration()?;
        self.attempts += 1;
        self.state = CalibrationState::AwaitingMetrics;
        info!(
            "[CALIBRATION] {} attempt {} started: {}",
            control.role(),
            self.attempts,
            reply
        );
        Ok(())
    }

    /// Feed one telemetry message into the current attempt.
    ///
    /// Records that cannot be decoded are skipped: the logging stream carries
    /// every host log line, not only calibration output.
    pub fn observe(&mut self, topic: &[u8], payload: &[u8]) -> PupilResult<()> {
        let record: LogRecord = match decode(payload) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "[CALIBRATION] Skipping undecodable '{}' record: {}",
                    String::from_utf8_lossy(topic),
                    e
                );
                return Ok(());
            }
        };

        if self.result.absorb(&record.msg)? {
            debug!(
                "[CALIBRATION] {} (ignored fields: {})",
                record.msg,
                record.ignored_fields().collect::<Vec<_>>().join(",")
            );
        }
        Ok(())
    }

    fn evaluate<D: DecisionSource + ?Sized>(
        &self,
        decisions: &mut D,
    ) -> PupilResult<CalibrationDecision> {
        if self.policy.passes(&self.result) {
            return Ok(CalibrationDecision::Accepted);
        }

        warn!(
            "[CALIBRATION] Thresholds not met (accuracy < {}, precision < {})",
            self.policy.max_accuracy, self.policy.max_precision
        );
        Ok(match decisions.await_decision(&self.result)? {
            RetryDecision::Retry => CalibrationDecision::Retry,
            RetryDecision::Continue => CalibrationDecision::AcceptedWithOverride,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::encode;
    use crate::mock::{ScriptedReq, ScriptedSub};
    use serde::Serialize;
    use std::collections::VecDeque;
    use syncc_config::Role;

    #[derive(Serialize)]
    struct HostLog<'a> {
        topic: &'a str,
        levelname: &'a str,
        msg: &'a str,
    }

    fn log_line(msg: &str) -> (Vec<u8>, Vec<u8>) {
        let payload = encode(&HostLog {
            topic: "logging.info",
            levelname: "INFO",
            msg,
        })
        .unwrap();
        (b"logging.info".to_vec(), payload)
    }

    fn metrics(accuracy: f64, precision: f64) -> Vec<(Vec<u8>, Vec<u8>)> {
        vec![
            log_line(&format!("Angular accuracy: {}. Used 120 of 122 samples.", accuracy)),
            log_line("Starting calibration on 9 markers"),
            log_line(&format!("Angular precision: {}. Used 118 of 122 samples.", precision)),
        ]
    }

    /// Replays scripted answers and counts prompts
    struct ScriptedOperator {
        answers: VecDeque<RetryDecision>,
        prompts: Vec<CalibrationResult>,
    }

    impl ScriptedOperator {
        fn new(answers: &[RetryDecision]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                prompts: Vec::new(),
            }
        }
    }

    impl DecisionSource for ScriptedOperator {
        fn await_decision(&mut self, result: &CalibrationResult) -> PupilResult<RetryDecision> {
            self.prompts.push(*result);
            self.answers.pop_front().ok_or(PupilError::DecisionInputClosed)
        }
    }

    fn control(replies: &[&str]) -> ControlChannel<ScriptedReq> {
        ControlChannel::new(ScriptedReq::new(replies), Role::Slave, 1000)
    }

    #[test]
    fn test_extract_metric_third_token() {
        assert_eq!(
            extract_metric("Angular accuracy: 0.42 deg", ACCURACY_MARKER).unwrap(),
            Some(0.42)
        );
        assert_eq!(
            extract_metric("Angular precision: 0.071. Used 5 of 6 samples.", PRECISION_MARKER)
                .unwrap(),
            Some(0.071)
        );
        assert_eq!(
            extract_metric("Angular accuracy: 0.42 deg", PRECISION_MARKER).unwrap(),
            None
        );
    }

    #[test]
    fn test_extract_metric_malformed() {
        assert!(matches!(
            extract_metric("Angular accuracy: n/a", ACCURACY_MARKER),
            Err(PupilError::MalformedTelemetry(_))
        ));
        assert!(matches!(
            extract_metric("Angular accuracy", ACCURACY_MARKER),
            Err(PupilError::MalformedTelemetry(_))
        ));
    }

    #[test]
    fn test_absorb_captures_each_metric_once() {
        let mut result = CalibrationResult::default();
        assert!(result.absorb("Angular accuracy: 0.3 deg").unwrap());
        assert!(!result.absorb("Angular accuracy: 0.9 deg").unwrap());
        assert!(!result.absorb("Unrelated log line").unwrap());
        assert_eq!(result.accuracy, 0.3);
        assert_eq!(result.precision, 0.0);
        assert!(!result.is_complete());

        assert!(result.absorb("Angular precision: 0.05 deg").unwrap());
        assert!(result.is_complete());
    }

    #[test]
    fn test_zero_reading_counts_as_missing() {
        let mut result = CalibrationResult::default();
        result.absorb("Angular accuracy: 0.0 deg").unwrap();
        result.absorb("Angular precision: 0.05 deg").unwrap();
        assert!(!result.is_complete());
    }

    #[test]
    fn test_policy_thresholds_are_strict() {
        let policy = CalibrationPolicy::default();
        assert!(policy.passes(&CalibrationResult { accuracy: 0.3, precision: 0.05 }));
        assert!(!policy.passes(&CalibrationResult { accuracy: 0.5, precision: 0.05 }));
        assert!(!policy.passes(&CalibrationResult { accuracy: 0.3, precision: 0.1 }));
    }

    #[test]
    fn test_good_calibration_accepted_without_prompt() {
        let control = control(&["calibration started"]);
        let telemetry = ScriptedSub::new(metrics(0.3, 0.05));
        let mut operator = ScriptedOperator::new(&[]);
        let mut monitor = CalibrationMonitor::new(CalibrationPolicy::default(), 0);

        let outcome = monitor.run(&control, &telemetry, &mut operator).unwrap();

        assert_eq!(outcome.decision, CalibrationDecision::Accepted);
        assert_eq!(outcome.result, CalibrationResult { accuracy: 0.3, precision: 0.05 });
        assert_eq!(outcome.attempts, 1);
        assert!(operator.prompts.is_empty());
        assert_eq!(control.client().request_log(), vec!["C"]);
        assert_eq!(
            monitor.state(),
            CalibrationState::Accepted(CalibrationDecision::Accepted)
        );
    }

    #[test]
    fn test_retry_resets_metrics_and_reissues_start() {
        let control = control(&["started", "started"]);
        let mut messages = metrics(0.8, 0.05);
        messages.extend(metrics(0.4, 0.06));
        let telemetry = ScriptedSub::new(messages);
        let mut operator = ScriptedOperator::new(&[RetryDecision::Retry]);
        let mut monitor = CalibrationMonitor::new(CalibrationPolicy::default(), 0);

        let outcome = monitor.run(&control, &telemetry, &mut operator).unwrap();

        assert_eq!(operator.prompts, vec![CalibrationResult { accuracy: 0.8, precision: 0.05 }]);
        assert_eq!(control.client().request_log(), vec!["C", "C"]);
        // Second attempt values, not leftovers from the first
        assert_eq!(outcome.result, CalibrationResult { accuracy: 0.4, precision: 0.06 });
        assert_eq!(outcome.decision, CalibrationDecision::Accepted);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(telemetry.remaining(), 0);
    }

    #[test]
    fn test_override_keeps_failing_values() {
        let control = control(&["started"]);
        let telemetry = ScriptedSub::new(metrics(0.8, 0.05));
        let mut operator = ScriptedOperator::new(&[RetryDecision::Continue]);
        let mut monitor = CalibrationMonitor::new(CalibrationPolicy::default(), 0);

        let outcome = monitor.run(&control, &telemetry, &mut operator).unwrap();

        assert_eq!(outcome.decision, CalibrationDecision::AcceptedWithOverride);
        assert_eq!(outcome.result, CalibrationResult { accuracy: 0.8, precision: 0.05 });
        assert_eq!(operator.prompts.len(), 1);
        assert_eq!(control.client().request_log(), vec!["C"]);
    }

    #[test]
    fn test_undecodable_records_are_skipped() {
        let control = control(&["started"]);
        let mut messages = vec![(b"logging.debug".to_vec(), vec![0xc1, 0x00])];
        messages.extend(metrics(0.2, 0.02));
        let telemetry = ScriptedSub::new(messages);
        let mut operator = ScriptedOperator::new(&[]);
        let mut monitor = CalibrationMonitor::new(CalibrationPolicy::default(), 0);

        let outcome = monitor.run(&control, &telemetry, &mut operator).unwrap();
        assert_eq!(outcome.decision, CalibrationDecision::Accepted);
    }

    #[test]
    fn test_closed_decision_input_is_an_error() {
        let control = control(&["started"]);
        let telemetry = ScriptedSub::new(metrics(0.9, 0.5));
        let mut operator = ScriptedOperator::new(&[]);
        let mut monitor = CalibrationMonitor::new(CalibrationPolicy::default(), 0);

        let result = monitor.run(&control, &telemetry, &mut operator);
        assert!(matches!(result, Err(PupilError::DecisionInputClosed)));
        assert_eq!(monitor.state(), CalibrationState::Evaluating);
    }

    #[test]
    fn test_telemetry_timeout_is_typed() {
        let control = control(&["started"]);
        let telemetry = ScriptedSub::new(vec![log_line("Angular accuracy: 0.3 deg")]);
        let mut operator = ScriptedOperator::new(&[]);
        let mut monitor = CalibrationMonitor::new(CalibrationPolicy::default(), 50);

        let result = monitor.run(&control, &telemetry, &mut operator);
        match result {
            Err(PupilError::Timeout {
                request,
                timeout_ms,
            }) => {
                assert_eq!(request, "logging");
                assert_eq!(timeout_ms, 50);
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
        assert_eq!(monitor.state(), CalibrationState::AwaitingMetrics);
        assert_eq!(monitor.result().accuracy, 0.3);
    }
}
