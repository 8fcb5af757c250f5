// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Experiment procedure over a pair of capture hosts
//!
//! Stages run in order, starting from the configured stage:
//! 2. calibration of the slave, then the master host
//! 3. stimulus segments, one recording, each segment bracketed by
//!    `start_<name>` / `stop_<name>` annotations
//! 4. free conversations, one recording each
//!
//! Presentation itself is delegated to a [`SegmentRunner`].

use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;
use syncc_config::{ProcedureConfig, Role};
use syncc_pupil::{CalibrationOutcome, DecisionSource, PupilResult, Session};
use tracing::info;

use crate::{RunnerError, RunnerResult};

/// Instruction animations shown around the two calibrations
const CALIBRATION_INSTRUCTIONS: [&str; 3] = ["calib_anim_1", "calib_anim_2", "calib_anim_3"];

/// Procedure stage, numbered as on the operator console
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Calibration = 2,
    Stimuli = 3,
    FreeConversation = 4,
}

impl TryFrom<u8> for Stage {
    type Error = RunnerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Stage::Calibration),
            3 => Ok(Stage::Stimuli),
            4 => Ok(Stage::FreeConversation),
            other => Err(RunnerError::UnknownStage(other)),
        }
    }
}

/// Recording and annotation operations the procedure needs from the hosts
pub trait CaptureControl {
    fn start_recording(&self, session_name: &str) -> PupilResult<()>;
    fn stop_recording(&self) -> PupilResult<()>;
    fn annotate(&self, label: &str) -> PupilResult<()>;
    fn calibrate<D: DecisionSource + ?Sized>(
        &self,
        role: Role,
        decisions: &mut D,
    ) -> PupilResult<CalibrationOutcome>;
}

impl CaptureControl for Session {
    fn start_recording(&self, session_name: &str) -> PupilResult<()> {
        Session::start_recording(self, session_name)
    }

    fn stop_recording(&self) -> PupilResult<()> {
        Session::stop_recording(self)
    }

    fn annotate(&self, label: &str) -> PupilResult<()> {
        Session::annotate(self, label).map(|_| ())
    }

    fn calibrate<D: DecisionSource + ?Sized>(
        &self,
        role: Role,
        decisions: &mut D,
    ) -> PupilResult<CalibrationOutcome> {
        Session::calibrate(self, role, decisions)
    }
}

/// The person at the console
pub trait Operator: DecisionSource {
    /// Block until the operator acknowledges `prompt`
    fn confirm(&mut self, prompt: &str) -> RunnerResult<()>;
}

/// A stretch of the procedure presented to the participants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    /// Fixed length, or `None` when the segment ends on its own
    pub duration: Option<Duration>,
}

impl Segment {
    pub fn open(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration: None,
        }
    }

    pub fn timed(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration: Some(duration),
        }
    }
}

/// Presents segments; returns once the segment has finished
pub trait SegmentRunner {
    fn run_segment(&mut self, segment: &Segment) -> RunnerResult<()>;
}

/// What happened during a run
#[derive(Debug, Clone, Default)]
pub struct ProcedureReport {
    pub calibrations: Vec<(Role, CalibrationOutcome)>,
    /// Stimulus segments in presentation order
    pub segment_order: Vec<String>,
    pub conversations: usize,
}

pub struct Procedure<'a, C: CaptureControl> {
    capture: &'a C,
    config: &'a ProcedureConfig,
    session_name: String,
}

impl<'a, C: CaptureControl> Procedure<'a, C> {
    pub fn new(capture: &'a C, config: &'a ProcedureConfig, session_name: impl Into<String>) -> Self {
        Self {
            capture,
            config,
            session_name: session_name.into(),
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Run every stage from the configured start stage on.
    ///
    /// The console both answers prompts and presents segments.
    pub fn run<K, R>(&self, console: &mut K, rng: &mut R) -> RunnerResult<ProcedureReport>
    where
        K: Operator + SegmentRunner + ?Sized,
        R: Rng + ?Sized,
    {
        let start = Stage::try_from(self.config.start_stage)?;
        info!("Procedure '{}' starting at {:?}", self.session_name, start);

        let mut report = ProcedureReport::default();

        if start <= Stage::Calibration {
            report.calibrations = self.run_calibration(console)?;
        }
        if start <= Stage::Stimuli {
            report.segment_order = self.run_stimuli(console, rng)?;
        }
        if start <= Stage::FreeConversation {
            report.conversations = self.run_free_conversations(console)?;
        }

        info!("Procedure '{}' finished", self.session_name);
        Ok(report)
    }

    fn present<S: SegmentRunner + ?Sized>(&self, runner: &mut S, segment: &Segment) -> RunnerResult<()> {
        self.capture.annotate(&format!("start_{}", segment.name))?;
        runner.run_segment(segment)?;
        self.capture.annotate(&format!("stop_{}", segment.name))?;
        Ok(())
    }

    fn calibrate_host<O: Operator + ?Sized>(
        &self,
        role: Role,
        operator: &mut O,
        calibrations: &mut Vec<(Role, CalibrationOutcome)>,
    ) -> RunnerResult<()> {
        operator.confirm(&format!("Press Enter to begin {} calibration", role))?;
        if self.config.debug_mode {
            info!("Debug mode: skipping {} calibration", role);
            return Ok(());
        }

        let outcome = self.capture.calibrate(role, operator)?;
        info!(
            "{} calibration: accuracy {} precision {} ({:?}, {} attempt(s))",
            role,
            outcome.result.accuracy,
            outcome.result.precision,
            outcome.decision,
            outcome.attempts
        );
        calibrations.push((role, outcome));
        Ok(())
    }

    fn run_calibration<K>(&self, console: &mut K) -> RunnerResult<Vec<(Role, CalibrationOutcome)>>
    where
        K: Operator + SegmentRunner + ?Sized,
    {
        info!("Stage 2: calibration");
        let mut calibrations = Vec::new();

        console.confirm("Press Enter to begin the calibration instruction")?;
        self.present(console, &Segment::open(CALIBRATION_INSTRUCTIONS[0]))?;

        console.confirm("Switch the display to the slave participant, then press Enter")?;
        self.calibrate_host(Role::Slave, console, &mut calibrations)?;

        console.confirm("Switch the display to the master participant, then press Enter")?;
        self.present(console, &Segment::open(CALIBRATION_INSTRUCTIONS[1]))?;
        self.calibrate_host(Role::Master, console, &mut calibrations)?;

        console.confirm("Press Enter if the calibration was successful")?;
        self.present(console, &Segment::open(CALIBRATION_INSTRUCTIONS[2]))?;

        Ok(calibrations)
    }

    fn run_stimuli<K, R>(&self, console: &mut K, rng: &mut R) -> RunnerResult<Vec<String>>
    where
        K: Operator + SegmentRunner + ?Sized,
        R: Rng + ?Sized,
    {
        info!("Stage 3: stimuli");
        let mut order = self.config.segments.clone();
        if self.config.shuffle_segments {
            order.shuffle(rng);
        }
        info!("Segment order: {}", order.join(", "));

        self.capture.start_recording(&self.session_name)?;
        console.confirm("Press Enter to begin the stimulus procedure")?;

        for name in &order {
            self.present(console, &Segment::open(name.as_str()))?;
        }

        self.capture.stop_recording()?;
        Ok(order)
    }

    fn run_free_conversations<K>(&self, console: &mut K) -> RunnerResult<usize>
    where
        K: Operator + SegmentRunner + ?Sized,
    {
        info!("Stage 4: free conversation");
        let countdown = Duration::from_secs(self.config.free_conversation_countdown_s);
        let length = Duration::from_secs(self.config.free_conversation_length_s);

        for index in 1..=self.config.free_conversations {
            console.confirm(&format!("Press Enter to begin free conversation {}", index))?;
            self.capture.start_recording(&self.session_name)?;

            self.capture.annotate("start_countdown_free")?;
            console.run_segment(&Segment::timed("countdown_free", countdown))?;
            self.capture.annotate("start_free_convo")?;
            console.run_segment(&Segment::timed("free_convo", length))?;
            self.capture.annotate("stop_free_convo")?;

            self.capture.stop_recording()?;
        }

        Ok(self.config.free_conversations)
    }
}
