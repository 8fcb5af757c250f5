//! Line-based operator console

use std::io::{self, BufRead, Write};
use std::thread;
use syncc_pupil::{CalibrationResult, DecisionSource, PupilError, PupilResult, RetryDecision};
use tracing::{debug, info};

use crate::procedure::{Operator, Segment, SegmentRunner};
use crate::RunnerResult;

/// Operator console over any line reader and writer.
///
/// Timed segments sleep for their duration; open-ended segments wait for
/// the operator to press Enter.
pub struct ConsoleOperator<R, W> {
    input: R,
    output: W,
}

/// Console bound to the process stdin and stdout
pub type StdinOperator = ConsoleOperator<io::StdinLock<'static>, io::Stdout>;

impl StdinOperator {
    pub fn stdin() -> Self {
        ConsoleOperator::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleOperator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Show `prompt` and read one line; `None` at end of input
    fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead, W: Write> DecisionSource for ConsoleOperator<R, W> {
    fn await_decision(&mut self, result: &CalibrationResult) -> PupilResult<RetryDecision> {
        let prompt = format!(
            "Calibration below threshold (accuracy {}, precision {}). Recalibrate? [y/n] ",
            result.accuracy, result.precision
        );

        loop {
            let answer = self
                .ask(&prompt)
                .map_err(|_| PupilError::DecisionInputClosed)?
                .ok_or(PupilError::DecisionInputClosed)?;

            match answer.to_ascii_lowercase().as_str() {
                "y" => return Ok(RetryDecision::Retry),
                "n" => return Ok(RetryDecision::Continue),
                other => debug!("Ignoring operator answer '{}'", other),
            }
        }
    }
}

impl<R: BufRead, W: Write> Operator for ConsoleOperator<R, W> {
    fn confirm(&mut self, prompt: &str) -> RunnerResult<()> {
        match self.ask(&format!("{} ", prompt))? {
            Some(_) => Ok(()),
            None => Err(PupilError::DecisionInputClosed.into()),
        }
    }
}

impl<R: BufRead, W: Write> SegmentRunner for ConsoleOperator<R, W> {
    fn run_segment(&mut self, segment: &Segment) -> RunnerResult<()> {
        match segment.duration {
            Some(duration) => {
                info!("Running '{}' for {:?}", segment.name, duration);
                writeln!(self.output, "{}: {} s", segment.name, duration.as_secs())?;
                thread::sleep(duration);
                Ok(())
            }
            None => self.confirm(&format!(
                "Present '{}' and press Enter when it has finished",
                segment.name
            )),
        }
    }
}
