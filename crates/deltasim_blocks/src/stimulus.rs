//! Scripted testbench stimulus.
//!
//! A [`Script`] is a list of [`Step`]s executed by one free-running
//! process. Writes and checks run back to back; delays and edges suspend the
//! process. Because writes are buffered, an `expect` right after a `write`
//! of the same signal still sees the old value; put a delay or an edge in
//! between.

use deltasim_kernel::{
    Edge, EventId, Process, ProcessBody, ProcessContext, ProcessKind, SignalId, SimError,
    Trigger, Value, Wait,
};
use tracing::debug;

/// One scripted action.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Write `value` to `signal`.
    Write {
        /// Target signal.
        signal: SignalId,
        /// Value to write.
        value: Value,
    },
    /// Suspend for a number of femtoseconds.
    Delay(u64),
    /// Suspend until `edge` of `signal`.
    Edge {
        /// Watched signal.
        signal: SignalId,
        /// Transition to wait for.
        edge: Edge,
    },
    /// Fail the run unless `signal` currently holds `value`.
    Expect {
        /// Checked signal.
        signal: SignalId,
        /// Required value.
        value: Value,
    },
    /// Fire an event.
    Fire(EventId),
    /// Stop the simulation.
    Stop,
}

/// A sequence of steps run by one process.
#[derive(Clone, Debug, Default)]
pub struct Script {
    steps: Vec<Step>,
    next: usize,
}

impl Script {
    /// An empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Appends a write.
    pub fn write(self, signal: SignalId, value: impl Into<Value>) -> Self {
        self.step(Step::Write {
            signal,
            value: value.into(),
        })
    }

    /// Appends a delay.
    pub fn delay(self, fs: u64) -> Self {
        self.step(Step::Delay(fs))
    }

    /// Appends a wait for the next rising edge of `signal`.
    pub fn posedge(self, signal: SignalId) -> Self {
        self.step(Step::Edge {
            signal,
            edge: Edge::Pos,
        })
    }

    /// Appends a wait for the next falling edge of `signal`.
    pub fn negedge(self, signal: SignalId) -> Self {
        self.step(Step::Edge {
            signal,
            edge: Edge::Neg,
        })
    }

    /// Appends a value check.
    pub fn expect(self, signal: SignalId, value: impl Into<Value>) -> Self {
        self.step(Step::Expect {
            signal,
            value: value.into(),
        })
    }

    /// Appends an event fire.
    pub fn fire(self, event: EventId) -> Self {
        self.step(Step::Fire(event))
    }

    /// Appends a stop.
    pub fn stop(self) -> Self {
        self.step(Step::Stop)
    }

    /// The steps in order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Wraps the script in a free-running process that drives every signal
    /// it writes.
    pub fn into_process(self, name: impl Into<String>) -> Process {
        let mut written = Vec::new();
        for step in &self.steps {
            if let Step::Write { signal, .. } = step {
                written.push(*signal);
            }
        }
        Process::with_kind(name, ProcessKind::FreeRunning, self).drives(written)
    }
}

impl ProcessBody for Script {
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        while let Some(step) = self.steps.get(self.next) {
            self.next += 1;
            match step {
                Step::Write { signal, value } => ctx.write(*signal, *value)?,
                Step::Delay(fs) => return Ok(Wait::delay(*fs)),
                Step::Edge { signal, edge } => {
                    return Ok(Wait::on(Trigger::Edge(*signal, *edge)));
                }
                Step::Expect { signal, value } => {
                    let actual = ctx.read(*signal)?;
                    ctx.check(
                        actual == *value,
                        format!(
                            "step {}: expected {value}, found {actual} at {}",
                            self.next,
                            ctx.now()
                        ),
                    )?;
                }
                Step::Fire(event) => ctx.fire(*event)?,
                Step::Stop => {
                    debug!(process = ctx.name(), time = %ctx.now(), "script stop");
                    ctx.stop();
                    return Ok(Wait::Done);
                }
            }
        }
        Ok(Wait::Done)
    }
}
