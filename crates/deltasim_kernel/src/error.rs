//! Error types for simulation construction and execution.
//!
//! Misuse of the kernel API is reported as a [`UsageError`], raised at the
//! point of misuse. Everything that stops a run, including failures inside
//! process bodies, surfaces as a [`SimError`].

use std::io;

use deltasim_common::ValueError;

use crate::time::SimTime;

/// The kernel API was used in a way it does not support.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    /// A signal handle does not belong to this simulation.
    #[error("unknown signal handle #{0}")]
    UnknownSignal(u32),

    /// An event handle does not belong to this simulation.
    #[error("unknown event handle #{0}")]
    UnknownEvent(u32),

    /// A process handle does not belong to this simulation.
    #[error("unknown process handle #{0}")]
    UnknownProcess(u32),

    /// A value was written to a signal of a different type.
    #[error("cannot write {value} to signal '{signal}' of type {expected}")]
    TypeMismatch {
        /// Signal name.
        signal: String,
        /// Display form of the signal type.
        expected: String,
        /// Display form of the rejected value.
        value: String,
    },

    /// Two different processes wrote one signal in the same delta cycle.
    #[error("signal '{signal}' written by both '{first}' and '{second}' in one delta cycle")]
    MultipleDrivers {
        /// Signal name.
        signal: String,
        /// The writer that got there first.
        first: String,
        /// The conflicting writer.
        second: String,
    },

    /// Two processes declared that they drive the same signal.
    #[error("signal '{signal}' is already driven by '{owner}', cannot also be driven by '{process}'")]
    ConflictingDrivers {
        /// Signal name.
        signal: String,
        /// The process already declared as its driver.
        owner: String,
        /// The process whose declaration was rejected.
        process: String,
    },

    /// A process wrote a signal owned by other processes.
    #[error("process '{process}' writes signal '{signal}' without declaring it as driven")]
    UndeclaredDriver {
        /// Signal name.
        signal: String,
        /// The offending process.
        process: String,
    },

    /// A combinational process asked to be woken after a delay.
    #[error("combinational process '{process}' cannot wait on a timeout")]
    TimedWaitInCombinational {
        /// Process name.
        process: String,
    },

    /// A combinational process drives one of its own inputs.
    #[error("combinational process '{process}' writes signal '{signal}' it is sensitive to")]
    CombinationalFeedback {
        /// Process name.
        process: String,
        /// The signal both read and written.
        signal: String,
    },

    /// A process suspended on nothing, so it could never wake again.
    #[error("process '{process}' waits with no triggers and no timeout")]
    EmptyWait {
        /// Process name.
        process: String,
    },

    /// A process was resumed while its body was already running.
    #[error("process '{process}' resumed while already running")]
    Reentrant {
        /// Process name.
        process: String,
    },

    /// A signal without a reset specification was used as a reset.
    #[error("signal '{signal}' is not a reset signal")]
    NotAReset {
        /// Signal name.
        signal: String,
    },

    /// A clocked process has a reset but no declared outputs to return to
    /// their initial values.
    #[error("process '{process}' has a reset but drives no signals to reset")]
    ResetWithoutDrives {
        /// Process name.
        process: String,
    },

    /// Two block instances resolved to the same hierarchical path.
    #[error("duplicate instance path '{path}'")]
    DuplicateInstance {
        /// The repeated path.
        path: String,
    },

    /// A block was instantiated with a parameter it cannot work with.
    #[error("invalid parameter {name} for '{block}': {reason}")]
    InvalidParameter {
        /// Instance path of the block.
        block: String,
        /// Parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Elaboration was attempted after the first run started.
    #[error("cannot add {what} after the simulation has started")]
    AlreadyStarted {
        /// What was being added.
        what: &'static str,
    },
}

/// Errors that end a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The kernel API was misused.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// A value could not be built for a signal type.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// The delta cycles at one instant did not reach a fixed point.
    #[error("no convergence at {time} after {max_deltas} delta cycles; still changing: {}", .signals.join(", "))]
    Convergence {
        /// The instant at which the cap was hit.
        time: SimTime,
        /// The configured delta cap.
        max_deltas: u32,
        /// Signals that changed in the last delta cycle.
        signals: Vec<String>,
    },

    /// Processes kept resuming at one instant without changing any signal.
    #[error("no progress at {time}: resumed more than {limit} times without advancing time: {}", .processes.join(", "))]
    Livelock {
        /// The instant at which the limit was hit.
        time: SimTime,
        /// Resumes allowed per process at one instant.
        limit: u32,
        /// Processes that used at least half of that allowance.
        processes: Vec<String>,
    },

    /// A design check inside a process body failed.
    #[error("assertion failed: {message}")]
    AssertionFailed {
        /// The assertion message.
        message: String,
    },

    /// A process gave up waiting after a fixed budget.
    #[error("timed out waiting for {what} after {cycles} cycles")]
    Timeout {
        /// What the process was waiting for.
        what: String,
        /// The exhausted budget.
        cycles: u64,
    },

    /// A process body returned an error; the run was aborted.
    #[error("process '{process}' failed at {time}: {source}")]
    ProcessFailed {
        /// Full hierarchical process name.
        process: String,
        /// Simulated time of the failure.
        time: SimTime,
        /// The error returned by the body.
        source: Box<SimError>,
    },

    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),
}

impl SimError {
    /// The innermost error, looking through [`SimError::ProcessFailed`].
    pub fn root_cause(&self) -> &SimError {
        match self {
            SimError::ProcessFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The usage error behind this failure, if any.
    pub fn as_usage(&self) -> Option<&UsageError> {
        match self.root_cause() {
            SimError::Usage(e) => Some(e),
            _ => None,
        }
    }
}
