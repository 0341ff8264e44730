//! The view a running process has of the simulation.

use deltasim_common::{Value, ValueError};

use crate::error::{SimError, UsageError};
use crate::event::{EventId, EventState};
use crate::kernel::{Core, TimerTarget};
use crate::process::ProcessId;
use crate::signal::{Driver, ResetSpec, SignalId};
use crate::time::SimTime;

/// Handed to a process body for the duration of one resume.
///
/// Reads return committed values only; writes are staged until the next
/// commit. Nothing another process does in the same delta cycle is visible
/// through this context.
pub struct ProcessContext<'a> {
    core: &'a mut Core,
    pid: ProcessId,
    reads: Option<Vec<SignalId>>,
    written: Vec<SignalId>,
}

impl<'a> ProcessContext<'a> {
    pub(crate) fn new(core: &'a mut Core, pid: ProcessId) -> Self {
        Self {
            core,
            pid,
            reads: None,
            written: Vec::new(),
        }
    }

    /// Signals written during this resume.
    pub(crate) fn into_written(self) -> Vec<SignalId> {
        self.written
    }

    /// Starts recording every signal read, for inferred sensitivity.
    pub(crate) fn track_reads(&mut self) {
        self.reads = Some(Vec::new());
    }

    pub(crate) fn take_reads(&mut self) -> Vec<SignalId> {
        self.reads.take().unwrap_or_default()
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.core.time
    }

    /// Full hierarchical name of the running process.
    pub fn name(&self) -> &str {
        self.core.process_name(self.pid)
    }

    /// The committed value of `signal`.
    pub fn read(&mut self, signal: SignalId) -> Result<Value, SimError> {
        let value = self.core.signal(signal)?.current;
        if let Some(reads) = &mut self.reads {
            if !reads.contains(&signal) {
                reads.push(signal);
            }
        }
        Ok(value)
    }

    /// Reads `signal` as a boolean; vectors are true when non-zero.
    pub fn read_bool(&mut self, signal: SignalId) -> Result<bool, SimError> {
        Ok(self.read(signal)?.is_truthy())
    }

    /// Reads `signal` as an unsigned integer.
    pub fn read_u64(&mut self, signal: SignalId) -> Result<u64, SimError> {
        let value = self.read(signal)?;
        value.to_u64().ok_or_else(|| {
            SimError::Value(ValueError::Overflow {
                value: value.to_i64().unwrap_or_default() as i128,
                ty: "u64".to_string(),
            })
        })
    }

    /// Reads `signal` as a signed integer.
    pub fn read_i64(&mut self, signal: SignalId) -> Result<i64, SimError> {
        let value = self.read(signal)?;
        value.to_i64().ok_or_else(|| {
            SimError::Value(ValueError::Overflow {
                value: value.to_bits() as i128,
                ty: "i64".to_string(),
            })
        })
    }

    /// Stages `value` for `signal`; it becomes visible after the next commit.
    pub fn write(&mut self, signal: SignalId, value: impl Into<Value>) -> Result<(), SimError> {
        self.core
            .stage_write(signal, value.into(), Driver::Process(self.pid))?;
        if !self.written.contains(&signal) {
            self.written.push(signal);
        }
        Ok(())
    }

    /// Stages a boolean write.
    pub fn write_bool(&mut self, signal: SignalId, value: bool) -> Result<(), SimError> {
        self.write(signal, Value::Bool(value))
    }

    /// Stages an integer write, failing if `raw` does not fit the signal type.
    pub fn write_u64(&mut self, signal: SignalId, raw: u64) -> Result<(), SimError> {
        let value = self.core.signal(signal)?.ty.value_from_u64(raw)?;
        self.write(signal, value)
    }

    /// Stages an integer write truncated to the signal width.
    pub fn write_wrapped(&mut self, signal: SignalId, raw: u64) -> Result<(), SimError> {
        let value = self.core.signal(signal)?.ty.wrap_u64(raw);
        self.write(signal, value)
    }

    /// The value `signal` was declared with.
    pub fn initial_value(&self, signal: SignalId) -> Result<Value, SimError> {
        Ok(self.core.signal(signal)?.init)
    }

    /// The reset specification of `signal`.
    pub fn reset_spec(&self, signal: SignalId) -> Result<ResetSpec, SimError> {
        let state = self.core.signal(signal)?;
        state.reset.ok_or_else(|| {
            UsageError::NotAReset {
                signal: state.name.clone(),
            }
            .into()
        })
    }

    /// Returns `true` if the reset `signal` is currently asserted.
    pub fn reset_asserted(&self, signal: SignalId) -> Result<bool, SimError> {
        let spec = self.reset_spec(signal)?;
        Ok(spec.is_asserted(&self.core.signal(signal)?.current))
    }

    /// Signals this process declared it drives.
    pub fn drives(&self) -> &[SignalId] {
        self.core
            .processes
            .get(self.pid)
            .map(|p| p.drives.as_slice())
            .unwrap_or_default()
    }

    /// Creates an event named after the running process.
    pub fn new_event(&mut self, name: &str) -> EventId {
        let full = format!("{}.{name}", self.name());
        self.core.events.alloc(EventState::new(full))
    }

    /// Wakes every process waiting on `event` in the current delta cycle.
    pub fn fire(&mut self, event: EventId) -> Result<(), SimError> {
        Ok(self.core.fire(event)?)
    }

    /// Fires `event` after `delay_fs` femtoseconds.
    pub fn fire_after(&mut self, event: EventId, delay_fs: u64) -> Result<(), SimError> {
        self.core.event(event)?;
        let at = self.core.time.fs.saturating_add(delay_fs);
        self.core.push_timer(at, TimerTarget::Fire(event));
        Ok(())
    }

    /// Ends the simulation once this process suspends. Writes not yet
    /// committed are discarded.
    pub fn stop(&mut self) {
        self.core.stop_requested = true;
    }

    /// Fails with [`SimError::AssertionFailed`] unless `condition` holds.
    pub fn check(&self, condition: bool, message: impl Into<String>) -> Result<(), SimError> {
        if condition {
            Ok(())
        } else {
            Err(SimError::AssertionFailed {
                message: message.into(),
            })
        }
    }

    /// Builds the error a process returns after waiting `cycles` times for
    /// `what` without success.
    pub fn timeout(&self, what: impl Into<String>, cycles: u64) -> SimError {
        SimError::Timeout {
            what: what.into(),
            cycles,
        }
    }
}
