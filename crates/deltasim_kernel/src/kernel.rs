//! The simulation kernel: delta-cycle scheduling, commit, and time advance.
//!
//! One [`Simulation`] owns every signal, event and process of a run. Its
//! main loop alternates three phases:
//!
//! 1. run every runnable process until it suspends (writes are only staged);
//! 2. commit all staged writes at once and wake processes waiting on the
//!    signals that changed, staying at the same instant;
//! 3. once a commit changes nothing, advance time to the earliest timed wait.
//!
//! Runs end when nothing is left to do, when a process calls
//! [`ProcessContext::stop`](crate::ProcessContext::stop), or when the time
//! bound is reached.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap, VecDeque};

use serde::Serialize;
use tracing::{debug, trace, warn};

use deltasim_common::{Value, ValueType};

use crate::arena::Arena;
use crate::block::{Block, InstanceRecord, Registry, Scope};
use crate::context::ProcessContext;
use crate::error::{SimError, UsageError};
use crate::event::{EventId, EventState};
use crate::process::{Process, ProcessBody, ProcessId, ProcessInfo, ProcessKind, Trigger, Wait};
use crate::signal::{
    Driver, DriverPolicy, ResetSpec, Resolution, SignalId, SignalInfo, SignalState,
};
use crate::time::SimTime;
use crate::waveform::{declare_signals, WaveformRecorder};
use crate::SimConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ProcessState {
    Runnable,
    Running,
    Waiting,
    Done,
}

pub(crate) struct ProcessEntry {
    pub name: String,
    pub kind: ProcessKind,
    /// `None` while the body is running.
    pub body: Option<Box<dyn ProcessBody>>,
    pub drives: Vec<SignalId>,
    pub sensitivity: Vec<Trigger>,
    pub inferred: bool,
    pub reset: Option<SignalId>,
    pub state: ProcessState,
    pub subscriptions: Vec<Trigger>,
    /// Bumped on every wake; timers carrying an older value are stale.
    pub generation: u64,
}

impl ProcessEntry {
    fn info(&self) -> ProcessInfo {
        ProcessInfo {
            name: self.name.clone(),
            kind: self.kind,
            sensitivity: self.sensitivity.clone(),
            inferred: self.inferred,
            drives: self.drives.clone(),
            reset: self.reset,
        }
    }
}

/// What happens when a timer expires.
#[derive(Clone, Copy, Debug)]
pub(crate) enum TimerTarget {
    Resume { pid: ProcessId, generation: u64 },
    Fire(EventId),
    Drive { signal: SignalId, value: Value },
}

#[derive(Debug)]
pub(crate) struct Timer {
    fs: u64,
    /// Insertion order, so timers at one instant fire first-in first-out.
    seq: u64,
    target: TimerTarget,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.fs == other.fs && self.seq == other.seq
    }
}

impl Eq for Timer {}

impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fs.cmp(&other.fs).then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Scheduler state shared with running processes through
/// [`ProcessContext`].
pub(crate) struct Core {
    pub policy: DriverPolicy,
    pub time: SimTime,
    pub signals: Arena<SignalId, SignalState>,
    pub events: Arena<EventId, EventState>,
    pub processes: Arena<ProcessId, ProcessEntry>,
    pub runnable: VecDeque<ProcessId>,
    pub pending_commits: Vec<SignalId>,
    timers: BinaryHeap<Reverse<Timer>>,
    timer_seq: u64,
    /// Incremented by every commit; identifies the current delta cycle.
    delta_serial: u64,
    pub stop_requested: bool,
}

impl Core {
    fn new(policy: DriverPolicy) -> Self {
        Self {
            policy,
            time: SimTime::zero(),
            signals: Arena::default(),
            events: Arena::default(),
            processes: Arena::default(),
            runnable: VecDeque::new(),
            pending_commits: Vec::new(),
            timers: BinaryHeap::new(),
            timer_seq: 0,
            delta_serial: 0,
            stop_requested: false,
        }
    }

    pub fn signal(&self, id: SignalId) -> Result<&SignalState, UsageError> {
        self.signals
            .get(id)
            .ok_or(UsageError::UnknownSignal(id.as_raw()))
    }

    fn signal_mut(&mut self, id: SignalId) -> Result<&mut SignalState, UsageError> {
        self.signals
            .get_mut(id)
            .ok_or(UsageError::UnknownSignal(id.as_raw()))
    }

    pub fn event(&self, id: EventId) -> Result<&EventState, UsageError> {
        self.events
            .get(id)
            .ok_or(UsageError::UnknownEvent(id.as_raw()))
    }

    pub fn process_name(&self, pid: ProcessId) -> &str {
        self.processes
            .get(pid)
            .map_or("<unknown>", |p| p.name.as_str())
    }

    fn driver_name(&self, driver: Driver) -> String {
        match driver {
            Driver::Process(pid) => self.process_name(pid).to_string(),
            Driver::External => "<external>".to_string(),
        }
    }

    /// Stages `value` for `id`, applying type checks, ownership and the
    /// multi-writer rules.
    pub fn stage_write(
        &mut self,
        id: SignalId,
        value: Value,
        driver: Driver,
    ) -> Result<(), SimError> {
        let policy = self.policy;
        let serial = self.delta_serial;
        let signal = self.signal(id)?;

        if !signal.ty.accepts(&value) {
            return Err(UsageError::TypeMismatch {
                signal: signal.name.clone(),
                expected: signal.ty.to_string(),
                value: value.to_string(),
            }
            .into());
        }

        if let Driver::Process(pid) = driver {
            if !signal.owners.is_empty() && !signal.owners.contains(&pid) {
                let process = self.process_name(pid).to_string();
                match policy {
                    DriverPolicy::Exclusive => {
                        return Err(UsageError::UndeclaredDriver {
                            signal: signal.name.clone(),
                            process,
                        }
                        .into());
                    }
                    DriverPolicy::LastWriteWins => {
                        warn!(signal = %signal.name, %process, "write from undeclared driver");
                    }
                }
            }
        }

        let mut staged = value;
        let earlier = signal
            .pending
            .zip(signal.last_writer)
            .filter(|(_, writer)| signal.pending_serial == serial && *writer != driver);
        if let Some((pending, first)) = earlier {
            match (signal.resolution, policy) {
                (Resolution::WiredOr, _) => staged = pending.wired_or(value),
                (Resolution::Exclusive, DriverPolicy::Exclusive) => {
                    return Err(UsageError::MultipleDrivers {
                        signal: signal.name.clone(),
                        first: self.driver_name(first),
                        second: self.driver_name(driver),
                    }
                    .into());
                }
                (Resolution::Exclusive, DriverPolicy::LastWriteWins) => {
                    warn!(
                        signal = %signal.name,
                        first = %self.driver_name(first),
                        second = %self.driver_name(driver),
                        time = %self.time,
                        "multiple drivers in one delta cycle, keeping the last write"
                    );
                }
            }
        }

        let signal = self.signal_mut(id)?;
        signal.pending = Some(staged);
        signal.pending_serial = serial;
        signal.last_writer = Some(driver);
        if !signal.queued && staged != signal.current {
            signal.queued = true;
            self.pending_commits.push(id);
        }
        Ok(())
    }

    /// Applies every staged write. Returns each changed signal with its
    /// previous value.
    fn commit(&mut self) -> Vec<(SignalId, Value)> {
        let mut changes = Vec::new();
        for id in std::mem::take(&mut self.pending_commits) {
            if let Some(signal) = self.signals.get_mut(id) {
                if let Some(old) = signal.commit() {
                    changes.push((id, old));
                }
            }
        }
        self.delta_serial += 1;
        changes
    }

    /// Drops all scheduled work: runnable processes, timers and staged writes.
    fn discard_pending(&mut self) {
        for id in std::mem::take(&mut self.pending_commits) {
            if let Some(signal) = self.signals.get_mut(id) {
                signal.discard();
            }
        }
        self.runnable.clear();
        self.timers.clear();
    }

    /// Makes a waiting process runnable, dropping all of its subscriptions.
    fn wake(&mut self, pid: ProcessId) {
        let Some(entry) = self.processes.get_mut(pid) else {
            return;
        };
        if entry.state != ProcessState::Waiting {
            return;
        }
        entry.state = ProcessState::Runnable;
        entry.generation += 1;
        let subscriptions = std::mem::take(&mut entry.subscriptions);
        for trigger in subscriptions {
            match trigger {
                Trigger::Change(s) | Trigger::Edge(s, _) => {
                    if let Some(signal) = self.signals.get_mut(s) {
                        signal.unsubscribe(pid);
                    }
                }
                Trigger::Event(e) => {
                    if let Some(event) = self.events.get_mut(e) {
                        event.unsubscribe(pid);
                    }
                }
            }
        }
        self.runnable.push_back(pid);
    }

    /// Registers the wait a process just suspended on.
    fn subscribe(
        &mut self,
        pid: ProcessId,
        triggers: Vec<Trigger>,
        timeout: Option<u64>,
    ) -> Result<(), UsageError> {
        for trigger in &triggers {
            match *trigger {
                Trigger::Change(s) | Trigger::Edge(s, _) => {
                    self.signal(s)?;
                }
                Trigger::Event(e) => {
                    self.event(e)?;
                }
            }
        }
        for trigger in &triggers {
            match *trigger {
                Trigger::Change(s) => self.signal_mut(s)?.subscribe(pid, None),
                Trigger::Edge(s, edge) => self.signal_mut(s)?.subscribe(pid, Some(edge)),
                Trigger::Event(e) => {
                    if let Some(event) = self.events.get_mut(e) {
                        event.subscribe(pid);
                    }
                }
            }
        }

        let now = self.time.fs;
        let Some(entry) = self.processes.get_mut(pid) else {
            return Ok(());
        };
        entry.state = ProcessState::Waiting;
        entry.subscriptions = triggers;
        let generation = entry.generation;
        if let Some(delay) = timeout {
            self.push_timer(
                now.saturating_add(delay),
                TimerTarget::Resume { pid, generation },
            );
        }
        Ok(())
    }

    pub fn fire(&mut self, id: EventId) -> Result<(), UsageError> {
        let waiters = self
            .events
            .get_mut(id)
            .ok_or(UsageError::UnknownEvent(id.as_raw()))?
            .fire();
        for pid in waiters {
            self.wake(pid);
        }
        Ok(())
    }

    /// Wakes every waiter whose filter matches the committed changes.
    fn wake_waiters(&mut self, changes: &[(SignalId, Value)]) {
        let mut woken = Vec::new();
        for (id, old) in changes {
            if let Some(signal) = self.signals.get(*id) {
                woken.extend(
                    signal
                        .waiters
                        .iter()
                        .filter(|w| w.wakes_on(old, &signal.current))
                        .map(|w| w.pid),
                );
            }
        }
        for pid in woken {
            self.wake(pid);
        }
    }

    pub fn push_timer(&mut self, fs: u64, target: TimerTarget) {
        let seq = self.timer_seq;
        self.timer_seq += 1;
        self.timers.push(Reverse(Timer { fs, seq, target }));
    }

    fn next_timer_fs(&self) -> Option<u64> {
        self.timers.peek().map(|Reverse(t)| t.fs)
    }

    fn pop_timer_at(&mut self, fs: u64) -> Option<TimerTarget> {
        if self.next_timer_fs() == Some(fs) {
            self.timers.pop().map(|Reverse(t)| t.target)
        } else {
            None
        }
    }
}

/// Why a run returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No runnable process, staged write or timer is left.
    Quiescent,
    /// A process called `stop`.
    Stopped,
    /// The run reached its time bound; pending timers are kept.
    TimeLimit,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StopReason::Quiescent => "quiescent",
            StopReason::Stopped => "stopped",
            StopReason::TimeLimit => "time limit",
        };
        f.write_str(s)
    }
}

/// Outcome of a run call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Simulated time when the run returned.
    pub final_time: SimTime,
    /// Why it returned.
    pub reason: StopReason,
    /// Changing commits since the simulation started.
    pub total_deltas: u64,
    /// Most changing commits seen at a single instant.
    pub peak_deltas: u32,
    /// Process resumes since the simulation started.
    pub activations: u64,
}

/// A self-contained simulation run.
pub struct Simulation {
    core: Core,
    config: SimConfig,
    recorder: Option<Box<dyn WaveformRecorder>>,
    registry: Registry,
    started: bool,
    /// Set once the run was stopped or failed.
    finished: bool,
    deltas_here: u32,
    /// Resumes per process since time last advanced.
    resumes_here: BTreeMap<ProcessId, u32>,
    total_deltas: u64,
    peak_deltas: u32,
    activations: u64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Simulation {
    /// Creates an empty simulation.
    pub fn new(config: SimConfig) -> Self {
        Self {
            core: Core::new(config.driver_policy),
            config,
            recorder: None,
            registry: Registry::default(),
            started: false,
            finished: false,
            deltas_here: 0,
            resumes_here: BTreeMap::new(),
            total_deltas: 0,
            peak_deltas: 0,
            activations: 0,
        }
    }

    /// The configuration this simulation was created with.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    fn ensure_not_started(&self, what: &'static str) -> Result<(), UsageError> {
        if self.started {
            Err(UsageError::AlreadyStarted { what })
        } else {
            Ok(())
        }
    }

    /// Declares a signal of type `ty` holding `init`.
    pub fn signal(
        &mut self,
        name: impl Into<String>,
        ty: ValueType,
        init: Value,
    ) -> Result<SignalId, SimError> {
        self.ensure_not_started("signals")?;
        let name = name.into();
        if !ty.accepts(&init) {
            return Err(UsageError::TypeMismatch {
                signal: name,
                expected: ty.to_string(),
                value: init.to_string(),
            }
            .into());
        }
        Ok(self.core.signals.alloc(SignalState::new(name, ty, init)))
    }

    /// Declares a boolean signal.
    pub fn bool_signal(&mut self, name: impl Into<String>, init: bool) -> Result<SignalId, SimError> {
        self.signal(name, ValueType::Bool, Value::Bool(init))
    }

    /// Declares an unsigned vector signal.
    pub fn unsigned_signal(
        &mut self,
        name: impl Into<String>,
        width: u32,
        init: u64,
    ) -> Result<SignalId, SimError> {
        let ty = ValueType::unsigned(width)?;
        let init = ty.value_from_u64(init)?;
        self.signal(name, ty, init)
    }

    /// Declares a boolean reset signal at level `init`.
    pub fn reset_signal(
        &mut self,
        name: impl Into<String>,
        init: bool,
        spec: ResetSpec,
    ) -> Result<SignalId, SimError> {
        let id = self.bool_signal(name, init)?;
        self.core.signal_mut(id)?.reset = Some(spec);
        Ok(id)
    }

    /// Declares a signal that accepts several writers per delta cycle and
    /// commits the bitwise OR of their values.
    pub fn wired_or_signal(
        &mut self,
        name: impl Into<String>,
        ty: ValueType,
        init: Value,
    ) -> Result<SignalId, SimError> {
        let id = self.signal(name, ty, init)?;
        self.core.signal_mut(id)?.resolution = Resolution::WiredOr;
        Ok(id)
    }

    /// Declares an event.
    pub fn event(&mut self, name: impl Into<String>) -> EventId {
        self.core.events.alloc(EventState::new(name.into()))
    }

    /// A scope that prefixes every name it creates with `name`.
    pub fn scope(&mut self, name: &str) -> Scope<'_> {
        Scope::new(self, name.to_string())
    }

    /// Adds a process; it first runs in the opening delta cycle.
    pub fn add_process(&mut self, process: Process) -> Result<ProcessId, SimError> {
        self.ensure_not_started("processes")?;
        let Process {
            name,
            kind,
            body,
            drives,
            sensitivity,
            inferred,
            reset,
        } = process;

        for trigger in &sensitivity {
            match *trigger {
                Trigger::Change(s) | Trigger::Edge(s, _) => {
                    self.core.signal(s)?;
                }
                Trigger::Event(e) => {
                    self.core.event(e)?;
                }
            }
        }
        if let Some(reset) = reset {
            let signal = self.core.signal(reset)?;
            if signal.reset.is_none() {
                return Err(UsageError::NotAReset {
                    signal: signal.name.clone(),
                }
                .into());
            }
            if drives.is_empty() {
                return Err(UsageError::ResetWithoutDrives { process: name }.into());
            }
        }
        for &id in &drives {
            let signal = self.core.signal(id)?;
            if signal.resolution == Resolution::Exclusive {
                if let Some(&owner) = signal.owners.first() {
                    return Err(UsageError::ConflictingDrivers {
                        signal: signal.name.clone(),
                        owner: self.core.process_name(owner).to_string(),
                        process: name,
                    }
                    .into());
                }
            }
        }

        let pid = self.core.processes.alloc(ProcessEntry {
            name,
            kind,
            body: Some(body),
            drives: drives.clone(),
            sensitivity,
            inferred,
            reset,
            state: ProcessState::Runnable,
            subscriptions: Vec::new(),
            generation: 0,
        });
        for id in drives {
            self.core.signal_mut(id)?.owners.push(pid);
        }
        self.core.runnable.push_back(pid);
        Ok(pid)
    }

    /// Flattens a block tree into this simulation.
    ///
    /// Every process is renamed to `<instance path>.<process name>` and every
    /// instance is recorded in the [`Registry`].
    pub fn add_block(&mut self, block: Block) -> Result<(), SimError> {
        self.ensure_not_started("blocks")?;
        let Block {
            kind,
            path,
            processes,
            children,
        } = block;
        self.registry.register(InstanceRecord {
            path: path.clone(),
            kind,
            processes: processes.len(),
        })?;
        for mut process in processes {
            process.name = if path.is_empty() {
                process.name
            } else {
                format!("{path}.{}", process.name)
            };
            self.add_process(process)?;
        }
        for child in children {
            self.add_block(child)?;
        }
        Ok(())
    }

    /// Attaches a waveform recorder. Must happen before the first run.
    pub fn set_recorder(&mut self, recorder: Box<dyn WaveformRecorder>) -> Result<(), SimError> {
        self.ensure_not_started("a waveform recorder")?;
        self.recorder = Some(recorder);
        Ok(())
    }

    /// Drives `signal` to `value` from outside the design at absolute time
    /// `fs`. Times already passed are clamped to now.
    pub fn schedule_write(
        &mut self,
        fs: u64,
        signal: SignalId,
        value: impl Into<Value>,
    ) -> Result<(), SimError> {
        let value = value.into();
        let state = self.core.signal(signal)?;
        if !state.ty.accepts(&value) {
            return Err(UsageError::TypeMismatch {
                signal: state.name.clone(),
                expected: state.ty.to_string(),
                value: value.to_string(),
            }
            .into());
        }
        let at = fs.max(self.core.time.fs);
        self.core.push_timer(at, TimerTarget::Drive { signal, value });
        Ok(())
    }

    /// Fires `event` from outside the design at absolute time `fs`.
    pub fn schedule_fire(&mut self, fs: u64, event: EventId) -> Result<(), SimError> {
        self.core.event(event)?;
        let at = fs.max(self.core.time.fs);
        self.core.push_timer(at, TimerTarget::Fire(event));
        Ok(())
    }

    /// Runs until nothing is left to do, a process stops the simulation, or
    /// the configured time limit is reached.
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        self.run_until(self.config.time_limit)
    }

    /// Runs for at most `duration_fs` femtoseconds from now. Timers beyond
    /// the bound are kept, so a later call continues where this one ended.
    pub fn run_for(&mut self, duration_fs: u64) -> Result<RunSummary, SimError> {
        let bound = self.core.time.fs.saturating_add(duration_fs);
        let bound = match self.config.time_limit {
            Some(limit) => bound.min(limit),
            None => bound,
        };
        self.run_until(Some(bound))
    }

    fn run_until(&mut self, bound: Option<u64>) -> Result<RunSummary, SimError> {
        if self.finished {
            return Ok(self.summary(StopReason::Stopped));
        }
        if !self.started {
            self.started = true;
            self.open_waveform()?;
        }

        let outcome = self.schedule(bound);
        if outcome.is_err() {
            self.finished = true;
        }
        let flushed = match &mut self.recorder {
            Some(recorder) => recorder.finalize(),
            None => Ok(()),
        };
        let reason = outcome?;
        flushed?;

        let summary = self.summary(reason);
        debug!(
            time = %summary.final_time,
            reason = %summary.reason,
            total_deltas = summary.total_deltas,
            activations = summary.activations,
            "run finished"
        );
        Ok(summary)
    }

    fn schedule(&mut self, bound: Option<u64>) -> Result<StopReason, SimError> {
        loop {
            while let Some(pid) = self.core.runnable.pop_front() {
                self.resume(pid)?;
                if self.core.stop_requested {
                    self.core.discard_pending();
                    self.finished = true;
                    debug!(time = %self.core.time, "simulation stopped");
                    return Ok(StopReason::Stopped);
                }
            }

            let changes = self.core.commit();
            if !changes.is_empty() {
                self.core.time = self.core.time.next_delta();
                self.deltas_here += 1;
                self.total_deltas += 1;
                self.peak_deltas = self.peak_deltas.max(self.deltas_here);
                if self.deltas_here > self.config.max_deltas {
                    return Err(self.convergence_error(&changes));
                }
                self.record_changes(&changes)?;
                self.core.wake_waiters(&changes);
                continue;
            }

            let Some(next) = self.core.next_timer_fs() else {
                return Ok(StopReason::Quiescent);
            };
            if let Some(bound) = bound {
                if next > bound {
                    if bound > self.core.time.fs {
                        self.advance_to(bound);
                    }
                    return Ok(StopReason::TimeLimit);
                }
            }
            if next > self.core.time.fs {
                self.advance_to(next);
            }
            while let Some(target) = self.core.pop_timer_at(next) {
                self.dispatch(target)?;
            }
        }
    }

    fn advance_to(&mut self, fs: u64) {
        self.core.time = self.core.time.advance_to(fs);
        self.deltas_here = 0;
        self.resumes_here.clear();
        debug!(time = %self.core.time, "advance time");
    }

    fn dispatch(&mut self, target: TimerTarget) -> Result<(), SimError> {
        match target {
            TimerTarget::Resume { pid, generation } => {
                let current = self
                    .core
                    .processes
                    .get(pid)
                    .is_some_and(|p| p.generation == generation);
                if current {
                    self.core.wake(pid);
                }
            }
            TimerTarget::Fire(event) => self.core.fire(event)?,
            TimerTarget::Drive { signal, value } => {
                self.core.stage_write(signal, value, Driver::External)?
            }
        }
        Ok(())
    }

    /// Resumes allowed per process at one instant: one per delta cycle plus
    /// one event wake inside each.
    fn resume_limit(&self) -> u32 {
        self.config.max_deltas.saturating_add(1).saturating_mul(2)
    }

    fn resume(&mut self, pid: ProcessId) -> Result<(), SimError> {
        if self.core.processes.get(pid).is_none() {
            return Err(UsageError::UnknownProcess(pid.as_raw()).into());
        }
        let limit = self.resume_limit();
        let resumes = self.resumes_here.entry(pid).or_insert(0);
        *resumes += 1;
        if *resumes > limit {
            return Err(self.livelock_error(limit));
        }

        let entry = self
            .core
            .processes
            .get_mut(pid)
            .ok_or(UsageError::UnknownProcess(pid.as_raw()))?;
        let Some(mut body) = entry.body.take() else {
            return Err(UsageError::Reentrant {
                process: entry.name.clone(),
            }
            .into());
        };
        entry.state = ProcessState::Running;
        let kind = entry.kind;
        self.activations += 1;
        trace!(process = %entry.name, time = %self.core.time, "resume");

        let mut ctx = ProcessContext::new(&mut self.core, pid);
        let result = body.resume(&mut ctx);
        let written = ctx.into_written();
        if let Some(entry) = self.core.processes.get_mut(pid) {
            entry.body = Some(body);
        }

        let wait = result.map_err(|e| self.process_failed(pid, e))?;
        self.suspend(pid, kind, wait, &written)
            .map_err(|e| self.process_failed(pid, e.into()))
    }

    /// Checks the wait a process returned and subscribes it.
    fn suspend(
        &mut self,
        pid: ProcessId,
        kind: ProcessKind,
        wait: Wait,
        written: &[SignalId],
    ) -> Result<(), UsageError> {
        let (triggers, timeout) = match wait {
            Wait::Done => {
                if let Some(entry) = self.core.processes.get_mut(pid) {
                    entry.state = ProcessState::Done;
                }
                return Ok(());
            }
            Wait::Any { triggers, timeout } => (triggers, timeout),
        };
        let process = self.core.process_name(pid);

        if triggers.is_empty() && timeout.is_none() {
            return Err(UsageError::EmptyWait {
                process: process.to_string(),
            });
        }
        if kind == ProcessKind::Combinational {
            if timeout.is_some() {
                return Err(UsageError::TimedWaitInCombinational {
                    process: process.to_string(),
                });
            }
            if let Some(looped) = triggers
                .iter()
                .filter_map(Trigger::signal)
                .find(|s| written.contains(s))
            {
                return Err(UsageError::CombinationalFeedback {
                    process: process.to_string(),
                    signal: self.core.signal(looped)?.name.clone(),
                });
            }
        }
        self.core.subscribe(pid, triggers, timeout)
    }

    fn process_failed(&mut self, pid: ProcessId, source: SimError) -> SimError {
        self.finished = true;
        SimError::ProcessFailed {
            process: self.core.process_name(pid).to_string(),
            time: self.core.time,
            source: Box::new(source),
        }
    }

    fn convergence_error(&self, changes: &[(SignalId, Value)]) -> SimError {
        let signals = changes
            .iter()
            .filter_map(|(id, _)| self.core.signals.get(*id))
            .map(|s| s.name.clone())
            .collect();
        SimError::Convergence {
            time: self.core.time,
            max_deltas: self.config.max_deltas,
            signals,
        }
    }

    fn livelock_error(&self, limit: u32) -> SimError {
        let processes = self
            .resumes_here
            .iter()
            .filter(|(_, &n)| n > limit / 2)
            .map(|(&pid, _)| self.core.process_name(pid).to_string())
            .collect();
        SimError::Livelock {
            time: self.core.time,
            limit,
            processes,
        }
    }

    fn open_waveform(&mut self) -> Result<(), SimError> {
        let Some(recorder) = self.recorder.as_deref_mut() else {
            return Ok(());
        };
        let signals: Vec<(SignalId, String, u32)> = self
            .core
            .signals
            .iter()
            .map(|(id, s)| (id, s.name.clone(), s.ty.width()))
            .collect();
        declare_signals(recorder, &self.config.name, &signals)?;
        for (id, signal) in self.core.signals.iter() {
            recorder.record_change(self.core.time.fs, id, &signal.current)?;
        }
        Ok(())
    }

    fn record_changes(&mut self, changes: &[(SignalId, Value)]) -> Result<(), SimError> {
        let Some(recorder) = self.recorder.as_deref_mut() else {
            return Ok(());
        };
        for (id, _) in changes {
            if let Some(signal) = self.core.signals.get(*id) {
                recorder.record_change(self.core.time.fs, *id, &signal.current)?;
            }
        }
        Ok(())
    }

    fn summary(&self, reason: StopReason) -> RunSummary {
        RunSummary {
            final_time: self.core.time,
            reason,
            total_deltas: self.total_deltas,
            peak_deltas: self.peak_deltas,
            activations: self.activations,
        }
    }

    /// The committed value of `signal`.
    pub fn value(&self, signal: SignalId) -> Result<Value, SimError> {
        Ok(self.core.signal(signal)?.current)
    }

    /// Looks up a signal by its full hierarchical name.
    pub fn find_signal(&self, name: &str) -> Option<SignalId> {
        self.core
            .signals
            .iter()
            .find(|(_, s)| s.name == name)
            .map(|(id, _)| id)
    }

    /// The full name of `signal`.
    pub fn signal_name(&self, signal: SignalId) -> Option<&str> {
        self.core.signals.get(signal).map(|s| s.name.as_str())
    }

    /// How many times `event` has fired.
    pub fn fire_count(&self, event: EventId) -> Result<u64, SimError> {
        Ok(self.core.event(event)?.fire_count)
    }

    /// Current simulated time.
    pub fn current_time(&self) -> SimTime {
        self.core.time
    }

    /// `true` once a process stopped the simulation or a run failed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Every process, in creation order.
    pub fn processes(&self) -> impl Iterator<Item = ProcessInfo> + '_ {
        self.core.processes.iter().map(|(_, p)| p.info())
    }

    /// Every signal with its handle, in creation order.
    pub fn signals(&self) -> impl Iterator<Item = (SignalId, SignalInfo)> + '_ {
        self.core.signals.iter().map(|(id, s)| (id, s.info()))
    }

    /// Block instances added so far.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
