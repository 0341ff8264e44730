//! Processes: resumable bodies plus the waits they suspend on.
//!
//! A process body is an explicit state machine. Each call to
//! [`ProcessBody::resume`] runs synchronous code up to the next suspension
//! point and returns a [`Wait`] describing what should wake it. Any
//! `FnMut(&mut ProcessContext) -> Result<Wait, SimError>` closure is a body;
//! bodies that need to remember where they stopped can keep that state in
//! captured variables or implement the trait on their own type.
//!
//! Three constructors cover the common shapes:
//!
//! - [`Process::comb`] / [`Process::comb_inferred`]: combinational logic,
//!   re-run whenever an input changes.
//! - [`Process::seq`]: clocked logic with an optional reset.
//! - [`Process::instance`]: free-running code with arbitrary waits.

use serde::Serialize;

use crate::arena::handle;
use crate::context::ProcessContext;
use crate::error::SimError;
use crate::event::EventId;
use crate::signal::{Edge, ResetKind, SignalId};

handle!(
    /// Handle to a process owned by one [`Simulation`](crate::Simulation).
    ProcessId
);

/// Scheduling discipline of a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ProcessKind {
    /// Re-evaluated whenever an input changes; may not wait on time.
    Combinational,
    /// Runs on one clock edge, with optional reset.
    Sequential,
    /// Arbitrary waits; used for stimulus and testbenches.
    FreeRunning,
}

/// One condition that wakes a waiting process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Trigger {
    /// Any committed change of the signal.
    Change(SignalId),
    /// A committed change of the signal that forms the given edge.
    Edge(SignalId, Edge),
    /// The next fire of the event.
    Event(EventId),
}

impl Trigger {
    /// The rising edge of `signal`.
    pub fn rising(signal: SignalId) -> Self {
        Trigger::Edge(signal, Edge::Pos)
    }

    /// The falling edge of `signal`.
    pub fn falling(signal: SignalId) -> Self {
        Trigger::Edge(signal, Edge::Neg)
    }

    /// The signal this trigger watches, if any.
    pub fn signal(&self) -> Option<SignalId> {
        match *self {
            Trigger::Change(s) | Trigger::Edge(s, _) => Some(s),
            Trigger::Event(_) => None,
        }
    }
}

impl From<SignalId> for Trigger {
    fn from(signal: SignalId) -> Self {
        Trigger::Change(signal)
    }
}

impl From<EventId> for Trigger {
    fn from(event: EventId) -> Self {
        Trigger::Event(event)
    }
}

/// What a process suspends on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Wait {
    /// Wake on whichever trigger happens first, or after `timeout`
    /// femtoseconds.
    Any {
        /// Signal and event triggers.
        triggers: Vec<Trigger>,
        /// Relative timeout in femtoseconds.
        timeout: Option<u64>,
    },
    /// The process has finished and never runs again.
    Done,
}

impl Wait {
    /// Wait on a single trigger.
    pub fn on(trigger: impl Into<Trigger>) -> Self {
        Wait::Any {
            triggers: vec![trigger.into()],
            timeout: None,
        }
    }

    /// Wait on whichever of `triggers` happens first.
    pub fn any<I, T>(triggers: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Trigger>,
    {
        Wait::Any {
            triggers: triggers.into_iter().map(Into::into).collect(),
            timeout: None,
        }
    }

    /// Wait for `fs` femtoseconds.
    pub fn delay(fs: u64) -> Self {
        Wait::Any {
            triggers: Vec::new(),
            timeout: Some(fs),
        }
    }

    /// Wait for the rising edge of `signal`.
    pub fn posedge(signal: SignalId) -> Self {
        Wait::on(Trigger::rising(signal))
    }

    /// Wait for the falling edge of `signal`.
    pub fn negedge(signal: SignalId) -> Self {
        Wait::on(Trigger::falling(signal))
    }

    /// Adds a timeout to this wait. A finished process stays finished.
    pub fn or_timeout(self, fs: u64) -> Self {
        match self {
            Wait::Any { triggers, .. } => Wait::Any {
                triggers,
                timeout: Some(fs),
            },
            Wait::Done => Wait::Done,
        }
    }
}

/// A resumable process body.
pub trait ProcessBody {
    /// Runs until the next suspension point.
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError>;
}

impl<F> ProcessBody for F
where
    F: FnMut(&mut ProcessContext<'_>) -> Result<Wait, SimError>,
{
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        self(ctx)
    }
}

/// A process description, ready to be added to a simulation.
pub struct Process {
    pub(crate) name: String,
    pub(crate) kind: ProcessKind,
    pub(crate) body: Box<dyn ProcessBody>,
    pub(crate) drives: Vec<SignalId>,
    pub(crate) sensitivity: Vec<Trigger>,
    pub(crate) inferred: bool,
    pub(crate) reset: Option<SignalId>,
}

impl Process {
    /// Combinational logic with an explicit sensitivity list.
    ///
    /// The body runs once at start and then once per delta cycle in which
    /// any listed signal changed.
    pub fn comb<I, F>(name: impl Into<String>, sensitivity: I, body: F) -> Self
    where
        I: IntoIterator<Item = SignalId>,
        F: FnMut(&mut ProcessContext<'_>) -> Result<(), SimError> + 'static,
    {
        let sensitivity: Vec<SignalId> = sensitivity.into_iter().collect();
        let triggers = sensitivity.iter().copied().map(Trigger::Change).collect();
        let mut process = Self::with_kind(
            name,
            ProcessKind::Combinational,
            CombBody {
                sensitivity: Some(sensitivity),
                body,
            },
        );
        process.sensitivity = triggers;
        process
    }

    /// Combinational logic whose sensitivity is every signal read during its
    /// previous run.
    pub fn comb_inferred<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnMut(&mut ProcessContext<'_>) -> Result<(), SimError> + 'static,
    {
        let mut process = Self::with_kind(
            name,
            ProcessKind::Combinational,
            CombBody {
                sensitivity: None,
                body,
            },
        );
        process.inferred = true;
        process
    }

    /// Clocked logic triggered by `edge` of `clock`.
    ///
    /// While `reset` is asserted the process writes the initial value of
    /// every signal it [`drives`](Process::drives) instead of running `body`.
    pub fn seq<F>(
        name: impl Into<String>,
        clock: SignalId,
        edge: Edge,
        reset: Option<SignalId>,
        body: F,
    ) -> Self
    where
        F: FnMut(&mut ProcessContext<'_>) -> Result<(), SimError> + 'static,
    {
        let mut process = Self::with_kind(
            name,
            ProcessKind::Sequential,
            SeqBody {
                clock,
                edge,
                reset,
                started: false,
                body,
            },
        );
        process.sensitivity = vec![Trigger::Edge(clock, edge)];
        process.reset = reset;
        process
    }

    /// A free-running process driven by a closure.
    pub fn instance<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnMut(&mut ProcessContext<'_>) -> Result<Wait, SimError> + 'static,
    {
        Self::with_kind(name, ProcessKind::FreeRunning, body)
    }

    /// A process of the given kind around any [`ProcessBody`].
    pub fn with_kind<B>(name: impl Into<String>, kind: ProcessKind, body: B) -> Self
    where
        B: ProcessBody + 'static,
    {
        Self {
            name: name.into(),
            kind,
            body: Box::new(body),
            drives: Vec::new(),
            sensitivity: Vec::new(),
            inferred: false,
            reset: None,
        }
    }

    /// Declares the signals this process writes.
    pub fn drives<I>(mut self, signals: I) -> Self
    where
        I: IntoIterator<Item = SignalId>,
    {
        for s in signals {
            if !self.drives.contains(&s) {
                self.drives.push(s);
            }
        }
        self
    }

    /// The process name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scheduling discipline.
    pub fn kind(&self) -> ProcessKind {
        self.kind
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("drives", &self.drives)
            .finish_non_exhaustive()
    }
}

/// Static description of a process, for netlist consumers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessInfo {
    /// Full hierarchical name.
    pub name: String,
    /// Scheduling discipline.
    pub kind: ProcessKind,
    /// Declared sensitivity; empty for inferred or free-running processes.
    pub sensitivity: Vec<Trigger>,
    /// Sensitivity is re-derived from the signals read on every run.
    pub inferred: bool,
    /// Declared driven signals.
    pub drives: Vec<SignalId>,
    /// Reset signal of a sequential process.
    pub reset: Option<SignalId>,
}

/// Wraps a combinational closure and derives its wait after every run.
struct CombBody<F> {
    /// `None` means inferred.
    sensitivity: Option<Vec<SignalId>>,
    body: F,
}

impl<F> ProcessBody for CombBody<F>
where
    F: FnMut(&mut ProcessContext<'_>) -> Result<(), SimError>,
{
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        if self.sensitivity.is_none() {
            ctx.track_reads();
        }
        (self.body)(ctx)?;
        let inputs = match &self.sensitivity {
            Some(list) => list.clone(),
            None => ctx.take_reads(),
        };
        // A block with no inputs computes a constant: one run is enough.
        if inputs.is_empty() {
            return Ok(Wait::Done);
        }
        Ok(Wait::any(inputs))
    }
}

/// Wraps a clocked closure with reset handling.
struct SeqBody<F> {
    clock: SignalId,
    edge: Edge,
    reset: Option<SignalId>,
    started: bool,
    body: F,
}

impl<F> SeqBody<F> {
    fn wait(&self, ctx: &ProcessContext<'_>) -> Result<Wait, SimError> {
        let mut triggers = vec![Trigger::Edge(self.clock, self.edge)];
        if let Some(reset) = self.reset {
            let spec = ctx.reset_spec(reset)?;
            if spec.kind == ResetKind::Async {
                triggers.push(Trigger::Edge(reset, spec.activating_edge()));
            }
        }
        Ok(Wait::Any {
            triggers,
            timeout: None,
        })
    }
}

impl<F> ProcessBody for SeqBody<F>
where
    F: FnMut(&mut ProcessContext<'_>) -> Result<(), SimError>,
{
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        if !self.started {
            self.started = true;
            return self.wait(ctx);
        }

        // Sync resets are not subscribed, so every wake here is a clock edge.
        let in_reset = match self.reset {
            Some(reset) => ctx.reset_asserted(reset)?,
            None => false,
        };
        if in_reset {
            for signal in ctx.drives().to_vec() {
                let init = ctx.initial_value(signal)?;
                ctx.write(signal, init)?;
            }
        } else {
            (self.body)(ctx)?;
        }
        self.wait(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Handle;

    #[test]
    fn wait_builders() {
        let s = SignalId::from_index(0);
        let e = EventId::from_index(1);
        assert_eq!(
            Wait::any([Trigger::from(s), Trigger::from(e)]),
            Wait::Any {
                triggers: vec![Trigger::Change(s), Trigger::Event(e)],
                timeout: None,
            }
        );
        assert_eq!(
            Wait::posedge(s).or_timeout(10),
            Wait::Any {
                triggers: vec![Trigger::Edge(s, Edge::Pos)],
                timeout: Some(10),
            }
        );
        assert_eq!(Wait::Done.or_timeout(5), Wait::Done);
        assert_eq!(
            Wait::delay(3),
            Wait::Any {
                triggers: vec![],
                timeout: Some(3)
            }
        );
    }

    #[test]
    fn trigger_signal() {
        let s = SignalId::from_index(2);
        assert_eq!(Trigger::Edge(s, Edge::Neg).signal(), Some(s));
        assert_eq!(Trigger::Event(EventId::from_index(0)).signal(), None);
    }

    #[test]
    fn builders_record_metadata() {
        let clk = SignalId::from_index(0);
        let rst = SignalId::from_index(1);
        let q = SignalId::from_index(2);

        let p = Process::seq("ff", clk, Edge::Pos, Some(rst), |_| Ok(())).drives([q, q]);
        assert_eq!(p.kind(), ProcessKind::Sequential);
        assert_eq!(p.sensitivity, vec![Trigger::Edge(clk, Edge::Pos)]);
        assert_eq!(p.reset, Some(rst));
        assert_eq!(p.drives, vec![q]);

        let c = Process::comb("mux", [clk, rst], |_| Ok(()));
        assert_eq!(c.kind(), ProcessKind::Combinational);
        assert_eq!(c.sensitivity.len(), 2);
        assert!(!c.inferred);

        let i = Process::comb_inferred("and", |_| Ok(()));
        assert!(i.inferred);
        assert_eq!(i.name(), "and");

        let f = Process::instance("tb", |_| Ok(Wait::Done));
        assert_eq!(f.kind(), ProcessKind::FreeRunning);
    }
}
