//! Signals: typed value cells with buffered, read-before-commit updates.
//!
//! A process reading a signal always sees its `current` value. Writes are
//! staged in `pending` and only become visible when the scheduler commits
//! them between delta cycles, so every process running in one delta cycle
//! observes the same snapshot regardless of execution order.

use serde::{Deserialize, Serialize};

use deltasim_common::{Value, ValueType};

use crate::arena::handle;
use crate::process::ProcessId;

handle!(
    /// Handle to a signal owned by one [`Simulation`](crate::Simulation).
    SignalId
);

/// A transition of bit 0 of a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    /// Rising edge, 0 to 1.
    Pos,
    /// Falling edge, 1 to 0.
    Neg,
    /// Either transition.
    Any,
}

impl Edge {
    /// Returns `true` if the change from `old` to `new` is this edge.
    pub fn matches(self, old: &Value, new: &Value) -> bool {
        let (was, is) = (old.bit(0), new.bit(0));
        match self {
            Edge::Pos => !was && is,
            Edge::Neg => was && !is,
            Edge::Any => was != is,
        }
    }
}

/// Whether a reset acts immediately or only at the clock edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResetKind {
    /// Checked only when the clock edge wakes the process.
    Sync,
    /// Checked on every wake; the activating reset edge also wakes the process.
    Async,
}

/// Reset polarity and timing carried by a reset signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResetSpec {
    /// Level at which the reset is asserted.
    pub active: bool,
    /// Sync or async behavior.
    pub kind: ResetKind,
}

impl ResetSpec {
    /// An active-high synchronous reset.
    pub fn sync_high() -> Self {
        Self {
            active: true,
            kind: ResetKind::Sync,
        }
    }

    /// An active-high asynchronous reset.
    pub fn async_high() -> Self {
        Self {
            active: true,
            kind: ResetKind::Async,
        }
    }

    /// An active-low asynchronous reset.
    pub fn async_low() -> Self {
        Self {
            active: false,
            kind: ResetKind::Async,
        }
    }

    /// The edge on which this reset becomes asserted.
    pub fn activating_edge(&self) -> Edge {
        if self.active {
            Edge::Pos
        } else {
            Edge::Neg
        }
    }

    /// Returns `true` if `value` asserts this reset.
    pub fn is_asserted(&self, value: &Value) -> bool {
        value.bit(0) == self.active
    }
}

/// How several writes to one signal within a delta cycle combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// One writer per delta cycle; further writers follow the [`DriverPolicy`].
    #[default]
    Exclusive,
    /// Any number of writers; their values are ORed together.
    WiredOr,
}

/// What happens when an [`Resolution::Exclusive`] signal sees a second writer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverPolicy {
    /// Reject the second write with a usage error.
    #[default]
    Exclusive,
    /// Keep the later write and log a warning.
    LastWriteWins,
}

/// Who staged a pending value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Driver {
    Process(ProcessId),
    /// The host, through scheduled stimulus.
    External,
}

/// A process waiting on a signal, optionally filtered to one edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Waiter {
    pub pid: ProcessId,
    pub edge: Option<Edge>,
}

impl Waiter {
    pub fn wakes_on(&self, old: &Value, new: &Value) -> bool {
        self.edge.map_or(true, |edge| edge.matches(old, new))
    }
}

/// Kernel-side state of one signal.
#[derive(Debug)]
pub(crate) struct SignalState {
    pub name: String,
    pub ty: ValueType,
    pub init: Value,
    pub current: Value,
    pub pending: Option<Value>,
    /// Delta serial in which `pending` was staged.
    pub pending_serial: u64,
    /// Already listed in the scheduler's pending commits.
    pub queued: bool,
    pub last_writer: Option<Driver>,
    pub waiters: Vec<Waiter>,
    pub reset: Option<ResetSpec>,
    pub resolution: Resolution,
    /// Processes that declared they drive this signal.
    pub owners: Vec<ProcessId>,
}

impl SignalState {
    pub fn new(name: String, ty: ValueType, init: Value) -> Self {
        Self {
            name,
            ty,
            init,
            current: init,
            pending: None,
            pending_serial: 0,
            queued: false,
            last_writer: None,
            waiters: Vec::new(),
            reset: None,
            resolution: Resolution::Exclusive,
            owners: Vec::new(),
        }
    }

    /// Moves the pending value into `current`. Returns the old value if the
    /// signal actually changed.
    pub fn commit(&mut self) -> Option<Value> {
        self.queued = false;
        let next = self.pending.take()?;
        if next == self.current {
            return None;
        }
        Some(std::mem::replace(&mut self.current, next))
    }

    /// Drops any staged value without applying it.
    pub fn discard(&mut self) {
        self.queued = false;
        self.pending = None;
        self.last_writer = None;
    }

    pub fn subscribe(&mut self, pid: ProcessId, edge: Option<Edge>) {
        self.waiters.push(Waiter { pid, edge });
    }

    pub fn unsubscribe(&mut self, pid: ProcessId) {
        self.waiters.retain(|w| w.pid != pid);
    }

    pub fn info(&self) -> SignalInfo {
        SignalInfo {
            name: self.name.clone(),
            ty: self.ty.clone(),
            init: self.init,
            reset: self.reset,
            resolution: self.resolution,
        }
    }
}

/// Static description of a signal, for netlist consumers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SignalInfo {
    /// Hierarchical name.
    pub name: String,
    /// Declared type.
    pub ty: ValueType,
    /// Initial value.
    pub init: Value,
    /// Reset behavior, for reset signals.
    pub reset: Option<ResetSpec>,
    /// Multi-writer resolution.
    pub resolution: Resolution,
}
