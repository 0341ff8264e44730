//! Discrete-event, delta-cycle simulation kernel for digital logic.
//!
//! Designs are described as [`Signal`](SignalId)s, one-shot [`Event`](EventId)s
//! and [`Process`]es. Processes communicate only through signals, whose
//! writes are buffered until the scheduler commits them between delta cycles.
//! Each simulated instant runs to a fixed point before time advances, so the
//! outcome never depends on the order in which processes happen to run.
//!
//! # Architecture
//!
//! A [`Simulation`] owns all state of one run: signals, events, processes,
//! the runnable queue, the timed-wait heap and the block [`Registry`]. Two
//! simulations never share anything. Process bodies are explicit resumable
//! state machines ([`ProcessBody`]) driven by the scheduler loop.
//!
//! # Usage
//!
//! ```ignore
//! use deltasim_kernel::{Edge, Process, SimConfig, Simulation};
//!
//! let mut sim = Simulation::new(SimConfig::default());
//! let clk = sim.bool_signal("clk", false)?;
//! let q = sim.unsigned_signal("q", 8, 0)?;
//! sim.add_process(Process::seq("count", clk, Edge::Pos, None, move |ctx| {
//!     let v = ctx.read_u64(q)?;
//!     ctx.write_wrapped(q, v + 1)
//! }).drives([q]))?;
//! let summary = sim.run()?;
//! ```
//!
//! # Modules
//!
//! - `time` — femtosecond time with delta index
//! - `signal` — signal state, edges, resets, driver rules
//! - `event` — one-shot events
//! - `process` — process bodies, waits and constructors
//! - `context` — the API a running process sees
//! - `kernel` — the scheduler
//! - `block` — composition and instance registry
//! - `waveform` — VCD output

#![warn(missing_docs)]

mod arena;
pub mod block;
pub mod context;
pub mod error;
pub mod event;
pub mod kernel;
pub mod process;
pub mod signal;
pub mod time;
pub mod waveform;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

pub use block::{Block, InstanceRecord, Registry, Scope};
pub use context::ProcessContext;
pub use error::{SimError, UsageError};
pub use event::EventId;
pub use kernel::{RunSummary, Simulation, StopReason};
pub use process::{Process, ProcessBody, ProcessId, ProcessInfo, ProcessKind, Trigger, Wait};
pub use signal::{DriverPolicy, Edge, ResetKind, ResetSpec, Resolution, SignalId, SignalInfo};
pub use time::SimTime;
pub use waveform::{VcdRecorder, WaveformRecorder};

pub use deltasim_common::{Value, ValueType};

/// Delta cycles allowed at one instant before a run fails to converge.
pub const DEFAULT_MAX_DELTAS: u32 = 10_000;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Root scope name used for waveform output.
    pub name: String,
    /// Absolute time limit in femtoseconds. `None` runs until quiescent or
    /// stopped.
    pub time_limit: Option<u64>,
    /// Changing commits allowed at one instant.
    pub max_deltas: u32,
    /// What to do when an exclusive signal sees a second writer.
    pub driver_policy: DriverPolicy,
    /// Optional path for VCD output.
    pub waveform_path: Option<PathBuf>,
    /// Whether to record a waveform. Ignored if `waveform_path` is `None`.
    pub record_waveform: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "top".to_string(),
            time_limit: None,
            max_deltas: DEFAULT_MAX_DELTAS,
            driver_policy: DriverPolicy::default(),
            waveform_path: None,
            record_waveform: false,
        }
    }
}

/// Runs an elaborated simulation to completion.
///
/// Attaches a VCD recorder when `config` asks for one, then calls
/// [`Simulation::run`]. The simulation's own configuration still governs the
/// time limit and delta cap.
pub fn simulate(sim: &mut Simulation, config: &SimConfig) -> Result<RunSummary, SimError> {
    if config.record_waveform {
        if let Some(path) = &config.waveform_path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let writer = BufWriter::new(File::create(path)?);
            sim.set_recorder(Box::new(VcdRecorder::new(writer)))?;
        }
    }
    sim.run()
}
