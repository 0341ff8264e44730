//! Configuration types deserialized from `deltasim.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;

/// The top-level configuration parsed from `deltasim.toml`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Project name and the design to simulate.
    pub project: ProjectMeta,
    /// Run bounds and driver rules.
    #[serde(default)]
    pub simulation: SimulationSection,
    /// VCD output settings.
    #[serde(default)]
    pub waveform: WaveformSection,
    /// Named clock definitions.
    #[serde(default)]
    pub clocks: BTreeMap<String, ClockDef>,
}

/// The `[project]` table.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name. Also the root scope of waveform output.
    pub name: String,
    /// The design to elaborate, e.g. `counter`.
    pub top: String,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
}

/// The `[simulation]` table.
#[derive(Debug, Default, Deserialize)]
pub struct SimulationSection {
    /// Absolute time limit as a duration string (e.g. `"1us"`).
    #[serde(default)]
    pub time_limit: Option<String>,
    /// Delta cycles allowed at one instant.
    #[serde(default)]
    pub max_deltas: Option<u32>,
    /// How a second writer to the same signal in one delta is handled.
    #[serde(default)]
    pub driver_policy: DriverPolicySetting,
}

/// Multi-driver policy as written in the configuration file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverPolicySetting {
    /// A second writer is an error.
    #[default]
    Exclusive,
    /// The later write wins and a warning is logged.
    LastWriteWins,
}

/// The `[waveform]` table.
#[derive(Debug, Default, Deserialize)]
pub struct WaveformSection {
    /// Whether to write a VCD file.
    #[serde(default)]
    pub enabled: bool,
    /// Output path. Defaults to `<project.name>.vcd`.
    #[serde(default)]
    pub path: Option<String>,
}

/// A `[clocks.<name>]` entry.
#[derive(Debug, Deserialize)]
pub struct ClockDef {
    /// The clock frequency as a string (e.g. `"100MHz"`), parsed to
    /// [`Frequency`](deltasim_common::Frequency).
    pub frequency: String,
}
