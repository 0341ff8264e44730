//! Resolution of string settings into typed simulation parameters.

use crate::error::ConfigError;
use crate::types::{DriverPolicySetting, ProjectConfig};
use deltasim_common::{parse_duration, Frequency};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Settings of one run with every string parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSimulation {
    /// Project name, used as the waveform root scope.
    pub name: String,
    /// The design to elaborate.
    pub top: String,
    /// Absolute time limit in femtoseconds.
    pub time_limit_fs: Option<u64>,
    /// Delta cycles allowed at one instant; `None` keeps the kernel default.
    pub max_deltas: Option<u32>,
    /// Multi-driver policy.
    pub driver_policy: DriverPolicySetting,
    /// Where to write a VCD file, if waveforms are enabled.
    pub waveform_path: Option<PathBuf>,
    /// Clock frequencies by name.
    pub clocks: BTreeMap<String, Frequency>,
}

impl ResolvedSimulation {
    /// Settings used when no configuration file is present.
    pub fn defaults(top: impl Into<String>) -> Self {
        Self {
            name: "top".to_string(),
            top: top.into(),
            time_limit_fs: None,
            max_deltas: None,
            driver_policy: DriverPolicySetting::Exclusive,
            waveform_path: None,
            clocks: BTreeMap::new(),
        }
    }
}

/// Parses the durations, frequencies and paths of a loaded configuration.
///
/// An enabled waveform without an explicit path is written to
/// `<project.name>.vcd`.
pub fn resolve_simulation(config: &ProjectConfig) -> Result<ResolvedSimulation, ConfigError> {
    let time_limit_fs = config
        .simulation
        .time_limit
        .as_deref()
        .map(parse_duration)
        .transpose()
        .map_err(|e| ConfigError::invalid("simulation.time_limit", e))?;

    let waveform_path = config.waveform.enabled.then(|| {
        config
            .waveform
            .path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{}.vcd", config.project.name)))
    });

    let mut clocks = BTreeMap::new();
    for (name, clock) in &config.clocks {
        let freq: Frequency = clock
            .frequency
            .parse()
            .map_err(|e| ConfigError::invalid(format!("clocks.{name}.frequency"), e))?;
        clocks.insert(name.clone(), freq);
    }

    Ok(ResolvedSimulation {
        name: config.project.name.clone(),
        top: config.project.top.clone(),
        time_limit_fs,
        max_deltas: config.simulation.max_deltas,
        driver_policy: config.simulation.driver_policy,
        waveform_path,
        clocks,
    })
}
