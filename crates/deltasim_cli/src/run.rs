//! `deltasim run` — simulate one demo design.
//!
//! Settings come from, in order of precedence: command-line flags, the file
//! named by `--config`, `deltasim.toml` in the current directory, and the
//! built-in defaults.

use std::error::Error;
use std::path::{Path, PathBuf};

use deltasim_blocks::{find_design, ClockConfig, DemoParams, Design};
use deltasim_common::parse_duration;
use deltasim_config::{DriverPolicySetting, ResolvedSimulation, CONFIG_FILE_NAME};
use deltasim_kernel::{
    simulate, DriverPolicy, RunSummary, SimConfig, Simulation, DEFAULT_MAX_DELTAS,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{GlobalArgs, ReportFormat, RunArgs};

/// Clock name looked up in `[clocks]` for the demo clock.
const DEMO_CLOCK: &str = "clk";

/// Final state of a run.
#[derive(Debug, Serialize)]
pub struct Report {
    /// Design name.
    pub design: String,
    /// How the run ended.
    pub summary: RunSummary,
    /// Final value of every signal, in declaration order.
    pub signals: Vec<SignalReport>,
}

/// One signal in a [`Report`].
#[derive(Debug, Serialize)]
pub struct SignalReport {
    /// Hierarchical name.
    pub name: String,
    /// Display form of the committed value.
    pub value: String,
}

/// Runs the `deltasim run` command.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let settings = load_settings(global.config.as_deref(), Path::new("."), args.design.as_deref())?;
    let name = args.design.as_deref().unwrap_or(&settings.top);
    let design = find_design(name)
        .ok_or_else(|| format!("unknown design '{name}' (see `deltasim list`)"))?;

    let config = sim_config(&settings, args)?;
    let params = demo_params(&settings)?;
    if !global.quiet {
        eprintln!("   Simulating {}", design.name);
    }

    let report = execute(design, config, &params)?;
    match args.format {
        ReportFormat::Text => {
            if !global.quiet {
                print!("{}", render_text(&report));
            }
        }
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(0)
}

/// Finds and resolves the configuration for this invocation.
fn load_settings(
    explicit: Option<&str>,
    cwd: &Path,
    design: Option<&str>,
) -> Result<ResolvedSimulation, Box<dyn Error>> {
    let config = match explicit {
        Some(path) => Some(deltasim_config::load_config_file(Path::new(path))?),
        None if cwd.join(CONFIG_FILE_NAME).is_file() => Some(deltasim_config::load_config(cwd)?),
        None => None,
    };
    match config {
        Some(config) => {
            debug!(project = %config.project.name, "loaded configuration");
            Ok(deltasim_config::resolve_simulation(&config)?)
        }
        None => {
            let top = design.ok_or("no design given and no deltasim.toml found")?;
            Ok(ResolvedSimulation::defaults(top))
        }
    }
}

/// Merges command-line overrides into the kernel configuration.
fn sim_config(settings: &ResolvedSimulation, args: &RunArgs) -> Result<SimConfig, Box<dyn Error>> {
    let time_limit = match &args.time {
        Some(t) => Some(parse_duration(t)?),
        None => settings.time_limit_fs,
    };
    let waveform_path = args
        .vcd
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| settings.waveform_path.clone());
    Ok(SimConfig {
        name: settings.name.clone(),
        time_limit,
        max_deltas: args
            .max_deltas
            .or(settings.max_deltas)
            .unwrap_or(DEFAULT_MAX_DELTAS),
        driver_policy: match settings.driver_policy {
            DriverPolicySetting::Exclusive => DriverPolicy::Exclusive,
            DriverPolicySetting::LastWriteWins => DriverPolicy::LastWriteWins,
        },
        record_waveform: waveform_path.is_some(),
        waveform_path,
    })
}

/// Applies a configured `clk` frequency to the demo clock.
fn demo_params(settings: &ResolvedSimulation) -> Result<DemoParams, Box<dyn Error>> {
    let mut params = DemoParams::default();
    if let Some(freq) = settings.clocks.get(DEMO_CLOCK) {
        let clock = ClockConfig::from_frequency(*freq)
            .ok_or_else(|| format!("clock '{DEMO_CLOCK}' at {freq} is too fast to simulate"))?;
        params.clock = ClockConfig {
            cycles: params.clock.cycles,
            ..clock
        };
    }
    Ok(params)
}

/// Elaborates and runs `design`, collecting the final signal values.
fn execute(
    design: &Design,
    config: SimConfig,
    params: &DemoParams,
) -> Result<Report, Box<dyn Error>> {
    let mut sim = Simulation::new(config.clone());
    design.elaborate(&mut sim, params)?;
    info!(
        design = design.name,
        signals = sim.signals().count(),
        processes = sim.processes().count(),
        "elaborated"
    );

    let summary = simulate(&mut sim, &config)?;
    info!(reason = %summary.reason, time = %summary.final_time, "run finished");

    let mut signals = Vec::new();
    for (id, info) in sim.signals() {
        let value = sim.value(id)?;
        signals.push(SignalReport {
            name: info.name,
            value: value.to_string(),
        });
    }
    Ok(Report {
        design: design.name.to_string(),
        summary,
        signals,
    })
}

fn render_text(report: &Report) -> String {
    let width = report
        .signals
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for s in &report.signals {
        out.push_str(&format!("{:<width$}  {}\n", s.name, s.value));
    }
    let summary = &report.summary;
    out.push_str(&format!(
        "\n{}: {} at {} ({} delta cycles, peak {}, {} activations)\n",
        report.design,
        summary.reason,
        summary.final_time,
        summary.total_deltas,
        summary.peak_deltas,
        summary.activations
    ));
    out
}
