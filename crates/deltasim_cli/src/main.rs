//! deltasim CLI: runs the bundled demo designs on the delta-cycle kernel.
//!
//! `deltasim list` shows the available designs; `deltasim run <design>`
//! elaborates one, runs it to completion and prints the final signal values
//! together with the run summary.

#![warn(missing_docs)]

mod list;
mod run;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// deltasim — a discrete-event simulator for digital logic.
#[derive(Parser, Debug)]
#[command(name = "deltasim", version, about = "Delta-cycle logic simulator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `deltasim.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the demo designs.
    List,
    /// Simulate a demo design.
    Run(RunArgs),
}

/// Arguments for the `deltasim run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Design to simulate. Defaults to `project.top` from the configuration.
    pub design: Option<String>,

    /// Simulation time limit (e.g. "200ns", "1us").
    #[arg(long)]
    pub time: Option<String>,

    /// Write a VCD waveform to this path.
    #[arg(long)]
    pub vcd: Option<String>,

    /// Delta cycles allowed at one instant.
    #[arg(long)]
    pub max_deltas: Option<u32>,

    /// Output format for the results.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Result output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print debug information.
    pub verbose: bool,
    /// Optional path to a configuration file.
    pub config: Option<String>,
}

fn init_tracing(global: &GlobalArgs) {
    let filter = if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::List => list::run(&global),
        Command::Run(ref args) => run::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_list() {
        let cli = Cli::parse_from(["deltasim", "list"]);
        assert!(matches!(cli.command, Command::List));
    }

    #[test]
    fn parse_run_basic() {
        let cli = Cli::parse_from(["deltasim", "run", "counter"]);
        match cli.command {
            Command::Run(ref args) => {
                assert_eq!(args.design.as_deref(), Some("counter"));
                assert!(args.time.is_none());
                assert!(args.vcd.is_none());
                assert!(args.max_deltas.is_none());
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_run_with_args() {
        let cli = Cli::parse_from([
            "deltasim",
            "run",
            "fifo",
            "--time",
            "200ns",
            "--vcd",
            "out/fifo.vcd",
            "--max-deltas",
            "50",
            "--format",
            "json",
        ]);
        match cli.command {
            Command::Run(ref args) => {
                assert_eq!(args.design.as_deref(), Some("fifo"));
                assert_eq!(args.time.as_deref(), Some("200ns"));
                assert_eq!(args.vcd.as_deref(), Some("out/fifo.vcd"));
                assert_eq!(args.max_deltas, Some(50));
                assert_eq!(args.format, ReportFormat::Json);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_run_without_design() {
        let cli = Cli::parse_from(["deltasim", "run"]);
        match cli.command {
            Command::Run(ref args) => assert!(args.design.is_none()),
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["deltasim", "--quiet", "--config", "sim/deltasim.toml", "list"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("sim/deltasim.toml"));
    }

    #[test]
    fn parse_verbose_after_subcommand() {
        let cli = Cli::parse_from(["deltasim", "run", "counter", "-v"]);
        assert!(cli.verbose);
    }

    #[test]
    fn reject_unknown_format() {
        assert!(Cli::try_parse_from(["deltasim", "run", "counter", "--format", "xml"]).is_err());
    }
}
