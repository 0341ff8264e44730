//! Parsing and validation of `deltasim.toml` configuration files.
//!
//! [`load_config`] reads the file into a [`ProjectConfig`]; [`resolve_simulation`]
//! turns its string settings into typed values (femtosecond limits, clock
//! frequencies, driver policy) ready for a simulation run.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{resolve_simulation, ResolvedSimulation};
pub use types::*;
