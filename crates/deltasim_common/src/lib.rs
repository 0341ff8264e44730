//! Shared foundational types for the deltasim workspace.
//!
//! This crate provides the tagged signal payload ([`Value`]) with its
//! construction-time type ([`ValueType`]), femtosecond durations, and clock
//! frequencies.

#![warn(missing_docs)]

pub mod duration;
pub mod frequency;
pub mod value;

pub use duration::{format_duration, parse_duration, DurationError};
pub use duration::{FS_PER_MS, FS_PER_NS, FS_PER_PS, FS_PER_S, FS_PER_US};
pub use frequency::{Frequency, ParseFrequencyError};
pub use value::{Value, ValueError, ValueType};
