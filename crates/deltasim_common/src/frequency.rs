//! Clock frequencies and the femtosecond periods they imply.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::duration::FS_PER_S;

/// A clock frequency in whole Hertz.
///
/// Parses strings like `"50MHz"`, `"12.5 MHz"`, `"32768Hz"` or a bare number of
/// Hertz. Fractional inputs are rounded to the nearest Hertz.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Frequency {
    hz: u64,
}

impl Frequency {
    /// A frequency of `hz` Hertz.
    pub fn from_hz(hz: u64) -> Self {
        Self { hz }
    }

    /// The frequency in Hertz.
    pub fn hz(&self) -> u64 {
        self.hz
    }

    /// One full clock period in femtoseconds, or `None` for 0 Hz.
    pub fn period_fs(&self) -> Option<u64> {
        (self.hz > 0).then(|| FS_PER_S / self.hz)
    }

    /// Time between successive clock toggles, or `None` if the period does
    /// not split into two non-zero halves.
    pub fn half_period_fs(&self) -> Option<u64> {
        self.period_fs().map(|p| p / 2).filter(|h| *h > 0)
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({self})")
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hz = self.hz as f64;
        if self.hz >= 1_000_000_000 {
            write!(f, "{}GHz", hz / 1e9)
        } else if self.hz >= 1_000_000 {
            write!(f, "{}MHz", hz / 1e6)
        } else if self.hz >= 1_000 {
            write!(f, "{}KHz", hz / 1e3)
        } else {
            write!(f, "{}Hz", self.hz)
        }
    }
}

/// Error returned when a frequency string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency: '{input}'")]
pub struct ParseFrequencyError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseFrequencyError {
            input: s.to_string(),
        };

        let lower = s.to_ascii_lowercase();
        let (number, scale) = [("ghz", 1e9), ("mhz", 1e6), ("khz", 1e3), ("hz", 1.0)]
            .iter()
            .find_map(|(suffix, scale)| lower.strip_suffix(suffix).map(|n| (n, *scale)))
            .unwrap_or((lower.as_str(), 1.0));

        let value: f64 = number.trim().parse().map_err(|_| err())?;
        let hz = value * scale;
        if !hz.is_finite() || hz < 0.0 || hz > u64::MAX as f64 {
            return Err(err());
        }
        Ok(Frequency::from_hz(hz.round() as u64))
    }
}
