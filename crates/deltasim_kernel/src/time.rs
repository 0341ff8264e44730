//! Simulated time: femtoseconds plus the delta index within one instant.
//!
//! Two [`SimTime`]s at the same femtosecond are ordered by their delta index,
//! so every committed change has a distinct, totally ordered timestamp.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use deltasim_common::{format_duration, FS_PER_NS};

/// A point in simulated time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SimTime {
    /// Simulated time in femtoseconds.
    pub fs: u64,
    /// Number of changing commits already performed at `fs`.
    pub delta: u32,
}

impl SimTime {
    /// Time zero, before any delta cycle.
    pub fn zero() -> Self {
        Self::default()
    }

    /// The start of the instant `fs`.
    pub fn from_fs(fs: u64) -> Self {
        Self { fs, delta: 0 }
    }

    /// The start of the instant `ns` nanoseconds after zero.
    pub fn from_ns(ns: u64) -> Self {
        Self::from_fs(ns * FS_PER_NS)
    }

    /// The next delta cycle at the same instant.
    pub fn next_delta(&self) -> Self {
        Self {
            fs: self.fs,
            delta: self.delta + 1,
        }
    }

    /// Moves to a later instant, resetting the delta index.
    pub fn advance_to(&self, fs: u64) -> Self {
        debug_assert!(fs >= self.fs, "time moved backwards: {} -> {fs}", self.fs);
        Self::from_fs(fs)
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fs.cmp(&other.fs).then(self.delta.cmp(&other.delta))
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_duration(self.fs))?;
        if self.delta > 0 {
            write!(f, "+d{}", self.delta)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        assert_eq!(SimTime::zero(), SimTime { fs: 0, delta: 0 });
        assert_eq!(SimTime::from_ns(3).fs, 3_000_000);
    }

    #[test]
    fn deltas_order_within_an_instant() {
        let t = SimTime::from_ns(5);
        let d1 = t.next_delta();
        let d2 = d1.next_delta();
        assert!(t < d1 && d1 < d2);
        assert_eq!(d2.delta, 2);
        assert!(SimTime::from_ns(6) > d2);
    }

    #[test]
    fn advance_resets_delta() {
        let t = SimTime { fs: 100, delta: 4 };
        assert_eq!(t.advance_to(250), SimTime::from_fs(250));
    }

    #[test]
    fn display() {
        assert_eq!(SimTime::zero().to_string(), "0 fs");
        assert_eq!(SimTime::from_ns(10).to_string(), "10 ns");
        assert_eq!(SimTime { fs: FS_PER_NS, delta: 3 }.to_string(), "1 ns+d3");
    }

    #[test]
    fn serde_roundtrip() {
        let t = SimTime { fs: 12345, delta: 7 };
        let json = serde_json::to_string(&t).unwrap();
        let back: SimTime = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
