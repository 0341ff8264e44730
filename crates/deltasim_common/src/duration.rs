//! Femtosecond durations with unit-suffixed parsing and display.
//!
//! Simulated time is counted in integer femtoseconds. Human input such as
//! `"100ns"` or `"5 us"` is converted with [`parse_duration`].

/// Femtoseconds per picosecond.
pub const FS_PER_PS: u64 = 1_000;
/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;
/// Femtoseconds per millisecond.
pub const FS_PER_MS: u64 = 1_000_000_000_000;
/// Femtoseconds per second.
pub const FS_PER_S: u64 = 1_000_000_000_000_000;

const UNITS: [(&str, u64); 6] = [
    ("s", FS_PER_S),
    ("ms", FS_PER_MS),
    ("us", FS_PER_US),
    ("ns", FS_PER_NS),
    ("ps", FS_PER_PS),
    ("fs", 1),
];

/// Errors produced by [`parse_duration`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    /// The input was empty or whitespace.
    #[error("empty duration string")]
    Empty,
    /// The input did not start with a number.
    #[error("invalid duration: no numeric value in '{0}'")]
    NoNumber(String),
    /// The number had no unit suffix.
    #[error("missing unit in duration '{0}' (use fs, ps, ns, us, ms, or s)")]
    MissingUnit(String),
    /// The unit suffix was not recognized.
    #[error("unknown duration unit '{0}' (use fs, ps, ns, us, ms, or s)")]
    UnknownUnit(String),
    /// The duration does not fit in 64-bit femtoseconds.
    #[error("duration '{0}' overflows the femtosecond range")]
    Overflow(String),
}

/// Parses a duration like `"100ns"` or `"5 us"` into femtoseconds.
pub fn parse_duration(s: &str) -> Result<u64, DurationError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }

    let digit_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if digit_end == 0 {
        return Err(DurationError::NoNumber(s.to_string()));
    }
    let number: u64 = s[..digit_end]
        .parse()
        .map_err(|_| DurationError::Overflow(s.to_string()))?;

    let unit = s[digit_end..].trim();
    if unit.is_empty() {
        return Err(DurationError::MissingUnit(s.to_string()));
    }
    let multiplier = UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, fs)| *fs)
        .ok_or_else(|| DurationError::UnknownUnit(unit.to_string()))?;

    number
        .checked_mul(multiplier)
        .ok_or_else(|| DurationError::Overflow(s.to_string()))
}

/// Formats femtoseconds using the largest unit that divides them exactly.
pub fn format_duration(fs: u64) -> String {
    if fs == 0 {
        return "0 fs".to_string();
    }
    for (name, unit) in UNITS {
        if fs >= unit && fs % unit == 0 {
            return format!("{} {name}", fs / unit);
        }
    }
    format!("{fs} fs")
}
