//! Duration parsing utilities.

use anyhow::Context;
use std::time::Duration;

/// Seconds per unit suffix
const UNITS: [(char, u64, &str); 3] = [
    ('h', 3600, "hours"),
    ('m', 60, "minutes"),
    ('s', 1, "seconds"),
];

/// Parse a timeout such as "300", "300s", "30m" or "1h".
///
/// A bare number is seconds. Values whose second count does not fit in a
/// `u64` are rejected rather than wrapped.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    for (suffix, secs_per_unit, unit) in UNITS {
        if let Some(num_str) = s.strip_suffix(suffix) {
            return scaled(num_str, secs_per_unit, unit);
        }
    }

    scaled(s, 1, "seconds")
}

fn scaled(num_str: &str, secs_per_unit: u64, unit: &str) -> anyhow::Result<Duration> {
    let count: u64 = num_str
        .parse()
        .with_context(|| format!("Invalid {unit} value: {num_str}"))?;
    let secs = count
        .checked_mul(secs_per_unit)
        .with_context(|| format!("Duration too large: {num_str} {unit}"))?;
    Ok(Duration::from_secs(secs))
}
