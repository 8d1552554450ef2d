//! Human-readable duration strings: `"15s"`, `"2h"`, `"1h30m"`, `"500ms"`.
//!
//! Config files express every interval, timeout, and start-of-day offset in
//! this grammar: one or more `<number><unit>` components, where the number
//! may be fractional and the unit is `h`, `m`, `s`, or `ms`.

use chrono::Duration;

use crate::error::{ConfigError, Result};

/// Parse a duration string into a signed [`chrono::Duration`].
///
/// `"0"` is accepted as a bare zero. Negative durations are rejected — no
/// scheduling field has a meaningful negative value.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() || s.starts_with('-') || s.starts_with('+') {
        return Err(ConfigError::InvalidDuration(s.to_string()));
    }
    if s == "0" {
        return Ok(Duration::zero());
    }

    let mut total_ms = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let value: f64 = rest[..num_len]
            .parse()
            .map_err(|_| ConfigError::InvalidDuration(s.to_string()))?;
        rest = &rest[num_len..];

        // Units must be matched longest-first: "ms" before "m".
        let (unit_ms, unit_len) = if rest.starts_with("ms") {
            (1f64, 2)
        } else if rest.starts_with('s') {
            (1_000f64, 1)
        } else if rest.starts_with('m') {
            (60_000f64, 1)
        } else if rest.starts_with('h') {
            (3_600_000f64, 1)
        } else {
            return Err(ConfigError::InvalidDuration(s.to_string()));
        };
        rest = &rest[unit_len..];
        total_ms += value * unit_ms;
    }

    if !total_ms.is_finite() || total_ms > i64::MAX as f64 {
        return Err(ConfigError::InvalidDuration(s.to_string()));
    }
    Ok(Duration::milliseconds(total_ms.round() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_units() {
        assert_eq!(parse_duration("15s").unwrap(), Duration::seconds(15));
        assert_eq!(parse_duration("2h").unwrap(), Duration::hours(2));
        assert_eq!(parse_duration("90m").unwrap(), Duration::minutes(90));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::milliseconds(500));
    }

    #[test]
    fn compound() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::minutes(90));
        assert_eq!(parse_duration("5h3m").unwrap(), Duration::minutes(303));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::seconds(90));
    }

    #[test]
    fn fractional() {
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::minutes(90));
        assert_eq!(parse_duration("0.5s").unwrap(), Duration::milliseconds(500));
    }

    #[test]
    fn bare_zero() {
        assert_eq!(parse_duration("0").unwrap(), Duration::zero());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10").is_err()); // number without a unit
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("5d").is_err()); // days are not a config unit
    }
}
