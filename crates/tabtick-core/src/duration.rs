//! Duration literals and human-readable ages.
//!
//! Rules express durations as `<int><unit>` strings (`30m`, `2h`, `7d`).
//! Everything is compared in milliseconds.

use thiserror::Error;

/// Milliseconds per minute.
pub const MINUTE_MS: i64 = 60_000;
/// Milliseconds per hour.
pub const HOUR_MS: i64 = 3_600_000;
/// Milliseconds per day.
pub const DAY_MS: i64 = 86_400_000;

const UNITS: &[(char, i64)] = &[('m', MINUTE_MS), ('h', HOUR_MS), ('d', DAY_MS)];

/// A duration literal that does not match `<int><unit>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration literal '{literal}' (expected <int><m|h|d>)")]
pub struct DurationError {
    /// The rejected literal.
    pub literal: String,
}

/// Parse a `<int><unit>` literal into milliseconds.
///
/// Units: `m` (minutes), `h` (hours), `d` (days). Whitespace around the
/// literal is ignored; the unit is case-insensitive.
pub fn parse_duration_ms(literal: &str) -> Result<i64, DurationError> {
    let err = || DurationError {
        literal: literal.to_owned(),
    };
    let trimmed = literal.trim();
    let unit = trimmed.chars().last().ok_or_else(err)?.to_ascii_lowercase();
    let multiplier = UNITS
        .iter()
        .find(|(u, _)| *u == unit)
        .map(|(_, ms)| *ms)
        .ok_or_else(err)?;
    let digits = &trimmed[..trimmed.len() - 1];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(err());
    }
    let count: i64 = digits.parse().map_err(|_| err())?;
    count.checked_mul(multiplier).ok_or_else(err)
}

/// Short human-readable age: `just now`, `12m`, `3h`, `5d`.
pub fn format_age(ms: i64) -> String {
    if ms < MINUTE_MS {
        "just now".to_owned()
    } else if ms < HOUR_MS {
        format!("{}m", ms / MINUTE_MS)
    } else if ms < DAY_MS {
        format!("{}h", ms / HOUR_MS)
    } else {
        format!("{}d", ms / DAY_MS)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_each_unit() {
        assert_eq!(parse_duration_ms("30m"), Ok(30 * MINUTE_MS));
        assert_eq!(parse_duration_ms("2h"), Ok(7_200_000));
        assert_eq!(parse_duration_ms("1d"), Ok(86_400_000));
    }

    #[test]
    fn unit_is_case_insensitive_and_trimmed() {
        assert_eq!(parse_duration_ms(" 3H "), Ok(3 * HOUR_MS));
    }

    #[test]
    fn zero_is_allowed() {
        assert_eq!(parse_duration_ms("0m"), Ok(0));
    }

    #[test]
    fn rejects_bad_literals() {
        for bad in ["", "m", "10", "10s", "-5m", "1.5h", "h1", "ten d"] {
            assert_matches!(parse_duration_ms(bad), Err(DurationError { .. }), "{bad}");
        }
    }

    #[test]
    fn rejects_overflow() {
        assert!(parse_duration_ms("9999999999999999d").is_err());
    }

    #[test]
    fn error_message() {
        let err = parse_duration_ms("5w").unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"invalid duration literal '5w' (expected <int><m|h|d>)");
    }

    #[test]
    fn format_age_buckets() {
        assert_eq!(format_age(5_000), "just now");
        assert_eq!(format_age(12 * MINUTE_MS + 5), "12m");
        assert_eq!(format_age(3 * HOUR_MS), "3h");
        assert_eq!(format_age(5 * DAY_MS + HOUR_MS), "5d");
    }
}
