//! Duration strings
//!
//! Timeouts in the workflow catalog and in `--timeout` flags use the same
//! grammar as Prow's configuration: one or more `<number><unit>` groups such
//! as `30m`, `1h30m` or `1.5s`. Formatting produces the canonical form Prow
//! prints back (`30m0s`, `1h30m0s`).

use std::time::Duration;

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Errors produced while parsing a duration string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("invalid duration \"{0}\"")]
    Invalid(String),

    #[error("missing unit in duration \"{0}\"")]
    MissingUnit(String),

    #[error("unknown unit \"{unit}\" in duration \"{input}\"")]
    UnknownUnit { unit: String, input: String },

    #[error("duration \"{0}\" is out of range")]
    Overflow(String),

    #[error("duration \"{0}\" must not be negative")]
    Negative(String),
}

/// Parse a duration string such as `45m`, `1h30m` or `2.5s`
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let mut s = input;
    let mut negative = false;

    if let Some(rest) = s.strip_prefix('-') {
        negative = true;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }

    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(DurationError::Invalid(input.to_string()));
    }

    let mut total: u128 = 0;

    while !s.is_empty() {
        let int_len = s.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, rest) = s.split_at(int_len);
        s = rest;

        let mut frac_part = "";
        if let Some(rest) = s.strip_prefix('.') {
            let frac_len = rest.bytes().take_while(u8::is_ascii_digit).count();
            frac_part = &rest[..frac_len];
            s = &rest[frac_len..];
        }

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(DurationError::Invalid(input.to_string()));
        }

        let unit_len = s
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(s.len());
        let (unit, rest) = s.split_at(unit_len);
        s = rest;

        if unit.is_empty() {
            return Err(DurationError::MissingUnit(input.to_string()));
        }

        let scale = unit_scale(unit).ok_or_else(|| DurationError::UnknownUnit {
            unit: unit.to_string(),
            input: input.to_string(),
        })?;

        let overflow = || DurationError::Overflow(input.to_string());

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| overflow())?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(overflow)?;

        if !frac_part.is_empty() {
            // Digits beyond nanosecond precision cannot change the result.
            let digits = &frac_part[..frac_part.len().min(18)];
            let frac: u128 = digits.parse().map_err(|_| overflow())?;
            nanos += frac * scale / 10u128.pow(digits.len() as u32);
        }

        total = total.checked_add(nanos).ok_or_else(overflow)?;
        if total > i64::MAX as u128 {
            return Err(overflow());
        }
    }

    if negative && total > 0 {
        return Err(DurationError::Negative(input.to_string()));
    }

    Ok(Duration::from_nanos(total as u64))
}

fn unit_scale(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(60 * NANOS_PER_SECOND),
        "h" => Some(3_600 * NANOS_PER_SECOND),
        _ => None,
    }
}

/// Format a duration in canonical form (`30m0s`, `1h0m0s`, `1.5s`, `250ms`)
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }

    if nanos < NANOS_PER_SECOND {
        let (unit, scale) = if nanos < 1_000 {
            ("ns", 1)
        } else if nanos < 1_000_000 {
            ("µs", 1_000)
        } else {
            ("ms", 1_000_000)
        };
        return format!("{}{}", format_fraction(nanos, scale), unit);
    }

    let total_secs = nanos / NANOS_PER_SECOND;
    let hours = total_secs / 3_600;
    let minutes = (total_secs / 60) % 60;
    let seconds_nanos = (total_secs % 60) * NANOS_PER_SECOND + nanos % NANOS_PER_SECOND;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    out.push_str(&format_fraction(seconds_nanos, NANOS_PER_SECOND));
    out.push('s');
    out
}

fn format_fraction(value: u128, scale: u128) -> String {
    let whole = value / scale;
    let remainder = value % scale;
    if remainder == 0 {
        return whole.to_string();
    }

    let width = scale.to_string().len() - 1;
    let digits = format!("{:0width$}", remainder, width = width);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(parse_duration("45m").unwrap(), Duration::from_secs(45 * 60));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7_200));
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("3us").unwrap(), Duration::from_micros(3));
        assert_eq!(parse_duration("3µs").unwrap(), Duration::from_micros(3));
        assert_eq!(parse_duration("7ns").unwrap(), Duration::from_nanos(7));
    }

    #[test]
    fn test_parse_compound_and_fractional() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5_400));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5_400));
        assert_eq!(parse_duration(".5s").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("+5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("-0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(parse_duration(""), Err(DurationError::Invalid(_))));
        assert!(matches!(parse_duration("abc"), Err(DurationError::Invalid(_))));
        assert!(matches!(parse_duration("30"), Err(DurationError::MissingUnit(_))));
        assert!(matches!(
            parse_duration("30minutes"),
            Err(DurationError::UnknownUnit { .. })
        ));
        assert!(matches!(parse_duration("1d"), Err(DurationError::UnknownUnit { .. })));
        assert!(matches!(parse_duration("-5m"), Err(DurationError::Negative(_))));
        assert!(matches!(
            parse_duration("99999999999999999999h"),
            Err(DurationError::Overflow(_))
        ));
    }

    #[test]
    fn test_format_canonical() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_secs(30 * 60)), "30m0s");
        assert_eq!(format_duration(Duration::from_secs(5_400)), "1h30m0s");
        assert_eq!(format_duration(Duration::from_secs(3_600)), "1h0m0s");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_millis(1_500)), "1.5s");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_nanos(1_500)), "1.5µs");
    }

    #[test]
    fn test_format_output_parses_back() {
        for input in ["45m", "1h30m", "2.25s", "90s", "1h0m1s"] {
            let parsed = parse_duration(input).unwrap();
            assert_eq!(parse_duration(&format_duration(parsed)).unwrap(), parsed);
        }
    }
}
