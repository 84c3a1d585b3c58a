//! Date/time parsing boundary. Accepts the handful of common forms CRDS
//! rule files carry ("YYYY-MM-DD HH:MM:SS", with or without fractional
//! seconds, and a bare date), and canonicalizes them to a single form for
//! ordering and display.

use crate::error::{Error, Result};
use chrono::NaiveDateTime;

const FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
    "%Y/%m/%d %H:%M:%S",
];

/// A parsed, orderable instant in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(NaiveDateTime);

impl Instant {
    /// Seconds elapsed from `self` to `other` (may be negative).
    #[must_use]
    pub fn seconds_until(&self, other: &Self) -> i64 {
        (other.0 - self.0).num_seconds()
    }

    /// Absolute number of seconds between `self` and `other`.
    #[must_use]
    pub fn abs_delta_seconds(&self, other: &Self) -> i64 {
        self.seconds_until(other).abs()
    }
}

/// Parses one of the supported date/time forms.
///
/// # Errors
/// Returns `Error::InvalidDateTime` if no supported form matches.
pub fn parse_date(raw: &str) -> Result<Instant> {
    let trimmed = raw.trim();

    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(Instant(dt));
        }
        if let Ok(d) = chrono::NaiveDate::parse_from_str(trimmed, fmt) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(Instant(dt));
            }
        }
    }

    Err(Error::InvalidDateTime(raw.to_string()))
}

/// Reformats any supported date/time string to the canonical
/// `YYYY-MM-DD HH:MM:SS` form.
///
/// # Errors
/// Returns `Error::InvalidDateTime` if `raw` cannot be parsed.
pub fn reformat_date(raw: &str) -> Result<String> {
    Ok(parse_date(raw)?.0.format("%Y-%m-%d %H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_datetime() {
        let a = parse_date("2004-07-02 08:09:00").unwrap();
        let b = parse_date("2004-07-02 08:09:01").unwrap();
        assert!(a < b);
    }

    #[test]
    fn parses_bare_date() {
        let a = parse_date("2000-07-02").unwrap();
        let b = parse_date("2000-07-02 00:00:00").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_date("not a date").is_err());
    }

    #[test]
    fn reformats_canonically() {
        assert_eq!(
            reformat_date("2000-07-02").unwrap(),
            "2000-07-02 00:00:00"
        );
    }

    #[test]
    fn seconds_until_is_signed() {
        let a = parse_date("2000-01-01 00:00:00").unwrap();
        let b = parse_date("2000-01-01 00:00:10").unwrap();
        assert_eq!(a.seconds_until(&b), 10);
        assert_eq!(b.seconds_until(&a), -10);
    }
}
