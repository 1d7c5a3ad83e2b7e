//! Timestamp parsing and arithmetic
//!
//! All observation timestamps are treated as UTC-labelled naive
//! date-times. The timezone offset applied during header adjustment is
//! a flat hour count; no timezone database is consulted and the result
//! stays labelled UTC. That simplification is intentional.

use chrono::{Duration, NaiveDateTime};

/// Julian Date of the Unix epoch, 1970-01-01T00:00:00 UTC.
pub const UNIX_EPOCH_JD: f64 = 2440587.5;

/// Parse an ISO 8601 combined date-time (`YYYY-MM-DDTHH:MM:SS` with an
/// optional fractional second).
pub fn parse_isot(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// Render with millisecond precision, e.g. `2014-11-22T12:31:25.000`.
pub fn format_isot(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}

pub fn add_hours(t: NaiveDateTime, hours: f64) -> NaiveDateTime {
    t + micros(hours * 3600.0)
}

pub fn add_seconds(t: NaiveDateTime, seconds: f64) -> NaiveDateTime {
    t + micros(seconds)
}

/// Fractional seconds as a whole-microsecond duration, which keeps the
/// arithmetic exact at sub-second precision.
fn micros(seconds: f64) -> Duration {
    Duration::microseconds((seconds * 1e6).round() as i64)
}

/// Julian Date of a UTC timestamp.
pub fn julian_date(t: NaiveDateTime) -> f64 {
    t.and_utc().timestamp_micros() as f64 / 86_400e6 + UNIX_EPOCH_JD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_isot_with_and_without_fraction() {
        assert!(parse_isot("2014-11-22T12:31:10").is_some());
        assert!(parse_isot(" 2014-11-22T12:31:10.125 ").is_some());
        assert!(parse_isot("22/11/2014").is_none());
        assert!(parse_isot("2014-11-22").is_none());
    }

    #[test]
    fn test_format_isot_millisecond_precision() {
        let t = parse_isot("2014-11-22T12:31:10.1256").unwrap();
        assert_eq!(format_isot(t), "2014-11-22T12:31:10.125");
        let t = parse_isot("2014-11-22T12:31:10").unwrap();
        assert_eq!(format_isot(t), "2014-11-22T12:31:10.000");
    }

    #[test]
    fn test_add_hours_fractional() {
        let t = parse_isot("2014-01-01T00:00:00").unwrap();
        assert_eq!(
            format_isot(add_hours(t, 10.5)),
            "2014-01-01T10:30:00.000"
        );
        assert_eq!(
            format_isot(add_hours(t, -1.25)),
            "2013-12-31T22:45:00.000"
        );
    }

    #[test]
    fn test_add_seconds_subsecond_precision() {
        let t = parse_isot("2014-01-01T00:00:00").unwrap();
        assert_eq!(
            format_isot(add_seconds(t, 15.25)),
            "2014-01-01T00:00:15.250"
        );
    }

    #[test]
    fn test_julian_date_epochs() {
        let epoch = parse_isot("1970-01-01T00:00:00").unwrap();
        assert!((julian_date(epoch) - UNIX_EPOCH_JD).abs() < 1e-9);

        // J2000.0
        let j2000 = parse_isot("2000-01-01T12:00:00").unwrap();
        assert!((julian_date(j2000) - 2451545.0).abs() < 1e-9);
    }

    #[test]
    fn test_julian_date_precision() {
        let t = parse_isot("2014-11-22T12:31:25").unwrap();
        assert!((julian_date(t) - 2456984.0218171296).abs() < 1e-5);
    }
}
