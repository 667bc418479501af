//! Event time parsing.
//!
//! Accepts RFC 3339 strings (the vendor CSV format), integer nanoseconds since
//! epoch, and integer or fractional seconds since epoch. Numbers between the
//! two ranges, such as millisecond epochs, are rejected.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Numeric values above this are nanoseconds.
const NANOS_THRESHOLD: f64 = 1e14;

/// Largest magnitude read as seconds (about year 5138).
const MAX_EPOCH_SECS: f64 = 1e11;

fn ambiguous_unit(raw: &str) -> Error {
    Error::Time(format!("{raw} is neither seconds nor nanoseconds since epoch"))
}

/// Parse an event time cell into a UTC timestamp.
pub fn parse_event_time(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::Time("empty value".to_string()));
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Ok(int) = raw.parse::<i64>() {
        let magnitude = (int as f64).abs();
        return if int as f64 > NANOS_THRESHOLD {
            Ok(Utc.timestamp_nanos(int))
        } else if magnitude > MAX_EPOCH_SECS {
            Err(ambiguous_unit(raw))
        } else {
            Utc.timestamp_opt(int, 0)
                .single()
                .ok_or_else(|| Error::Time(format!("out of range: {raw}")))
        };
    }

    if let Ok(secs) = raw.parse::<f64>() {
        if secs.is_finite() {
            if secs.abs() > MAX_EPOCH_SECS {
                return Err(ambiguous_unit(raw));
            }
            let nanos = (secs * 1e9).round();
            if nanos.abs() < i64::MAX as f64 {
                return Ok(Utc.timestamp_nanos(nanos as i64));
            }
        }
    }

    Err(Error::Time(format!("unrecognised format: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_rfc3339() {
        let ts = parse_event_time("2025-01-03T10:30:00.123456789Z").unwrap();
        assert_eq!(ts.hour(), 10);
        assert_eq!(ts.nanosecond(), 123_456_789);
    }

    #[test]
    fn test_integer_seconds_and_nanos() {
        let secs = parse_event_time("1735900200").unwrap();
        let nanos = parse_event_time("1735900200000000000").unwrap();
        assert_eq!(secs, nanos);
    }

    #[test]
    fn test_fractional_seconds() {
        let ts = parse_event_time("1735900200.5").unwrap();
        assert_eq!(ts.timestamp(), 1_735_900_200);
        assert_eq!(ts.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_millis_rejected() {
        for raw in ["1735900200000", "1735900200000.5", "-1735900200000"] {
            match parse_event_time(raw) {
                Err(Error::Time(msg)) => assert!(msg.contains("neither seconds nor nanoseconds")),
                other => panic!("{raw} parsed as {other:?}"),
            }
        }
        assert!(parse_event_time("99999999999").is_ok());
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(parse_event_time("yesterday"), Err(Error::Time(_))));
        assert!(matches!(parse_event_time(""), Err(Error::Time(_))));
    }
}
