//! Microsecond-epoch timestamps.
//!
//! The language stores timestamps as unsigned microseconds since the Unix
//! epoch and accepts three single-quoted literal shapes in source text:
//!
//! - `YYYY-MM-DD HH:MM:SS[.ffffff]` - a local-time instant
//! - `YYYY-MM-DD` - local midnight of that date
//! - `HH:MM:SS[.ffffff]` - microseconds from midnight, not anchored to any
//!   date
//!
//! The formatting helpers are the inverse renderings, also in local time.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::Error;

const USEC_PER_SEC: u64 = 1_000_000;

/// Parse a timestamp literal (without its surrounding quotes) into
/// microseconds since the epoch.
///
/// Date-bearing forms resolve in the local timezone. A time-only form
/// yields a dateless count of microseconds from midnight; it is up to the
/// host to anchor it if an absolute instant is needed.
pub fn parse_timestamp(text: &str) -> Result<u64, Error> {
    let has_date = text.contains('-');
    let has_time = text.contains(':');
    if has_date && has_time {
        let dt = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
            .map_err(|e| Error::Syntax(format!("unable to parse timestamp '{text}': {e}")))?;
        local_micros(dt, text)
    } else if has_date {
        let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map_err(|e| Error::Syntax(format!("unable to parse date '{text}': {e}")))?;
        local_micros(date.and_time(NaiveTime::MIN), text)
    } else if has_time {
        let time = NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
            .map_err(|e| Error::Syntax(format!("unable to parse time '{text}': {e}")))?;
        Ok(time.num_seconds_from_midnight() as u64 * USEC_PER_SEC
            + (time.nanosecond() / 1_000) as u64)
    } else {
        Err(Error::Syntax(format!(
            "unable to parse timestamp '{text}'"
        )))
    }
}

fn local_micros(dt: NaiveDateTime, text: &str) -> Result<u64, Error> {
    dt.and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.timestamp_micros() as u64)
        .ok_or_else(|| {
            Error::Syntax(format!(
                "timestamp '{text}' does not exist in the local timezone"
            ))
        })
}

/// Render a timestamp as `YYYY-MM-DD HH:MM:SS` in local time, with
/// microseconds appended when `incl_usec` is set.
pub fn format_timestamp(micros: u64, incl_usec: bool) -> String {
    match local_datetime(micros) {
        Some(local) => {
            if incl_usec {
                local.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
            } else {
                local.format("%Y-%m-%d %H:%M:%S").to_string()
            }
        }
        None => micros.to_string(),
    }
}

/// Render only the date component, `YYYY-MM-DD`, in local time.
pub fn format_date(micros: u64) -> String {
    match local_datetime(micros) {
        Some(local) => local.format("%Y-%m-%d").to_string(),
        None => micros.to_string(),
    }
}

/// Render only the time component, `HH:MM:SS`, in local time, with
/// microseconds appended when `incl_usec` is set.
pub fn format_time(micros: u64, incl_usec: bool) -> String {
    match local_datetime(micros) {
        Some(local) => {
            if incl_usec {
                local.format("%H:%M:%S%.6f").to_string()
            } else {
                local.format("%H:%M:%S").to_string()
            }
        }
        None => micros.to_string(),
    }
}

fn local_datetime(micros: u64) -> Option<DateTime<Local>> {
    DateTime::from_timestamp_micros(micros as i64).map(|utc| utc.with_timezone(&Local))
}
