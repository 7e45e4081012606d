//! Wire-format date handling.
//!
//! Every format writes UTC timestamps as `YYYY-MM-DDThh:mm:ss.SSSZ`.
//! Readers are tolerant: fractional seconds and the trailing `Z` are
//! optional, and stored data from older repository versions may omit both.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::TypeError;

/// The canonical emission format (millisecond precision, `Z` suffix).
pub const WIRE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

const ACCEPTED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S",
];

/// Format a timestamp in the canonical wire form.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(WIRE_DATE_FORMAT).to_string()
}

/// Parse a wire-form timestamp, accepting the tolerant variants.
pub fn parse_date(s: &str) -> Result<DateTime<Utc>, TypeError> {
    let trimmed = s.trim();
    for fmt in ACCEPTED_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(TypeError::InvalidDate(s.to_string()))
}
