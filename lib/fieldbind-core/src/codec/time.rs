//! Timestamp codec.
//!
//! Rendering: RFC 3339 in UTC with as many fractional digits as needed.
//! Parsing accepts, in order: RFC 3339, a bare `YYYY-MM-DD` date (midnight
//! UTC), and Unix seconds with 1 to 9 fractional digits.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use super::ScalarCodec;
use crate::{Error, Result};

const TYPE_NAME: &str = "timestamp";

/// Codec for `DateTime<Utc>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeCodec;

impl ScalarCodec<DateTime<Utc>> for TimeCodec {
    fn encode(&self, value: &DateTime<Utc>) -> Result<String> {
        Ok(value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    fn decode(&self, input: &str) -> Result<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
            return Ok(parsed.with_timezone(&Utc));
        }
        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            return Ok(date.and_time(chrono::NaiveTime::default()).and_utc());
        }
        parse_unix(input)
    }
}

/// Parse `^\d+(\.\d{1,9})?$` as Unix seconds.
fn parse_unix(input: &str) -> Result<DateTime<Utc>> {
    let invalid = |message: &str| Error::parse(TYPE_NAME, input, message);

    let (seconds, fraction) = match input.split_once('.') {
        Some((seconds, fraction)) => (seconds, Some(fraction)),
        None => (input, None),
    };
    if seconds.is_empty() || !seconds.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(invalid("not a timestamp"));
    }
    let seconds: i64 = seconds.parse().map_err(|_| invalid("seconds out of range"))?;

    let nanos = match fraction {
        None => 0,
        Some(fraction) => {
            if fraction.is_empty() || fraction.len() > 9 {
                return Err(invalid("expected 1 to 9 fractional digits"));
            }
            if !fraction.bytes().all(|byte| byte.is_ascii_digit()) {
                return Err(invalid("not a timestamp"));
            }
            let padded = format!("{fraction:0<9}");
            padded
                .parse::<u32>()
                .map_err(|_| invalid("invalid fraction"))?
        }
    };

    DateTime::from_timestamp(seconds, nanos).ok_or_else(|| invalid("timestamp out of range"))
}
