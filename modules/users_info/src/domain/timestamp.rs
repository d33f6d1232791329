use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use thiserror::Error;

/// `YYYYMMDDHHMMSS`, the width of every stamp on the wire.
pub const STAMP_LEN: usize = 14;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("timestamp '{0}' is not 14 digits")]
    Format(String),
    #[error("timestamp '{0}' is not a valid date and time")]
    OutOfRange(String),
}

/// UTC instant with second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::from_naive(dt.naive_utc())
    }

    pub fn from_naive(dt: NaiveDateTime) -> Self {
        Self(dt.with_nanosecond(0).unwrap_or(dt))
    }

    /// Strict parse of a 14-digit stamp.
    pub fn parse(raw: &str) -> Result<Self, TimestampError> {
        if raw.len() != STAMP_LEN || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TimestampError::Format(raw.to_string()));
        }

        let field = |from: usize, to: usize| raw[from..to].parse::<u32>().unwrap_or(u32::MAX);
        let year = raw[0..4].parse::<i32>().unwrap_or(i32::MAX);

        NaiveDate::from_ymd_opt(year, field(4, 6), field(6, 8))
            .and_then(|d| d.and_hms_opt(field(8, 10), field(10, 12), field(12, 14)))
            .map(Self)
            .ok_or_else(|| TimestampError::OutOfRange(raw.to_string()))
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }

    /// Absolute distance to `other` in milliseconds.
    pub fn millis_between(&self, other: &Timestamp) -> i64 {
        (other.0 - self.0).num_milliseconds().abs()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d%H%M%S"))
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
