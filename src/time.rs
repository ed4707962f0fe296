//! The time scalar.
//!
//! [`Timestamp`] wraps a [`chrono::DateTime<FixedOffset>`] and knows the five
//! textual shapes the format uses. The shape is picked from the length of the
//! text when reading, and from the value when writing:
//!
//! | length | shape                        | example                      |
//! |--------|------------------------------|------------------------------|
//! | 25     | date, time and offset        | `2006-01-02 15:04:05 -0700`  |
//! | 19     | date and time                | `2006-01-02 15:04:05`        |
//! | 14     | time and offset              | `15:04:05 -0700`             |
//! | 10     | date                         | `2006-01-02`                 |
//! | 8      | time                         | `15:04:05`                   |
//!
//! Shapes without an offset are UTC. Shapes without a date sit on
//! `0000-01-01`. The zero value is `0001-01-01 00:00:00 +0000`.
//!
//! ```rust
//! use serde_cfg::Timestamp;
//!
//! let ts: Timestamp = "15:04:05 -0700".parse().unwrap();
//! assert_eq!(ts.to_string(), "15:04:05 -0700");
//! assert!(Timestamp::default().is_zero());
//! ```

use crate::error::CoercionError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Newtype name that lets the value serializer and the type tracer recognize
/// a [`Timestamp`] among ordinary strings.
pub(crate) const TIMESTAMP_TOKEN: &str = "$serde_cfg::private::Timestamp";

const OFFSET_DATE_TIME: &str = "%Y-%m-%d %H:%M:%S %z";
const DATE_TIME: &str = "%Y-%m-%d %H:%M:%S";
const OFFSET_TIME: &str = "%H:%M:%S %z";
const DATE: &str = "%Y-%m-%d";
const TIME: &str = "%H:%M:%S";

/// A point in time with a fixed UTC offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(DateTime<FixedOffset>);

fn utc() -> FixedOffset {
    Utc.fix()
}

fn time_only_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(0, 1, 1).unwrap_or_default()
}

impl Timestamp {
    #[must_use]
    pub fn new(datetime: DateTime<FixedOffset>) -> Self {
        Timestamp(datetime)
    }

    /// Builds a UTC timestamp from a naive date and time.
    #[must_use]
    pub fn from_naive_utc(naive: NaiveDateTime) -> Self {
        Timestamp(utc().from_utc_datetime(&naive))
    }

    /// Parses one of the five shapes; the length of `s` selects the shape.
    pub fn parse(s: &str) -> Result<Self, CoercionError> {
        let invalid = || CoercionError::InvalidTime { input: s.to_string() };
        match s.len() {
            25 => DateTime::parse_from_str(s, OFFSET_DATE_TIME)
                .map(Timestamp)
                .map_err(|_| invalid()),
            19 => NaiveDateTime::parse_from_str(s, DATE_TIME)
                .map(Timestamp::from_naive_utc)
                .map_err(|_| invalid()),
            14 => {
                let with_date = format!("{} {}", time_only_date().format(DATE), s);
                DateTime::parse_from_str(&with_date, OFFSET_DATE_TIME)
                    .map(Timestamp)
                    .map_err(|_| invalid())
            }
            10 => NaiveDate::parse_from_str(s, DATE)
                .map(|date| Timestamp::from_naive_utc(date.and_time(NaiveTime::MIN)))
                .map_err(|_| invalid()),
            8 => NaiveTime::parse_from_str(s, TIME)
                .map(|time| Timestamp::from_naive_utc(time_only_date().and_time(time)))
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Timestamp::default()
    }

    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<FixedOffset> {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> DateTime<FixedOffset> {
        self.0
    }

    fn layout(&self) -> &'static str {
        let has_offset = self.0.offset().local_minus_utc() != 0;
        let local = self.0.naive_local();
        let no_date = local.date() == time_only_date();
        let no_time = local.time() == NaiveTime::MIN;
        match (has_offset, no_date, no_time) {
            (false, true, _) => TIME,
            (false, false, true) => DATE,
            (false, false, false) => DATE_TIME,
            (true, true, _) => OFFSET_TIME,
            (true, false, _) => OFFSET_DATE_TIME,
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        let zero = NaiveDate::from_ymd_opt(1, 1, 1)
            .unwrap_or_default()
            .and_time(NaiveTime::MIN);
        Timestamp::from_naive_utc(zero)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(self.layout()))
    }
}

impl FromStr for Timestamp {
    type Err = CoercionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timestamp::parse(s)
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(datetime: DateTime<FixedOffset>) -> Self {
        Timestamp(datetime)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Timestamp(datetime.with_timezone(&utc()))
    }
}

impl From<Timestamp> for DateTime<FixedOffset> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_newtype_struct(TIMESTAMP_TOKEN, &self.to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TimestampVisitor;

        impl<'de> Visitor<'de> for TimestampVisitor {
            type Value = Timestamp;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a date, a time, or a date and time")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Timestamp::parse(value).map_err(E::custom)
            }

            fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_str(self)
            }
        }

        deserializer.deserialize_newtype_struct(TIMESTAMP_TOKEN, TimestampVisitor)
    }
}
