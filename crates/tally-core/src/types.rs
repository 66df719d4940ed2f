//! Date and time types shared by the event store and the analytics engine

use chrono::{DateTime as ChronoDateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;
use utoipa::ToSchema;

use crate::error::{ServiceError, ServiceResult};

/// Database DateTime type for TIMESTAMPTZ columns.
pub type DBDateTime = ChronoDateTime<Utc>;

/// Canonical UTC timestamp used in services and API responses.
///
/// When exposed through utoipa, annotate the field:
/// ```rust,ignore
/// #[schema(value_type = String, format = DateTime)]
/// pub occurred_at: UtcDateTime,
/// ```
pub type UtcDateTime = ChronoDateTime<Utc>;

/// Wrapper type for DateTime<Utc> that parses lenient ISO 8601 input.
///
/// Accepts:
/// - `2024-01-15T14:30:00` (naive datetime, assumes UTC)
/// - `2024-01-15T14:30:00Z`
/// - `2024-01-15T14:30:00+02:00` (converted to UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ToSchema)]
#[schema(value_type = String, example = "2024-01-15T14:30:00Z")]
pub struct DateTime(pub ChronoDateTime<Utc>);

impl<'de> Deserialize<'de> for DateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;

        if let Ok(dt) = s.parse::<ChronoDateTime<Utc>>() {
            return Ok(DateTime(dt));
        }

        if let Ok(naive_dt) = NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S") {
            return Ok(DateTime(naive_dt.and_utc()));
        }

        Err(serde::de::Error::custom(
            "Invalid datetime format. Use ISO 8601: YYYY-MM-DDTHH:MM:SSZ",
        ))
    }
}

impl Serialize for DateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_rfc3339())
    }
}

impl Deref for DateTime {
    type Target = ChronoDateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<ChronoDateTime<Utc>> for DateTime {
    fn from(dt: ChronoDateTime<Utc>) -> Self {
        DateTime(dt)
    }
}

impl From<DateTime> for ChronoDateTime<Utc> {
    fn from(dt: DateTime) -> Self {
        dt.0
    }
}

/// An inclusive range of calendar days, evaluated in UTC.
///
/// Both ends are whole days: a timestamp belongs to the window when
/// `start 00:00:00 <= ts < (end + 1 day) 00:00:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DateWindow {
    #[schema(value_type = String, format = Date, example = "2025-01-01")]
    start: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2025-01-31")]
    end: NaiveDate,
    #[serde(skip)]
    lower: UtcDateTime,
    #[serde(skip)]
    upper_exclusive: UtcDateTime,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ServiceResult<Self> {
        if start > end {
            return Err(ServiceError::validation(format!(
                "window start {} is after window end {}",
                start, end
            )));
        }

        let day_after_end = end
            .checked_add_days(Days::new(1))
            .ok_or_else(|| ServiceError::validation(format!("window end {} is out of range", end)))?;

        Ok(Self {
            start,
            end,
            lower: start.and_time(NaiveTime::MIN).and_utc(),
            upper_exclusive: day_after_end.and_time(NaiveTime::MIN).and_utc(),
        })
    }

    /// Window covering a single day.
    pub fn day(day: NaiveDate) -> ServiceResult<Self> {
        Self::new(day, day)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// First instant inside the window.
    pub fn lower_bound(&self) -> UtcDateTime {
        self.lower
    }

    /// First instant after the window.
    pub fn upper_bound_exclusive(&self) -> UtcDateTime {
        self.upper_exclusive
    }

    pub fn contains(&self, ts: &UtcDateTime) -> bool {
        *ts >= self.lower && *ts < self.upper_exclusive
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}
