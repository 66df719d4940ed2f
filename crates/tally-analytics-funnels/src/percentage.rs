//! Fixed-point percentages with two fractional digits

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use utoipa::ToSchema;

/// A percentage stored as hundredths of a percent, so `66.67%` is `6667`.
///
/// Serialized as a JSON number (`66.67`). All arithmetic is integer; the
/// only float conversion happens at the serialization boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, ToSchema)]
#[schema(value_type = f64, example = 66.67)]
pub struct Percentage(i64);

impl Percentage {
    pub const ZERO: Percentage = Percentage(0);
    pub const HUNDRED: Percentage = Percentage(10_000);

    pub const fn from_hundredths(hundredths: i64) -> Self {
        Percentage(hundredths)
    }

    pub const fn hundredths(self) -> i64 {
        self.0
    }

    /// `numerator / denominator * 100`, rounded half-up to two decimals.
    ///
    /// A zero (or negative) denominator yields `0.00`. Results above 100 are
    /// not clamped.
    pub fn ratio(numerator: i64, denominator: i64) -> Self {
        if denominator <= 0 || numerator <= 0 {
            return Self::ZERO;
        }

        let n = numerator as i128;
        let d = denominator as i128;
        let hundredths = (2 * n * 10_000 + d) / (2 * d);

        Percentage(i64::try_from(hundredths).unwrap_or(i64::MAX))
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Percentage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Percentage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() {
            return Err(serde::de::Error::custom("percentage must be finite"));
        }
        Ok(Percentage((value * 100.0).round() as i64))
    }
}
