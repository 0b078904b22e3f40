//! ISO-8601 durations as used by ELAPSED_TIME constraints.
//!
//! Only exact units are accepted (`W`, `D`, `H`, `M`, `S`); calendar units
//! (years, months) have no fixed length and are rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MalformedPolicyError;

const MILLIS_PER_SECOND: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: u64 = 24 * MILLIS_PER_HOUR;
const MILLIS_PER_WEEK: u64 = 7 * MILLIS_PER_DAY;

/// A non-negative usage duration with millisecond precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UsageDuration {
    millis: u64,
}

impl UsageDuration {
    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self {
            millis: secs.saturating_mul(MILLIS_PER_SECOND),
        }
    }

    pub fn as_millis(&self) -> u64 {
        self.millis
    }

    /// Convert for date arithmetic. Saturates at `i64::MAX` milliseconds.
    pub fn to_chrono(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.millis).unwrap_or(i64::MAX))
    }

    /// Parse an ISO-8601 duration such as `P3D`, `PT1H30M` or `PT0.5S`.
    pub fn parse(input: &str) -> Result<Self, MalformedPolicyError> {
        let invalid = |reason: &str| MalformedPolicyError::InvalidDuration {
            value: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let body = trimmed
            .strip_prefix('P')
            .ok_or_else(|| invalid("must start with 'P'"))?;
        if body.is_empty() {
            return Err(invalid("no components"));
        }

        let (date_part, time_part) = match body.split_once('T') {
            Some((d, t)) => {
                if t.is_empty() {
                    return Err(invalid("empty time component"));
                }
                (d, Some(t))
            }
            None => (body, None),
        };

        let mut millis: u64 = 0;
        for (value, unit) in components(date_part).map_err(|r| invalid(&r))? {
            let factor = match unit {
                'W' => MILLIS_PER_WEEK,
                'D' => MILLIS_PER_DAY,
                'Y' | 'M' => return Err(invalid("calendar units are not supported")),
                other => return Err(invalid(&format!("unknown date unit '{}'", other))),
            };
            millis = add_scaled(millis, value, factor).ok_or_else(|| invalid("overflow"))?;
        }

        if let Some(time_part) = time_part {
            for (value, unit) in components(time_part).map_err(|r| invalid(&r))? {
                let factor = match unit {
                    'H' => MILLIS_PER_HOUR,
                    'M' => MILLIS_PER_MINUTE,
                    'S' => MILLIS_PER_SECOND,
                    other => return Err(invalid(&format!("unknown time unit '{}'", other))),
                };
                millis = add_scaled(millis, value, factor).ok_or_else(|| invalid("overflow"))?;
            }
        }

        Ok(Self { millis })
    }
}

/// Split `3DT` style strings into `(number, unit)` pairs.
fn components(part: &str) -> Result<Vec<(f64, char)>, String> {
    let mut out = Vec::new();
    let mut number = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() || c == '.' || c == ',' {
            number.push(if c == ',' { '.' } else { c });
            continue;
        }
        if number.is_empty() {
            return Err(format!("unit '{}' without a value", c));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| format!("'{}' is not a number", number))?;
        out.push((value, c));
        number.clear();
    }
    if !number.is_empty() {
        return Err(format!("trailing value '{}' without a unit", number));
    }
    Ok(out)
}

fn add_scaled(acc: u64, value: f64, factor: u64) -> Option<u64> {
    let scaled = (value * factor as f64).round();
    if !scaled.is_finite() || scaled < 0.0 || scaled > u64::MAX as f64 {
        return None;
    }
    acc.checked_add(scaled as u64)
}

impl FromStr for UsageDuration {
    type Err = MalformedPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for UsageDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.millis;
        let days = rest / MILLIS_PER_DAY;
        rest %= MILLIS_PER_DAY;
        let hours = rest / MILLIS_PER_HOUR;
        rest %= MILLIS_PER_HOUR;
        let minutes = rest / MILLIS_PER_MINUTE;
        rest %= MILLIS_PER_MINUTE;

        write!(f, "P")?;
        if days > 0 {
            write!(f, "{}D", days)?;
        }
        if hours == 0 && minutes == 0 && rest == 0 {
            if days == 0 {
                write!(f, "T0S")?;
            }
            return Ok(());
        }
        write!(f, "T")?;
        if hours > 0 {
            write!(f, "{}H", hours)?;
        }
        if minutes > 0 {
            write!(f, "{}M", minutes)?;
        }
        if rest > 0 {
            if rest % MILLIS_PER_SECOND == 0 {
                write!(f, "{}S", rest / MILLIS_PER_SECOND)?;
            } else {
                write!(f, "{}.{:03}S", rest / MILLIS_PER_SECOND, rest % MILLIS_PER_SECOND)?;
            }
        }
        Ok(())
    }
}

impl Serialize for UsageDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for UsageDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        UsageDuration::parse(&s).map_err(serde::de::Error::custom)
    }
}
