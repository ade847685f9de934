//! Exact decimal hours stored as integer hundredths.
//!
//! Effort estimates and daily limits are money-like quantities: two
//! decimal places, compared exactly. Floating point would make
//! 1.50 and 1.5 sort unpredictably against 1.45, so the value is an
//! `i64` count of hundredths of an hour and every comparison is an
//! integer comparison.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Limits matching the stored column: at most 4 significant digits,
/// at most 2 of them after the decimal point (max 99.99).
const MAX_WHOLE_DIGITS: usize = 2;
const MAX_DECIMAL_PLACES: usize = 2;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HoursError {
    #[error("not a valid decimal number")]
    Invalid,

    #[error("more than {MAX_DECIMAL_PLACES} decimal places")]
    TooManyDecimals,

    #[error("more than {MAX_WHOLE_DIGITS} digits before the decimal point")]
    TooManyDigits,
}

/// A duration in hours with exact two-decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hours(i64);

impl Hours {
    pub const ZERO: Hours = Hours(0);

    pub const fn from_hundredths(hundredths: i64) -> Self {
        Hours(hundredths)
    }

    pub const fn hundredths(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Parse a decimal string like `"1.5"`, `"6.00"` or `"-0.25"`.
    ///
    /// Accepts at most two decimal places and two whole digits; the
    /// decimal part is not rounded, excess places are an error.
    pub fn parse(input: &str) -> Result<Self, HoursError> {
        let trimmed = input.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        if unsigned.is_empty() {
            return Err(HoursError::Invalid);
        }

        let (whole, frac) = match unsigned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (unsigned, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(HoursError::Invalid);
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(HoursError::Invalid);
        }
        if frac.len() > MAX_DECIMAL_PLACES {
            return Err(HoursError::TooManyDecimals);
        }
        // Leading zeros are not significant digits.
        if whole.trim_start_matches('0').len() > MAX_WHOLE_DIGITS {
            return Err(HoursError::TooManyDigits);
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .trim_start_matches('0')
                .parse()
                .unwrap_or(0)
        };
        let frac_value: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| HoursError::Invalid)? * 10,
            _ => frac.parse().map_err(|_| HoursError::Invalid)?,
        };

        let hundredths = whole_value * 100 + frac_value;
        Ok(Hours(if negative { -hundredths } else { hundredths }))
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Hours {
    type Err = HoursError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hours::parse(s)
    }
}

impl Serialize for Hours {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct HoursVisitor;

impl<'de> Visitor<'de> for HoursVisitor {
    type Value = Hours;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal number of hours as a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Hours, E> {
        Hours::parse(v).map_err(de::Error::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Hours, E> {
        // The shortest round-trip formatting preserves what the client
        // sent closely enough for the digit checks to apply.
        Hours::parse(&format!("{}", v)).map_err(de::Error::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Hours, E> {
        Hours::parse(&v.to_string()).map_err(de::Error::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Hours, E> {
        Hours::parse(&v.to_string()).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Hours {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Hours, D::Error> {
        deserializer.deserialize_any(HoursVisitor)
    }
}

/// Raw client input for an hours field, kept unparsed so handlers can
/// turn parse failures into their own field errors instead of a
/// request-body rejection.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HoursInput {
    Text(String),
    Number(serde_json::Number),
}

impl HoursInput {
    pub fn parse(&self) -> Result<Hours, HoursError> {
        match self {
            HoursInput::Text(s) => Hours::parse(s),
            HoursInput::Number(n) => Hours::parse(&n.to_string()),
        }
    }
}
