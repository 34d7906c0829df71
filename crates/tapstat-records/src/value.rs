//! Cell values of record tables

use std::{cmp::Ordering, fmt};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

const TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "<NA>", "NaT", "null", "None"];

/// A single table cell.
///
/// Ordering and equality are total: numeric cells compare by value regardless
/// of integer/float representation (so `Int(700) == Float(700.0)`), and the
/// variant groups sort as `Missing < numbers < Time < Text`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Missing,
    Int(i64),
    Float(f64),
    Time(NaiveDateTime),
    Text(String),
}

impl Value {
    /// Parses a raw text cell, inferring its type.
    ///
    /// Empty cells and the usual missing markers (`NA`, `NaN`, ...) become
    /// [`Value::Missing`]; integers, floats and timestamps are recognized in
    /// that order and anything else is kept as text.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if MISSING_MARKERS.contains(&raw) {
            return Self::Missing;
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Self::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return Self::from_f64(f);
        }
        parse_time(raw).map_or_else(|| Self::Text(raw.to_owned()), Self::Time)
    }

    /// Wraps a float, mapping `NaN` to [`Value::Missing`].
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            Self::Missing
        } else {
            Self::Float(value)
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Numeric view of the cell; `None` for missing and non-numeric cells.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Missing | Self::Time(_) | Self::Text(_) => None,
        }
    }

    /// Numeric view with `NaN` standing in for anything non-numeric.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.as_f64().unwrap_or(f64::NAN)
    }

    /// Integer view; floats are accepted only when they hold an integral value.
    #[expect(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Some(*f as i64),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Missing => 0,
            Self::Int(_) | Self::Float(_) => 1,
            Self::Time(_) => 2,
            Self::Text(_) => 3,
        }
    }
}

/// Parses a timestamp in one of the accepted layouts, or a bare date at midnight.
#[must_use]
pub fn parse_time(raw: &str) -> Option<NaiveDateTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => self.rank().cmp(&other.rank()),
            },
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Int(i) => write!(f, "{i}"),
            // debug formatting keeps a trailing `.0` so floats reload as floats
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Time(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S%.f")),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_infers_types() {
        assert_eq!(Value::parse("12"), Value::Int(12));
        assert!(matches!(Value::parse("0.25"), Value::Float(f) if f == 0.25));
        assert!(Value::parse("").is_missing());
        assert!(Value::parse("NaN").is_missing());
        assert!(matches!(Value::parse("2021-03-04 10:15:00"), Value::Time(_)));
        assert!(matches!(Value::parse("2021-03-04"), Value::Time(_)));
        assert!(matches!(Value::parse("rat_7"), Value::Text(_)));
    }

    #[test]
    fn test_numeric_equality_across_representations() {
        assert_eq!(Value::Int(700), Value::Float(700.0));
        assert!(Value::Int(500) < Value::Float(700.5));
        assert!(Value::Missing < Value::Int(-3));
        assert!(Value::Int(3) < Value::Text("a".into()));
    }

    #[test]
    fn test_display_round_trips() {
        for raw in ["700", "0.1", "700.0", "2021-03-04 10:15:00", "2021-03-04 10:15:00.250", "abc"] {
            let value = Value::parse(raw);
            assert_eq!(value.to_string(), raw);
        }
        assert_eq!(Value::Missing.to_string(), "");
    }

    #[test]
    fn test_integral_float_as_i64() {
        assert_eq!(Value::Float(3.0).as_i64(), Some(3));
        assert_eq!(Value::Float(3.5).as_i64(), None);
        assert_eq!(Value::Text("3".into()).as_i64(), None);
    }

    #[test]
    fn test_serializes_untagged() {
        let json = serde_json::to_string(&[Value::Int(1), Value::Missing, Value::Float(0.5)]).unwrap();
        assert_eq!(json, "[1,null,0.5]");
    }
}
