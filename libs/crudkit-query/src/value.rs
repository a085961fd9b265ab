//! Scalar values carried by filter requests.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::columns::ColumnKind;

/// An untyped filter operand.
///
/// Values bound from query strings always arrive as `Text`; JSON callers may
/// send numbers and booleans directly. Integers stay `Int` so ids beyond
/// 2^53 keep every digit. The operand is coerced to the target column's
/// kind just before it is bound, see [`Scalar::coerce`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Number(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Scalar {
    /// Coerce into the representation expected by a column of `kind`.
    ///
    /// Returns `None` when the value cannot represent that kind.
    #[must_use]
    pub fn coerce(&self, kind: ColumnKind) -> Option<Scalar> {
        match (kind, self) {
            (ColumnKind::Number, Scalar::Int(n)) => Some(Scalar::Int(*n)),
            (ColumnKind::Number, Scalar::Number(n)) => Some(Scalar::Number(*n)),
            (ColumnKind::Number, Scalar::Text(s)) => parse_number(s),

            (ColumnKind::Boolean, Scalar::Bool(b)) => Some(Scalar::Bool(*b)),
            (ColumnKind::Boolean, Scalar::Text(s)) => parse_bool(s).map(Scalar::Bool),

            (ColumnKind::Timestamp, Scalar::Timestamp(t)) => Some(Scalar::Timestamp(*t)),
            (ColumnKind::Timestamp, Scalar::Text(s)) => parse_timestamp(s).map(Scalar::Timestamp),

            (ColumnKind::Text, Scalar::Text(s)) => Some(Scalar::Text(s.clone())),
            (ColumnKind::Text, other) => Some(Scalar::Text(other.to_string())),

            (ColumnKind::Number | ColumnKind::Boolean | ColumnKind::Timestamp, _) => None,
        }
    }

    /// Raw text of the operand, if it was supplied as text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }
}

fn parse_number(s: &str) -> Option<Scalar> {
    let s = s.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Some(Scalar::Int(n));
    }
    s.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(Scalar::Number)
}

fn parse_bool(s: &str) -> Option<bool> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") || s == "1" {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") || s == "0" {
        Some(false)
    } else {
        None
    }
}

/// Accepts RFC 3339, naive `YYYY-MM-DD[T| ]HH:MM:SS[.fff]` (read as UTC) and
/// plain dates (midnight UTC).
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Text(s) => write!(f, "{s}"),
            Scalar::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Scalar::Int(i64::from(n))
    }
}

impl From<u32> for Scalar {
    fn from(n: u32) -> Self {
        Scalar::Int(i64::from(n))
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(t: DateTime<Utc>) -> Self {
        Scalar::Timestamp(t)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn text_coerces_to_number() {
        assert_eq!(
            Scalar::from("18").coerce(ColumnKind::Number),
            Some(Scalar::Int(18))
        );
        assert_eq!(
            Scalar::from("18.5").coerce(ColumnKind::Number),
            Some(Scalar::Number(18.5))
        );
        assert_eq!(
            Scalar::from(" 9007199254740993 ").coerce(ColumnKind::Number),
            Some(Scalar::Int(9_007_199_254_740_993))
        );
        assert_eq!(Scalar::from("eighteen").coerce(ColumnKind::Number), None);
        assert_eq!(Scalar::from("NaN").coerce(ColumnKind::Number), None);
    }

    #[test]
    fn text_coerces_to_bool() {
        assert_eq!(
            Scalar::from("TRUE").coerce(ColumnKind::Boolean),
            Some(Scalar::Bool(true))
        );
        assert_eq!(
            Scalar::from("0").coerce(ColumnKind::Boolean),
            Some(Scalar::Bool(false))
        );
        assert_eq!(Scalar::from("yes").coerce(ColumnKind::Boolean), None);
        assert_eq!(Scalar::Int(1).coerce(ColumnKind::Boolean), None);
    }

    #[test]
    fn timestamps_accept_several_layouts() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        for raw in [
            "2024-05-01T12:30:00Z",
            "2024-05-01T14:30:00+02:00",
            "2024-05-01T12:30:00",
            "2024-05-01 12:30:00",
        ] {
            assert_eq!(
                Scalar::from(raw).coerce(ColumnKind::Timestamp),
                Some(Scalar::Timestamp(expected)),
                "{raw}"
            );
        }
        assert_eq!(
            parse_timestamp("2024-05-01"),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn anything_coerces_to_text() {
        assert_eq!(
            Scalar::Int(42).coerce(ColumnKind::Text),
            Some(Scalar::Text("42".to_owned()))
        );
        assert_eq!(
            Scalar::Bool(false).coerce(ColumnKind::Text),
            Some(Scalar::Text("false".to_owned()))
        );
    }

    #[test]
    fn json_strings_stay_text() {
        let v: Scalar = serde_json::from_str(r#""2024-05-01T12:30:00Z""#).unwrap();
        assert_eq!(v, Scalar::Text("2024-05-01T12:30:00Z".to_owned()));
        let n: Scalar = serde_json::from_str("3.5").unwrap();
        assert_eq!(n, Scalar::Number(3.5));
        let id: Scalar = serde_json::from_str("9007199254740993").unwrap();
        assert_eq!(id, Scalar::Int(9_007_199_254_740_993));
        let b: Scalar = serde_json::from_str("true").unwrap();
        assert_eq!(b, Scalar::Bool(true));
    }
}
