//! Scalar cell values and column kinds.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Formats accepted when reading timestamps from text.
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A single scalar cell.
///
/// `Missing` is the missing-marker: it is distinct from every data value,
/// including zero and the empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value (input nulls land here)
    #[default]
    Missing,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Naive date-time
    Timestamp(NaiveDateTime),
    /// Free text
    Text(String),
}

/// The kind of a column after inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Every value is missing
    Empty,
    /// Booleans
    Bool,
    /// Integers
    Integer,
    /// Floats (integers coerced)
    Float,
    /// Timestamps
    Timestamp,
    /// Text (also the fallback for mixed columns)
    Text,
}

impl ColumnKind {
    /// Whether the kind can be plotted or summed.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

impl Value {
    /// Create a text value
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Check if this is the missing-marker
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// The kind of this value, or `None` for the missing-marker.
    pub fn kind(&self) -> Option<ColumnKind> {
        match self {
            Value::Missing => None,
            Value::Bool(_) => Some(ColumnKind::Bool),
            Value::Integer(_) => Some(ColumnKind::Integer),
            Value::Float(_) => Some(ColumnKind::Float),
            Value::Timestamp(_) => Some(ColumnKind::Timestamp),
            Value::Text(_) => Some(ColumnKind::Text),
        }
    }

    /// Numeric view of the value (integers widen to `f64`).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Borrow the text of a `Text` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert the value to the given column kind.
    ///
    /// Only the coercions inference can ask for are supported: integer to
    /// float, and anything to text. Missing stays missing.
    pub fn coerce(self, kind: ColumnKind) -> Value {
        match (self, kind) {
            (Value::Missing, _) => Value::Missing,
            (Value::Integer(v), ColumnKind::Float) => Value::Float(v as f64),
            (Value::Text(s), ColumnKind::Text) => Value::Text(s),
            (v, ColumnKind::Text) => Value::Text(v.to_string()),
            (v, _) => v,
        }
    }

    /// Render the value as a cell in a text document.
    ///
    /// The missing-marker renders as an empty field. Floats keep a decimal
    /// point so they read back as floats.
    pub fn to_field(&self) -> String {
        match self {
            Value::Missing => String::new(),
            other => other.to_string(),
        }
    }

    /// Infer a value from a text cell, the inverse of [`Value::to_field`].
    pub fn parse_field(field: &str) -> Value {
        if field.is_empty() {
            return Value::Missing;
        }
        if let Ok(v) = field.parse::<i64>() {
            return Value::Integer(v);
        }
        if let Ok(v) = field.parse::<f64>() {
            if field.contains(['.', 'e', 'E']) && v.is_finite() {
                return Value::Float(v);
            }
        }
        match field {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
        if let Some(ts) = parse_timestamp(field) {
            if field.len() > 10 {
                return Value::Timestamp(ts);
            }
        }
        Value::Text(field.to_string())
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Integer(_) | Value::Float(_) => 1,
            Value::Timestamp(_) => 2,
            Value::Text(_) => 3,
            Value::Missing => 4,
        }
    }

    /// Total order used for sorting row indices.
    ///
    /// Numbers compare numerically across integer/float, missing sorts
    /// last, and different kinds order by kind.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.rank().cmp(&b.rank()),
            },
        }
    }

    /// Equality used for grouping: like `==` but NaN equals NaN and
    /// integer/float values compare by number.
    pub fn same_as(&self, other: &Value) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }
}

/// Parse a timestamp in one of the accepted layouts (a bare date means midnight).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Missing, Into::into)
    }
}

/// Infer the kind shared by a sequence of values.
///
/// Integers and floats unify to float; any other mix is text. A sequence
/// with no present values is `Empty`.
pub fn infer_kind<'a>(values: impl IntoIterator<Item = &'a Value>) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for value in values {
        let Some(k) = value.kind() else { continue };
        kind = Some(match kind {
            None => k,
            Some(prev) if prev == k => prev,
            Some(prev) if prev.is_numeric() && k.is_numeric() => ColumnKind::Float,
            Some(_) => return ColumnKind::Text,
        });
    }
    kind.unwrap_or(ColumnKind::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_infer_kind_homogeneous() {
        let values = vec![Value::from(1), Value::Missing, Value::from(3)];
        assert_eq!(infer_kind(&values), ColumnKind::Integer);
    }

    #[test]
    fn test_infer_kind_numeric_mix_is_float() {
        let values = vec![Value::from(1), Value::from(2.5)];
        assert_eq!(infer_kind(&values), ColumnKind::Float);
    }

    #[test]
    fn test_infer_kind_mixed_falls_back_to_text() {
        let values = vec![Value::from(1), Value::from("a"), Value::from(true)];
        assert_eq!(infer_kind(&values), ColumnKind::Text);
    }

    #[test]
    fn test_infer_kind_all_missing() {
        let values = vec![Value::Missing, Value::Missing];
        assert_eq!(infer_kind(&values), ColumnKind::Empty);
        assert_eq!(infer_kind(&[]), ColumnKind::Empty);
    }

    #[test]
    fn test_coerce_keeps_missing() {
        assert_eq!(Value::Missing.coerce(ColumnKind::Text), Value::Missing);
        assert_eq!(Value::from(2).coerce(ColumnKind::Float), Value::Float(2.0));
        assert_eq!(Value::from(true).coerce(ColumnKind::Text), Value::from("true"));
    }

    #[test]
    fn test_field_rendering() {
        assert_eq!(Value::Missing.to_field(), "");
        assert_eq!(Value::Float(10.0).to_field(), "10.0");
        assert_eq!(Value::Integer(10).to_field(), "10");
        assert_eq!(
            Value::Timestamp(ts("2020-01-01T06:30:00")).to_field(),
            "2020-01-01 06:30:00"
        );
    }

    #[test]
    fn test_parse_field_inverts_rendering() {
        let values = vec![
            Value::Integer(-4),
            Value::Float(0.25),
            Value::Float(12.0),
            Value::Bool(false),
            Value::Timestamp(ts("2021-03-04 05:06:07.5")),
            Value::from("2020-01-01"),
            Value::from("site=A"),
            Value::Missing,
        ];
        for value in values {
            assert_eq!(Value::parse_field(&value.to_field()), value, "{:?}", value);
        }
    }

    #[test]
    fn test_total_cmp_orders_numbers_and_missing() {
        let mut values = vec![
            Value::Missing,
            Value::from(3),
            Value::from(1.5),
            Value::from("b"),
            Value::from(2),
        ];
        values.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(
            values,
            vec![
                Value::from(1.5),
                Value::from(2),
                Value::from(3),
                Value::from("b"),
                Value::Missing,
            ]
        );
    }

    #[test]
    fn test_same_as_across_numeric_kinds() {
        assert!(Value::from(2).same_as(&Value::from(2.0)));
        assert!(!Value::from(2).same_as(&Value::from("2")));
    }
}
