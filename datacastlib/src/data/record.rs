//! Flat input records.

use serde_json::Value as JsonValue;

use crate::error::DatacastError;
use crate::Result;

use super::value::{parse_timestamp, Value};

/// An immutable, ordered mapping from field name to value.
///
/// Field order is the order of first assignment and is used to derive the
/// column order when no explicit order is declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set a field. Re-setting a field keeps its original position.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
        self
    }

    /// Look up a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Field names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert a JSON object into a record.
    ///
    /// Nested arrays and objects are kept as their JSON text; everything
    /// else maps onto the matching scalar.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let JsonValue::Object(map) = value else {
            return Err(DatacastError::InvalidRecord(format!(
                "expected a JSON object, got {}",
                json_type_name(value)
            )));
        };
        let fields = map
            .iter()
            .map(|(name, v)| (name.clone(), json_scalar(v)))
            .collect();
        Ok(Self { fields })
    }

    /// Parse a JSON array of objects into records.
    pub fn parse_json_array(input: &str) -> Result<Vec<Self>> {
        let value: JsonValue = serde_json::from_str(input)
            .map_err(|e| DatacastError::InvalidRecord(format!("invalid JSON: {e}")))?;
        match value {
            JsonValue::Array(items) => items.iter().map(Self::from_json).collect(),
            other => Err(DatacastError::InvalidRecord(format!(
                "expected a JSON array of records, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Return a copy with the named text fields parsed as timestamps.
    ///
    /// Text that does not parse is left as text; inference will then keep
    /// the column as text.
    pub fn parse_timestamps(&self, names: &[String]) -> Self {
        let fields = self
            .fields
            .iter()
            .map(|(n, v)| {
                let v = match v {
                    Value::Text(s) if names.contains(n) => {
                        parse_timestamp(s).map_or_else(|| v.clone(), Value::Timestamp)
                    }
                    _ => v.clone(),
                };
                (n.clone(), v)
            })
            .collect();
        Self { fields }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Record::new(), |record, (k, v)| record.with(k, v))
    }
}

fn json_scalar(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Missing,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map_or(Value::Missing, Value::Float),
        },
        JsonValue::String(s) => Value::Text(s.clone()),
        nested => Value::Text(nested.to_string()),
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
