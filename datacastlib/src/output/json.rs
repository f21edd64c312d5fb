//! JSON: tables as arrays of row objects.
//!
//! Multi-level header paths are joined into one flattened key by default.
//! That loses the level structure (a key containing the separator cannot be
//! told apart from a deeper path), so nested mode is available: each header
//! level becomes a nested object instead.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};
use tracing::debug;

use crate::data::{Table, TableSet, Value};
use crate::error::DatacastError;
use crate::Result;

use super::{Encoded, Encoder, JSON};

/// Key layout for multi-level headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonOptions {
    /// Header levels become nested objects
    pub nested: bool,
    /// Joins header levels into flat keys
    pub separator: String,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            nested: false,
            separator: "/".to_string(),
        }
    }
}

/// Writes `application/json`.
#[derive(Debug, Clone, Default)]
pub struct JsonEncoder {
    options: JsonOptions,
}

impl JsonEncoder {
    pub fn new(options: JsonOptions) -> Self {
        Self { options }
    }

    /// One row as an object; `None` lays out the keys with null values.
    ///
    /// Two cells landing on the same key (a column named like the index,
    /// or joined paths that coincide) is an error rather than an overwrite.
    fn object(&self, table: &Table, row: Option<usize>) -> Result<Map<String, JsonValue>> {
        let cell = |values: &[Value]| row.map_or(JsonValue::Null, |r| to_json(&values[r]));
        let mut object = Map::new();
        if let Some(index) = table.index() {
            object.insert(
                index.display_name().to_string(),
                cell(index.labels.as_slice()),
            );
        }
        for column in table.columns() {
            let labels = column.path().labels();
            let value = cell(column.values());
            let placed = if self.options.nested {
                insert_nested(&mut object, labels, value)
            } else {
                object
                    .insert(labels.join(&self.options.separator), value)
                    .is_none()
            };
            if !placed {
                return Err(DatacastError::encode(
                    "json",
                    format!("column {} clashes with another key", column.path()),
                ));
            }
        }
        Ok(object)
    }

    fn rows(&self, table: &Table) -> Result<Vec<JsonValue>> {
        self.object(table, None)?;
        (0..table.row_count())
            .map(|r| self.object(table, Some(r)).map(JsonValue::Object))
            .collect()
    }
}

/// JSON form of a cell. Non-finite floats have no JSON number and become null.
fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Missing => JsonValue::Null,
        Value::Bool(v) => JsonValue::Bool(*v),
        Value::Integer(v) => JsonValue::Number((*v).into()),
        Value::Float(v) => Number::from_f64(*v).map_or(JsonValue::Null, JsonValue::Number),
        Value::Timestamp(v) => JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        Value::Text(v) => JsonValue::String(v.clone()),
    }
}

/// Place `value` under nested objects, one per label. Returns false if
/// the slot is already taken.
fn insert_nested(object: &mut Map<String, JsonValue>, labels: &[String], value: JsonValue) -> bool {
    match labels {
        [] => true,
        [leaf] => object.insert(leaf.clone(), value).is_none(),
        [outer, rest @ ..] => match object
            .entry(outer.clone())
            .or_insert_with(|| JsonValue::Object(Map::new()))
        {
            JsonValue::Object(inner) => insert_nested(inner, rest, value),
            _ => false,
        },
    }
}

impl Encoder for JsonEncoder {
    fn format_id(&self) -> &str {
        "json"
    }

    fn content_type(&self) -> &str {
        JSON
    }

    fn encode(&self, tables: &TableSet) -> Result<Encoded> {
        let document = if tables.is_multi() {
            let mut keyed = Map::new();
            for (position, table) in tables.tables().enumerate() {
                let label = tables.label(position);
                let rows = JsonValue::Array(self.rows(table)?);
                if keyed.insert(label.clone(), rows).is_some() {
                    return Err(DatacastError::encode(
                        "json",
                        format!("two tables share the label '{label}'"),
                    ));
                }
            }
            JsonValue::Object(keyed)
        } else {
            let mut rows = Vec::new();
            for table in tables.tables() {
                rows.extend(self.rows(table)?);
            }
            JsonValue::Array(rows)
        };
        let bytes = serde_json::to_vec(&document).map_err(|e| DatacastError::encode("json", e))?;
        debug!(tables = tables.len(), bytes = bytes.len(), nested = self.options.nested, "encoded json");
        Ok(Encoded::new(JSON, bytes))
    }
}
