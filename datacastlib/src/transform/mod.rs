//! Table transforms: pivot, merge, sort, set-index, select.
//!
//! This module handles the second stage of the pipeline - reshaping built
//! tables before they are encoded. It provides:
//!
//! - **Transform**: A serde-friendly directive (`{"operation": "pivot", ...}`)
//! - **Transformer**: Applies directives to tables and table sets
//! - **AggregationTable**: Pluggable name -> reduce function lookup for pivot
//!
//! Every operation is pure: it returns a new table and never touches its input.
//!
//! ## Example
//!
//! ```rust
//! use datacastlib::data::{build, Record};
//! use datacastlib::transform::{Pivot, Transform, Transformer};
//!
//! let records = vec![
//!     Record::new().with("date", "2020-01-01").with("site", "A").with("temp", 10),
//!     Record::new().with("date", "2020-01-01").with("site", "B").with("temp", 12),
//! ];
//! let table = build(&records, None).unwrap();
//! let pivoted = Transformer::new()
//!     .apply(&table, &Transform::Pivot(Pivot::new("site", "temp").index("date")))
//!     .unwrap();
//! assert_eq!(pivoted.columns().len(), 2);
//! ```

pub mod aggregate;
pub mod merge;
pub mod pivot;
pub mod reshape;

pub use aggregate::{AggregationTable, ReduceFn};
pub use merge::{merge, JoinPolicy};
pub use pivot::{pivot, Pivot};
pub use reshape::{select, set_index, sort_by_index};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{HeaderPath, Table, TableSet};
use crate::error::DatacastError;
use crate::Result;

/// One reshape operation.
///
/// Deserializes from keyed configuration, e.g.
/// `{"operation": "pivot", "key_column": "date", "value_column": "amount", "group_columns": ["site"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Transform {
    /// Spread a key column into columns
    Pivot(Pivot),
    /// Collapse a table set into one table under a discriminator level
    Merge {
        #[serde(default)]
        join: Option<JoinPolicy>,
    },
    /// Sort rows by index label
    Sort,
    /// Move a column into the row index
    SetIndex { column: HeaderPath },
    /// Keep columns matching path prefixes
    Select { columns: Vec<HeaderPath> },
}

impl Transform {
    /// Parse one directive from JSON text.
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| DatacastError::InvalidDirective(e.to_string()))
    }

    /// Parse a JSON array of directives (a single object is accepted too).
    pub fn list_from_json(input: &str) -> Result<Vec<Self>> {
        let value: serde_json::Value = serde_json::from_str(input)
            .map_err(|e| DatacastError::InvalidDirective(e.to_string()))?;
        let parsed = match value {
            serde_json::Value::Array(_) => serde_json::from_value(value),
            other => serde_json::from_value(other).map(|t| vec![t]),
        };
        parsed.map_err(|e| DatacastError::InvalidDirective(e.to_string()))
    }

    /// Short operation name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Transform::Pivot(_) => "pivot",
            Transform::Merge { .. } => "merge",
            Transform::Sort => "sort",
            Transform::SetIndex { .. } => "set_index",
            Transform::Select { .. } => "select",
        }
    }
}

/// Applies transforms using a configured aggregation table.
#[derive(Debug, Clone, Default)]
pub struct Transformer {
    aggregations: AggregationTable,
}

impl Transformer {
    /// A transformer with the built-in aggregations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: use a custom aggregation table.
    pub fn aggregations(mut self, aggregations: AggregationTable) -> Self {
        self.aggregations = aggregations;
        self
    }

    /// Apply one transform to a single table.
    ///
    /// Merge needs several tables; on a single table it fails with
    /// `InvalidDirective` (use [`Transformer::apply_set`]).
    pub fn apply(&self, table: &Table, transform: &Transform) -> Result<Table> {
        debug!(operation = transform.name(), "applying transform");
        match transform {
            Transform::Pivot(params) => pivot(table, params, &self.aggregations),
            Transform::Merge { .. } => Err(DatacastError::InvalidDirective(
                "merge combines a table set, not a single table".to_string(),
            )),
            Transform::Sort => Ok(sort_by_index(table)),
            Transform::SetIndex { column } => set_index(table, column),
            Transform::Select { columns } => select(table, columns),
        }
    }

    /// Apply one transform to every table of a set. Merge collapses the set
    /// into a single table.
    pub fn apply_set(&self, set: &TableSet, transform: &Transform) -> Result<TableSet> {
        match transform {
            Transform::Merge { join } => Ok(TableSet::single(merge(set, *join)?)),
            other => set.try_map(|table| self.apply(table, other)),
        }
    }

    /// Apply transforms in order.
    pub fn apply_all(&self, set: &TableSet, transforms: &[Transform]) -> Result<TableSet> {
        transforms
            .iter()
            .try_fold(set.clone(), |current, t| self.apply_set(&current, t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BuildOptions, Record, TableBuilder, Value};

    fn records() -> Vec<Record> {
        vec![
            Record::new()
                .with("date", "2020-01-02")
                .with("site", "A")
                .with("temp", 11),
            Record::new()
                .with("date", "2020-01-01")
                .with("site", "A")
                .with("temp", 10),
            Record::new()
                .with("date", "2020-01-01")
                .with("site", "B")
                .with("temp", 12),
            Record::new()
                .with("date", "2020-01-02")
                .with("site", "B")
                .with("temp", 13),
        ]
    }

    #[test]
    fn test_pivot_directive_from_json() {
        let t = Transform::from_json(
            r#"{"operation": "pivot", "key_column": "date", "value_column": "amount", "group_columns": ["site"]}"#,
        )
        .unwrap();
        match t {
            Transform::Pivot(p) => {
                assert_eq!(p.key_column, HeaderPath::from("date"));
                assert_eq!(p.group_columns, vec![HeaderPath::from("site")]);
                assert!(p.aggregate.is_none());
            }
            other => panic!("unexpected transform: {other:?}"),
        }
    }

    #[test]
    fn test_directive_list_from_json() {
        let list = Transform::list_from_json(
            r#"[{"operation": "merge", "join": "outer"}, {"operation": "sort"},
                {"operation": "select", "columns": [["site=A", "temp"]]}]"#,
        )
        .unwrap();
        assert_eq!(
            list,
            vec![
                Transform::Merge {
                    join: Some(JoinPolicy::Outer)
                },
                Transform::Sort,
                Transform::Select {
                    columns: vec![HeaderPath::from(["site=A", "temp"])]
                },
            ]
        );
        assert_eq!(
            Transform::list_from_json(r#"{"operation": "sort"}"#).unwrap(),
            vec![Transform::Sort]
        );
    }

    #[test]
    fn test_bad_directive() {
        let err = Transform::from_json(r#"{"operation": "explode"}"#).unwrap_err();
        assert!(matches!(err, DatacastError::InvalidDirective(_)));
    }

    #[test]
    fn test_merge_on_single_table_is_rejected() {
        let err = Transformer::new()
            .apply(&crate::data::Table::empty(), &Transform::Merge { join: None })
            .unwrap_err();
        assert!(matches!(err, DatacastError::InvalidDirective(_)));
    }

    #[test]
    fn test_split_merge_sort_pipeline() {
        let options = BuildOptions::new().split_by("site").index("date");
        let set = TableBuilder::new(options).build_set(&records()).unwrap();
        let out = Transformer::new()
            .apply_all(
                &set,
                &[
                    Transform::Merge {
                        join: Some(JoinPolicy::Outer),
                    },
                    Transform::Sort,
                ],
            )
            .unwrap();

        assert_eq!(out.len(), 1);
        let table = &out.entries()[0].table;
        assert_eq!(
            table.index().unwrap().labels,
            vec![Value::from("2020-01-01"), Value::from("2020-01-02")]
        );
        assert_eq!(
            table.row(0).cloned().collect::<Vec<_>>(),
            vec![Value::Integer(10), Value::Integer(12)]
        );
    }

    #[test]
    fn test_custom_aggregation_table() {
        fn count(values: &[Value]) -> Value {
            Value::Integer(values.len() as i64)
        }
        let table = TableBuilder::new(BuildOptions::new())
            .build(&records())
            .unwrap();
        let transformer =
            Transformer::new().aggregations(AggregationTable::with_builtins().register("count", count));
        let out = transformer
            .apply(
                &table,
                &Transform::Pivot(Pivot::new("site", "temp").index("site").aggregate("count")),
            )
            .unwrap();
        assert_eq!(out.column(&"A".into()).unwrap().values()[0], Value::Integer(2));
    }
}
