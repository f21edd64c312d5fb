//! Pivot: spread a key column's distinct values into columns.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::table::label_key;
use crate::data::{Column, HeaderPath, RowIndex, Table, Value};
use crate::error::DatacastError;
use crate::Result;

use super::aggregate::{AggregationTable, ReduceFn};

/// Pivot parameters.
///
/// Output columns are keyed by `(group values..., key value)`; output rows
/// by the `index_column` values, else the existing row index, else input
/// position. Columns not named here are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pivot {
    /// Column whose distinct values become output columns
    pub key_column: HeaderPath,
    /// Column holding the cell values
    pub value_column: HeaderPath,
    /// Columns whose values become outer header levels
    #[serde(default)]
    pub group_columns: Vec<HeaderPath>,
    /// Column whose distinct values become the output rows
    #[serde(default)]
    pub index_column: Option<HeaderPath>,
    /// Aggregation name for duplicate cells (None = duplicates are an error)
    #[serde(default)]
    pub aggregate: Option<String>,
}

impl Pivot {
    /// Pivot `value` by `key`.
    pub fn new(key: impl Into<HeaderPath>, value: impl Into<HeaderPath>) -> Self {
        Self {
            key_column: key.into(),
            value_column: value.into(),
            group_columns: Vec::new(),
            index_column: None,
            aggregate: None,
        }
    }

    /// Builder: set the group columns.
    pub fn groups<I, P>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<HeaderPath>,
    {
        self.group_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set the column that identifies output rows.
    pub fn index(mut self, column: impl Into<HeaderPath>) -> Self {
        self.index_column = Some(column.into());
        self
    }

    /// Builder: combine duplicates with a named aggregation.
    pub fn aggregate(mut self, name: impl Into<String>) -> Self {
        self.aggregate = Some(name.into());
        self
    }
}

/// Distinct items in first-occurrence order.
struct Distinct<T> {
    items: Vec<T>,
    positions: HashMap<String, usize>,
}

impl<T> Distinct<T> {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
        }
    }

    fn slot(&mut self, key: String, item: impl FnOnce() -> T) -> usize {
        let next = self.items.len();
        let slot = *self.positions.entry(key).or_insert(next);
        if slot == next {
            self.items.push(item());
        }
        slot
    }
}

/// Run a pivot against `table`.
pub fn pivot(table: &Table, params: &Pivot, aggregations: &AggregationTable) -> Result<Table> {
    let reduce: Option<ReduceFn> = params
        .aggregate
        .as_deref()
        .map(|name| aggregations.get(name))
        .transpose()?;

    let keys = table.require(&params.key_column)?.values();
    let values = table.require(&params.value_column)?.values();
    let groups = params
        .group_columns
        .iter()
        .map(|p| table.require(p).map(Column::values))
        .collect::<Result<Vec<_>>>()?;

    let (row_labels, index_name): (Option<&[Value]>, Option<String>) = match &params.index_column
    {
        Some(path) => (
            Some(table.require(path)?.values()),
            Some(path.leaf().to_string()),
        ),
        None => match table.index() {
            Some(index) => (Some(index.labels.as_slice()), index.name.clone()),
            None => (None, None),
        },
    };

    let mut rows: Distinct<Value> = Distinct::new();
    let mut columns: Distinct<HeaderPath> = Distinct::new();
    let mut cells: HashMap<(usize, usize), Vec<Value>> = HashMap::new();

    for input_row in 0..table.row_count() {
        let row = match row_labels {
            Some(labels) => {
                let label = &labels[input_row];
                rows.slot(label_key(label), || label.clone())
            }
            None => rows.slot(input_row.to_string(), || Value::Integer(input_row as i64)),
        };

        let mut labels: Vec<String> = groups.iter().map(|g| g[input_row].to_field()).collect();
        labels.push(keys[input_row].to_field());
        let path = HeaderPath::new(labels);
        let column = columns.slot(path.joined("\u{1f}"), || path.clone());

        let cell = cells.entry((row, column)).or_default();
        if reduce.is_none() && !cell.is_empty() {
            return Err(DatacastError::AmbiguousPivot {
                row: match row_labels {
                    Some(labels) => labels[input_row].to_field(),
                    None => input_row.to_string(),
                },
                column: path.to_string(),
            });
        }
        cell.push(values[input_row].clone());
    }

    let output = columns
        .items
        .iter()
        .enumerate()
        .map(|(c, path)| {
            let column_values = (0..rows.items.len())
                .map(|r| match (cells.get(&(r, c)), reduce) {
                    (None, _) => Value::Missing,
                    (Some(found), Some(f)) => f(found),
                    (Some(found), None) => found[0].clone(),
                })
                .collect();
            Column::new(path.clone(), column_values)
        })
        .collect();

    let index = row_labels.map(|_| RowIndex::new(index_name, rows.items.clone()));
    debug!(
        rows = rows.items.len(),
        columns = columns.items.len(),
        aggregate = params.aggregate.as_deref().unwrap_or("none"),
        "pivoted table"
    );
    Table::with_rows(output, index, rows.items.len())
}
