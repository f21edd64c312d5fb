//! Merge: combine discriminated tables side by side under a new header level.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{RowIndex, Table, TableSet, Value};
use crate::error::DatacastError;
use crate::Result;

/// How to align tables whose row indices differ.
///
/// A label that repeats is matched occurrence by occurrence: its second
/// row in one table pairs with its second row in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// Keep rows present in every table, in the first table's order
    Inner,
    /// Keep every row (first-seen order); absent cells are missing
    Outer,
}

/// For each output row, the source row of every input table.
struct Alignment {
    labels: Option<Vec<Value>>,
    rows: Vec<Vec<Option<usize>>>,
}

/// Merge the tables of `set` into one table.
///
/// Output header depth is one more than the deepest input; each column's
/// path is prefixed with its table's discriminator (or position), and
/// shallower paths are padded with empty inner labels.
pub fn merge(set: &TableSet, join: Option<JoinPolicy>) -> Result<Table> {
    let depth = set.tables().map(Table::depth).max().unwrap_or(1);
    let alignment = align(set, join)?;

    let mut columns = Vec::new();
    for (position, (entry, rows)) in set.entries().iter().zip(&alignment.rows).enumerate() {
        let label = set.label(position);
        let taken = entry.table.take_rows(rows);
        for column in taken.columns() {
            columns.push(column.renamed(column.path().padded(depth).prefixed(label.clone())));
        }
    }

    let row_count = alignment.rows.first().map_or(0, Vec::len);
    let index = alignment.labels.map(|labels| {
        let name = set
            .tables()
            .find_map(|t| t.index().and_then(|i| i.name.clone()));
        RowIndex::new(name, labels)
    });

    debug!(
        tables = set.len(),
        rows = row_count,
        columns = columns.len(),
        join = ?join,
        "merged tables"
    );
    Table::with_rows(columns, index, row_count)
}

fn align(set: &TableSet, join: Option<JoinPolicy>) -> Result<Alignment> {
    let indexed = set.tables().filter(|t| t.index().is_some()).count();
    if indexed == 0 {
        return align_positions(set, join);
    }
    if indexed != set.len() {
        let position = set
            .tables()
            .position(|t| t.index().is_none())
            .unwrap_or_default();
        return Err(DatacastError::Alignment {
            table: set.label(position),
            message: "has no row index while other tables do".to_string(),
        });
    }

    let indices: Vec<&RowIndex> = set.tables().filter_map(Table::index).collect();
    let first = indices[0];

    let exact = indices.iter().all(|i| {
        i.labels.len() == first.labels.len()
            && i.labels.iter().zip(&first.labels).all(|(a, b)| a.same_as(b))
    });
    if exact {
        let identity: Vec<Option<usize>> = (0..first.labels.len()).map(Some).collect();
        return Ok(Alignment {
            labels: Some(first.labels.clone()),
            rows: vec![identity; set.len()],
        });
    }

    // The k-th row carrying a label pairs with the k-th such row in every
    // other table.
    let keys: Vec<Vec<(String, usize)>> = indices.iter().map(|i| i.occurrence_keys()).collect();
    let lookups: Vec<HashMap<&(String, usize), usize>> = keys
        .iter()
        .map(|k| k.iter().enumerate().map(|(row, key)| (key, row)).collect())
        .collect();

    let chosen: Vec<(&(String, usize), &Value)> = match join {
        None => {
            let position = indices
                .iter()
                .position(|i| {
                    i.labels.len() != first.labels.len()
                        || i.labels.iter().zip(&first.labels).any(|(a, b)| !a.same_as(b))
                })
                .unwrap_or_default();
            return Err(DatacastError::Alignment {
                table: set.label(position),
                message: "has a row index that differs from the first table; \
                          use an inner or outer join"
                    .to_string(),
            });
        }
        Some(JoinPolicy::Inner) => keys[0]
            .iter()
            .zip(&first.labels)
            .filter(|(key, _)| lookups.iter().all(|l| l.contains_key(key)))
            .collect(),
        Some(JoinPolicy::Outer) => {
            let mut seen = HashSet::new();
            let mut chosen = Vec::new();
            for (index, index_keys) in indices.iter().zip(&keys) {
                for (key, label) in index_keys.iter().zip(&index.labels) {
                    if seen.insert(key) {
                        chosen.push((key, label));
                    }
                }
            }
            chosen
        }
    };

    let rows = lookups
        .iter()
        .map(|l| chosen.iter().map(|(key, _)| l.get(key).copied()).collect())
        .collect();
    Ok(Alignment {
        labels: Some(chosen.iter().map(|(_, label)| (*label).clone()).collect()),
        rows,
    })
}

fn align_positions(set: &TableSet, join: Option<JoinPolicy>) -> Result<Alignment> {
    let counts: Vec<usize> = set.tables().map(Table::row_count).collect();
    let first = counts[0];

    let target = match join {
        _ if counts.iter().all(|&c| c == first) => first,
        Some(JoinPolicy::Inner) => counts.iter().copied().min().unwrap_or(0),
        Some(JoinPolicy::Outer) => counts.iter().copied().max().unwrap_or(0),
        None => {
            let position = counts.iter().position(|&c| c != first).unwrap_or_default();
            return Err(DatacastError::Alignment {
                table: set.label(position),
                message: format!(
                    "has {} rows but the first table has {}; use an inner or outer join",
                    counts[position], first
                ),
            });
        }
    };

    let rows = counts
        .iter()
        .map(|&count| (0..target).map(|r| (r < count).then_some(r)).collect())
        .collect();
    Ok(Alignment { labels: None, rows })
}
