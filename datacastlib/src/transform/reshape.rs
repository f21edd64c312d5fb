//! Row and column reshaping: sort, set-index, select.

use tracing::debug;

use crate::data::{HeaderPath, RowIndex, Table};
use crate::error::DatacastError;
use crate::Result;

/// Reorder rows by index label, ascending. Ties keep their input order;
/// unindexed tables come back unchanged.
pub fn sort_by_index(table: &Table) -> Table {
    let Some(index) = table.index() else {
        return table.clone();
    };
    let mut order: Vec<usize> = (0..table.row_count()).collect();
    order.sort_by(|&a, &b| index.labels[a].total_cmp(&index.labels[b]));
    let rows: Vec<Option<usize>> = order.into_iter().map(Some).collect();
    table.take_rows(&rows)
}

/// Move a one-level column into the row index, replacing any existing index.
pub fn set_index(table: &Table, column: &HeaderPath) -> Result<Table> {
    let found = table.require(column)?;
    if table.depth() != 1 {
        return Err(DatacastError::InvalidTable(format!(
            "cannot index by {} in a table with header depth {}",
            column,
            table.depth()
        )));
    }
    let index = RowIndex::new(Some(column.leaf().to_string()), found.values().to_vec());
    let columns = table
        .columns()
        .iter()
        .filter(|c| c.path() != column)
        .cloned()
        .collect();
    debug!(column = %column, "set row index");
    Table::with_rows(columns, Some(index), table.row_count())
}

/// Keep the columns whose path starts with any of `prefixes`, in table order.
///
/// A prefix that matches nothing is an error so typos surface.
pub fn select(table: &Table, prefixes: &[HeaderPath]) -> Result<Table> {
    if let Some(unmatched) = prefixes
        .iter()
        .find(|p| !table.paths().any(|path| path.starts_with(p)))
    {
        return Err(DatacastError::ColumnNotFound(unmatched.to_string()));
    }
    let columns = table
        .columns()
        .iter()
        .filter(|c| prefixes.iter().any(|p| c.path().starts_with(p)))
        .cloned()
        .collect();
    Table::with_rows(columns, table.index().cloned(), table.row_count())
}
