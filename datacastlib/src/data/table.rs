//! The canonical in-memory table.
//!
//! A [`Table`] is an ordered list of typed [`Column`]s sharing a row count,
//! plus an optional [`RowIndex`]. Columns are addressed by [`HeaderPath`],
//! which is what gives tables their multi-level headers.
//!
//! Tables are validated on construction and never mutated afterwards:
//! every transform builds a new table.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DatacastError;
use crate::Result;

use super::value::{infer_kind, ColumnKind, Value};

/// Ordered labels identifying a column, outermost level first.
///
/// Deserializes from either a single string or an array of labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "PathRepr")]
pub struct HeaderPath(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum PathRepr {
    One(String),
    Many(Vec<String>),
}

impl From<PathRepr> for HeaderPath {
    fn from(repr: PathRepr) -> Self {
        match repr {
            PathRepr::One(label) => Self::single(label),
            PathRepr::Many(labels) => Self::new(labels),
        }
    }
}

impl HeaderPath {
    /// Create a path from labels. An empty label list is a one-level path
    /// with an empty label.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            Self(vec![String::new()])
        } else {
            Self(labels)
        }
    }

    /// A one-level path.
    pub fn single(label: impl Into<String>) -> Self {
        Self(vec![label.into()])
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    /// Label at a level, if the path is that deep.
    pub fn level(&self, level: usize) -> Option<&str> {
        self.0.get(level).map(String::as_str)
    }

    /// The innermost label.
    pub fn leaf(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// Labels joined into a single flat key.
    pub fn joined(&self, separator: &str) -> String {
        self.0.join(separator)
    }

    /// New path with `label` as the outermost level.
    pub fn prefixed(&self, label: impl Into<String>) -> Self {
        let mut labels = Vec::with_capacity(self.0.len() + 1);
        labels.push(label.into());
        labels.extend(self.0.iter().cloned());
        Self(labels)
    }

    /// New path padded with empty labels at the inner end up to `depth`.
    pub fn padded(&self, depth: usize) -> Self {
        let mut labels = self.0.clone();
        labels.resize(depth.max(labels.len()), String::new());
        Self(labels)
    }

    /// Whether `prefix` matches this path's outermost levels.
    pub fn starts_with(&self, prefix: &HeaderPath) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for HeaderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() == 1 {
            f.write_str(&self.0[0])
        } else {
            write!(f, "({})", self.0.join(", "))
        }
    }
}

impl From<&str> for HeaderPath {
    fn from(label: &str) -> Self {
        Self::single(label)
    }
}

impl From<String> for HeaderPath {
    fn from(label: String) -> Self {
        Self::single(label)
    }
}

impl From<Vec<String>> for HeaderPath {
    fn from(labels: Vec<String>) -> Self {
        Self::new(labels)
    }
}

impl From<Vec<&str>> for HeaderPath {
    fn from(labels: Vec<&str>) -> Self {
        Self::new(labels)
    }
}

impl<const N: usize> From<[&str; N]> for HeaderPath {
    fn from(labels: [&str; N]) -> Self {
        Self::new(labels)
    }
}

/// A typed column of values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    path: HeaderPath,
    kind: ColumnKind,
    values: Vec<Value>,
}

impl Column {
    /// Create a column, inferring its kind and coercing every value to it.
    pub fn new(path: impl Into<HeaderPath>, values: Vec<Value>) -> Self {
        let kind = infer_kind(&values);
        let values = values.into_iter().map(|v| v.coerce(kind)).collect();
        Self {
            path: path.into(),
            kind,
            values,
        }
    }

    pub fn path(&self) -> &HeaderPath {
        &self.path
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Same values under a different header path.
    pub fn renamed(&self, path: HeaderPath) -> Self {
        Self {
            path,
            kind: self.kind,
            values: self.values.clone(),
        }
    }

    /// Column made of the values at `rows` (`None` yields the missing-marker).
    pub(crate) fn take(&self, rows: &[Option<usize>]) -> Self {
        let values = rows
            .iter()
            .map(|r| r.and_then(|i| self.values.get(i).cloned()).unwrap_or_default())
            .collect();
        Self::new(self.path.clone(), values)
    }
}

/// Row labels for indexed tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowIndex {
    /// Name of the field the index came from, if any
    pub name: Option<String>,
    /// One label per row
    pub labels: Vec<Value>,
}

impl RowIndex {
    pub fn new(name: Option<String>, labels: Vec<Value>) -> Self {
        Self { name, labels }
    }

    /// Display name, `index` when unnamed.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("index")
    }

    /// Position of the first row carrying `label`.
    pub fn position(&self, label: &Value) -> Option<usize> {
        self.labels.iter().position(|l| l.same_as(label))
    }

    /// `(label key, k)` for every row, where `k` counts earlier rows with
    /// the same label. Unique even when labels repeat.
    pub(crate) fn occurrence_keys(&self) -> Vec<(String, usize)> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        self.labels
            .iter()
            .map(|label| {
                let key = label_key(label);
                let count = seen.entry(key.clone()).or_insert(0);
                *count += 1;
                (key, *count - 1)
            })
            .collect()
    }

    pub(crate) fn take(&self, rows: &[Option<usize>]) -> Self {
        Self {
            name: self.name.clone(),
            labels: rows
                .iter()
                .map(|r| r.and_then(|i| self.labels.get(i).cloned()).unwrap_or_default())
                .collect(),
        }
    }
}

/// Hashable identity of a label. Kinds stay distinct: `1` and `"1"` differ.
pub(crate) fn label_key(value: &Value) -> String {
    format!("{:?}", value)
}

/// A validated, immutable table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    index: Option<RowIndex>,
    rows: usize,
}

impl Table {
    /// Build a table, checking that columns and index agree on the row
    /// count, header paths are unique, and header depth is uniform.
    ///
    /// With no columns and no index the row count is zero.
    pub fn new(columns: Vec<Column>, index: Option<RowIndex>) -> Result<Self> {
        let rows = columns
            .first()
            .map(Column::len)
            .or_else(|| index.as_ref().map(|i| i.labels.len()))
            .unwrap_or(0);
        Self::with_rows(columns, index, rows)
    }

    /// Like [`Table::new`] but with an explicit row count, for tables that
    /// have rows but no columns.
    pub fn with_rows(columns: Vec<Column>, index: Option<RowIndex>, rows: usize) -> Result<Self> {
        if let Some(index) = &index {
            if index.labels.len() != rows {
                return Err(DatacastError::InvalidTable(format!(
                    "row index has {} labels but the table has {} rows",
                    index.labels.len(),
                    rows
                )));
            }
        }

        let mut seen = HashSet::new();
        let depth = columns.first().map(|c| c.path.depth());
        for column in &columns {
            if column.len() != rows {
                return Err(DatacastError::InvalidTable(format!(
                    "column {} has {} values but the table has {} rows",
                    column.path,
                    column.len(),
                    rows
                )));
            }
            if Some(column.path.depth()) != depth {
                return Err(DatacastError::InvalidTable(format!(
                    "column {} has header depth {} but the table uses depth {}",
                    column.path,
                    column.path.depth(),
                    depth.unwrap_or(1)
                )));
            }
            if !seen.insert(&column.path) {
                return Err(DatacastError::DuplicateColumn(column.path.to_string()));
            }
        }

        Ok(Self {
            columns,
            index,
            rows,
        })
    }

    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            index: None,
            rows: 0,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn index(&self) -> Option<&RowIndex> {
        self.index.as_ref()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Header depth shared by all columns (1 for a table without columns).
    pub fn depth(&self) -> usize {
        self.columns.first().map_or(1, |c| c.path.depth())
    }

    pub fn paths(&self) -> impl Iterator<Item = &HeaderPath> {
        self.columns.iter().map(|c| &c.path)
    }

    /// Look up a column by header path.
    pub fn column(&self, path: &HeaderPath) -> Option<&Column> {
        self.columns.iter().find(|c| &c.path == path)
    }

    /// Like [`Table::column`] but failing with `ColumnNotFound`.
    pub fn require(&self, path: &HeaderPath) -> Result<&Column> {
        self.column(path)
            .ok_or_else(|| DatacastError::ColumnNotFound(path.to_string()))
    }

    /// Values of a row, in column order.
    pub fn row(&self, row: usize) -> impl Iterator<Item = &Value> {
        self.columns.iter().map(move |c| &c.values[row])
    }

    /// New table made of the rows at `rows`, in that order. `None` entries
    /// produce rows of missing-markers.
    pub(crate) fn take_rows(&self, rows: &[Option<usize>]) -> Self {
        Self {
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            index: self.index.as_ref().map(|i| i.take(rows)),
            rows: rows.len(),
        }
    }

    /// Same columns with a different row index.
    pub fn with_index(&self, index: Option<RowIndex>) -> Result<Self> {
        Self::with_rows(self.columns.clone(), index, self.rows)
    }
}

/// One table within a [`TableSet`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableEntry {
    /// Label naming the table's origin group
    pub discriminator: Option<String>,
    /// The table itself
    pub table: Table,
}

/// The ordered tables produced by one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSet {
    entries: Vec<TableEntry>,
}

impl TableSet {
    /// A set holding a single, unlabelled table.
    pub fn single(table: Table) -> Self {
        Self {
            entries: vec![TableEntry {
                discriminator: None,
                table,
            }],
        }
    }

    /// A set of labelled tables. At least one table is required.
    pub fn new(entries: Vec<TableEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(DatacastError::InvalidTable(
                "a table set needs at least one table".to_string(),
            ));
        }
        Ok(Self { entries })
    }

    /// Convenience constructor from `(discriminator, table)` pairs.
    pub fn labelled<I, S>(tables: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Table)>,
        S: Into<String>,
    {
        Self::new(
            tables
                .into_iter()
                .map(|(label, table)| TableEntry {
                    discriminator: Some(label.into()),
                    table,
                })
                .collect(),
        )
    }

    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.entries.iter().map(|e| &e.table)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: a set holds at least one table.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether encoders need to separate and tag the tables.
    pub fn is_multi(&self) -> bool {
        self.entries.len() > 1
    }

    /// Discriminator of the table at `position`, or its position as text.
    pub fn label(&self, position: usize) -> String {
        self.entries
            .get(position)
            .and_then(|e| e.discriminator.clone())
            .unwrap_or_else(|| position.to_string())
    }

    /// Apply a fallible function to every table, keeping discriminators.
    pub fn try_map<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(&Table) -> Result<Table>,
    {
        let entries = self
            .entries
            .iter()
            .map(|e| {
                Ok(TableEntry {
                    discriminator: e.discriminator.clone(),
                    table: f(&e.table)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }
}

impl From<Table> for TableSet {
    fn from(table: Table) -> Self {
        Self::single(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|&v| Value::Integer(v)).collect()
    }

    #[test]
    fn test_header_path_helpers() {
        let path = HeaderPath::from(["temperature", "max"]);
        assert_eq!(path.depth(), 2);
        assert_eq!(path.leaf(), "max");
        assert_eq!(path.joined("/"), "temperature/max");
        assert_eq!(path.to_string(), "(temperature, max)");
        assert_eq!(
            HeaderPath::from("t").prefixed("site=A"),
            HeaderPath::from(["site=A", "t"])
        );
        assert_eq!(HeaderPath::from("t").padded(3), HeaderPath::from(["t", "", ""]));
        assert!(path.starts_with(&HeaderPath::from("temperature")));
        assert!(!path.starts_with(&HeaderPath::from("max")));
    }

    #[test]
    fn test_header_path_deserializes_from_string_or_array() {
        let one: HeaderPath = serde_json::from_str(r#""site""#).unwrap();
        assert_eq!(one, HeaderPath::from("site"));
        let many: HeaderPath = serde_json::from_str(r#"["site", "temp"]"#).unwrap();
        assert_eq!(many, HeaderPath::from(["site", "temp"]));
    }

    #[test]
    fn test_column_coerces_to_inferred_kind() {
        let column = Column::new("x", vec![Value::from(1), Value::from(2.5), Value::Missing]);
        assert_eq!(column.kind(), ColumnKind::Float);
        assert_eq!(
            column.values(),
            &[Value::Float(1.0), Value::Float(2.5), Value::Missing]
        );
    }

    #[test]
    fn test_table_rejects_ragged_columns() {
        let err = Table::new(
            vec![Column::new("a", ints(&[1, 2])), Column::new("b", ints(&[1]))],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DatacastError::InvalidTable(_)));
    }

    #[test]
    fn test_table_rejects_duplicate_paths() {
        let err = Table::new(
            vec![Column::new("a", ints(&[1])), Column::new("a", ints(&[2]))],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DatacastError::DuplicateColumn(_)));
    }

    #[test]
    fn test_table_rejects_mixed_depth() {
        let err = Table::new(
            vec![
                Column::new("a", ints(&[1])),
                Column::new(["b", "c"], ints(&[2])),
            ],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DatacastError::InvalidTable(_)));
    }

    #[test]
    fn test_table_rejects_short_index() {
        let index = RowIndex::new(None, vec![Value::from("r1")]);
        let err = Table::new(vec![Column::new("a", ints(&[1, 2]))], Some(index)).unwrap_err();
        assert!(matches!(err, DatacastError::InvalidTable(_)));
    }

    #[test]
    fn test_take_rows_fills_missing() {
        let table = Table::new(vec![Column::new("a", ints(&[1, 2]))], None).unwrap();
        let taken = table.take_rows(&[Some(1), None]);
        assert_eq!(taken.row_count(), 2);
        assert_eq!(taken.columns()[0].values(), &[Value::Integer(2), Value::Missing]);
    }

    #[test]
    fn test_table_set_labels() {
        let set = TableSet::new(vec![
            TableEntry {
                discriminator: Some("site=A".into()),
                table: Table::empty(),
            },
            TableEntry {
                discriminator: None,
                table: Table::empty(),
            },
        ])
        .unwrap();
        assert!(set.is_multi());
        assert_eq!(set.label(0), "site=A");
        assert_eq!(set.label(1), "1");
        assert!(TableSet::new(vec![]).is_err());
    }
}
