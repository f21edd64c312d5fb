//! Record collection to table conversion.
//!
//! This is the first stage of the pipeline: an ordered sequence of flat
//! [`Record`]s becomes a [`Table`] (or, when split by a grouping field, a
//! [`TableSet`]). Column kinds are inferred here; nothing downstream ever
//! looks at records again.

use std::collections::HashSet;

use tracing::debug;

use crate::error::DatacastError;
use crate::Result;

use super::record::Record;
use super::table::{Column, RowIndex, Table, TableEntry, TableSet};
use super::value::Value;

/// Options controlling how records become columns.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Declared column order (None = union of record keys, first-seen order)
    pub column_order: Option<Vec<String>>,
    /// Drop undeclared fields instead of failing
    pub permissive: bool,
    /// Field moved into the row index
    pub index_field: Option<String>,
    /// Field whose distinct values split the records into separate tables
    pub split_by: Option<String>,
    /// Text fields to parse as timestamps before inference
    pub timestamp_fields: Vec<String>,
}

impl BuildOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the exact column set and order.
    pub fn columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_order = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Fill or drop instead of failing on undeclared fields.
    pub fn permissive(mut self, permissive: bool) -> Self {
        self.permissive = permissive;
        self
    }

    /// Use a field as the row index.
    pub fn index(mut self, field: impl Into<String>) -> Self {
        self.index_field = Some(field.into());
        self
    }

    /// Split into one table per distinct value of `field`.
    pub fn split_by(mut self, field: impl Into<String>) -> Self {
        self.split_by = Some(field.into());
        self
    }

    /// Parse the named fields as timestamps.
    pub fn timestamps<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.timestamp_fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// Converts records into tables.
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    options: BuildOptions,
}

impl TableBuilder {
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    /// Build a single table. `split_by` is ignored here; see
    /// [`TableBuilder::build_set`].
    pub fn build(&self, records: &[Record]) -> Result<Table> {
        let records = self.prepare(records);
        let names = self.column_names(&records)?;
        let all: Vec<&Record> = records.iter().collect();
        self.assemble(&names, &all)
    }

    /// Build one table per distinct `split_by` value (first-occurrence
    /// order, discriminator `field=value`), or a single-table set when no
    /// split field is configured or there are no records.
    pub fn build_set(&self, records: &[Record]) -> Result<TableSet> {
        let Some(split) = &self.options.split_by else {
            return Ok(TableSet::single(self.build(records)?));
        };

        let records = self.prepare(records);
        let names: Vec<String> = self
            .column_names(&records)?
            .into_iter()
            .filter(|n| n != split)
            .collect();

        let mut groups: Vec<(Value, Vec<&Record>)> = Vec::new();
        for record in &records {
            let key = record.get(split).cloned().unwrap_or_default();
            match groups.iter_mut().find(|(k, _)| k.same_as(&key)) {
                Some((_, members)) => members.push(record),
                None => groups.push((key, vec![record])),
            }
        }

        if groups.is_empty() {
            return Ok(TableSet::single(self.assemble(&names, &[])?));
        }

        debug!(field = %split, groups = groups.len(), "splitting records");
        let mut used = HashSet::new();
        let entries = groups
            .into_iter()
            .map(|(key, members)| {
                let label = unique_label(&mut used, format!("{}={}", split, key.to_field()));
                Ok(TableEntry {
                    discriminator: Some(label),
                    table: self.assemble(&names, &members)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        TableSet::new(entries)
    }

    fn prepare(&self, records: &[Record]) -> Vec<Record> {
        if self.options.timestamp_fields.is_empty() {
            records.to_vec()
        } else {
            records
                .iter()
                .map(|r| r.parse_timestamps(&self.options.timestamp_fields))
                .collect()
        }
    }

    /// Resolve the column set, checking records against a declared order.
    fn column_names(&self, records: &[Record]) -> Result<Vec<String>> {
        match &self.options.column_order {
            Some(order) => {
                if !self.options.permissive {
                    for (row, record) in records.iter().enumerate() {
                        if let Some(field) = record.keys().find(|k| !order.iter().any(|o| o == k))
                        {
                            return Err(DatacastError::Schema {
                                field: field.to_string(),
                                record: row,
                            });
                        }
                    }
                }
                Ok(order.clone())
            }
            None => {
                let mut names: Vec<String> = Vec::new();
                for record in records {
                    for key in record.keys() {
                        if !names.iter().any(|n| n == key) {
                            names.push(key.to_string());
                        }
                    }
                }
                Ok(names)
            }
        }
    }

    fn assemble(&self, names: &[String], records: &[&Record]) -> Result<Table> {
        let index_field = self.options.index_field.as_deref();

        let mut index = None;
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let values: Vec<Value> = records
                .iter()
                .map(|r| r.get(name).cloned().unwrap_or_default())
                .collect();
            if Some(name.as_str()) == index_field {
                index = Some(RowIndex::new(Some(name.clone()), values));
            } else {
                columns.push(Column::new(name.as_str(), values));
            }
        }

        if let Some(field) = index_field {
            if index.is_none() {
                if !records.is_empty() {
                    return Err(DatacastError::ColumnNotFound(field.to_string()));
                }
                index = Some(RowIndex::new(Some(field.to_string()), Vec::new()));
            }
        }

        debug!(
            rows = records.len(),
            columns = columns.len(),
            indexed = index.is_some(),
            "built table"
        );
        Table::with_rows(columns, index, records.len())
    }
}

/// `base`, or `base (n)` with the smallest `n >= 2` not in `used`.
///
/// Distinct split values can render alike (`1` and `"1"`, missing and
/// `""`); every table still needs its own label.
fn unique_label(used: &mut HashSet<String>, base: String) -> String {
    let mut label = base.clone();
    let mut n = 2;
    while !used.insert(label.clone()) {
        label = format!("{base} ({n})");
        n += 1;
    }
    label
}

/// Build a table from records with an optional declared column order.
pub fn build(records: &[Record], column_order: Option<&[&str]>) -> Result<Table> {
    let mut options = BuildOptions::new();
    if let Some(order) = column_order {
        options = options.columns(order.iter().copied());
    }
    TableBuilder::new(options).build(records)
}
