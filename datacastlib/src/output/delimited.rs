//! Delimited text: the canonical lossless text form of a table.
//!
//! Header paths become stacked header rows, one per level. Multi-table sets
//! are written as blocks separated by a blank line.

use csv::{ReaderBuilder, Terminator, WriterBuilder};
use tracing::debug;

use crate::data::{Column, HeaderPath, RowIndex, Table, TableSet, Value};
use crate::envelope::{grids, Grid};
use crate::error::DatacastError;
use crate::Result;

use super::{Encoded, Encoder, CSV};

/// Writes `text/csv`.
#[derive(Debug, Clone)]
pub struct CsvEncoder {
    delimiter: u8,
}

impl Default for CsvEncoder {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: use a different field delimiter.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn write_block(&self, grid: &Grid, out: &mut Vec<u8>) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .terminator(Terminator::Any(b'\n'))
            .flexible(true)
            .from_writer(out);

        if grid.width() > 0 {
            for row in &grid.header {
                writer
                    .write_record(row)
                    .map_err(|e| DatacastError::encode("csv", e))?;
            }
        }
        for row in &grid.body {
            writer
                .write_record(row.iter().map(Value::to_field))
                .map_err(|e| DatacastError::encode("csv", e))?;
        }
        writer.flush().map_err(|e| DatacastError::encode("csv", e))
    }
}

impl Encoder for CsvEncoder {
    fn format_id(&self) -> &str {
        "csv"
    }

    fn content_type(&self) -> &str {
        CSV
    }

    fn encode(&self, tables: &TableSet) -> Result<Encoded> {
        let mut out = Vec::new();
        for (position, grid) in grids(tables).iter().enumerate() {
            if position > 0 {
                out.push(b'\n');
            }
            self.write_block(grid, &mut out)?;
        }
        debug!(tables = tables.len(), bytes = out.len(), "encoded csv");
        Ok(Encoded::new(CSV, out))
    }
}

/// Read a single-block csv document back into a table.
///
/// The first `header_rows` records are the stacked header levels; with
/// `indexed`, the first cell of every row is the row-index label. Cell
/// kinds are inferred from the text and empty cells become missing.
/// Without header rows, columns are labelled by position.
pub fn parse_delimited(text: &str, header_rows: usize, indexed: bool) -> Result<Table> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DatacastError::InvalidRecord(e.to_string()))?;
        records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    if records.len() < header_rows {
        return Err(DatacastError::InvalidRecord(format!(
            "expected {} header rows but the document has {} rows",
            header_rows,
            records.len()
        )));
    }

    let (header, body) = records.split_at(header_rows);
    let skip = usize::from(indexed);
    let width = header
        .iter()
        .chain(body)
        .map(Vec::len)
        .max()
        .unwrap_or(0)
        .saturating_sub(skip);

    let columns = (0..width)
        .map(|c| {
            let path = if header.is_empty() {
                HeaderPath::single(c.to_string())
            } else {
                HeaderPath::new(header.iter().map(|row| cell(row, c + skip).to_string()))
            };
            let values = body
                .iter()
                .map(|row| Value::parse_field(cell(row, c + skip)))
                .collect();
            Column::new(path, values)
        })
        .collect();
    let index = indexed.then(|| {
        RowIndex::new(
            None,
            body.iter().map(|row| Value::parse_field(cell(row, 0))).collect(),
        )
    });

    Table::with_rows(columns, index, body.len())
}

fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(String::as_str).unwrap_or_default()
}
