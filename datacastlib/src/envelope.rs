//! Multi-table envelope: one response from a whole table set.
//!
//! A request can yield several tables (one per split value, say). Each
//! format family renders them together in its own way:
//!
//! - **Text** (csv, txt): blocks stacked vertically, the discriminator as a
//!   leading column ([`grids`])
//! - **Spreadsheets** (xlsx, xls): one sheet per table ([`sheet_names`])
//! - **Charts** (png, svg): one series per plotted column per table
//!
//! [`Envelope`] drives the full request: build, transform, resolve, encode.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::data::{BuildOptions, Record, Table, TableBuilder, TableSet, Value};
use crate::output::{Encoded, FormatRegistry};
use crate::transform::{Transform, Transformer};
use crate::Result;

/// Longest sheet name spreadsheet applications accept.
const SHEET_NAME_MAX: usize = 31;

/// A table laid out as rows of cells: stacked header rows (outermost
/// level first), then body rows.
///
/// Leading cells hold the discriminator (multi-table sets only) and the
/// row-index label. Their header cells are empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// One row per header level
    pub header: Vec<Vec<String>>,
    /// One row per table row
    pub body: Vec<Vec<Value>>,
    /// Number of leading (discriminator/index) cells per row
    pub leading: usize,
}

impl Grid {
    /// Lay out `table`, tagging every body row with `discriminator` if given.
    pub fn new(table: &Table, discriminator: Option<&str>) -> Self {
        let leading = usize::from(discriminator.is_some()) + usize::from(table.index().is_some());

        let header = (0..table.depth())
            .map(|level| {
                let mut row = vec![String::new(); leading];
                row.extend(
                    table
                        .paths()
                        .map(|p| p.level(level).unwrap_or_default().to_string()),
                );
                row
            })
            .collect();

        let body = (0..table.row_count())
            .map(|r| {
                let mut row = Vec::with_capacity(leading + table.columns().len());
                if let Some(label) = discriminator {
                    row.push(Value::text(label));
                }
                if let Some(index) = table.index() {
                    row.push(index.labels[r].clone());
                }
                row.extend(table.row(r).cloned());
                row
            })
            .collect();

        Self {
            header,
            body,
            leading,
        }
    }

    /// Cells per row.
    pub fn width(&self) -> usize {
        self.header.first().map_or(self.leading, Vec::len)
    }
}

/// Lay out every table of `set`. Discriminator columns appear only when
/// the set holds more than one table.
pub fn grids(set: &TableSet) -> Vec<Grid> {
    set.entries()
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            let label = set.is_multi().then(|| set.label(position));
            Grid::new(&entry.table, label.as_deref())
        })
        .collect()
}

/// Sheet names for every table of `set`: the sanitized discriminator, or
/// `Sheet{n}` (1-based) when there is none. Names are unique
/// case-insensitively.
pub fn sheet_names(set: &TableSet) -> Vec<String> {
    let mut used = HashSet::new();
    set.entries()
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            let base = entry
                .discriminator
                .as_deref()
                .map(sanitize_sheet_name)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| format!("Sheet{}", position + 1));

            let mut name = base.clone();
            let mut n = 2;
            while !used.insert(name.to_lowercase()) {
                let suffix = format!(" ({n})");
                let keep = SHEET_NAME_MAX.saturating_sub(suffix.chars().count());
                name = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
                n += 1;
            }
            name
        })
        .collect()
}

fn sanitize_sheet_name(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    cleaned
        .trim_matches('\'')
        .chars()
        .take(SHEET_NAME_MAX)
        .collect()
}

/// Prefix for chart series labels of the table at `position`.
pub fn series_prefix(set: &TableSet, position: usize) -> Option<String> {
    set.is_multi().then(|| set.label(position))
}

/// Runs one request: records to encoded document.
///
/// The registry is shared and read-only; everything else is per request.
#[derive(Debug)]
pub struct Envelope<'r> {
    registry: &'r FormatRegistry,
    builder: TableBuilder,
    transformer: Transformer,
    transforms: Vec<Transform>,
}

impl<'r> Envelope<'r> {
    pub fn new(registry: &'r FormatRegistry) -> Self {
        Self {
            registry,
            builder: TableBuilder::default(),
            transformer: Transformer::new(),
            transforms: Vec::new(),
        }
    }

    /// Builder: set how records become tables.
    pub fn options(mut self, options: BuildOptions) -> Self {
        self.builder = TableBuilder::new(options);
        self
    }

    /// Builder: use a custom transformer (aggregation table).
    pub fn transformer(mut self, transformer: Transformer) -> Self {
        self.transformer = transformer;
        self
    }

    /// Builder: transforms applied in order after building.
    pub fn transforms(mut self, transforms: Vec<Transform>) -> Self {
        self.transforms = transforms;
        self
    }

    /// Build and transform `records` into the table set to encode.
    pub fn tables(&self, records: &[Record]) -> Result<TableSet> {
        let built = self.builder.build_set(records)?;
        debug!(
            records = records.len(),
            tables = built.len(),
            "built table set"
        );
        self.transformer.apply_all(&built, &self.transforms)
    }

    /// Run the whole pipeline and encode with the first format matching
    /// `requested` (or the registry default).
    pub fn render<S: AsRef<str>>(&self, records: &[Record], requested: &[S]) -> Result<Encoded> {
        let set = self.tables(records)?;
        let encoder = self.registry.resolve(requested)?;
        let encoded = encoder.encode(&set)?;
        info!(
            format = encoder.format_id(),
            content_type = %encoded.content_type,
            tables = set.len(),
            bytes = encoded.bytes.len(),
            "encoded response"
        );
        Ok(encoded)
    }
}
