//! Plain text: the csv layout as a padded, fixed-width table.

use tracing::debug;

use crate::data::{TableSet, Value};
use crate::envelope::{grids, Grid};
use crate::Result;

use super::{Encoded, Encoder, TXT};

const GAP: &str = "  ";

/// Writes `text/plain` tables for terminals and logs.
///
/// Labels (header cells, discriminator and index) are left-aligned, values
/// right-aligned, and a dashed line separates the header from the body.
#[derive(Debug, Clone, Default)]
pub struct TextEncoder;

impl TextEncoder {
    pub fn new() -> Self {
        Self
    }
}

fn render_block(grid: &Grid, out: &mut String) {
    let width = grid.width();
    if width == 0 {
        return;
    }
    let body: Vec<Vec<String>> = grid
        .body
        .iter()
        .map(|row| row.iter().map(Value::to_field).collect())
        .collect();

    let mut widths = vec![0; width];
    for row in grid.header.iter().chain(&body) {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut push_line = |cells: Vec<String>| {
        out.push_str(cells.join(GAP).trim_end());
        out.push('\n');
    };

    for row in &grid.header {
        push_line(
            row.iter()
                .zip(&widths)
                .map(|(cell, &w)| format!("{:<w$}", cell))
                .collect(),
        );
    }
    let rule = widths.iter().sum::<usize>() + GAP.len() * (width - 1);
    push_line(vec!["-".repeat(rule)]);

    for row in &body {
        push_line(
            row.iter()
                .zip(&widths)
                .enumerate()
                .map(|(c, (cell, &w))| {
                    if c < grid.leading {
                        format!("{:<w$}", cell)
                    } else {
                        format!("{:>w$}", cell)
                    }
                })
                .collect(),
        );
    }
}

impl Encoder for TextEncoder {
    fn format_id(&self) -> &str {
        "txt"
    }

    fn content_type(&self) -> &str {
        TXT
    }

    fn encode(&self, tables: &TableSet) -> Result<Encoded> {
        let mut out = String::new();
        for (position, grid) in grids(tables).iter().enumerate() {
            if position > 0 {
                out.push('\n');
            }
            render_block(grid, &mut out);
        }
        debug!(tables = tables.len(), bytes = out.len(), "encoded text table");
        Ok(Encoded::new(TXT, out.into_bytes()))
    }
}
