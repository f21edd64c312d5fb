//! Legacy Excel (`application/vnd.ms-excel`) as an XML Spreadsheet 2003
//! document, which every Excel since 2002 opens as a native workbook.

use std::fmt::Write as _;

use tracing::debug;

use crate::data::{TableSet, Value};
use crate::envelope::{sheet_names, Grid};
use crate::error::DatacastError;
use crate::Result;

use super::xlsx::TIMESTAMP_FORMAT;
use super::{escape_xml, Encoded, Encoder, XLS};

const PROLOGUE: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
    "<?mso-application progid=\"Excel.Sheet\"?>\n",
    "<Workbook xmlns=\"urn:schemas-microsoft-com:office:spreadsheet\" ",
    "xmlns:ss=\"urn:schemas-microsoft-com:office:spreadsheet\">\n",
);

/// Writes one worksheet per table, same layout as xlsx.
#[derive(Debug, Clone, Default)]
pub struct XlsEncoder;

impl XlsEncoder {
    pub fn new() -> Self {
        Self
    }
}

fn data_cell(out: &mut String, value: &Value) -> std::fmt::Result {
    match value {
        Value::Missing => out.write_str("<Cell/>"),
        Value::Bool(v) => write!(
            out,
            "<Cell><Data ss:Type=\"Boolean\">{}</Data></Cell>",
            u8::from(*v)
        ),
        Value::Integer(v) => write!(out, "<Cell><Data ss:Type=\"Number\">{v}</Data></Cell>"),
        Value::Float(v) if v.is_finite() => {
            write!(out, "<Cell><Data ss:Type=\"Number\">{v:?}</Data></Cell>")
        }
        Value::Timestamp(ts) => write!(
            out,
            "<Cell ss:StyleID=\"timestamp\"><Data ss:Type=\"DateTime\">{}</Data></Cell>",
            ts.format("%Y-%m-%dT%H:%M:%S%.3f")
        ),
        other => write!(
            out,
            "<Cell><Data ss:Type=\"String\">{}</Data></Cell>",
            escape_xml(&other.to_field())
        ),
    }
}

fn write_sheet(out: &mut String, name: &str, grid: &Grid) -> std::fmt::Result {
    writeln!(out, "<Worksheet ss:Name=\"{}\">", escape_xml(name))?;
    out.write_str("<Table>\n")?;
    if grid.width() > 0 {
        for row in &grid.header {
            out.write_str("<Row>")?;
            for label in row {
                if label.is_empty() {
                    out.write_str("<Cell/>")?;
                } else {
                    write!(
                        out,
                        "<Cell ss:StyleID=\"header\"><Data ss:Type=\"String\">{}</Data></Cell>",
                        escape_xml(label)
                    )?;
                }
            }
            out.write_str("</Row>\n")?;
        }
    }
    for row in &grid.body {
        out.write_str("<Row>")?;
        for value in row {
            data_cell(out, value)?;
        }
        out.write_str("</Row>\n")?;
    }
    out.write_str("</Table>\n</Worksheet>\n")
}

impl Encoder for XlsEncoder {
    fn format_id(&self) -> &str {
        "xls"
    }

    fn content_type(&self) -> &str {
        XLS
    }

    fn encode(&self, tables: &TableSet) -> Result<Encoded> {
        let mut out = String::from(PROLOGUE);
        write!(
            out,
            "<Styles>\n<Style ss:ID=\"header\"><Font ss:Bold=\"1\"/></Style>\n\
             <Style ss:ID=\"timestamp\"><NumberFormat ss:Format=\"{TIMESTAMP_FORMAT}\"/></Style>\n\
             </Styles>\n"
        )
        .map_err(|e| DatacastError::encode("xls", e))?;
        for (entry, name) in tables.entries().iter().zip(sheet_names(tables)) {
            write_sheet(&mut out, &name, &Grid::new(&entry.table, None))
                .map_err(|e| DatacastError::encode("xls", e))?;
        }
        out.push_str("</Workbook>\n");
        debug!(sheets = tables.len(), bytes = out.len(), "encoded xls");
        Ok(Encoded::new(XLS, out.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{build, Record, Table};

    fn encode(set: &TableSet) -> String {
        let encoded = XlsEncoder::new().encode(set).unwrap();
        assert_eq!(encoded.content_type, "application/vnd.ms-excel");
        String::from_utf8(encoded.bytes).unwrap()
    }

    #[test]
    fn test_typed_cells() {
        let table = build(
            &[Record::new()
                .with("name", "a<b")
                .with("n", 3)
                .with("x", 1.5)
                .with("ok", true)
                .with("gap", Value::Missing)],
            None,
        )
        .unwrap();
        let doc = encode(&table.into());
        assert!(doc.starts_with("<?xml"));
        assert!(doc.contains("<Worksheet ss:Name=\"Sheet1\">"));
        assert!(doc.contains("<Data ss:Type=\"String\">a&lt;b</Data>"));
        assert!(doc.contains("<Data ss:Type=\"Number\">3</Data>"));
        assert!(doc.contains("<Data ss:Type=\"Number\">1.5</Data>"));
        assert!(doc.contains("<Data ss:Type=\"Boolean\">1</Data>"));
        assert!(doc.trim_end().ends_with("</Workbook>"));
    }

    #[test]
    fn test_sheet_per_table() {
        let set = TableSet::labelled([
            ("site=A", build(&[Record::new().with("v", 1)], None).unwrap()),
            ("site=B", build(&[Record::new().with("v", 2)], None).unwrap()),
        ])
        .unwrap();
        let doc = encode(&set);
        assert_eq!(doc.matches("<Worksheet ").count(), 2);
        assert!(doc.contains("ss:Name=\"site=B\""));
    }

    #[test]
    fn test_empty_table() {
        let doc = encode(&Table::empty().into());
        assert!(doc.contains("<Table>\n</Table>"));
    }
}
