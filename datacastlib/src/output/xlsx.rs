//! Excel workbooks (Office Open XML).

use chrono::{NaiveDate, NaiveDateTime};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::debug;

use crate::data::{TableSet, Value};
use crate::envelope::{sheet_names, Grid};
use crate::error::DatacastError;
use crate::Result;

use super::{Encoded, Encoder, XLSX};

pub(crate) const TIMESTAMP_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Writes one worksheet per table with bold stacked header rows and
/// natively typed cells.
#[derive(Debug, Clone, Default)]
pub struct XlsxEncoder;

impl XlsxEncoder {
    pub fn new() -> Self {
        Self
    }
}

struct Formats {
    header: Format,
    timestamp: Format,
}

/// Days since the 1900 date system epoch, as spreadsheets store dates.
fn excel_serial(ts: &NaiveDateTime) -> Option<f64> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let elapsed = ts.signed_duration_since(epoch);
    Some(elapsed.num_milliseconds() as f64 / 86_400_000.0)
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    formats: &Formats,
) -> std::result::Result<(), XlsxError> {
    match value {
        Value::Missing => {}
        Value::Bool(v) => {
            sheet.write_boolean(row, col, *v)?;
        }
        Value::Integer(v) => {
            sheet.write_number(row, col, *v as f64)?;
        }
        Value::Float(v) if v.is_finite() => {
            sheet.write_number(row, col, *v)?;
        }
        Value::Float(v) => {
            sheet.write_string(row, col, v.to_string())?;
        }
        Value::Timestamp(ts) => match excel_serial(ts) {
            Some(serial) => {
                sheet.write_number_with_format(row, col, serial, &formats.timestamp)?;
            }
            None => {
                sheet.write_string(row, col, value.to_field())?;
            }
        },
        Value::Text(v) => {
            sheet.write_string(row, col, v)?;
        }
    }
    Ok(())
}

fn cell_row(r: usize) -> std::result::Result<u32, XlsxError> {
    u32::try_from(r).map_err(|_| XlsxError::RowColumnLimitError)
}

fn cell_col(c: usize) -> std::result::Result<u16, XlsxError> {
    u16::try_from(c).map_err(|_| XlsxError::RowColumnLimitError)
}

fn write_sheet(
    sheet: &mut Worksheet,
    name: &str,
    grid: &Grid,
    formats: &Formats,
) -> std::result::Result<(), XlsxError> {
    sheet.set_name(name)?;
    let header_rows = grid.header.len() * usize::from(grid.width() > 0);
    for (r, row) in grid.header.iter().enumerate().take(header_rows) {
        for (c, label) in row.iter().enumerate() {
            if !label.is_empty() {
                sheet.write_string_with_format(cell_row(r)?, cell_col(c)?, label, &formats.header)?;
            }
        }
    }
    for (r, row) in grid.body.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            write_cell(sheet, cell_row(header_rows + r)?, cell_col(c)?, value, formats)?;
        }
    }
    sheet.autofit();
    Ok(())
}

impl Encoder for XlsxEncoder {
    fn format_id(&self) -> &str {
        "xlsx"
    }

    fn content_type(&self) -> &str {
        XLSX
    }

    fn encode(&self, tables: &TableSet) -> Result<Encoded> {
        let formats = Formats {
            header: Format::new().set_bold(),
            timestamp: Format::new().set_num_format(TIMESTAMP_FORMAT),
        };
        let mut workbook = Workbook::new();
        for (entry, name) in tables.entries().iter().zip(sheet_names(tables)) {
            let grid = Grid::new(&entry.table, None);
            let sheet = workbook.add_worksheet();
            write_sheet(sheet, &name, &grid, &formats)
                .map_err(|e| DatacastError::encode("xlsx", format!("sheet '{name}': {e}")))?;
        }
        let bytes = workbook
            .save_to_buffer()
            .map_err(|e| DatacastError::encode("xlsx", e))?;
        debug!(sheets = tables.len(), bytes = bytes.len(), "encoded xlsx");
        Ok(Encoded::new(XLSX, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{build, Record, Table};
    use crate::transform::merge;
    use std::io::{Cursor, Read};

    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    /// The `<c>` element for `reference`, up to its closing tag.
    fn cell<'a>(sheet: &'a str, reference: &str) -> Option<&'a str> {
        let start = sheet.find(&format!("<c r=\"{reference}\""))?;
        let end = sheet[start..].find("</c>")?;
        Some(&sheet[start..start + end])
    }

    #[test]
    fn test_excel_serial() {
        let ts = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(excel_serial(&ts), Some(43831.5));
    }

    #[test]
    fn test_typed_cells() {
        let noon = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let table = build(
            &[Record::new()
                .with("name", "Widget")
                .with("price", 9.99)
                .with("stock", 3)
                .with("active", true)
                .with("when", noon)
                .with("gap", Value::Missing)],
            None,
        )
        .unwrap();
        let encoded = XlsxEncoder::new().encode(&table.into()).unwrap();
        assert_eq!(encoded.content_type, XLSX);
        assert_eq!(&encoded.bytes[0..2], b"PK");

        let sheet = part(&encoded.bytes, "xl/worksheets/sheet1.xml");
        let header = cell(&sheet, "A1").unwrap();
        assert!(header.contains("t=\"s\""));
        assert!(header.contains(" s=\""), "header cells carry the bold format");

        let price = cell(&sheet, "B2").unwrap();
        assert!(price.ends_with("<v>9.99</v>"));
        assert!(!price.contains("t=\""));
        assert!(cell(&sheet, "C2").unwrap().ends_with("<v>3</v>"));

        let active = cell(&sheet, "D2").unwrap();
        assert!(active.contains("t=\"b\""));
        assert!(active.ends_with("<v>1</v>"));

        let when = cell(&sheet, "E2").unwrap();
        assert!(when.ends_with("<v>43831.5</v>"));
        assert!(when.contains(" s=\""));

        assert!(cell(&sheet, "F1").is_some());
        assert!(!sheet.contains("r=\"F2\""));

        let strings = part(&encoded.bytes, "xl/sharedStrings.xml");
        assert!(strings.contains(">name<"));
        assert!(strings.contains(">Widget<"));
    }

    #[test]
    fn test_multi_sheet_and_stacked_headers() {
        let a = build(&[Record::new().with("temp", 10)], None).unwrap();
        let b = build(&[Record::new().with("temp", 12)], None).unwrap();
        let set = TableSet::labelled([("site=A", a), ("site=B", b)]).unwrap();

        let encoded = XlsxEncoder::new().encode(&set).unwrap();
        let workbook = part(&encoded.bytes, "xl/workbook.xml");
        assert!(workbook.contains("name=\"site=A\""));
        assert!(workbook.contains("name=\"site=B\""));
        let second = part(&encoded.bytes, "xl/worksheets/sheet2.xml");
        assert!(cell(&second, "A2").unwrap().ends_with("<v>12</v>"));

        let merged = merge(&set, None).unwrap();
        let encoded = XlsxEncoder::new().encode(&merged.into()).unwrap();
        let sheet = part(&encoded.bytes, "xl/worksheets/sheet1.xml");
        for reference in ["A1", "B1", "A2", "B2"] {
            assert!(cell(&sheet, reference).unwrap().contains("t=\"s\""));
        }
        assert!(cell(&sheet, "A3").unwrap().ends_with("<v>10</v>"));
        assert!(cell(&sheet, "B3").unwrap().ends_with("<v>12</v>"));
        assert!(!sheet.contains("r=\"A4\""));
        let strings = part(&encoded.bytes, "xl/sharedStrings.xml");
        assert!(strings.contains(">site=A<"));
        assert!(strings.contains(">temp<"));
    }

    #[test]
    fn test_empty_table() {
        let encoded = XlsxEncoder::new().encode(&Table::empty().into()).unwrap();
        assert_eq!(&encoded.bytes[0..2], b"PK");
    }

    #[test]
    fn test_columns_past_the_sheet_limit_fail() {
        let mut header = vec![String::new(); 65_537];
        header[65_536] = "x".to_string();
        let grid = Grid {
            header: vec![header],
            body: Vec::new(),
            leading: 0,
        };
        let formats = Formats {
            header: Format::new().set_bold(),
            timestamp: Format::new(),
        };
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        assert!(write_sheet(sheet, "wide", &grid, &formats).is_err());
    }

    #[test]
    fn test_oversized_text_fails_whole_document() {
        let table = build(&[Record::new().with("t", "x".repeat(40_000))], None).unwrap();
        let err = XlsxEncoder::new().encode(&table.into()).unwrap_err();
        assert!(matches!(err, DatacastError::Encode { .. }));
    }
}
