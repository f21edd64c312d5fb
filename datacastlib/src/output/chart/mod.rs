//! Line charts from tables, as SVG or PNG.
//!
//! The first non-index column is the X axis and every other column is a
//! numeric series. Multi-table sets contribute one series per column per
//! table, labelled with the discriminator. Tables that cannot be plotted
//! (header depth above two, non-numeric series) fail with
//! `UnsupportedShape` rather than producing a blank image.

mod png;
mod svg;

use chrono::DateTime;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{Column, ColumnKind, TableSet, Value};
use crate::envelope::series_prefix;
use crate::error::DatacastError;
use crate::Result;

use super::{Encoded, Encoder, PNG, SVG};

/// Series colors, cycled.
const PALETTE: &[[u8; 3]] = &[
    [0x1f, 0x77, 0xb4],
    [0xff, 0x7f, 0x0e],
    [0x2c, 0xa0, 0x2c],
    [0xd6, 0x27, 0x28],
    [0x94, 0x67, 0xbd],
    [0x8c, 0x56, 0x4b],
    [0xe3, 0x77, 0xc2],
    [0x7f, 0x7f, 0x7f],
    [0xbc, 0xbd, 0x22],
    [0x17, 0xbe, 0xcf],
];

const TICKS: usize = 5;
const MAX_CATEGORY_TICKS: usize = 12;

/// Output image size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 400,
        }
    }
}

/// Which image format a [`ChartEncoder`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Svg,
    Png,
}

/// Writes `image/svg+xml` or `image/png` line charts.
#[derive(Debug, Clone)]
pub struct ChartEncoder {
    kind: ChartKind,
    options: ChartOptions,
}

impl ChartEncoder {
    pub fn new(kind: ChartKind, options: ChartOptions) -> Self {
        Self { kind, options }
    }

    pub fn svg(options: ChartOptions) -> Self {
        Self::new(ChartKind::Svg, options)
    }

    pub fn png(options: ChartOptions) -> Self {
        Self::new(ChartKind::Png, options)
    }
}

impl Encoder for ChartEncoder {
    fn format_id(&self) -> &str {
        match self.kind {
            ChartKind::Svg => "svg",
            ChartKind::Png => "png",
        }
    }

    fn content_type(&self) -> &str {
        match self.kind {
            ChartKind::Svg => SVG,
            ChartKind::Png => PNG,
        }
    }

    fn encode(&self, tables: &TableSet) -> Result<Encoded> {
        let data = ChartData::from_set(tables, self.format_id())?;
        let frame = Frame::new(&data, self.options);
        let bytes = match self.kind {
            ChartKind::Svg => svg::render(&data, &frame).into_bytes(),
            ChartKind::Png => png::render(&data, &frame)?,
        };
        debug!(
            format = self.format_id(),
            series = data.series.len(),
            bytes = bytes.len(),
            "encoded chart"
        );
        Ok(Encoded::new(self.content_type(), bytes))
    }
}

/// How X values map onto the axis.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum XAxis {
    Numeric,
    /// Seconds since the Unix epoch
    Time,
    /// Distinct labels in first-seen order, plotted at their position
    Category(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Series {
    pub label: String,
    pub color: [u8; 3],
    pub points: Vec<(f64, f64)>,
}

/// Everything a renderer needs, in data coordinates.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ChartData {
    pub x_axis: XAxis,
    pub series: Vec<Series>,
}

impl ChartData {
    pub(crate) fn from_set(set: &TableSet, format: &str) -> Result<Self> {
        let unsupported = |message: String| DatacastError::UnsupportedShape {
            format: format.to_string(),
            message,
        };

        for table in set.tables() {
            if table.depth() > 2 {
                return Err(unsupported(format!(
                    "header depth {} is deeper than 2",
                    table.depth()
                )));
            }
            if let Some(column) = table
                .columns()
                .iter()
                .skip(1)
                .find(|c| !(c.kind().is_numeric() || c.kind() == ColumnKind::Empty))
            {
                return Err(unsupported(format!(
                    "series column {} is not numeric",
                    column.path()
                )));
            }
        }

        let x_columns: Vec<&Column> = set.tables().filter_map(|t| t.columns().first()).collect();
        let x_axis = x_axis_for(&x_columns);

        let mut series = Vec::new();
        for (position, table) in set.tables().enumerate() {
            let Some((x, rest)) = table.columns().split_first() else {
                continue;
            };
            let xs: Vec<Option<f64>> = x.values().iter().map(|v| x_axis.position(v)).collect();
            for column in rest {
                let name = column.path().joined(" / ");
                let label = match series_prefix(set, position) {
                    Some(prefix) => format!("{prefix}: {name}"),
                    None => name,
                };
                let points = xs
                    .iter()
                    .zip(column.values())
                    .filter_map(|(x, y)| Some(((*x)?, y.as_f64().filter(|v| v.is_finite())?)))
                    .collect();
                series.push(Series {
                    label,
                    color: PALETTE[series.len() % PALETTE.len()],
                    points,
                });
            }
        }

        Ok(Self { x_axis, series })
    }

    fn points(&self) -> impl Iterator<Item = &(f64, f64)> {
        self.series.iter().flat_map(|s| s.points.iter())
    }
}

fn x_axis_for(columns: &[&Column]) -> XAxis {
    let kinds = || {
        columns
            .iter()
            .map(|c| c.kind())
            .filter(|k| *k != ColumnKind::Empty)
    };
    if kinds().all(ColumnKind::is_numeric) {
        return XAxis::Numeric;
    }
    if kinds().all(|k| k == ColumnKind::Timestamp) {
        return XAxis::Time;
    }
    let mut labels: Vec<String> = Vec::new();
    for value in columns.iter().flat_map(|c| c.values()) {
        let label = value.to_field();
        if !value.is_missing() && !labels.contains(&label) {
            labels.push(label);
        }
    }
    XAxis::Category(labels)
}

impl XAxis {
    fn position(&self, value: &Value) -> Option<f64> {
        match (self, value) {
            (_, Value::Missing) => None,
            (XAxis::Numeric, v) => v.as_f64().filter(|x| x.is_finite()),
            (XAxis::Time, Value::Timestamp(ts)) => {
                Some(ts.and_utc().timestamp_millis() as f64 / 1000.0)
            }
            (XAxis::Time, _) => None,
            (XAxis::Category(labels), v) => {
                let label = v.to_field();
                labels.iter().position(|l| *l == label).map(|p| p as f64)
            }
        }
    }

    fn tick_label(&self, x: f64) -> String {
        match self {
            XAxis::Numeric => number_label(x),
            XAxis::Time => DateTime::from_timestamp(x.round() as i64, 0)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            XAxis::Category(labels) => labels
                .get(x.round() as usize)
                .cloned()
                .unwrap_or_default(),
        }
    }
}

fn number_label(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

/// Pixel layout: plot area and data-to-pixel mapping.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Frame {
    pub width: u32,
    pub height: u32,
    pub plot: Rect,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Frame {
    pub(crate) fn new(data: &ChartData, options: ChartOptions) -> Self {
        let width = options.width.max(64);
        let height = options.height.max(64);
        let plot = Rect::new(56.0, 16.0, f64::from(width) - 16.0, f64::from(height) - 32.0);

        let x_range = match &data.x_axis {
            XAxis::Category(labels) => (-0.5, labels.len().max(1) as f64 - 0.5),
            _ => padded_range(data.points().map(|p| p.0)),
        };
        let y_range = padded_range(data.points().map(|p| p.1));
        Self {
            width,
            height,
            plot,
            x_range,
            y_range,
        }
    }

    /// Pixel position of a data point.
    pub(crate) fn map(&self, x: f64, y: f64) -> Point {
        let (x0, x1) = self.x_range;
        let (y0, y1) = self.y_range;
        Point::new(
            self.plot.x0 + (x - x0) / (x1 - x0) * self.plot.width(),
            self.plot.y1 - (y - y0) / (y1 - y0) * self.plot.height(),
        )
    }

    /// Y tick positions (pixels) and labels.
    pub(crate) fn y_ticks(&self) -> Vec<(f64, String)> {
        linear_ticks(self.y_range)
            .into_iter()
            .map(|y| (self.map(self.x_range.0, y).y, number_label(y)))
            .collect()
    }

    /// X tick positions (pixels) and labels.
    pub(crate) fn x_ticks(&self, axis: &XAxis) -> Vec<(f64, String)> {
        let positions: Vec<f64> = match axis {
            XAxis::Category(labels) => {
                let step = labels.len().div_ceil(MAX_CATEGORY_TICKS).max(1);
                (0..labels.len()).step_by(step).map(|i| i as f64).collect()
            }
            _ => linear_ticks(self.x_range),
        };
        positions
            .into_iter()
            .map(|x| (self.map(x, self.y_range.0).x, axis.tick_label(x)))
            .collect()
    }
}

/// Min/max of `values`, widened so the range is never empty.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        (0.0, 1.0)
    } else if lo == hi {
        (lo - 1.0, hi + 1.0)
    } else {
        (lo, hi)
    }
}

fn linear_ticks((lo, hi): (f64, f64)) -> Vec<f64> {
    (0..TICKS)
        .map(|i| lo + (hi - lo) * i as f64 / (TICKS - 1) as f64)
        .collect()
}

pub(crate) fn hex(color: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{build, Record, Table};
    use chrono::NaiveDate;

    fn series_table() -> Table {
        build(
            &[
                Record::new().with("x", 1).with("a", 2).with("b", 1.5),
                Record::new().with("x", 2).with("a", 4).with("b", Value::Missing),
            ],
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_series_extraction() {
        let data = ChartData::from_set(&series_table().into(), "svg").unwrap();
        assert_eq!(data.x_axis, XAxis::Numeric);
        assert_eq!(data.series.len(), 2);
        assert_eq!(data.series[0].label, "a");
        assert_eq!(data.series[0].points, vec![(1.0, 2.0), (2.0, 4.0)]);
        assert_eq!(data.series[1].points, vec![(1.0, 1.5)]);
        assert_ne!(data.series[0].color, data.series[1].color);
    }

    #[test]
    fn test_multi_table_series_are_labelled() {
        let set = TableSet::labelled([("site=A", series_table()), ("site=B", series_table())])
            .unwrap();
        let data = ChartData::from_set(&set, "png").unwrap();
        let labels: Vec<_> = data.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["site=A: a", "site=A: b", "site=B: a", "site=B: b"]);
    }

    #[test]
    fn test_text_series_is_unsupported() {
        let table = build(&[Record::new().with("x", 1).with("name", "n")], None).unwrap();
        match ChartData::from_set(&table.into(), "svg").unwrap_err() {
            DatacastError::UnsupportedShape { format, message } => {
                assert_eq!(format, "svg");
                assert!(message.contains("name"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_deep_headers_are_unsupported() {
        let table = Table::new(
            vec![crate::data::Column::new(["a", "b", "c"], vec![Value::from(1)])],
            None,
        )
        .unwrap();
        assert!(matches!(
            ChartData::from_set(&table.into(), "png"),
            Err(DatacastError::UnsupportedShape { .. })
        ));
    }

    #[test]
    fn test_category_and_time_axes() {
        let table = build(
            &[
                Record::new().with("day", "mon").with("v", 1),
                Record::new().with("day", "tue").with("v", 2),
            ],
            None,
        )
        .unwrap();
        let data = ChartData::from_set(&table.into(), "svg").unwrap();
        assert_eq!(
            data.x_axis,
            XAxis::Category(vec!["mon".to_string(), "tue".to_string()])
        );
        assert_eq!(data.series[0].points, vec![(0.0, 1.0), (1.0, 2.0)]);

        let ts = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let table = build(&[Record::new().with("t", ts).with("v", 1)], None).unwrap();
        let data = ChartData::from_set(&table.into(), "svg").unwrap();
        assert_eq!(data.x_axis, XAxis::Time);
        assert_eq!(data.series[0].points, vec![(1_577_836_800.0, 1.0)]);
        assert_eq!(XAxis::Time.tick_label(1_577_836_800.0), "2020-01-01");
    }

    #[test]
    fn test_frame_maps_into_plot_area() {
        let data = ChartData::from_set(&series_table().into(), "svg").unwrap();
        let frame = Frame::new(&data, ChartOptions::default());
        let low = frame.map(1.0, 1.5);
        let high = frame.map(2.0, 4.0);
        assert_eq!(low, Point::new(frame.plot.x0, frame.plot.y1));
        assert_eq!(high, Point::new(frame.plot.x1, frame.plot.y0));
        assert_eq!(frame.y_ticks().len(), 5);
    }

    #[test]
    fn test_empty_table_has_no_series() {
        let data = ChartData::from_set(&Table::empty().into(), "svg").unwrap();
        assert!(data.series.is_empty());
        let frame = Frame::new(&data, ChartOptions::default());
        assert_eq!(frame.x_ticks(&data.x_axis).len(), 5);
    }
}
