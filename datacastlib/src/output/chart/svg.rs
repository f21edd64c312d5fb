//! SVG rendering of a chart, built as a string.

use kurbo::{BezPath, Circle, Shape};

use crate::output::escape_xml;

use super::{hex, ChartData, Frame};

const AXIS: &str = "#444444";
const FONT_SIZE: f64 = 11.0;

pub(super) fn render(data: &ChartData, frame: &Frame) -> String {
    let mut out = String::new();
    let plot = frame.plot;

    out.push_str(r#"<svg xmlns="http://www.w3.org/2000/svg" "#);
    out.push_str(&format!(
        r#"viewBox="0 0 {w} {h}" width="{w}" height="{h}">"#,
        w = frame.width,
        h = frame.height
    ));
    out.push('\n');
    out.push_str(&format!(
        r##"<rect x="0" y="0" width="{}" height="{}" fill="#ffffff"/>"##,
        frame.width, frame.height
    ));
    out.push('\n');

    let mut axes = BezPath::new();
    axes.move_to((plot.x0, plot.y0));
    axes.line_to((plot.x0, plot.y1));
    axes.line_to((plot.x1, plot.y1));
    out.push_str(&format!(
        r#"<path d="{}" fill="none" stroke="{AXIS}" stroke-width="1"/>"#,
        axes.to_svg()
    ));
    out.push('\n');

    for (y, label) in frame.y_ticks() {
        out.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" font-size="{FONT_SIZE}" text-anchor="end" dominant-baseline="middle" fill="{AXIS}">{}</text>"#,
            plot.x0 - 6.0,
            y,
            escape_xml(&label)
        ));
        out.push('\n');
    }
    for (x, label) in frame.x_ticks(&data.x_axis) {
        out.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" font-size="{FONT_SIZE}" text-anchor="middle" dominant-baseline="hanging" fill="{AXIS}">{}</text>"#,
            x,
            plot.y1 + 6.0,
            escape_xml(&label)
        ));
        out.push('\n');
    }

    for series in &data.series {
        let color = hex(series.color);
        let mut line = BezPath::new();
        for (i, &(x, y)) in series.points.iter().enumerate() {
            let p = frame.map(x, y);
            if i == 0 {
                line.move_to(p);
            } else {
                line.line_to(p);
            }
        }
        if series.points.len() > 1 {
            out.push_str(&format!(
                r#"<path d="{}" fill="none" stroke="{color}" stroke-width="2"/>"#,
                line.to_svg()
            ));
            out.push('\n');
        }
        for &(x, y) in &series.points {
            let marker = Circle::new(frame.map(x, y), 2.5);
            out.push_str(&format!(
                r#"<path d="{}" fill="{color}"/>"#,
                marker.to_path(0.1).to_svg()
            ));
            out.push('\n');
        }
    }

    for (i, series) in data.series.iter().enumerate() {
        let x = plot.x1 - 140.0;
        let y = plot.y0 + 4.0 + 16.0 * i as f64;
        out.push_str(&format!(
            r#"<rect x="{x:.1}" y="{y:.1}" width="10" height="10" fill="{}"/>"#,
            hex(series.color)
        ));
        out.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" font-size="{FONT_SIZE}" dominant-baseline="middle" fill="{AXIS}">{}</text>"#,
            x + 14.0,
            y + 5.0,
            escape_xml(&series.label)
        ));
        out.push('\n');
    }

    out.push_str("</svg>\n");
    out
}

#[cfg(test)]
mod tests {
    use crate::data::{build, Record, Table, TableSet};
    use crate::output::{ChartEncoder, ChartOptions, Encoder};

    fn render(set: &TableSet) -> String {
        let encoded = ChartEncoder::svg(ChartOptions::default()).encode(set).unwrap();
        assert_eq!(encoded.content_type, "image/svg+xml");
        String::from_utf8(encoded.bytes).unwrap()
    }

    #[test]
    fn test_svg_document() {
        let table = build(
            &[
                Record::new().with("x", 1).with("temp & rain", 2),
                Record::new().with("x", 2).with("temp & rain", 5),
            ],
            None,
        )
        .unwrap();
        let svg = render(&table.into());
        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(svg.contains("width=\"640\" height=\"400\""));
        assert!(svg.contains("stroke=\"#1f77b4\""));
        assert!(svg.contains("temp &amp; rain"));
        assert!(svg.ends_with("</svg>\n"));
    }

    #[test]
    fn test_svg_is_deterministic() {
        let table = build(&[Record::new().with("x", 1).with("y", 2)], None).unwrap();
        let set: TableSet = table.into();
        assert_eq!(render(&set), render(&set));
    }

    #[test]
    fn test_empty_chart() {
        let svg = render(&Table::empty().into());
        assert!(svg.contains("<rect"));
        assert!(!svg.contains("stroke-width=\"2\""));
    }
}
