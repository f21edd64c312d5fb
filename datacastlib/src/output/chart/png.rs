//! PNG rendering of a chart: lines and markers rasterized onto an RGBA
//! canvas. Raster output carries no text, so the legend is color swatches
//! only.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use kurbo::{Line, ParamCurve, Point, Rect};

use crate::error::DatacastError;
use crate::Result;

use super::{ChartData, Frame};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const AXIS: Rgba<u8> = Rgba([0x44, 0x44, 0x44, 255]);
const GRID: Rgba<u8> = Rgba([0xdd, 0xdd, 0xdd, 255]);

pub(super) fn render(data: &ChartData, frame: &Frame) -> Result<Vec<u8>> {
    let mut canvas = RgbaImage::from_pixel(frame.width, frame.height, WHITE);
    let plot = frame.plot;

    for (y, _) in frame.y_ticks() {
        draw_line(&mut canvas, Line::new((plot.x0, y), (plot.x1, y)), GRID, 0);
    }
    draw_line(&mut canvas, Line::new((plot.x0, plot.y0), (plot.x0, plot.y1)), AXIS, 0);
    draw_line(&mut canvas, Line::new((plot.x0, plot.y1), (plot.x1, plot.y1)), AXIS, 0);
    for (x, _) in frame.x_ticks(&data.x_axis) {
        draw_line(&mut canvas, Line::new((x, plot.y1), (x, plot.y1 + 4.0)), AXIS, 0);
    }

    for series in &data.series {
        let color = Rgba([series.color[0], series.color[1], series.color[2], 255]);
        let points: Vec<Point> = series.points.iter().map(|&(x, y)| frame.map(x, y)).collect();
        for pair in points.windows(2) {
            draw_line(&mut canvas, Line::new(pair[0], pair[1]), color, 1);
        }
        for p in &points {
            fill_rect(&mut canvas, Rect::from_center_size(*p, (5.0, 5.0)), color);
        }
    }

    for (i, series) in data.series.iter().enumerate() {
        let origin = Point::new(plot.x1 - 14.0, plot.y0 + 4.0 + 14.0 * i as f64);
        let color = Rgba([series.color[0], series.color[1], series.color[2], 255]);
        fill_rect(&mut canvas, Rect::from_origin_size(origin, (10.0, 10.0)), color);
    }

    let mut bytes = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| DatacastError::encode("png", e))?;
    Ok(bytes)
}

fn put(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(canvas.width()) && y < i64::from(canvas.height()) {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

/// Plot `line` by sampling it once per pixel of its longer extent; `radius`
/// thickens it into a square brush.
fn draw_line(canvas: &mut RgbaImage, line: Line, color: Rgba<u8>, radius: i64) {
    let extent = (line.p1.x - line.p0.x).abs().max((line.p1.y - line.p0.y).abs());
    let steps = extent.ceil().max(1.0) as usize;
    for step in 0..=steps {
        let p = line.eval(step as f64 / steps as f64);
        let (cx, cy) = (p.x.round() as i64, p.y.round() as i64);
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                put(canvas, cx + dx, cy + dy, color);
            }
        }
    }
}

fn fill_rect(canvas: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    let rect = rect.round();
    for y in rect.y0 as i64..rect.y1 as i64 {
        for x in rect.x0 as i64..rect.x1 as i64 {
            put(canvas, x, y, color);
        }
    }
}
