use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, Rgba, RgbaImage};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::charts::{ChartData, ChartKind, ChartPanel};
use crate::dataset::Dataset;
use crate::domain::DashboardError;
use crate::theme::Palette;

pub const CSV_EXPORT_FILE: &str = "datapulse_export.csv";
pub const JSON_EXPORT_FILE: &str = "datapulse_export.json";
pub const CHART_EXPORT_FILE: &str = "datapulse_chart.png";

pub const CHART_WIDTH: u32 = 800;
pub const CHART_HEIGHT: u32 = 400;

fn quote_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// CSV of the given rows restricted to the given columns.
pub fn to_csv(dataset: &Dataset, rows: &[usize], columns: &[usize]) -> Result<String, DashboardError> {
    if rows.is_empty() {
        return Err(DashboardError::NoData);
    }
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        columns
            .iter()
            .map(|&c| quote_csv_field(&dataset.columns()[c]))
            .collect::<Vec<_>>()
            .join(","),
    );
    for &row in rows {
        lines.push(
            columns
                .iter()
                .map(|&c| quote_csv_field(&dataset.value(row, c).to_string()))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    Ok(lines.join("\n"))
}

/// Pretty printed JSON array of row objects restricted to the given columns.
pub fn to_json(dataset: &Dataset, rows: &[usize], columns: &[usize]) -> Result<String, DashboardError> {
    if rows.is_empty() {
        return Err(DashboardError::NoData);
    }
    let records: Vec<serde_json::Value> = rows
        .iter()
        .map(|&row| {
            let obj: serde_json::Map<String, serde_json::Value> = columns
                .iter()
                .map(|&c| (dataset.columns()[c].clone(), dataset.value(row, c).to_json()))
                .collect();
            serde_json::Value::Object(obj)
        })
        .collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

pub fn write_export(dir: &Path, file_name: &str, content: &[u8]) -> Result<PathBuf, DashboardError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    fs::write(&path, content)?;
    info!("Exported {} bytes to {:?}", content.len(), path);
    Ok(path)
}

fn rgba(rgb: [u8; 3]) -> Rgba<u8> {
    Rgba([rgb[0], rgb[1], rgb[2], 255])
}

struct Canvas {
    img: RgbaImage,
}

impl Canvas {
    fn new(width: u32, height: u32, background: Rgba<u8>) -> Self {
        Self {
            img: RgbaImage::from_pixel(width, height, background),
        }
    }

    fn plot(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.img.width() && (y as u32) < self.img.height() {
            self.img.put_pixel(x as u32, y as u32, color);
        }
    }

    // Bresenham
    fn line(&mut self, (x0, y0): (i64, i64), (x1, y1): (i64, i64), color: Rgba<u8>) {
        let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
        let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            self.plot(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn rect(&mut self, (x0, y0): (i64, i64), (x1, y1): (i64, i64), color: Rgba<u8>) {
        for y in y0.min(y1)..=y0.max(y1) {
            for x in x0.min(x1)..=x0.max(x1) {
                self.plot(x, y, color);
            }
        }
    }
}

/// Rasterize a chart panel into PNG bytes.
pub fn render_chart_png(
    panel: &ChartPanel,
    palette: &Palette,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, DashboardError> {
    let margin = 40i64;
    let (w, h) = (width as i64, height as i64);
    let mut canvas = Canvas::new(width, height, rgba(palette.background));
    let grid = rgba(palette.grid);
    let color = rgba(palette.series[0]);

    let (x0, x1, y0, y1) = (margin, w - margin, h - margin, margin);
    for i in 0..=4 {
        let y = y0 + (y1 - y0) * i / 4;
        canvas.line((x0, y), (x1, y), grid);
    }
    canvas.line((x0, y0), (x0, y1), rgba(palette.muted));

    let (min, max) = panel.data.value_bounds().unwrap_or((0.0, 1.0));
    let (min, max) = (min.min(0.0), if max > min { max } else { min + 1.0 });
    let scale_y = |v: f64| y0 - ((v - min) / (max - min) * (y0 - y1) as f64).round() as i64;

    match &panel.data {
        ChartData::Categories { values, .. } => {
            let n = values.len().max(1) as i64;
            let step = (x1 - x0) / n.max(2).saturating_sub(1).max(1);
            let xs = |i: usize| {
                if n == 1 { (x0 + x1) / 2 } else { x0 + step * i as i64 }
            };
            match panel.kind {
                ChartKind::Bar | ChartKind::HorizontalBar => {
                    let bar = ((x1 - x0) / n / 2).max(1);
                    for (i, v) in values.iter().enumerate() {
                        if let Some(v) = v {
                            let cx = x0 + (x1 - x0) * (2 * i as i64 + 1) / (2 * n);
                            canvas.rect((cx - bar / 2, y0), (cx + bar / 2, scale_y(*v)), color);
                        }
                    }
                }
                _ => {
                    let mut previous: Option<(i64, i64)> = None;
                    for (i, v) in values.iter().enumerate() {
                        let Some(v) = v else {
                            previous = None;
                            continue;
                        };
                        let point = (xs(i), scale_y(*v));
                        if panel.kind == ChartKind::Area {
                            canvas.line((point.0, y0), point, grid);
                        }
                        if let Some(prev) = previous {
                            canvas.line(prev, point, color);
                        }
                        canvas.rect((point.0 - 2, point.1 - 2), (point.0 + 2, point.1 + 2), color);
                        previous = Some(point);
                    }
                }
            }
        }
        ChartData::Points(points) => {
            let (xmin, xmax) = points
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.0), hi.max(p.0)));
            let span = if xmax > xmin { xmax - xmin } else { 1.0 };
            for &(x, y) in points {
                let px = x0 + ((x - xmin) / span * (x1 - x0) as f64).round() as i64;
                let py = scale_y(y);
                canvas.rect((px - 2, py - 2), (px + 2, py + 2), rgba(palette.series[1]));
            }
        }
    }

    let mut bytes = Vec::new();
    canvas
        .img
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
