use std::path::Path;

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};

use crate::content::{ChartKind, ChartSpec};

// 6x4in canvas at 100dpi
const WIDTH: u32 = 600;
const HEIGHT: u32 = 400;
const MARGIN: u32 = 40;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([224, 224, 224]);
const AXIS: Rgb<u8> = Rgb([117, 117, 117]);

const SERIES_COLORS: [Rgb<u8>; 6] = [
    Rgb([0x42, 0x85, 0xF4]),
    Rgb([0xEA, 0x43, 0x35]),
    Rgb([0xFB, 0xBC, 0x05]),
    Rgb([0x34, 0xA8, 0x53]),
    Rgb([0xA1, 0x42, 0xF4]),
    Rgb([0xF4, 0x7C, 0x42]),
];

/// Rasterize a chart spec to a PNG at `path`. Rendering is pure: the same
/// spec always produces the same bytes. Labels stay on the slide text, the
/// image carries the shapes.
pub fn render_chart(spec: &ChartSpec, path: &Path) -> Result<()> {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);

    match spec.kind {
        ChartKind::Bar => draw_bar(&mut img, spec),
        ChartKind::Pie => draw_pie(&mut img, spec),
    }

    img.save(path)
        .with_context(|| format!("failed to write chart to {}", path.display()))?;
    Ok(())
}

fn series_of(spec: &ChartSpec) -> Vec<Vec<f64>> {
    if !spec.datasets.is_empty() {
        spec.datasets.iter().map(|d| d.data.clone()).collect()
    } else {
        vec![spec.values.clone()]
    }
}

fn draw_bar(img: &mut RgbImage, spec: &ChartSpec) {
    let series = series_of(spec);
    let groups = series.iter().map(|s| s.len()).max().unwrap_or(0);

    let left = MARGIN;
    let right = WIDTH - MARGIN;
    let top = MARGIN;
    let bottom = HEIGHT - MARGIN;

    // horizontal gridlines at quarters, then the baseline
    for step in 1..=3 {
        let y = top + (bottom - top) * step / 4;
        fill_rect(img, left, y, right, y + 1, GRID);
    }
    fill_rect(img, left, bottom, right, bottom + 2, AXIS);

    if groups == 0 {
        return;
    }

    let max_value = series
        .iter()
        .flatten()
        .copied()
        .fold(0.0_f64, f64::max)
        .max(1e-9);

    let plot_width = (right - left) as f64;
    let plot_height = (bottom - top) as f64;
    let group_width = plot_width / groups as f64;
    let bar_width = group_width * 0.8 / series.len() as f64;

    for (series_idx, values) in series.iter().enumerate() {
        let color = SERIES_COLORS[series_idx % SERIES_COLORS.len()];
        for (group_idx, &value) in values.iter().enumerate() {
            let height = (value.max(0.0) / max_value * plot_height).round() as u32;
            if height == 0 {
                continue;
            }
            let x0 = left as f64
                + group_idx as f64 * group_width
                + group_width * 0.1
                + series_idx as f64 * bar_width;
            let x1 = x0 + bar_width;
            fill_rect(
                img,
                x0.round() as u32,
                bottom - height,
                x1.round() as u32,
                bottom,
                color,
            );
        }
    }
}

fn draw_pie(img: &mut RgbImage, spec: &ChartSpec) {
    let values: Vec<f64> = if !spec.values.is_empty() {
        spec.values.clone()
    } else {
        spec.datasets
            .first()
            .map(|d| d.data.clone())
            .unwrap_or_default()
    };

    let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
    if total <= 0.0 {
        return;
    }

    // slice boundaries as cumulative fractions of the circle
    let mut boundaries = Vec::with_capacity(values.len());
    let mut cumulative = 0.0;
    for value in &values {
        cumulative += value.max(0.0) / total;
        boundaries.push(cumulative);
    }

    let cx = WIDTH as f64 / 2.0;
    let cy = HEIGHT as f64 / 2.0;
    let radius = (HEIGHT.min(WIDTH) / 2 - MARGIN) as f64;

    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            // clockwise angle from 12 o'clock, in turns
            let mut angle = dx.atan2(-dy) / std::f64::consts::TAU;
            if angle < 0.0 {
                angle += 1.0;
            }
            let slice = boundaries
                .iter()
                .position(|&b| angle < b)
                .unwrap_or(values.len() - 1);
            img.put_pixel(x, y, SERIES_COLORS[slice % SERIES_COLORS.len()]);
        }
    }
}

fn fill_rect(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    for y in y0..y1.min(HEIGHT) {
        for x in x0..x1.min(WIDTH) {
            img.put_pixel(x, y, color);
        }
    }
}
