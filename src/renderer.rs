// src/renderer.rs

use crate::error::{MinerError, Result};
use crate::model::tag_key;
use crate::reporter::{Report, TrendPoint, VersionBreakdown};
use image::{Rgb, RgbImage};
use indicatif::{ParallelProgressIterator, ProgressBar};
use palette::{FromColor, Lch, LinSrgb, Srgb};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const BACKGROUND: Rgb<u8> = Rgb([8, 8, 12]);
const AXIS: Rgb<u8> = Rgb([90, 90, 100]);
const NO_DATA: Rgb<u8> = Rgb([120, 120, 120]);
const MARGIN: u32 = 32;
const MARKER_RADIUS: i64 = 5;

pub const TREND_FILE: &str = "trend.png";
const VERSION_CHART_PREFIX: &str = "version-";

/// File name of the breakdown chart for `version`; never collides with [`TREND_FILE`].
pub fn version_chart_file(version: &str) -> String {
    format!("{}{}.png", VERSION_CHART_PREFIX, tag_key(version))
}

/// Renders one bar chart per version plus the trend chart into `dir` and
/// returns the written paths. Per-version charts are independent and drawn
/// in parallel.
pub fn render_charts(report: &Report, dir: &Path, width: u32, height: u32) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| MinerError::io(dir, e))?;

    let categories = report.categories();
    let palette = generate_category_colors(&categories);

    let bar = ProgressBar::new(report.breakdowns.len() as u64);
    bar.set_message("Rendering charts");

    let mut written: Vec<PathBuf> = report
        .breakdowns
        .par_iter()
        .progress_with(bar)
        .map(|breakdown| {
            let path = dir.join(version_chart_file(&breakdown.version));
            let image = render_breakdown(breakdown, &palette, width, height);
            save(&image, &path).map(|()| path)
        })
        .collect::<Result<Vec<_>>>()?;

    let trend_path = dir.join(TREND_FILE);
    save(&render_trend(&report.trend, width, height), &trend_path)?;
    written.push(trend_path);
    Ok(written)
}

fn save(image: &RgbImage, path: &Path) -> Result<()> {
    image.save(path).map_err(|source| MinerError::Chart {
        path: path.to_path_buf(),
        source,
    })
}

/// Horizontal bars, one per category, most frequent on top.
pub fn render_breakdown(
    breakdown: &VersionBreakdown,
    palette: &HashMap<String, Rgb<u8>>,
    width: u32,
    height: u32,
) -> RgbImage {
    let mut image = RgbImage::from_pixel(width, height, BACKGROUND);
    draw_axes(&mut image);

    let rows = breakdown.categories.len() as u32;
    let max = breakdown.categories.iter().map(|(_, n)| *n).max().unwrap_or(0);
    if rows == 0 || max == 0 {
        return image;
    }

    let plot_width = width - 2 * MARGIN;
    let row_height = ((height - 2 * MARGIN) / rows).max(1);
    let gap = row_height / 5;

    for (row, (category, count)) in breakdown.categories.iter().enumerate() {
        let top = MARGIN + row as u32 * row_height;
        let length = ((*count as f32 / max as f32) * plot_width as f32).round().max(1.0) as u32;
        let color = palette.get(category).copied().unwrap_or(AXIS);
        fill_rect(&mut image, MARGIN + 1, top + gap, length, row_height.saturating_sub(2 * gap).max(1), color);
    }
    image
}

/// Totals per version, left to right in version order. Versions without
/// data are grey hollow markers on the baseline and break the line.
pub fn render_trend(trend: &[TrendPoint], width: u32, height: u32) -> RgbImage {
    let mut image = RgbImage::from_pixel(width, height, BACKGROUND);
    draw_axes(&mut image);
    if trend.is_empty() {
        return image;
    }

    let max = trend.iter().filter_map(|p| p.total).max().unwrap_or(0).max(1);
    let plot_width = (width - 2 * MARGIN) as f32;
    let plot_height = (height - 2 * MARGIN) as f32;
    let baseline = (height - MARGIN) as i64;
    let step = if trend.len() > 1 { plot_width / (trend.len() - 1) as f32 } else { 0.0 };

    let positions: Vec<(i64, Option<i64>)> = trend
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let x = MARGIN as i64 + (i as f32 * step).round() as i64;
            let y = point
                .total
                .map(|t| baseline - ((t as f32 / max as f32) * plot_height).round() as i64);
            (x, y)
        })
        .collect();

    for pair in positions.windows(2) {
        if let [(x0, Some(y0)), (x1, Some(y1))] = pair {
            draw_line(&mut image, (*x0, *y0), (*x1, *y1), AXIS);
        }
    }

    for (point, (x, y)) in trend.iter().zip(&positions) {
        match (point.total, y) {
            (Some(total), Some(y)) => {
                let color = heat_to_color(total as f32 / max as f32);
                draw_marker(&mut image, *x, *y, color, true);
            }
            _ => draw_marker(&mut image, *x, baseline, NO_DATA, false),
        }
    }
    image
}

fn draw_axes(image: &mut RgbImage) {
    let (width, height) = image.dimensions();
    let bottom = (height - MARGIN) as i64;
    draw_line(image, (MARGIN as i64, MARGIN as i64), (MARGIN as i64, bottom), AXIS);
    draw_line(image, (MARGIN as i64, bottom), ((width - MARGIN) as i64, bottom), AXIS);
}

fn put(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    let (width, height) = image.dimensions();
    if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
        image.put_pixel(x as u32, y as u32, color);
    }
}

fn fill_rect(image: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    for dy in 0..h {
        for dx in 0..w {
            put(image, (x + dx) as i64, (y + dy) as i64, color);
        }
    }
}

fn draw_line(image: &mut RgbImage, (x0, y0): (i64, i64), (x1, y1): (i64, i64), color: Rgb<u8>) {
    let steps = (x1 - x0).abs().max((y1 - y0).abs()).max(1);
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let x = x0 as f32 + (x1 - x0) as f32 * t;
        let y = y0 as f32 + (y1 - y0) as f32 * t;
        put(image, x.round() as i64, y.round() as i64, color);
    }
}

fn draw_marker(image: &mut RgbImage, cx: i64, cy: i64, color: Rgb<u8>, filled: bool) {
    let r2 = MARKER_RADIUS * MARKER_RADIUS;
    for dy in -MARKER_RADIUS..=MARKER_RADIUS {
        for dx in -MARKER_RADIUS..=MARKER_RADIUS {
            let d2 = dx * dx + dy * dy;
            let on_ring = d2 <= r2 && d2 >= (MARKER_RADIUS - 1) * (MARKER_RADIUS - 1);
            if (filled && d2 <= r2) || on_ring {
                put(image, cx + dx, cy + dy, color);
            }
        }
    }
}

// Blue-to-Orange gradient; `heat` is the share of the largest total, 0..=1
fn heat_to_color(heat: f32) -> Rgb<u8> {
    let lch_colors = [
        Lch::new(40.0f32, 40.0f32, 260.0f32), // Blue
        Lch::new(95.0f32, 35.0f32, 90.0f32),  // Light Yellow
        Lch::new(75.0f32, 80.0f32, 50.0f32),  // Orange
        Lch::new(65.0f32, 100.0f32, 30.0f32), // Red-Orange
    ];
    let gradient_stops: Vec<LinSrgb<f32>> = lch_colors.into_iter().map(LinSrgb::from_color).collect();

    let scaled_pos = heat.clamp(0.0, 1.0) * (gradient_stops.len() - 1) as f32;
    let idx1 = scaled_pos.floor() as usize;
    let idx2 = (idx1 + 1).min(gradient_stops.len() - 1);
    let t = scaled_pos.fract();

    let c1 = gradient_stops[idx1];
    let c2 = gradient_stops[idx2];
    let mixed = LinSrgb::new(
        c1.red + (c2.red - c1.red) * t,
        c1.green + (c2.green - c1.green) * t,
        c1.blue + (c2.blue - c1.blue) * t,
    );
    to_rgb(Srgb::from_linear(mixed))
}

/// Same category, same colour, in every chart of one report. Colours follow
/// the sorted category set, so a new category can shift them between runs.
fn generate_category_colors(categories: &[&str]) -> HashMap<String, Rgb<u8>> {
    let mut rng = StdRng::seed_from_u64(42);
    categories
        .iter()
        .map(|category| {
            let hue = rng.gen_range(0.0f32..360.0f32);
            let srgb: Srgb<f32> = Srgb::from_color(Lch::new(70.0f32, 80.0f32, hue));
            (category.to_string(), to_rgb(srgb))
        })
        .collect()
}

fn to_rgb(color: Srgb<f32>) -> Rgb<u8> {
    let (r, g, b) = color.into_components();
    Rgb([
        (r.clamp(0.0, 1.0) * 255.0f32) as u8,
        (g.clamp(0.0, 1.0) * 255.0f32) as u8,
        (b.clamp(0.0, 1.0) * 255.0f32) as u8,
    ])
}
