//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks of a lookup in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - candidate spectra: rank digit (`1` best), best drawn on top
//! - known target points: `o`

use crate::lookup::LookupResult;

/// Candidates drawn at most (one digit each).
const MAX_CURVES: usize = 9;

/// Render the known target points and the ranked candidate spectra.
pub fn render_lookup_plot(result: &LookupResult, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let curves: Vec<&[f64]> = result
        .candidates
        .iter()
        .take(MAX_CURVES)
        .map(|c| c.spectrum.as_slice())
        .collect();

    let len = curves
        .iter()
        .map(|c| c.len())
        .chain(result.key_points.iter().map(|&(i, _)| i + 1))
        .max()
        .unwrap_or(0);
    let (x_min, x_max) = (0.0, (len.max(2) - 1) as f64);

    let (y_min, y_max) = match y_range(&curves, &result.key_points) {
        Some((lo, hi)) if hi > lo => pad_range(lo, hi, 0.05),
        Some((lo, hi)) => (lo - 1.0, hi + 1.0),
        None => (0.0, 1.0),
    };

    let mut grid = vec![vec![' '; width]; height];

    // Best curve first: `draw_line` never overwrites, so earlier ranks stay on top.
    for (rank, curve) in curves.iter().enumerate() {
        let ch = char::from_digit(rank as u32 + 1, 10).unwrap_or('*');
        let points: Vec<(f64, f64)> = curve.iter().enumerate().map(|(i, &y)| (i as f64, y)).collect();
        draw_curve(&mut grid, &points, (x_min, x_max), (y_min, y_max), ch);
    }

    for &(i, v) in &result.key_points {
        let x = map_x(i as f64, x_min, x_max, width);
        let y = map_y(v, y_min, y_max, height);
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: index=[{x_min:.0}, {x_max:.0}] | y=[{y_min:.4}, {y_max:.4}] | curves={}\n",
        curves.len()
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn y_range(curves: &[&[f64]], key_points: &[(usize, f64)]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    let values = curves
        .iter()
        .flat_map(|c| c.iter().copied())
        .chain(key_points.iter().map(|&(_, v)| v));
    for y in values.filter(|y| y.is_finite()) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    (min_y.is_finite() && max_y.is_finite()).then_some((min_y, max_y))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x: (f64, f64), y: (f64, f64), ch: char) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(cx, cy) in curve.iter().filter(|(_, cy)| cy.is_finite()) {
        let px = map_x(cx, x.0, x.1, width);
        let py = map_y(cy, y.0, y.1, height);
        let (x0, y0) = prev.unwrap_or((px, py));
        draw_line(grid, x0, y0, px, py, ch);
        prev = Some((px, py));
    }
}

/// Integer line drawing (Bresenham-ish). Only blank cells are written.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
