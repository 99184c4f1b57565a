//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Energies span many decades, so the y-axis is `log10(E)`.
//!
//! Plot elements:
//! - observed events: `o`
//! - fitted curve: `-` line

use crate::domain::{EnergyComponent, EnergyRecord, FittedCurve};

/// Render one component against magnitude, with its fitted curve if present.
pub fn render_ascii_plot(
    records: &[EnergyRecord],
    component: EnergyComponent,
    curve: Option<&FittedCurve>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let points: Vec<(f64, f64)> = records
        .iter()
        .filter_map(|r| {
            let e = component.value(&r.energy);
            (e > 0.0 && e.is_finite()).then(|| (r.event.magnitude, e.log10()))
        })
        .collect();

    let (m_min, m_max) = x_range(&points).unwrap_or((0.0, 10.0));
    let curve_points = curve.and_then(|c| sample_curve(c, m_min, m_max, width));

    // Determine y-range from observed points and curve points.
    let (y_min, y_max) = y_range(&points, curve_points.as_deref()).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    if let Some(curve) = &curve_points {
        draw_curve(&mut grid, curve, m_min, m_max, y_min, y_max);
    }

    for &(m, y) in &points {
        let x = map_x(m, m_min, m_max, width);
        let y = map_y(y, y_min, y_max, height);
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: magnitude=[{m_min:.3}, {m_max:.3}] | log10 {}=[{y_min:.2}, {y_max:.2}] J\n",
        component.column()
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn x_range(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_m = f64::INFINITY;
    let mut max_m = f64::NEG_INFINITY;
    for &(m, _) in points {
        min_m = min_m.min(m);
        max_m = max_m.max(m);
    }
    if min_m.is_finite() && max_m.is_finite() && max_m > min_m {
        Some((min_m, max_m))
    } else if min_m.is_finite() {
        Some((min_m - 0.5, min_m + 0.5))
    } else {
        None
    }
}

/// Sample `log10(a·e^(b·m))`; only defined for `a > 0`.
fn sample_curve(curve: &FittedCurve, m_min: f64, m_max: f64, n: usize) -> Option<Vec<(f64, f64)>> {
    if !(curve.a > 0.0) {
        return None;
    }
    let log_a = curve.a.log10();
    let slope = curve.b * std::f64::consts::LOG10_E;

    let n = n.max(2);
    let out = (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let m = m_min + u * (m_max - m_min);
            (m, log_a + slope * m)
        })
        .collect();
    Some(out)
}

fn y_range(points: &[(f64, f64)], curve: Option<&[(f64, f64)]>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for &(_, y) in points.iter().chain(curve.unwrap_or(&[])) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() {
        Some((min_y - 0.5, min_y + 0.5))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(m: f64, m_min: f64, m_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((m - m_min) / (m_max - m_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], m_min: f64, m_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(m, y) in curve {
        let x = map_x(m, m_min, m_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, '-');
        } else {
            grid[yy][x] = '-';
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
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
