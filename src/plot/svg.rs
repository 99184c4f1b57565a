//! SVG charts rendered with Plotters.
//!
//! Every function here draws exactly one file and returns a boxed error on
//! failure; the caller decides whether that failure is fatal (it never is).
//!
//! Energies span many decades, so 2-D charts use a log-scaled energy axis and
//! the 3-D chart plots `log10(E)`.

use std::error::Error;
use std::path::Path;

use chrono::{NaiveDateTime, TimeDelta};
use plotters::prelude::*;

use crate::domain::{EnergyComponent, EnergyRecord, FittedCurve};
use crate::fit::CurveSet;

pub type PlotResult = Result<(), Box<dyn Error>>;

const SIZE: (u32, u32) = (1280, 760);
const CURVE_SAMPLES: usize = 200;

fn color(component: EnergyComponent) -> RGBColor {
    match component {
        EnergyComponent::Radiated => RGBColor(30, 144, 255),
        EnergyComponent::Fracture => RGBColor(220, 20, 60),
        EnergyComponent::Thermal => RGBColor(34, 139, 34),
    }
}

/// Scatter of every component against magnitude, with the fitted curves
/// overlaid for the components that have one.
pub fn energy_vs_magnitude(path: &Path, records: &[EnergyRecord], curves: &CurveSet) -> PlotResult {
    let (m0, m1) = padded(records.iter().map(|r| r.event.magnitude)).ok_or("no finite magnitudes")?;
    let (e0, e1) = energy_bounds(records.iter())?;

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(25)
        .caption("Energy Components vs Magnitude", ("sans-serif", 28))
        .set_label_area_size(LabelAreaPosition::Left, 80)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(m0..m1, (e0..e1).log_scale())?;

    chart
        .configure_mesh()
        .x_desc("Magnitude")
        .y_desc("Energy (J)")
        .x_label_formatter(&|v| format!("{v:.1}"))
        .y_label_formatter(&|v| format!("{v:.0e}"))
        .label_style(("sans-serif", 16))
        .draw()?;

    for component in EnergyComponent::ALL {
        let c = color(component);
        chart
            .draw_series(
                positive_points(records, component, |r| Some(r.event.magnitude))
                    .map(|p| Circle::new(p, 3, c.filled())),
            )?
            .label(component.display_name())
            .legend(move |(x, y)| Circle::new((x, y), 4, c.filled()));

        if let Some(curve) = curves.get(component) {
            chart
                .draw_series(LineSeries::new(sample_curve(curve, m0, m1), c.stroke_width(2)))?
                .label(format!("{} fit: {:.3e}·e^({:.4}·m)", component.column(), curve.a, curve.b))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 30, y)], c.stroke_width(2)));
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(("sans-serif", 16))
        .draw()?;

    root.present()?;
    Ok(())
}

/// Scatter of every component against hypocentral depth.
///
/// Only records with a known depth are drawn.
pub fn energy_vs_depth(path: &Path, records: &[EnergyRecord]) -> PlotResult {
    let (d0, d1) = padded(records.iter().filter_map(|r| r.event.depth)).ok_or("no event has a known depth")?;
    let (e0, e1) = energy_bounds(records.iter().filter(|r| r.event.depth.is_some()))?;

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(25)
        .caption("Energy Components vs Depth", ("sans-serif", 28))
        .set_label_area_size(LabelAreaPosition::Left, 80)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(d0..d1, (e0..e1).log_scale())?;

    chart
        .configure_mesh()
        .x_desc("Depth (km)")
        .y_desc("Energy (J)")
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&|v| format!("{v:.0e}"))
        .label_style(("sans-serif", 16))
        .draw()?;

    for component in EnergyComponent::ALL {
        let c = color(component);
        chart
            .draw_series(positive_points(records, component, |r| r.event.depth).map(|p| Circle::new(p, 3, c.filled())))?
            .label(component.display_name())
            .legend(move |(x, y)| Circle::new((x, y), 4, c.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(("sans-serif", 16))
        .draw()?;

    root.present()?;
    Ok(())
}

/// Time-ordered line plot of every component.
///
/// `series` must already be sorted by timestamp.
pub fn energy_vs_time(path: &Path, series: &[(NaiveDateTime, &EnergyRecord)]) -> PlotResult {
    let t0 = series.first().map(|(t, _)| *t).ok_or("no timestamped events")?;
    let days = |t: &NaiveDateTime| (*t - t0).num_milliseconds() as f64 / 86_400_000.0;

    let (x0, x1) = padded(series.iter().map(|(t, _)| days(t))).ok_or("no timestamped events")?;
    let (e0, e1) = energy_bounds(series.iter().map(|(_, r)| *r))?;

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(25)
        .caption("Energy Components over Time", ("sans-serif", 28))
        .set_label_area_size(LabelAreaPosition::Left, 80)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(x0..x1, (e0..e1).log_scale())?;

    let date_label = |v: &f64| {
        TimeDelta::try_milliseconds((v * 86_400_000.0).round() as i64)
            .and_then(|d| t0.checked_add_signed(d))
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    };

    chart
        .configure_mesh()
        .x_desc("Time")
        .y_desc("Energy (J)")
        .x_labels(8)
        .x_label_formatter(&date_label)
        .y_label_formatter(&|v| format!("{v:.0e}"))
        .label_style(("sans-serif", 16))
        .draw()?;

    for component in EnergyComponent::ALL {
        let c = color(component);
        let line: Vec<(f64, f64)> = series
            .iter()
            .map(|(t, r)| (days(t), component.value(&r.energy)))
            .filter(|&(_, e)| e > 0.0 && e.is_finite())
            .collect();
        chart
            .draw_series(LineSeries::new(line, c.stroke_width(1)))?
            .label(component.display_name())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 30, y)], c.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(("sans-serif", 16))
        .draw()?;

    root.present()?;
    Ok(())
}

/// 3-D scatter of `log10(E)` against magnitude (x) and depth (z).
pub fn energy_3d(path: &Path, records: &[EnergyRecord]) -> PlotResult {
    let with_depth: Vec<&EnergyRecord> = records.iter().filter(|r| r.event.depth.is_some()).collect();
    let (m0, m1) = padded(with_depth.iter().map(|r| r.event.magnitude)).ok_or("no event has a known depth")?;
    let (d0, d1) = padded(with_depth.iter().filter_map(|r| r.event.depth)).ok_or("no event has a known depth")?;
    let (e0, e1) = energy_bounds(with_depth.iter().copied())?;
    let (l0, l1) = (e0.log10(), e1.log10());

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(25)
        .caption("log10 Energy vs Magnitude and Depth", ("sans-serif", 28))
        .build_cartesian_3d(m0..m1, l0..l1, d0..d1)?;

    chart.with_projection(|mut pb| {
        pb.pitch = 0.35;
        pb.yaw = 0.6;
        pb.scale = 0.85;
        pb.into_matrix()
    });

    chart
        .configure_axes()
        .light_grid_style(&BLACK.mix(0.15))
        .max_light_lines(3)
        .label_style(("sans-serif", 14))
        .draw()?;

    for component in EnergyComponent::ALL {
        let c = color(component);
        let points: Vec<(f64, f64, f64)> = with_depth
            .iter()
            .filter_map(|r| {
                let e = component.value(&r.energy);
                let depth = r.event.depth?;
                (e > 0.0 && e.is_finite()).then(|| (r.event.magnitude, e.log10(), depth))
            })
            .collect();
        chart
            .draw_series(points.into_iter().map(|p| Circle::new(p, 3, c.filled())))?
            .label(component.display_name())
            .legend(move |(x, y)| Circle::new((x, y), 4, c.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(("sans-serif", 16))
        .draw()?;

    root.present()?;
    Ok(())
}

/// `(x, E)` pairs for one component, skipping rows without an `x` and
/// energies that cannot sit on a log axis.
fn positive_points<'a>(
    records: &'a [EnergyRecord],
    component: EnergyComponent,
    x: impl Fn(&EnergyRecord) -> Option<f64> + 'a,
) -> impl Iterator<Item = (f64, f64)> + 'a {
    records.iter().filter_map(move |r| {
        let e = component.value(&r.energy);
        let x = x(r)?;
        (x.is_finite() && e > 0.0 && e.is_finite()).then_some((x, e))
    })
}

/// Positive energy range across all components, widened by a factor of two on
/// each side.
fn energy_bounds<'a>(records: impl Iterator<Item = &'a EnergyRecord>) -> Result<(f64, f64), Box<dyn Error>> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for r in records {
        for component in EnergyComponent::ALL {
            let e = component.value(&r.energy);
            if e > 0.0 && e.is_finite() {
                lo = lo.min(e);
                hi = hi.max(e);
            }
        }
    }
    if !(lo.is_finite() && hi.is_finite()) {
        return Err("no positive finite energies to plot".into());
    }
    Ok((lo / 2.0, hi * 2.0))
}

/// Finite value range padded by 5% (or ±0.5 when all values coincide).
fn padded(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return None;
    }
    if hi > lo {
        let pad = (hi - lo) * 0.05;
        Some((lo - pad, hi + pad))
    } else {
        Some((lo - 0.5, hi + 0.5))
    }
}

/// Fitted curve sampled over `[m0, m1]`, keeping only points a log axis can show.
fn sample_curve(curve: &FittedCurve, m0: f64, m1: f64) -> Vec<(f64, f64)> {
    (0..CURVE_SAMPLES)
        .map(|i| {
            let m = m0 + (m1 - m0) * i as f64 / (CURVE_SAMPLES - 1) as f64;
            (m, crate::models::exponential::predict(curve.a, curve.b, m))
        })
        .filter(|&(_, y)| y > 0.0 && y.is_finite())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_widens_degenerate_ranges() {
        assert_eq!(padded([4.0, 4.0].into_iter()), Some((3.5, 4.5)));
        assert_eq!(padded([f64::NAN].into_iter()), None);
        let (lo, hi) = padded([0.0, 10.0].into_iter()).unwrap();
        assert!((lo + 0.5).abs() < 1e-12 && (hi - 10.5).abs() < 1e-12);
    }

    #[test]
    fn sampled_curve_drops_non_positive_values() {
        let curve = FittedCurve {
            component: EnergyComponent::Thermal,
            a: -1.0,
            b: 0.5,
            predicted: Vec::new(),
            sse: 0.0,
            evaluations: 1,
        };
        assert!(sample_curve(&curve, 0.0, 5.0).is_empty());

        let curve = FittedCurve { a: 2.0, ..curve };
        let pts = sample_curve(&curve, 0.0, 5.0);
        assert_eq!(pts.len(), CURVE_SAMPLES);
        assert!((pts[0].1 - 2.0).abs() < 1e-12);
    }
}
