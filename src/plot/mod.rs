//! Rendering stage.
//!
//! - `svg`: the four image artifacts (Plotters, SVG backend)
//! - `ascii`: optional terminal plot of radiated energy vs magnitude
//!
//! Each artifact is best-effort: one failing or being skipped never stops the
//! others from being attempted.

pub mod ascii;
pub mod svg;

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::domain::{Artifact, ArtifactStatus, EnergyRecord};
use crate::fit::CurveSet;

pub use ascii::render_ascii_plot;

pub const MAGNITUDE_PLOT: &str = "energy_vs_magnitude_with_exp_fit.svg";
pub const DEPTH_PLOT: &str = "energy_vs_depth.svg";
pub const TIME_PLOT: &str = "energy_vs_time.svg";
pub const SCATTER_3D_PLOT: &str = "energy_3d_plot.svg";

/// Render every plot into `plots_dir`, creating it if needed.
pub fn render_all(records: &[EnergyRecord], curves: &CurveSet, plots_dir: &Path) -> Vec<Artifact> {
    if let Err(err) = std::fs::create_dir_all(plots_dir) {
        let reason = format!("cannot create '{}': {err}", plots_dir.display());
        warn!(dir = %plots_dir.display(), %reason, "plot directory unavailable");
        return [MAGNITUDE_PLOT, DEPTH_PLOT, TIME_PLOT, SCATTER_3D_PLOT]
            .into_iter()
            .map(|name| Artifact {
                name,
                path: plots_dir.join(name),
                status: ArtifactStatus::Failed(reason.clone()),
            })
            .collect();
    }

    let has_depth = records.iter().any(|r| r.event.depth.is_some());
    let no_depth = || skip("no event has a known depth");

    vec![
        attempt(plots_dir, MAGNITUDE_PLOT, || {
            if records.is_empty() {
                return skip("no events to plot");
            }
            render(svg::energy_vs_magnitude(&plots_dir.join(MAGNITUDE_PLOT), records, curves))
        }),
        attempt(plots_dir, DEPTH_PLOT, || {
            if !has_depth {
                return no_depth();
            }
            render(svg::energy_vs_depth(&plots_dir.join(DEPTH_PLOT), records))
        }),
        attempt(plots_dir, TIME_PLOT, || match time_series(records) {
            Ok(series) => render(svg::energy_vs_time(&plots_dir.join(TIME_PLOT), &series)),
            Err(reason) => skip(&reason),
        }),
        attempt(plots_dir, SCATTER_3D_PLOT, || {
            if !has_depth {
                return no_depth();
            }
            render(svg::energy_3d(&plots_dir.join(SCATTER_3D_PLOT), records))
        }),
    ]
}

fn attempt(dir: &Path, name: &'static str, draw: impl FnOnce() -> ArtifactStatus) -> Artifact {
    let path = dir.join(name);
    let status = draw();
    match &status {
        ArtifactStatus::Written => info!(path = %path.display(), "wrote plot"),
        ArtifactStatus::Skipped(reason) => warn!(plot = name, %reason, "skipping plot"),
        ArtifactStatus::Failed(reason) => warn!(plot = name, %reason, "plot failed"),
    }
    Artifact { name, path, status }
}

fn render(result: svg::PlotResult) -> ArtifactStatus {
    match result {
        Ok(()) => ArtifactStatus::Written,
        Err(err) => ArtifactStatus::Failed(err.to_string()),
    }
}

fn skip(reason: &str) -> ArtifactStatus {
    ArtifactStatus::Skipped(reason.to_string())
}

/// Pair every record with its parsed timestamp, sorted by time.
///
/// All-or-nothing: one missing or unparseable timestamp rejects the series.
fn time_series(records: &[EnergyRecord]) -> Result<Vec<(NaiveDateTime, &EnergyRecord)>, String> {
    if records.is_empty() {
        return Err("no events to plot".to_string());
    }
    let mut series = Vec::with_capacity(records.len());
    for (i, r) in records.iter().enumerate() {
        let raw = r
            .event
            .time
            .as_deref()
            .ok_or_else(|| format!("event {} has no timestamp", i + 1))?;
        let t = parse_timestamp(raw).ok_or_else(|| format!("unparseable timestamp '{raw}'"))?;
        series.push((t, r));
    }
    series.sort_by_key(|(t, _)| *t);
    Ok(series)
}

/// Parse a catalog timestamp.
///
/// Accepted forms, tried in order: RFC 3339 (`2024-05-01T12:30:00.123Z`),
/// `2024-05-01 12:30:00[.fff]`, and a bare date.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.naive_utc());
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(t);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
