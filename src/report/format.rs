//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the energy/fitting code stays clean and testable
//! - output changes are localized

use std::path::Path;

use crate::app::pipeline::{PartitionOutput, PreprocessOutput, RunOutput, TablePlotOutput};
use crate::domain::{AnalysisConfig, Artifact, ArtifactStatus, CatalogFilter};
use crate::fit::CurveSet;
use crate::io::{DatasetStats, RowError};

/// Row errors listed individually before the rest are summarized.
const MAX_ROW_ERRORS: usize = 5;

/// Summary of a full `quake run`.
pub fn format_run_summary(run: &RunOutput, config: &AnalysisConfig) -> String {
    let mut out = header();
    out.push_str(&format_partition_summary(&run.partition, config));
    out.push('\n');
    out.push_str(&format_fits(&run.plot.curves));
    out.push('\n');
    out.push_str(&format_artifacts(run.artifacts()));
    out
}

/// Summary of `quake preprocess`.
pub fn format_preprocess_summary(pre: &PreprocessOutput, input: &Path) -> String {
    let mut out = header();
    out.push_str(&format!("Input: {}\n", input.display()));
    out.push_str(&format!(
        "Rows: read={} | kept={} | dropped={} | errors={}\n",
        pre.summary.rows_read,
        pre.summary.rows_kept,
        pre.summary.rows_dropped,
        pre.summary.row_errors.len()
    ));
    out.push_str(&fmt_row_errors(&pre.summary.row_errors));
    out.push_str(&format!("Wrote: {}\n", pre.output.display()));
    out
}

/// Load/filter/partition status lines.
pub fn format_partition_summary(part: &PartitionOutput, config: &AnalysisConfig) -> String {
    let mut out = String::new();
    out.push_str(&format!("Input: {}\n", config.input.display()));
    out.push_str(&format!(
        "Mode: {} | thermal floor: {:?}\n",
        config.mode.display_name(),
        config.thermal_floor
    ));
    out.push_str(&format!("Filter: {}\n", fmt_filter(&config.filter)));
    out.push_str(&format!(
        "Rows: read={} | kept={} | filtered={} | errors={}\n",
        part.rows_read,
        part.records.len(),
        part.rows_filtered,
        part.row_errors.len()
    ));
    out.push_str(&fmt_stats(&part.stats));
    out.push_str(&format!("Partitioned: {} event(s)", part.records.len()));
    if part.clamped > 0 {
        out.push_str(&format!(" | thermal residual floored for {}", part.clamped));
    }
    out.push('\n');
    out.push_str(&fmt_row_errors(&part.row_errors));
    out
}

/// Summary of `quake plot`.
pub fn format_table_plot_summary(run: &TablePlotOutput) -> String {
    let mut out = header();
    out.push_str(&format!("Table: {}\n", run.table.display()));
    out.push_str(&format!(
        "Rows: read={} | kept={} | errors={}\n",
        run.rows_read,
        run.stats.n_events,
        run.row_errors.len()
    ));
    out.push_str(&fmt_stats(&run.stats));
    out.push_str(&fmt_row_errors(&run.row_errors));
    out.push('\n');
    out.push_str(&format_fits(&run.plot.curves));
    out.push('\n');
    out.push_str(&format_artifacts(run.plot.artifacts.iter()));
    out
}

/// Fitted coefficients per component, then the skipped ones with reasons.
pub fn format_fits(curves: &CurveSet) -> String {
    let mut out = String::new();
    out.push_str("Exponential fits (E = a·e^(b·m)):\n");
    out.push_str(
        format!(
            "{:<10} {:>14} {:>12} {:>14} {:>6}\n",
            "component", "a", "b", "sse", "evals"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<10} {:-<14} {:-<12} {:-<14} {:-<6}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for curve in &curves.fitted {
        out.push_str(&format!(
            "{:<10} {:>14.6e} {:>12.6} {:>14.4e} {:>6}\n",
            curve.component.column(),
            curve.a,
            curve.b,
            curve.sse,
            curve.evaluations
        ));
    }
    for (component, reason) in &curves.skipped {
        out.push_str(&format!("  (skipped {}) {reason}\n", component.column()));
    }
    out
}

/// One line per artifact: status, name, then path or reason.
pub fn format_artifacts<'a>(artifacts: impl IntoIterator<Item = &'a Artifact>) -> String {
    let mut out = String::from("Artifacts:\n");
    let mut any = false;
    for a in artifacts {
        any = true;
        let line = match &a.status {
            ArtifactStatus::Written => format!("  {:<8} {}\n", "written", a.path.display()),
            ArtifactStatus::Skipped(reason) => format!("  {:<8} {} ({reason})\n", "skipped", a.name),
            ArtifactStatus::Failed(reason) => format!("  {:<8} {} ({reason})\n", "FAILED", a.name),
        };
        out.push_str(&line);
    }
    if !any {
        out.push_str("  (none)\n");
    }
    out
}

fn header() -> String {
    "=== quake - Earthquake Energy Partitioning ===\n".to_string()
}

fn fmt_filter(filter: &CatalogFilter) -> String {
    if !filter.is_active() {
        return "none".to_string();
    }
    let mut parts = Vec::new();
    if let Some(b) = &filter.bbox {
        parts.push(format!(
            "lat=[{}, {}] lon=[{}, {}]",
            b.min_lat, b.max_lat, b.min_lon, b.max_lon
        ));
    }
    if let Some(m) = filter.min_magnitude {
        parts.push(format!("magnitude>={m}"));
    }
    parts.join(" | ")
}

fn fmt_stats(stats: &DatasetStats) -> String {
    format!(
        "Magnitude: [{:.2}, {:.2}] | with depth={} | with time={}\n",
        stats.magnitude_min, stats.magnitude_max, stats.with_depth, stats.with_time
    )
}

fn fmt_row_errors(errors: &[RowError]) -> String {
    let mut out = String::new();
    for e in errors.iter().take(MAX_ROW_ERRORS) {
        out.push_str(&format!("  line {}: {}\n", e.line, truncate(&e.message, 100)));
    }
    if errors.len() > MAX_ROW_ERRORS {
        out.push_str(&format!("  ... and {} more\n", errors.len() - MAX_ROW_ERRORS));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
