//! Stage logic shared by every subcommand.
//!
//! The workflow is:
//! catalog CSV -> filter -> partition -> energy table CSV -> fit -> plots
//!
//! Each `run_*` function takes the resolved `AnalysisConfig` and returns the
//! computed outputs; printing is left to the caller. File-level failures that
//! abort a stage come back as `AppError`. Artifact failures do not: they are
//! recorded in the returned `Artifact` list so the remaining artifacts are
//! still attempted.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::{AnalysisConfig, Artifact, ArtifactStatus, EnergyRecord, Event, PartitionMode, ThermalFloor};
use crate::error::AppError;
use crate::fit::{fit_components, CurveSet};
use crate::io::{DatasetStats, PreprocessSummary, RowError};
use crate::models::energy::partition;

pub const ENERGY_TABLE: &str = "processed_earthquake_data.csv";
pub const PREPROCESSED_TABLE: &str = "processed_data.csv";

/// Outputs of `quake preprocess`.
#[derive(Debug, Clone)]
pub struct PreprocessOutput {
    pub summary: PreprocessSummary,
    pub output: PathBuf,
}

/// Outputs of the partition stage.
#[derive(Debug, Clone)]
pub struct PartitionOutput {
    pub rows_read: usize,
    pub rows_filtered: usize,
    pub row_errors: Vec<RowError>,
    pub stats: DatasetStats,
    pub records: Vec<EnergyRecord>,
    /// Records whose thermal residual was floored.
    pub clamped: usize,
    /// The energy table CSV.
    pub table: Artifact,
}

/// Outputs of the fit + render stage.
#[derive(Debug, Clone)]
pub struct PlotOutput {
    pub curves: CurveSet,
    pub artifacts: Vec<Artifact>,
    /// Terminal plot, when requested.
    pub ascii: Option<String>,
}

/// Outputs of `quake plot`.
#[derive(Debug, Clone)]
pub struct TablePlotOutput {
    pub table: PathBuf,
    pub rows_read: usize,
    pub row_errors: Vec<RowError>,
    pub stats: DatasetStats,
    pub plot: PlotOutput,
}

/// Outputs of `quake run`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub partition: PartitionOutput,
    pub plot: PlotOutput,
}

impl RunOutput {
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        std::iter::once(&self.partition.table).chain(self.plot.artifacts.iter())
    }
}

/// Apply the energy model to every event, in input order.
pub fn partition_events(events: &[Event], mode: PartitionMode, floor: ThermalFloor) -> Vec<EnergyRecord> {
    events
        .iter()
        .map(|event| EnergyRecord {
            event: event.clone(),
            energy: partition(event, mode, floor),
        })
        .collect()
}

/// Clean the raw catalog into `<output_dir>/processed_data.csv`.
pub fn run_preprocess(config: &AnalysisConfig) -> Result<PreprocessOutput, AppError> {
    let output = config.preprocessed_path();
    let summary = crate::io::preprocess_catalog(&config.input, &output)?;
    Ok(PreprocessOutput { summary, output })
}

/// Load, filter and partition the catalog, then write the energy table.
///
/// A failed write is recorded on `table`; it does not discard the records.
pub fn run_partition(config: &AnalysisConfig) -> Result<PartitionOutput, AppError> {
    let catalog = crate::io::load_catalog(&config.input, &config.filter)?;

    let records = partition_events(&catalog.events, config.mode, config.thermal_floor);
    let clamped = records.iter().filter(|r| r.energy.thermal_clamped).count();
    info!(
        events = records.len(),
        mode = config.mode.display_name(),
        clamped,
        "partitioned energy"
    );
    if clamped > 0 {
        warn!(clamped, "negative thermal residuals were floored");
    }

    let table = write_table(&config.energy_table_path(), &records);

    Ok(PartitionOutput {
        rows_read: catalog.rows_read,
        rows_filtered: catalog.rows_filtered,
        row_errors: catalog.row_errors,
        stats: catalog.stats,
        records,
        clamped,
        table,
    })
}

/// Fit one curve per component and render the plots.
pub fn fit_and_render(records: &[EnergyRecord], config: &AnalysisConfig) -> PlotOutput {
    let curves = fit_components(records, config.initial_guess);

    let artifacts = if config.plots {
        crate::plot::render_all(records, &curves, &config.plots_dir())
    } else {
        Vec::new()
    };

    let ascii = config.ascii_plot.then(|| {
        crate::plot::render_ascii_plot(
            records,
            crate::domain::EnergyComponent::Radiated,
            curves.get(crate::domain::EnergyComponent::Radiated),
            config.plot_width,
            config.plot_height,
        )
    });

    PlotOutput {
        curves,
        artifacts,
        ascii,
    }
}

/// Fit and plot an energy table written by an earlier partition run.
pub fn run_plot(config: &AnalysisConfig, table: &Path) -> Result<TablePlotOutput, AppError> {
    let ingested = crate::io::load_energy_table(table)?;
    let plot = fit_and_render(&ingested.records, config);
    Ok(TablePlotOutput {
        table: table.to_path_buf(),
        rows_read: ingested.rows_read,
        row_errors: ingested.row_errors,
        stats: ingested.stats,
        plot,
    })
}

/// Full pipeline: partition, export, fit, render.
pub fn run_full(config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    let partition = run_partition(config)?;
    let plot = fit_and_render(&partition.records, config);
    Ok(RunOutput { partition, plot })
}

fn write_table(path: &Path, records: &[EnergyRecord]) -> Artifact {
    let status = match crate::io::write_energy_csv(path, records) {
        Ok(()) => {
            info!(path = %path.display(), rows = records.len(), "wrote energy table");
            ArtifactStatus::Written
        }
        Err(err) => {
            warn!(path = %path.display(), reason = %err, "energy table not written");
            ArtifactStatus::Failed(err.to_string())
        }
    };
    Artifact {
        name: ENERGY_TABLE,
        path: path.to_path_buf(),
        status,
    }
}
