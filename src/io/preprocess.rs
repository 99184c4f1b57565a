//! Raw catalog cleanup.
//!
//! Keeps the columns the analysis needs and drops rows that lack any of the
//! critical ones. Values are copied through as text; nothing is re-formatted.

use std::path::Path;

use tracing::info;

use crate::error::AppError;
use crate::io::export::ensure_parent_dir;
use crate::io::ingest::{get_optional, log_row_errors, open_csv, RowError};

/// Columns copied to the cleaned catalog, in output order.
pub const KEPT_COLUMNS: [&str; 6] = ["time", "latitude", "longitude", "depth", "mag", "place"];

/// Columns that must be non-empty for a row to survive.
pub const CRITICAL_COLUMNS: [&str; 5] = ["time", "latitude", "longitude", "depth", "mag"];

/// Row counts of a preprocess run.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessSummary {
    pub rows_read: usize,
    pub rows_kept: usize,
    /// Incomplete rows plus rows the CSV reader rejected.
    pub rows_dropped: usize,
    /// Rows the CSV reader rejected.
    pub row_errors: Vec<RowError>,
}

/// Clean `input` into `output`.
///
/// The input is fully validated before anything is written, so a missing file
/// or column never leaves a partial output behind.
pub fn preprocess_catalog(input: &Path, output: &Path) -> Result<PreprocessSummary, AppError> {
    let (mut reader, header_map) = open_csv(input)?;

    let missing: Vec<&str> = KEPT_COLUMNS
        .iter()
        .copied()
        .filter(|c| !header_map.contains_key(*c))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::malformed(format!(
            "Missing required column(s) in '{}': {}",
            input.display(),
            missing.join(", ")
        )));
    }

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;
    for (idx, result) in reader.records().enumerate() {
        rows_read += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line: idx + 2,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        let complete = CRITICAL_COLUMNS
            .iter()
            .all(|c| get_optional(&record, &header_map, c).is_some());
        if !complete {
            continue;
        }
        rows.push(
            KEPT_COLUMNS
                .iter()
                .map(|c| get_optional(&record, &header_map, c).unwrap_or_default().to_string())
                .collect(),
        );
    }

    log_row_errors(input, &row_errors);

    ensure_parent_dir(output)?;
    let mut writer = csv::Writer::from_path(output)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", output.display())))?;
    writer
        .write_record(KEPT_COLUMNS)
        .map_err(|e| AppError::io(format!("Failed to write header: {e}")))?;
    for row in &rows {
        writer
            .write_record(row)
            .map_err(|e| AppError::io(format!("Failed to write row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush '{}': {e}", output.display())))?;

    let summary = PreprocessSummary {
        rows_read,
        rows_kept: rows.len(),
        rows_dropped: rows_read - rows.len(),
        row_errors,
    };
    info!(
        input = %input.display(),
        output = %output.display(),
        rows_read = summary.rows_read,
        rows_kept = summary.rows_kept,
        row_errors = summary.row_errors.len(),
        "preprocessed catalog"
    );
    Ok(summary)
}
