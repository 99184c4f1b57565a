//! CSV ingest and normalization.
//!
//! This module turns an earthquake catalog CSV into clean `Event`s (or, for an
//! augmented table, `EnergyRecord`s) that are safe to partition and fit.
//!
//! Design goals:
//! - **Strict schema** for required columns (missing-file vs malformed-data)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (rows keep file order)
//! - **Separation of concerns**: no energy or fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::{CatalogFilter, EnergyBreakdown, EnergyComponent, EnergyRecord, Event};
use crate::error::AppError;
use crate::models::energy::total_energy;

/// Accepted spellings of the magnitude column, in priority order.
const MAGNITUDE_COLUMNS: [&str; 2] = ["magnitude", "mag"];

/// Summary stats about the rows actually kept.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub n_events: usize,
    pub magnitude_min: f64,
    pub magnitude_max: f64,
    pub with_depth: usize,
    pub with_time: usize,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output for a raw or preprocessed catalog.
#[derive(Debug, Clone)]
pub struct IngestedCatalog {
    pub events: Vec<Event>,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    /// Valid rows dropped by the bounding box / magnitude threshold.
    pub rows_filtered: usize,
}

/// Ingest output for an augmented (energy) table.
#[derive(Debug, Clone)]
pub struct IngestedTable {
    pub records: Vec<EnergyRecord>,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a catalog, applying the bounding-box and magnitude filter.
pub fn load_catalog(path: &Path, filter: &CatalogFilter) -> Result<IngestedCatalog, AppError> {
    let (mut reader, header_map) = open_csv(path)?;
    let magnitude_col = resolve_magnitude_column(&header_map)?;
    ensure_filter_columns_exist(filter, &header_map)?;

    let mut events = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_filtered = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1 and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_event(&record, &header_map, magnitude_col) {
            Ok(event) if passes_filter(&event, filter) => events.push(event),
            Ok(_) => rows_filtered += 1,
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    log_row_errors(path, &row_errors);

    let stats = compute_stats(&events).ok_or_else(|| {
        AppError::malformed(format!(
            "No valid rows remain in '{}' after validation/filtering.",
            path.display()
        ))
    })?;

    info!(
        path = %path.display(),
        rows_read,
        rows_kept = events.len(),
        rows_filtered,
        row_errors = row_errors.len(),
        "loaded catalog"
    );

    Ok(IngestedCatalog {
        events,
        stats,
        row_errors,
        rows_read,
        rows_filtered,
    })
}

/// Load an augmented table previously written by the partition stage.
///
/// Accepts `E_R`/`E_G`/`E_H` as well as the older `ER`/`EG`/`EH` headers. A
/// missing `total_energy` column is recomputed from magnitude. The table has
/// no clamp column, so `thermal_clamped` is inferred from `E_R + E_G > total`.
pub fn load_energy_table(path: &Path) -> Result<IngestedTable, AppError> {
    let (mut reader, header_map) = open_csv(path)?;
    let magnitude_col = resolve_magnitude_column(&header_map)?;

    let mut energy_cols = Vec::with_capacity(3);
    for component in EnergyComponent::ALL {
        let col = resolve_energy_column(component, &header_map).ok_or_else(|| {
            AppError::malformed(format!(
                "Missing required column in '{}': `{}`",
                path.display(),
                component.column()
            ))
        })?;
        energy_cols.push(col);
    }
    let (radiated_col, fracture_col, thermal_col) = (energy_cols[0], energy_cols[1], energy_cols[2]);

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let parsed = parse_event(&record, &header_map, magnitude_col).and_then(|event| {
            let radiated = get_required_f64(&record, radiated_col, "E_R")?;
            let fracture = get_required_f64(&record, fracture_col, "E_G")?;
            let thermal = get_required_f64(&record, thermal_col, "E_H")?;
            let total = parse_opt_f64(get_optional(&record, &header_map, "total_energy"))
                .unwrap_or_else(|| total_energy(event.magnitude));
            Ok(EnergyRecord {
                event,
                energy: EnergyBreakdown {
                    total_energy: total,
                    radiated_energy: radiated,
                    fracture_energy: fracture,
                    thermal_energy: thermal,
                    // An unclamped residual closes the budget; a floored one
                    // means E_R + E_G already exceeded the total.
                    thermal_clamped: radiated + fracture > total,
                },
            })
        });

        match parsed {
            Ok(r) => records.push(r),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    log_row_errors(path, &row_errors);

    let events: Vec<Event> = records.iter().map(|r| r.event.clone()).collect();
    let stats = compute_stats(&events).ok_or_else(|| {
        AppError::malformed(format!("No valid rows in energy table '{}'.", path.display()))
    })?;

    info!(
        path = %path.display(),
        rows_read,
        rows_kept = records.len(),
        row_errors = row_errors.len(),
        "loaded energy table"
    );

    Ok(IngestedTable {
        records,
        stats,
        row_errors,
        rows_read,
    })
}

/// Open a CSV and index its (normalized) header names.
pub(crate) fn open_csv(path: &Path) -> Result<(csv::Reader<File>, HashMap<String, usize>), AppError> {
    let file = File::open(path).map_err(|e| AppError::open_failed(path, &e))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::malformed(format!("Failed to read CSV headers of '{}': {e}", path.display())))?
        .clone();

    Ok((reader, build_header_map(&headers)))
}

pub(crate) fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM;
    // left in place it would hide the column from schema validation.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn resolve_magnitude_column(header_map: &HashMap<String, usize>) -> Result<usize, AppError> {
    MAGNITUDE_COLUMNS
        .iter()
        .find_map(|name| header_map.get(*name).copied())
        .ok_or_else(|| AppError::malformed("Missing required column: `magnitude` (or `mag`)"))
}

fn resolve_energy_column(component: EnergyComponent, header_map: &HashMap<String, usize>) -> Option<usize> {
    let primary = component.column().to_ascii_lowercase();
    let legacy = primary.replace('_', "");
    header_map
        .get(&primary)
        .or_else(|| header_map.get(&legacy))
        .copied()
}

fn ensure_filter_columns_exist(filter: &CatalogFilter, header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    if filter.bbox.is_some() {
        for col in ["latitude", "longitude"] {
            if !header_map.contains_key(col) {
                return Err(AppError::malformed(format!(
                    "Bounding-box filter requires a `{col}` column in the CSV."
                )));
            }
        }
    }
    Ok(())
}

fn parse_event(record: &StringRecord, header_map: &HashMap<String, usize>, magnitude_col: usize) -> Result<Event, String> {
    let magnitude = get_required_f64(record, magnitude_col, "magnitude")?;

    Ok(Event {
        magnitude,
        depth: parse_opt_f64(get_optional(record, header_map, "depth")),
        latitude: parse_opt_f64(get_optional(record, header_map, "latitude")),
        longitude: parse_opt_f64(get_optional(record, header_map, "longitude")),
        stress_drop: parse_opt_f64(get_optional(record, header_map, "stress_drop")),
        fault_slip: parse_opt_f64(get_optional(record, header_map, "fault_slip")),
        material_elasticity: parse_opt_f64(get_optional(record, header_map, "material_elasticity")),
        time: get_optional(record, header_map, "time").map(str::to_string),
        place: get_optional(record, header_map, "place").map(str::to_string),
    })
}

fn passes_filter(event: &Event, filter: &CatalogFilter) -> bool {
    if let Some(min) = filter.min_magnitude {
        if event.magnitude < min {
            return false;
        }
    }
    if let Some(bbox) = filter.bbox {
        let (Some(lat), Some(lon)) = (event.latitude, event.longitude) else {
            return false;
        };
        if !bbox.contains(lat, lon) {
            return false;
        }
    }
    true
}

fn compute_stats(events: &[Event]) -> Option<DatasetStats> {
    if events.is_empty() {
        return None;
    }

    let mut magnitude_min = f64::INFINITY;
    let mut magnitude_max = f64::NEG_INFINITY;
    for e in events {
        magnitude_min = magnitude_min.min(e.magnitude);
        magnitude_max = magnitude_max.max(e.magnitude);
    }

    Some(DatasetStats {
        n_events: events.len(),
        magnitude_min,
        magnitude_max,
        with_depth: events.iter().filter(|e| e.depth.is_some()).count(),
        with_time: events.iter().filter(|e| e.time.is_some()).count(),
    })
}

pub(crate) fn log_row_errors(path: &Path, row_errors: &[RowError]) {
    for e in row_errors.iter().take(5) {
        warn!(path = %path.display(), line = e.line, "{}", e.message);
    }
    if row_errors.len() > 5 {
        warn!(path = %path.display(), "... and {} more row errors", row_errors.len() - 5);
    }
}

fn get_required_f64(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))?;
    let v = raw
        .parse::<f64>()
        .map_err(|_| format!("Invalid `{name}` value '{raw}'."))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite `{name}` value '{raw}'."))
    }
}

pub(crate) fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let s = s?;
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::domain::BoundingBox;
    use crate::error::ErrorKind;

    fn write_csv(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn accepts_mag_alias_and_bom_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "cat.csv",
            "\u{feff}time,latitude,longitude,depth,mag,place\n\
             2024-11-01T00:00:00.000Z,35.0,-118.0,8.1,3.4,\"10km N of Somewhere, CA\"\n",
        );
        let cat = load_catalog(&path, &CatalogFilter::default()).unwrap();
        assert_eq!(cat.events.len(), 1);
        let e = &cat.events[0];
        assert_eq!(e.magnitude, 3.4);
        assert_eq!(e.depth, Some(8.1));
        assert_eq!(e.place.as_deref(), Some("10km N of Somewhere, CA"));
        assert_eq!(e.stress_drop, None);
    }

    #[test]
    fn bad_rows_are_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "cat.csv",
            "magnitude,depth,stress_drop\n3.0,5,\nabc,5,\n,7,\n4.0,nan,-inf\n",
        );
        let cat = load_catalog(&path, &CatalogFilter::default()).unwrap();
        assert_eq!(cat.rows_read, 4);
        assert_eq!(cat.events.len(), 2);
        assert_eq!(cat.row_errors.len(), 2);
        assert_eq!(cat.row_errors[0].line, 3);
        // Non-finite optional attributes are simply unknown.
        assert_eq!(cat.events[1].depth, None);
        assert_eq!(cat.events[1].stress_drop, None);
    }

    #[test]
    fn filter_applies_bbox_and_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "cat.csv",
            "latitude,longitude,magnitude\n35,-118,3.5\n35,-118,2.0\n50,-118,4.0\n,,5.0\n",
        );
        let filter = CatalogFilter {
            bbox: Some(BoundingBox::from([32.5, 42.0, -125.0, -114.0])),
            min_magnitude: Some(3.0),
        };
        let cat = load_catalog(&path, &filter).unwrap();
        assert_eq!(cat.events.len(), 1);
        assert_eq!(cat.rows_filtered, 3);
        assert_eq!(cat.stats.magnitude_min, 3.5);
    }

    #[test]
    fn missing_file_and_missing_column_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_catalog(&dir.path().join("nope.csv"), &CatalogFilter::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingFile);

        let path = write_csv(&dir, "cat.csv", "depth,latitude\n1,2\n");
        let err = load_catalog(&path, &CatalogFilter::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData);
    }

    #[test]
    fn bbox_without_coordinates_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "cat.csv", "magnitude\n3.0\n");
        let filter = CatalogFilter {
            bbox: Some(BoundingBox::from([0.0, 1.0, 0.0, 1.0])),
            min_magnitude: None,
        };
        let err = load_catalog(&path, &filter).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData);
    }

    #[test]
    fn everything_filtered_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "cat.csv", "magnitude\n1.0\n2.0\n");
        let filter = CatalogFilter {
            bbox: None,
            min_magnitude: Some(3.0),
        };
        let err = load_catalog(&path, &filter).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData);
    }

    #[test]
    fn energy_table_accepts_legacy_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "energy.csv", "mag,depth,ER,EG,EH\n5.0,10,7,2,1\n");
        let table = load_energy_table(&path).unwrap();
        assert_eq!(table.records.len(), 1);
        let e = table.records[0].energy;
        assert_eq!((e.radiated_energy, e.fracture_energy, e.thermal_energy), (7.0, 2.0, 1.0));
        assert_eq!(e.total_energy, total_energy(5.0));
    }

    #[test]
    fn energy_table_infers_floored_thermal_residual() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "energy.csv",
            "magnitude,total_energy,E_R,E_G,E_H\n5.0,100,80,30,0\n5.0,100,70,20,10\n5.0,100,80,30,10\n",
        );
        let table = load_energy_table(&path).unwrap();
        let clamped: Vec<bool> = table.records.iter().map(|r| r.energy.thermal_clamped).collect();
        assert_eq!(clamped, [true, false, true]);
    }

    #[test]
    fn energy_table_requires_component_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "energy.csv", "magnitude,E_R,E_G\n5.0,1,2\n");
        let err = load_energy_table(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData);
        assert!(err.to_string().contains("E_H"));
    }
}
