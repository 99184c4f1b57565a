//! Export the augmented (event + energy) table to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! scripts, and to be byte-identical across runs on identical input: floats use
//! Rust's shortest round-trip formatting and unknown values are empty cells.

use std::fs::create_dir_all;
use std::path::Path;

use crate::domain::{EnergyComponent, EnergyRecord};
use crate::error::AppError;

const BASE_COLUMNS: [&str; 10] = [
    "time",
    "latitude",
    "longitude",
    "depth",
    "magnitude",
    "place",
    "stress_drop",
    "fault_slip",
    "material_elasticity",
    "total_energy",
];

/// Write the augmented table, creating the parent directory if needed.
pub fn write_energy_csv(path: &Path, records: &[EnergyRecord]) -> Result<(), AppError> {
    ensure_parent_dir(path)?;

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::io(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    let header: Vec<&str> = BASE_COLUMNS
        .iter()
        .copied()
        .chain(EnergyComponent::ALL.iter().map(|c| c.column()))
        .collect();
    writer
        .write_record(&header)
        .map_err(|e| AppError::io(format!("Failed to write export CSV header: {e}")))?;

    for r in records {
        let ev = &r.event;
        let en = &r.energy;
        let row = [
            ev.time.clone().unwrap_or_default(),
            fmt_opt(ev.latitude),
            fmt_opt(ev.longitude),
            fmt_opt(ev.depth),
            fmt_f64(ev.magnitude),
            ev.place.clone().unwrap_or_default(),
            fmt_opt(ev.stress_drop),
            fmt_opt(ev.fault_slip),
            fmt_opt(ev.material_elasticity),
            fmt_f64(en.total_energy),
            fmt_f64(en.radiated_energy),
            fmt_f64(en.fracture_energy),
            fmt_f64(en.thermal_energy),
        ];
        writer
            .write_record(&row)
            .map_err(|e| AppError::io(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush export CSV '{}': {e}", path.display())))?;

    Ok(())
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)
            .map_err(|e| AppError::io(format!("Failed to create output dir '{}': {e}", dir.display())))?;
    }
    Ok(())
}

fn fmt_f64(v: f64) -> String {
    format!("{v}")
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(fmt_f64).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Event, PartitionMode, ThermalFloor};
    use crate::io::ingest::load_energy_table;
    use crate::models::energy::partition;

    fn records() -> Vec<EnergyRecord> {
        [3.0, 4.0, 5.0]
            .iter()
            .map(|&m| {
                let mut event = Event::with_magnitude(m);
                event.place = Some("Somewhere, CA".to_string());
                event.depth = Some(10.0);
                let energy = partition(&event, PartitionMode::PhysicalResidual, ThermalFloor::Zero);
                EnergyRecord { event, energy }
            })
            .collect()
    }

    #[test]
    fn writes_header_and_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/energy.csv");
        write_energy_csv(&path, &records()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "time,latitude,longitude,depth,magnitude,place,stress_drop,fault_slip,material_elasticity,total_energy,E_R,E_G,E_H"
        );
        assert_eq!(text.lines().count(), 4);
        assert!(text.contains("\"Somewhere, CA\""));
    }

    #[test]
    fn written_values_reload_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("energy.csv");
        let original = records();
        write_energy_csv(&path, &original).unwrap();

        let table = load_energy_table(&path).unwrap();
        assert_eq!(table.records.len(), original.len());
        for (a, b) in table.records.iter().zip(&original) {
            assert_eq!(a.event.magnitude, b.event.magnitude);
            assert_eq!(a.energy.radiated_energy, b.energy.radiated_energy);
            assert_eq!(a.energy.thermal_energy, b.energy.thermal_energy);
        }
    }
}
