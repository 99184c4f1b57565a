//! Shared domain types.
//!
//! These types are intentionally plain data so they can be:
//!
//! - produced row-by-row by the energy model
//! - written to / reloaded from the augmented CSV
//! - handed to the fitting and rendering stages without back-references

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How an event's total energy is split into components.
///
/// The two modes are kept separate on purpose: they disagree whenever
/// auxiliary attributes are known, and a run must pick exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PartitionMode {
    /// Fixed 70/20/10 split of the magnitude-only total. Auxiliary attributes
    /// are ignored.
    FallbackFraction,
    /// Radiated and fracture energy from the physical relations (each with its
    /// own fallback); thermal energy is the residual of the total.
    #[default]
    PhysicalResidual,
}

impl PartitionMode {
    pub fn display_name(self) -> &'static str {
        match self {
            PartitionMode::FallbackFraction => "fallback-fraction",
            PartitionMode::PhysicalResidual => "physical-residual",
        }
    }
}

/// What a negative thermal residual is replaced with.
///
/// A negative residual appears when independently modeled radiated and
/// fracture energies already exceed the magnitude-based total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ThermalFloor {
    /// Clamp to zero.
    #[default]
    Zero,
    /// Substitute the 10% fallback fraction of the total.
    FallbackFraction,
}

/// One of the three partitioned energy components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnergyComponent {
    Radiated,
    Fracture,
    Thermal,
}

impl EnergyComponent {
    pub const ALL: [EnergyComponent; 3] = [
        EnergyComponent::Radiated,
        EnergyComponent::Fracture,
        EnergyComponent::Thermal,
    ];

    /// Column name in the augmented table.
    pub fn column(self) -> &'static str {
        match self {
            EnergyComponent::Radiated => "E_R",
            EnergyComponent::Fracture => "E_G",
            EnergyComponent::Thermal => "E_H",
        }
    }

    /// Human-readable label for reports and legends.
    pub fn display_name(self) -> &'static str {
        match self {
            EnergyComponent::Radiated => "Radiated Energy (E_R)",
            EnergyComponent::Fracture => "Fracture Energy (E_G)",
            EnergyComponent::Thermal => "Thermal Energy (E_H)",
        }
    }

    /// Pick this component out of a breakdown.
    pub fn value(self, energy: &EnergyBreakdown) -> f64 {
        match self {
            EnergyComponent::Radiated => energy.radiated_energy,
            EnergyComponent::Fracture => energy.fracture_energy,
            EnergyComponent::Thermal => energy.thermal_energy,
        }
    }
}

/// One observed earthquake.
///
/// `magnitude` is the only required attribute. Every physical attribute is
/// `None` when it was absent, non-finite or non-positive in the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    pub magnitude: f64,
    /// Hypocentral depth (km).
    pub depth: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Stress drop (Pa).
    pub stress_drop: Option<f64>,
    /// Average fault slip (m).
    pub fault_slip: Option<f64>,
    /// Shear modulus of the host rock (Pa).
    pub material_elasticity: Option<f64>,
    /// Raw timestamp text; parsed only by the time-series plot.
    pub time: Option<String>,
    /// Free-text location description, passed through to exports.
    pub place: Option<String>,
}

impl Event {
    pub fn with_magnitude(magnitude: f64) -> Self {
        Self {
            magnitude,
            ..Self::default()
        }
    }
}

/// Energy quantities derived from one event (joules).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyBreakdown {
    pub total_energy: f64,
    pub radiated_energy: f64,
    pub fracture_energy: f64,
    pub thermal_energy: f64,
    /// Set when the thermal residual was negative and replaced by the floor.
    pub thermal_clamped: bool,
}

/// An event plus its energy breakdown: one row of the augmented table.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyRecord {
    pub event: Event,
    pub energy: EnergyBreakdown,
}

/// Geographic bounding box (degrees, inclusive bounds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_lat
            && latitude <= self.max_lat
            && longitude >= self.min_lon
            && longitude <= self.max_lon
    }

    /// Bounds must be finite and ordered (`min <= max`).
    pub fn is_valid(&self) -> bool {
        [self.min_lat, self.max_lat, self.min_lon, self.max_lon]
            .iter()
            .all(|v| v.is_finite())
            && self.min_lat <= self.max_lat
            && self.min_lon <= self.max_lon
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        Self {
            min_lat: v[0],
            max_lat: v[1],
            min_lon: v[2],
            max_lon: v[3],
        }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.min_lat, b.max_lat, b.min_lon, b.max_lon]
    }
}

/// Row filter applied while loading a catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CatalogFilter {
    pub bbox: Option<BoundingBox>,
    pub min_magnitude: Option<f64>,
}

impl CatalogFilter {
    pub fn is_active(&self) -> bool {
        self.bbox.is_some() || self.min_magnitude.is_some()
    }
}

/// Starting point `(a, b)` for fitting `y = a·e^(b·x)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct InitialGuess {
    pub a: f64,
    pub b: f64,
}

impl Default for InitialGuess {
    fn default() -> Self {
        Self { a: 1.0, b: 0.1 }
    }
}

impl From<[f64; 2]> for InitialGuess {
    fn from(v: [f64; 2]) -> Self {
        Self { a: v[0], b: v[1] }
    }
}

impl From<InitialGuess> for [f64; 2] {
    fn from(g: InitialGuess) -> Self {
        [g.a, g.b]
    }
}

/// A fitted exponential curve for one energy component.
///
/// Owned by the plotting stage; discarded once the artifacts are rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedCurve {
    pub component: EnergyComponent,
    pub a: f64,
    pub b: f64,
    /// Model prediction at each input magnitude, in input order.
    pub predicted: Vec<f64>,
    /// Sum of squared residuals in joules².
    pub sse: f64,
    /// Number of model evaluations the solver used.
    pub evaluations: usize,
}

/// Outcome of producing one output artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactStatus {
    Written,
    /// Not attempted because the data does not support it (e.g. no depths).
    Skipped(String),
    /// Attempted and failed; the message says why.
    Failed(String),
}

/// One output file of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub name: &'static str,
    pub path: PathBuf,
    pub status: ArtifactStatus,
}

impl Artifact {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, ArtifactStatus::Failed(_))
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags, the optional TOML file and defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub filter: CatalogFilter,
    pub initial_guess: InitialGuess,
    pub mode: PartitionMode,
    pub thermal_floor: ThermalFloor,

    /// Render the SVG artifacts.
    pub plots: bool,
    /// Also print a terminal plot of the radiated component.
    pub ascii_plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/all_month.csv"),
            output_dir: PathBuf::from("output"),
            filter: CatalogFilter::default(),
            initial_guess: InitialGuess::default(),
            mode: PartitionMode::default(),
            thermal_floor: ThermalFloor::default(),
            plots: true,
            ascii_plot: false,
            plot_width: 80,
            plot_height: 20,
        }
    }
}

impl AnalysisConfig {
    /// Augmented table written by the partition stage.
    pub fn energy_table_path(&self) -> PathBuf {
        self.output_dir.join("processed_earthquake_data.csv")
    }

    /// Cleaned catalog written by the preprocess stage.
    pub fn preprocessed_path(&self) -> PathBuf {
        self.output_dir.join("processed_data.csv")
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.output_dir.join("plots")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_bounds_are_inclusive() {
        let bbox = BoundingBox::from([32.5, 42.0, -125.0, -114.0]);
        assert!(bbox.contains(32.5, -125.0));
        assert!(bbox.contains(42.0, -114.0));
        assert!(!bbox.contains(31.9, -120.0));
        assert!(!bbox.contains(35.0, -113.5));
    }

    #[test]
    fn bbox_rejects_inverted_bounds() {
        assert!(BoundingBox::from([32.5, 42.0, -125.0, -114.0]).is_valid());
        assert!(!BoundingBox::from([42.0, 32.5, -125.0, -114.0]).is_valid());
        assert!(!BoundingBox::from([f64::NAN, 42.0, -125.0, -114.0]).is_valid());
    }

    #[test]
    fn component_columns_match_table_schema() {
        let cols: Vec<&str> = EnergyComponent::ALL.iter().map(|c| c.column()).collect();
        assert_eq!(cols, ["E_R", "E_G", "E_H"]);
    }
}
