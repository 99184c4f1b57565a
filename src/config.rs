//! Layered run configuration.
//!
//! A `ConfigLayer` is a set of optional settings. Layers come from the TOML
//! file (`--config`) and from CLI flags / `QUAKE_*` environment variables; the
//! CLI layer is overlaid on the file layer and the result is resolved against
//! built-in defaults into an `AnalysisConfig`.
//!
//! Example file:
//!
//! ```toml
//! input = "data/all_month.csv"
//! output_dir = "output"
//! bbox = [32.5, 42.0, -125.0, -114.0]
//! min_magnitude = 3.0
//! initial_guess = [1.0, 0.1]
//! mode = "physical-residual"
//! thermal_floor = "zero"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::{AnalysisConfig, BoundingBox, CatalogFilter, InitialGuess, PartitionMode, ThermalFloor};
use crate::error::AppError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub input: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub bbox: Option<BoundingBox>,
    pub min_magnitude: Option<f64>,
    pub initial_guess: Option<InitialGuess>,
    pub mode: Option<PartitionMode>,
    pub thermal_floor: Option<ThermalFloor>,
}

impl ConfigLayer {
    /// Settings present in `top` replace the ones in `self`.
    pub fn overlay(self, top: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            input: top.input.or(self.input),
            output_dir: top.output_dir.or(self.output_dir),
            bbox: top.bbox.or(self.bbox),
            min_magnitude: top.min_magnitude.or(self.min_magnitude),
            initial_guess: top.initial_guess.or(self.initial_guess),
            mode: top.mode.or(self.mode),
            thermal_floor: top.thermal_floor.or(self.thermal_floor),
        }
    }

    /// Fill unset values from defaults and validate.
    ///
    /// Presentation settings (plots, terminal plot size) keep their defaults;
    /// the caller sets them from its own flags.
    pub fn resolve(self) -> Result<AnalysisConfig, AppError> {
        let defaults = AnalysisConfig::default();

        if let Some(bbox) = &self.bbox {
            if !bbox.is_valid() {
                return Err(AppError::config(format!(
                    "Invalid bounding box {:?}: bounds must be finite with min <= max.",
                    <[f64; 4]>::from(*bbox)
                )));
            }
        }
        if let Some(m) = self.min_magnitude {
            if !m.is_finite() {
                return Err(AppError::config(format!("Invalid minimum magnitude: {m}")));
            }
        }
        if let Some(g) = self.initial_guess {
            if !(g.a.is_finite() && g.b.is_finite()) {
                return Err(AppError::config(format!(
                    "Invalid initial guess ({}, {}): both values must be finite.",
                    g.a, g.b
                )));
            }
        }

        Ok(AnalysisConfig {
            input: self.input.unwrap_or(defaults.input),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            filter: CatalogFilter {
                bbox: self.bbox,
                min_magnitude: self.min_magnitude,
            },
            initial_guess: self.initial_guess.unwrap_or(defaults.initial_guess),
            mode: self.mode.unwrap_or(defaults.mode),
            thermal_floor: self.thermal_floor.unwrap_or(defaults.thermal_floor),
            ..defaults
        })
    }
}

/// Read a TOML configuration file.
///
/// Any failure here (missing file, bad syntax, unknown key) is a configuration
/// error.
pub fn load_config_file(path: &Path) -> Result<ConfigLayer, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::config(format!("Failed to read config file '{}': {e}", path.display())))?;
    parse_config(&content)
        .map_err(|e| AppError::config(format!("Invalid config file '{}': {e}", path.display())))
}

pub fn parse_config(content: &str) -> Result<ConfigLayer, toml::de::Error> {
    toml::from_str(content)
}
