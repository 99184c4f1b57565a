//! Command-line parsing for the earthquake energy analysis.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! energy/fitting code. Flags are all optional here; defaults live in
//! `config` so the TOML file can sit between the CLI and the built-ins.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::ConfigLayer;
use crate::domain::{BoundingBox, InitialGuess, PartitionMode, ThermalFloor};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "quake", version, about = "Earthquake energy partitioning and exponential fit plots")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Partition, export, fit and plot in one go (the default).
    Run(RunArgs),
    /// Clean a raw catalog into `<output_dir>/processed_data.csv`.
    Preprocess(CommonArgs),
    /// Partition a catalog and write `<output_dir>/processed_earthquake_data.csv`.
    Partition(CommonArgs),
    /// Fit and plot a previously written energy table.
    Plot(PlotArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone, Default)]
pub struct CommonArgs {
    /// TOML configuration file; CLI flags and env vars override its values.
    #[arg(long, value_name = "TOML", env = "QUAKE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Input catalog CSV [default: data/all_month.csv].
    #[arg(short, long, value_name = "CSV", env = "QUAKE_INPUT")]
    pub input: Option<PathBuf>,

    /// Output directory, created if absent [default: output].
    #[arg(short, long, value_name = "DIR", env = "QUAKE_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Bounding box as `min_lat,max_lat,min_lon,max_lon`.
    #[arg(long, value_name = "BOUNDS", env = "QUAKE_BBOX", value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: Option<BoundingBox>,

    /// Drop events below this magnitude.
    #[arg(long, env = "QUAKE_MIN_MAGNITUDE", allow_hyphen_values = true)]
    pub min_magnitude: Option<f64>,

    /// Energy partition mode [default: physical-residual].
    #[arg(long, value_enum, env = "QUAKE_MODE")]
    pub mode: Option<PartitionMode>,

    /// Replacement for a negative thermal residual [default: zero].
    #[arg(long, value_enum, env = "QUAKE_THERMAL_FLOOR")]
    pub thermal_floor: Option<ThermalFloor>,

    /// Debug-level logging (ignored when RUST_LOG is set).
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// The settings given on the command line (or via env vars).
    pub fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            input: self.input.clone(),
            output_dir: self.output_dir.clone(),
            bbox: self.bbox,
            min_magnitude: self.min_magnitude,
            initial_guess: None,
            mode: self.mode,
            thermal_floor: self.thermal_floor,
        }
    }
}

/// Fitting and rendering options.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Initial `(a, b)` for `y = a·e^(b·x)`, as `a,b` [default: 1,0.1].
    #[arg(long, value_name = "A,B", env = "QUAKE_GUESS", value_parser = parse_guess, allow_hyphen_values = true)]
    pub guess: Option<InitialGuess>,

    /// Skip the SVG plots.
    #[arg(long)]
    pub no_plots: bool,

    /// Also print an ASCII plot of radiated energy vs magnitude.
    #[arg(long)]
    pub ascii: bool,

    /// ASCII plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// ASCII plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    #[command(flatten)]
    pub fit: FitArgs,
}

#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    #[command(flatten)]
    pub fit: FitArgs,

    /// Energy table to plot [default: <output_dir>/processed_earthquake_data.csv].
    #[arg(long, value_name = "CSV")]
    pub table: Option<PathBuf>,
}

/// Parse `min_lat,max_lat,min_lon,max_lon`.
pub fn parse_bbox(s: &str) -> Result<BoundingBox, String> {
    let v = parse_floats(s)?;
    let bounds: [f64; 4] = v
        .try_into()
        .map_err(|v: Vec<f64>| format!("expected 4 comma-separated numbers, got {}", v.len()))?;
    let bbox = BoundingBox::from(bounds);
    if !bbox.is_valid() {
        return Err("bounds must be finite with min <= max".to_string());
    }
    Ok(bbox)
}

/// Parse `a,b`.
pub fn parse_guess(s: &str) -> Result<InitialGuess, String> {
    let v = parse_floats(s)?;
    let pair: [f64; 2] = v
        .try_into()
        .map_err(|v: Vec<f64>| format!("expected 2 comma-separated numbers, got {}", v.len()))?;
    if !pair.iter().all(|x| x.is_finite()) {
        return Err("values must be finite".to_string());
    }
    Ok(InitialGuess::from(pair))
}

fn parse_floats(s: &str) -> Result<Vec<f64>, String> {
    s.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>().map_err(|_| format!("'{part}' is not a number"))
        })
        .collect()
}
