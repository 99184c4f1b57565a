//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration enums (`PartitionMode`, `ThermalFloor`) and the resolved
//!   `AnalysisConfig`
//! - observed events (`Event`) and their derived `EnergyBreakdown`
//! - fit outputs (`FittedCurve`)

pub mod types;

pub use types::*;
