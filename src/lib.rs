//! `quake-energy` library crate.
//!
//! The binary (`quake`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the energy model and the fitter can be used on their own

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod telemetry;
