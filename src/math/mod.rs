//! Numerical utilities: damped least-squares solver for two-parameter models.

pub mod levenberg;

pub use levenberg::*;
