//! Pure model functions.
//!
//! - energy partitioning per event (`energy`)
//! - the exponential curve used for diagnostic fits (`exponential`)

pub mod energy;
pub mod exponential;

pub use energy::*;
