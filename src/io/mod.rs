//! Input/output helpers.
//!
//! - CSV ingest + validation + filtering (`ingest`)
//! - raw catalog cleanup (`preprocess`)
//! - augmented table export (`export`)

pub mod export;
pub mod ingest;
pub mod preprocess;

pub use export::*;
pub use ingest::*;
pub use preprocess::*;
