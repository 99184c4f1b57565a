//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit `y = a·e^(b·x)` to one column pair (`fitter`)
//! - run one independent fit per energy component and collect skips
//!   (`components`)

pub mod components;
pub mod fitter;

pub use components::*;
pub use fitter::*;
