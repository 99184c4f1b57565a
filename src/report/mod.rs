//! Run reports printed to stdout.

mod format;

pub use format::*;
