//! Terminal reports for training runs.

pub mod format;

pub use format::*;
