//! Mathematical utilities: summary statistics, link functions and least squares.

pub mod ols;
pub mod stats;

pub use ols::*;
pub use stats::*;
