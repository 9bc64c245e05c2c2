//! Holdout evaluation metrics.

pub mod classification;
pub mod regression;

pub use classification::*;
pub use regression::*;
