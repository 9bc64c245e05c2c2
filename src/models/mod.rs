//! Fitted linear predictors.
//!
//! A model is kept as plain numbers (intercept plus one coefficient per
//! standardized feature) so scoring needs neither the fitter nor the path.

pub mod model;

pub use model::*;
