//! Penalized model fitting.
//!
//! - `lambda_grid`: the regularization path
//! - `gaussian` / `binomial`: coordinate-descent path fitters
//! - `cv`: k-fold cross-validation over the path (parallel)
//! - `selection`: predictor ranking, screening and refit

pub mod binomial;
pub mod cv;
pub mod gaussian;
pub mod lambda_grid;
pub mod path;
pub mod selection;

pub use cv::*;
pub use lambda_grid::*;
pub use path::*;
pub use selection::*;
