//! Regularization path (λ grid) generation.
//!
//! The path starts at `lambda_max`, the smallest penalty at which every
//! coefficient is zero, and decreases geometrically to
//! `lambda_max * min_ratio`. Fitting from the top down lets every fit
//! warm-start from its neighbour.

use nalgebra::{DMatrix, DVector};

use crate::error::FitError;

/// Below this mixing value the lasso share is treated as `ALPHA_FLOOR` when
/// locating `lambda_max` (a pure ridge path has no finite all-zero point).
const ALPHA_FLOOR: f64 = 1e-3;

/// Default number of λ values on the path.
pub const DEFAULT_NLAMBDA: usize = 100;

/// Smallest λ at which all penalized coefficients are zero.
///
/// `max_j |x_j^T (y - ȳ)| / (n * alpha)`, with `x_j` centered on the fly.
pub fn lambda_max(x: &DMatrix<f64>, y: &DVector<f64>, alpha: f64) -> f64 {
    let n = x.nrows() as f64;
    let y_mean = y.mean();
    let mut best = 0.0_f64;
    for col in x.column_iter() {
        let x_mean = col.mean();
        let mut dot = 0.0;
        for (xi, yi) in col.iter().zip(y.iter()) {
            dot += (xi - x_mean) * (yi - y_mean);
        }
        best = best.max(dot.abs());
    }
    best / (n * alpha.max(ALPHA_FLOOR))
}

/// Default ratio `lambda_min / lambda_max`: deeper paths when rows outnumber columns.
pub fn default_min_ratio(n: usize, p: usize) -> f64 {
    if n > p { 1e-4 } else { 1e-2 }
}

/// Generate `steps` log-spaced values from `max` down to `max * min_ratio` (inclusive).
pub fn lambda_path(max: f64, steps: usize, min_ratio: f64) -> Result<Vec<f64>, FitError> {
    if !(max.is_finite() && max > 0.0) {
        return Err(FitError::InvalidPath(format!(
            "lambda_max={max} (the response may be constant or the predictors uninformative)"
        )));
    }
    if !(min_ratio.is_finite() && min_ratio > 0.0 && min_ratio < 1.0) {
        return Err(FitError::InvalidPath(format!(
            "min_ratio={min_ratio} (must be in (0, 1))"
        )));
    }
    if steps < 2 {
        return Err(FitError::InvalidPath("need at least 2 lambda values".to_string()));
    }

    let ln_max = max.ln();
    let ln_min = (max * min_ratio).ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    Ok((0..steps).map(|i| (ln_max - step * i as f64).exp()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn path_is_descending_and_includes_endpoints() {
        let path = lambda_path(2.0, 5, 1e-2).unwrap();
        assert_eq!(path.len(), 5);
        assert_relative_eq!(path[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(path[4], 0.02, epsilon = 1e-12);
        assert!(path.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn lambda_max_matches_hand_computation() {
        // x centered: [-1, 0, 1]; y centered: [-2, 0, 2] => dot = 4; n = 3.
        let x = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 3.0]);
        let y = DVector::from_row_slice(&[0.0, 2.0, 4.0]);
        assert_relative_eq!(lambda_max(&x, &y, 1.0), 4.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(lambda_max(&x, &y, 0.5), 8.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn constant_response_is_rejected() {
        let x = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 3.0]);
        let y = DVector::from_element(3, 1.0);
        let max = lambda_max(&x, &y, 1.0);
        assert!(lambda_path(max, 10, 1e-3).is_err());
    }

    #[test]
    fn min_ratio_depends_on_shape() {
        assert_eq!(default_min_ratio(100, 10), 1e-4);
        assert_eq!(default_min_ratio(10, 100), 1e-2);
    }
}
