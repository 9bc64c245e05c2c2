//! Ordinary least squares solver.
//!
//! Used for the "relaxed" LGD refit: once the penalized path has chosen a
//! predictor set, the coefficients on that set can be re-estimated without
//! shrinkage:
//!
//! ```text
//! minimize Σ (y_i - b0 - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - We use SVD so tall design matrices (many more loans than predictors) are
//!   solved robustly. (Nalgebra's `QR::solve` is intended for square systems.)
//! - Selected predictors can still be nearly collinear, so we retry with
//!   progressively looser singular-value tolerances before giving up.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fit `y = b0 + X β` by least squares and return `(b0, β)`.
pub fn fit_ols_with_intercept(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<(f64, DVector<f64>)> {
    let (n, p) = x.shape();
    let mut design = DMatrix::<f64>::from_element(n, p + 1, 1.0);
    design.view_mut((0, 1), (n, p)).copy_from(x);

    let beta = solve_least_squares(&design, y)?;
    let slopes = beta.rows(1, p).into_owned();
    Some((beta[0], slopes))
}
