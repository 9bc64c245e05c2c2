//! Shared regularization-path types and the family dispatch.
//!
//! Both fitters minimise
//!
//! ```text
//! loss(b0, β) + λ [ (1 - α)/2 ‖β‖² + α ‖β‖₁ ]
//! ```
//!
//! over a descending λ path, warm-starting each fit from the previous one.
//! The intercept is never penalized.

use nalgebra::{DMatrix, DVector};

use crate::domain::Family;
use crate::error::FitError;
use crate::math::{sigmoid, soft_threshold};

/// Solver knobs shared by every λ on the path.
#[derive(Debug, Clone, Copy)]
pub struct PathSettings {
    /// Elastic-net mixing: 1 = lasso, 0 = ridge.
    pub alpha: f64,
    /// Upper bound on coordinate-descent passes per λ.
    pub max_iter: usize,
    /// Convergence threshold on the largest weighted squared coefficient change,
    /// relative to the null variance of the response.
    pub tol: f64,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            max_iter: 10_000,
            tol: 1e-7,
        }
    }
}

impl PathSettings {
    pub fn validate(&self) -> Result<(), FitError> {
        if !(self.alpha.is_finite() && (0.0..=1.0).contains(&self.alpha)) {
            return Err(FitError::InvalidAlpha(self.alpha));
        }
        Ok(())
    }

    pub(crate) fn penalties(&self, lambda: f64) -> (f64, f64) {
        (lambda * self.alpha, lambda * (1.0 - self.alpha))
    }
}

/// Coefficients along a λ path.
#[derive(Debug, Clone)]
pub struct PathFit {
    pub family: Family,
    pub lambdas: Vec<f64>,
    pub intercepts: Vec<f64>,
    pub betas: Vec<DVector<f64>>,
    /// Whether each λ converged within `max_iter` passes.
    pub converged: Vec<bool>,
}

impl PathFit {
    pub fn len(&self) -> usize {
        self.lambdas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lambdas.is_empty()
    }

    /// Number of non-zero coefficients at path index `k`.
    pub fn n_nonzero(&self, k: usize) -> usize {
        self.betas[k].iter().filter(|b| **b != 0.0).count()
    }

    /// `b0 + X β` at path index `k`.
    pub fn linear_predictor(&self, x: &DMatrix<f64>, k: usize) -> DVector<f64> {
        let mut eta = x * &self.betas[k];
        eta.add_scalar_mut(self.intercepts[k]);
        eta
    }

    /// Predictions on the response scale (identity or logistic).
    pub fn predict(&self, x: &DMatrix<f64>, k: usize) -> DVector<f64> {
        let eta = self.linear_predictor(x, k);
        match self.family {
            Family::Gaussian => eta,
            Family::Binomial => eta.map(sigmoid),
        }
    }
}

/// Fit the whole λ path for the given family.
pub fn fit_path(
    family: Family,
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    lambdas: &[f64],
    settings: &PathSettings,
) -> Result<PathFit, FitError> {
    settings.validate()?;
    if x.nrows() != y.len() {
        return Err(FitError::DimensionMismatch {
            rows: x.nrows(),
            got: y.len(),
        });
    }
    if lambdas.is_empty() {
        return Err(FitError::InvalidPath("empty lambda path".to_string()));
    }

    match family {
        Family::Gaussian => crate::fit::gaussian::gaussian_path(x, y, lambdas, settings),
        Family::Binomial => crate::fit::binomial::binomial_path(x, y, lambdas, settings),
    }
}

/// One cyclic coordinate-descent sweep over `indices`.
///
/// Minimises `1/(2n) Σ w_i (r_i)^2 + l1 ‖β‖₁ + l2/2 ‖β‖²`, where `r` is the
/// current working residual (kept in sync with `beta`) and `curv[j]` is
/// `1/n Σ w_i x_ij²`. With `weights = None` every `w_i = 1`.
///
/// Returns the largest `curv[j] * Δβ_j²`.
pub(crate) fn cd_sweep(
    x: &DMatrix<f64>,
    weights: Option<&DVector<f64>>,
    curv: &[f64],
    beta: &mut DVector<f64>,
    r: &mut DVector<f64>,
    l1: f64,
    l2: f64,
    indices: impl Iterator<Item = usize>,
) -> f64 {
    let n = x.nrows() as f64;
    let mut dmax = 0.0_f64;

    for j in indices {
        if curv[j] <= 0.0 {
            continue;
        }
        let col = x.column(j);
        let gradient = match weights {
            None => col.dot(&*r),
            Some(w) => col
                .iter()
                .zip(w.iter())
                .zip(r.iter())
                .map(|((xi, wi), ri)| xi * wi * ri)
                .sum::<f64>(),
        } / n;

        let old = beta[j];
        let new = soft_threshold(gradient + curv[j] * old, l1) / (curv[j] + l2);
        if new == old {
            continue;
        }

        let delta = new - old;
        r.axpy(-delta, &col, 1.0);
        beta[j] = new;
        dmax = dmax.max(curv[j] * delta * delta);
    }

    dmax
}

/// Indices of non-zero coefficients.
pub(crate) fn active_set(beta: &DVector<f64>) -> Vec<usize> {
    beta.iter()
        .enumerate()
        .filter_map(|(j, b)| if *b != 0.0 { Some(j) } else { None })
        .collect()
}
