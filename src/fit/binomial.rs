//! Elastic-net logistic regression path.
//!
//! Each λ is fitted by iteratively reweighted least squares: the binomial
//! log-likelihood is replaced by its quadratic approximation at the current
//! estimate (working weights `p(1-p)`, working response `η + (y - p)/w`) and
//! that penalized weighted least-squares problem is solved by coordinate
//! descent. The outer loop stops once the deviance settles.

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

use crate::domain::Family;
use crate::error::FitError;
use crate::fit::path::{PathFit, PathSettings, active_set, cd_sweep};
use crate::math::{binomial_deviance, logit, sigmoid};

/// IRLS iterations per λ.
const MAX_OUTER: usize = 25;

/// Working weights are floored so fitted probabilities of 0/1 cannot stall the solver.
const W_FLOOR: f64 = 1e-5;

/// Relative deviance change that ends the IRLS loop.
const DEV_TOL: f64 = 1e-8;

pub fn binomial_path(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    lambdas: &[f64],
    settings: &PathSettings,
) -> Result<PathFit, FitError> {
    if let Some(bad) = y.iter().find(|v| **v != 0.0 && **v != 1.0) {
        return Err(FitError::NonBinary(*bad));
    }
    let y_bar = y.mean();
    if y_bar <= 0.0 || y_bar >= 1.0 {
        return Err(FitError::SingleClass(y_bar));
    }

    let (n, p) = x.shape();
    let n_f = n as f64;
    let tol = settings.tol * y_bar * (1.0 - y_bar);

    let mut b0 = logit(y_bar);
    let mut beta = DVector::<f64>::zeros(p);

    let mut out = PathFit {
        family: Family::Binomial,
        lambdas: lambdas.to_vec(),
        intercepts: Vec::with_capacity(lambdas.len()),
        betas: Vec::with_capacity(lambdas.len()),
        converged: Vec::with_capacity(lambdas.len()),
    };

    for &lambda in lambdas {
        let (l1, l2) = settings.penalties(lambda);
        let mut dev_old = deviance(x, y, b0, &beta);
        let mut passes = 0usize;
        let mut converged = false;

        for outer in 0..MAX_OUTER {
            let mut eta = x * &beta;
            eta.add_scalar_mut(b0);
            let prob = eta.map(sigmoid);
            let w = prob.map(|p| (p * (1.0 - p)).max(W_FLOOR));
            let w_sum = w.sum();
            let mut r = DVector::from_fn(n, |i, _| (y[i] - prob[i]) / w[i]);
            let curv: Vec<f64> = x
                .column_iter()
                .map(|c| c.iter().zip(w.iter()).map(|(xi, wi)| wi * xi * xi).sum::<f64>() / n_f)
                .collect();

            while passes < settings.max_iter {
                let dmax = cd_sweep(x, Some(&w), &curv, &mut beta, &mut r, l1, l2, 0..p)
                    .max(update_intercept(&w, w_sum, n_f, &mut b0, &mut r));
                passes += 1;
                if dmax < tol {
                    break;
                }

                let active = active_set(&beta);
                while passes < settings.max_iter {
                    let d = cd_sweep(x, Some(&w), &curv, &mut beta, &mut r, l1, l2, active.iter().copied())
                        .max(update_intercept(&w, w_sum, n_f, &mut b0, &mut r));
                    passes += 1;
                    if d < tol {
                        break;
                    }
                }
            }

            if !b0.is_finite() || beta.iter().any(|b| !b.is_finite()) {
                return Err(FitError::NonFinite);
            }

            let dev = deviance(x, y, b0, &beta);
            if (dev - dev_old).abs() / (dev.abs() + 0.1) < DEV_TOL {
                debug!("lambda={lambda:.3e}: IRLS converged after {} outer step(s)", outer + 1);
                converged = true;
                break;
            }
            dev_old = dev;
            if passes >= settings.max_iter {
                break;
            }
        }

        if !converged {
            warn!("Binomial path did not converge at lambda={lambda:.3e} ({passes} passes)");
        }

        out.intercepts.push(b0);
        out.betas.push(beta.clone());
        out.converged.push(converged);
    }

    Ok(out)
}

/// Unpenalized intercept step of the weighted least-squares problem.
fn update_intercept(w: &DVector<f64>, w_sum: f64, n: f64, b0: &mut f64, r: &mut DVector<f64>) -> f64 {
    let delta = w.dot(&*r) / w_sum;
    *b0 += delta;
    r.add_scalar_mut(-delta);
    (w_sum / n) * delta * delta
}

/// Total binomial deviance at `(b0, β)`.
pub fn deviance(x: &DMatrix<f64>, y: &DVector<f64>, b0: f64, beta: &DVector<f64>) -> f64 {
    let mut eta = x * beta;
    eta.add_scalar_mut(b0);
    eta.iter()
        .zip(y.iter())
        .map(|(e, yi)| binomial_deviance(*yi, sigmoid(*e)))
        .sum()
}
