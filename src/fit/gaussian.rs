//! Elastic-net linear regression path (squared-error loss).
//!
//! Objective per λ:
//!
//! ```text
//! 1/(2n) Σ (y_i - b0 - x_i^T β)^2 + λ [ (1 - α)/2 ‖β‖² + α ‖β‖₁ ]
//! ```
//!
//! Predictors and response are centered once, so the intercept drops out of
//! the coordinate updates and is recovered afterwards as `ȳ - x̄^T β`.
//! Each λ alternates a full sweep with sweeps over the active set until the
//! full sweep changes nothing.

use log::warn;
use nalgebra::{DMatrix, DVector};

use crate::domain::Family;
use crate::error::FitError;
use crate::fit::path::{PathFit, PathSettings, active_set, cd_sweep};

pub fn gaussian_path(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    lambdas: &[f64],
    settings: &PathSettings,
) -> Result<PathFit, FitError> {
    let (n, p) = x.shape();
    let n_f = n as f64;

    let x_means: Vec<f64> = x.column_iter().map(|c| c.mean()).collect();
    let mut xc = x.clone();
    for (j, mut col) in xc.column_iter_mut().enumerate() {
        col.add_scalar_mut(-x_means[j]);
    }
    let y_mean = y.mean();
    let yc = y.add_scalar(-y_mean);

    let curv: Vec<f64> = xc.column_iter().map(|c| c.norm_squared() / n_f).collect();
    let null_var = yc.norm_squared() / n_f;
    let tol = settings.tol * null_var.max(f64::MIN_POSITIVE);

    let mut beta = DVector::<f64>::zeros(p);
    let mut r = yc;

    let mut out = PathFit {
        family: Family::Gaussian,
        lambdas: lambdas.to_vec(),
        intercepts: Vec::with_capacity(lambdas.len()),
        betas: Vec::with_capacity(lambdas.len()),
        converged: Vec::with_capacity(lambdas.len()),
    };

    for &lambda in lambdas {
        let (l1, l2) = settings.penalties(lambda);
        let mut passes = 0usize;
        let mut converged = false;

        while passes < settings.max_iter {
            let dmax = cd_sweep(&xc, None, &curv, &mut beta, &mut r, l1, l2, 0..p);
            passes += 1;
            if dmax < tol {
                converged = true;
                break;
            }

            let active = active_set(&beta);
            while passes < settings.max_iter {
                let d = cd_sweep(&xc, None, &curv, &mut beta, &mut r, l1, l2, active.iter().copied());
                passes += 1;
                if d < tol {
                    break;
                }
            }
        }

        if !converged {
            warn!("Gaussian path did not converge at lambda={lambda:.3e} after {passes} passes");
        }
        if beta.iter().any(|b| !b.is_finite()) {
            return Err(FitError::NonFinite);
        }

        let intercept = y_mean - x_means.iter().zip(beta.iter()).map(|(m, b)| m * b).sum::<f64>();
        out.intercepts.push(intercept);
        out.betas.push(beta.clone());
        out.converged.push(converged);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::lambda_grid::{lambda_max, lambda_path};
    use approx::assert_relative_eq;

    fn design() -> (DMatrix<f64>, DVector<f64>) {
        // y = 1 + 2 * x1; x2 is irrelevant.
        let n = 40;
        let x = DMatrix::from_fn(n, 2, |i, j| {
            let t = i as f64;
            if j == 0 { (t * 0.37).sin() * 3.0 } else { ((t * 1.91).cos() * 2.0).round() }
        });
        let y = DVector::from_fn(n, |i, _| 1.0 + 2.0 * x[(i, 0)]);
        (x, y)
    }

    #[test]
    fn top_of_path_is_all_zero() {
        let (x, y) = design();
        let lambdas = lambda_path(lambda_max(&x, &y, 1.0), 10, 1e-4).unwrap();
        let fit = gaussian_path(&x, &y, &lambdas, &PathSettings::default()).unwrap();

        assert!(fit.betas[0].iter().all(|b| b.abs() < 1e-10));
        assert_relative_eq!(fit.intercepts[0], y.mean(), epsilon = 1e-9);
    }

    #[test]
    fn bottom_of_path_recovers_least_squares() {
        let (x, y) = design();
        let lambdas = lambda_path(lambda_max(&x, &y, 1.0), 30, 1e-6).unwrap();
        let fit = gaussian_path(&x, &y, &lambdas, &PathSettings::default()).unwrap();

        let k = fit.len() - 1;
        assert!(fit.converged[k]);
        assert_relative_eq!(fit.betas[k][0], 2.0, epsilon = 1e-3);
        assert!(fit.betas[k][1].abs() < 1e-3);
        assert_relative_eq!(fit.intercepts[k], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn relevant_predictor_enters_first() {
        let (x, y) = design();
        let lambdas = lambda_path(lambda_max(&x, &y, 1.0), 20, 1e-3).unwrap();
        let fit = gaussian_path(&x, &y, &lambdas, &PathSettings::default()).unwrap();
        let first = (0..fit.len())
            .find(|&k| fit.betas[k].iter().any(|b| b.abs() > 1e-8))
            .unwrap();
        assert!(fit.betas[first][0].abs() > 1e-8);
    }

    #[test]
    fn ridge_keeps_all_coefficients_nonzero() {
        let (x, y) = design();
        let settings = PathSettings {
            alpha: 0.0,
            ..PathSettings::default()
        };
        let lambdas = vec![1.0, 0.1];
        let fit = gaussian_path(&x, &y, &lambdas, &settings).unwrap();
        assert_eq!(fit.n_nonzero(1), 2);
    }
}
