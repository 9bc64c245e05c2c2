//! K-fold cross-validation over a regularization path.
//!
//! The λ path is computed once on the full matrix. Each fold refits that
//! path without its own rows and scores them; fold scores are combined into
//! a mean curve (`cvm`) and its standard error (`cvsd`), from which
//! `lambda.min` and `lambda.1se` are read.
//!
//! Folds are fitted in parallel with rayon. When called inside a dedicated
//! `ThreadPool` the fold work runs on that pool.

use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;

use crate::domain::{Family, LambdaRule, Measure};
use crate::error::FitError;
use crate::fit::lambda_grid::{DEFAULT_NLAMBDA, default_min_ratio, lambda_max, lambda_path};
use crate::fit::path::{PathFit, PathSettings, fit_path};
use crate::math::binomial_deviance;
use crate::metrics::{auc, misclassification};

/// Smallest number of folds that gives a usable standard error.
pub const MIN_FOLDS: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct CvSettings {
    pub path: PathSettings,
    pub nfolds: usize,
    pub nlambda: usize,
    /// `None` picks `default_min_ratio(n, p)`.
    pub lambda_min_ratio: Option<f64>,
    pub measure: Measure,
    pub seed: u64,
}

impl Default for CvSettings {
    fn default() -> Self {
        Self {
            path: PathSettings::default(),
            nfolds: 10,
            nlambda: DEFAULT_NLAMBDA,
            lambda_min_ratio: None,
            measure: Measure::Mse,
            seed: 42,
        }
    }
}

/// Cross-validated path.
#[derive(Debug, Clone)]
pub struct CvFit {
    pub measure: Measure,
    pub lambdas: Vec<f64>,
    /// Mean fold score per λ.
    pub cvm: Vec<f64>,
    /// Standard error of `cvm` per λ.
    pub cvsd: Vec<f64>,
    /// Non-zero coefficients of the full-data fit per λ.
    pub nzero: Vec<usize>,
    pub index_min: usize,
    pub index_1se: usize,
    pub fold_sizes: Vec<usize>,
    /// Path fitted on every row.
    pub path: PathFit,
}

impl CvFit {
    pub fn lambda_min(&self) -> f64 {
        self.lambdas[self.index_min]
    }

    pub fn lambda_1se(&self) -> f64 {
        self.lambdas[self.index_1se]
    }

    pub fn index(&self, rule: LambdaRule) -> usize {
        match rule {
            LambdaRule::Min => self.index_min,
            LambdaRule::OneSe => self.index_1se,
        }
    }

    pub fn nfolds(&self) -> usize {
        self.fold_sizes.len()
    }
}

/// Cross-validate an elastic-net path.
pub fn cross_validate(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    family: Family,
    settings: &CvSettings,
) -> Result<CvFit, FitError> {
    let (n, p) = x.shape();
    if settings.nfolds < MIN_FOLDS {
        return Err(FitError::TooFewFolds(settings.nfolds));
    }
    if n < settings.nfolds {
        return Err(FitError::TooFewRows {
            rows: n,
            folds: settings.nfolds,
        });
    }
    if y.len() != n {
        return Err(FitError::DimensionMismatch { rows: n, got: y.len() });
    }
    if family == Family::Gaussian && settings.measure.binomial_only() {
        return Err(FitError::MeasureFamily(settings.measure.name()));
    }
    settings.path.validate()?;

    let min_ratio = settings.lambda_min_ratio.unwrap_or_else(|| default_min_ratio(n, p));
    let lambdas = lambda_path(lambda_max(x, y, settings.path.alpha), settings.nlambda, min_ratio)?;
    debug!(
        "lambda path: {} values from {:.4e} to {:.4e}",
        lambdas.len(),
        lambdas[0],
        lambdas[lambdas.len() - 1]
    );

    let path = fit_path(family, x, y, &lambdas, &settings.path)?;

    let folds = assign_folds(n, settings.nfolds, settings.seed);
    let fold_scores: Vec<(usize, Vec<f64>)> = (0..settings.nfolds)
        .into_par_iter()
        .map(|f| score_fold(x, y, family, &lambdas, &folds, f, settings))
        .collect::<Result<Vec<_>, FitError>>()?;

    let (cvm, cvsd) = combine_folds(&fold_scores, lambdas.len());
    let index_min = best_index(&cvm, settings.measure).ok_or(FitError::NonFinite)?;
    let index_1se = one_se_index(&cvm, &cvsd, index_min, settings.measure);

    let nzero = (0..path.len()).map(|k| path.n_nonzero(k)).collect();
    let fold_sizes = fold_scores.iter().map(|(size, _)| *size).collect();

    info!(
        "{}-fold CV ({}): lambda.min={:.4e} ({}={:.5}), lambda.1se={:.4e}",
        settings.nfolds,
        settings.measure.name(),
        lambdas[index_min],
        settings.measure.name(),
        cvm[index_min],
        lambdas[index_1se]
    );

    Ok(CvFit {
        measure: settings.measure,
        lambdas,
        cvm,
        cvsd,
        nzero,
        index_min,
        index_1se,
        fold_sizes,
        path,
    })
}

/// Fold id per row: a seeded shuffle dealt round-robin, so fold sizes differ by at most one.
pub fn assign_folds(n: usize, nfolds: usize, seed: u64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let mut folds = vec![0usize; n];
    for (pos, &row) in order.iter().enumerate() {
        folds[row] = pos % nfolds;
    }
    folds
}

/// Fit the path without fold `f` and score fold `f` at every λ.
fn score_fold(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    family: Family,
    lambdas: &[f64],
    folds: &[usize],
    f: usize,
    settings: &CvSettings,
) -> Result<(usize, Vec<f64>), FitError> {
    let train: Vec<usize> = (0..folds.len()).filter(|&i| folds[i] != f).collect();
    let held: Vec<usize> = (0..folds.len()).filter(|&i| folds[i] == f).collect();

    let x_train = x.select_rows(train.iter());
    let y_train = DVector::from_iterator(train.len(), train.iter().map(|&i| y[i]));
    let x_held = x.select_rows(held.iter());
    let y_held: Vec<f64> = held.iter().map(|&i| y[i]).collect();

    let fit = fit_path(family, &x_train, &y_train, lambdas, &settings.path)?;
    let scores = (0..fit.len())
        .map(|k| {
            let pred: Vec<f64> = fit.predict(&x_held, k).iter().copied().collect();
            fold_measure(settings.measure, family, &y_held, &pred)
        })
        .collect();
    Ok((held.len(), scores))
}

/// Score one fold's predictions. Undefined scores (AUC on a single-class fold) are `NaN`.
pub fn fold_measure(measure: Measure, family: Family, y: &[f64], pred: &[f64]) -> f64 {
    let n = y.len() as f64;
    match measure {
        Measure::Mse => y.iter().zip(pred).map(|(a, b)| (a - b) * (a - b)).sum::<f64>() / n,
        Measure::Mae => y.iter().zip(pred).map(|(a, b)| (a - b).abs()).sum::<f64>() / n,
        Measure::Deviance => match family {
            Family::Gaussian => fold_measure(Measure::Mse, family, y, pred),
            Family::Binomial => y.iter().zip(pred).map(|(a, b)| binomial_deviance(*a, *b)).sum::<f64>() / n,
        },
        Measure::Class => misclassification(pred, y, 0.5),
        Measure::Auc => auc(pred, y).unwrap_or(f64::NAN),
    }
}

/// Fold-size weighted mean and standard error per λ, skipping `NaN` fold scores.
fn combine_folds(fold_scores: &[(usize, Vec<f64>)], nlambda: usize) -> (Vec<f64>, Vec<f64>) {
    let mut cvm = Vec::with_capacity(nlambda);
    let mut cvsd = Vec::with_capacity(nlambda);

    for k in 0..nlambda {
        let used: Vec<(f64, f64)> = fold_scores
            .iter()
            .filter(|(_, s)| s[k].is_finite())
            .map(|(w, s)| (*w as f64, s[k]))
            .collect();
        let w_sum: f64 = used.iter().map(|(w, _)| w).sum();
        if used.is_empty() || w_sum <= 0.0 {
            cvm.push(f64::NAN);
            cvsd.push(f64::NAN);
            continue;
        }

        let m = used.iter().map(|(w, s)| w * s).sum::<f64>() / w_sum;
        let sd = if used.len() > 1 {
            let var = used.iter().map(|(w, s)| w * (s - m) * (s - m)).sum::<f64>() / w_sum;
            (var / (used.len() as f64 - 1.0)).sqrt()
        } else {
            0.0
        };
        cvm.push(m);
        cvsd.push(sd);
    }

    (cvm, cvsd)
}

fn best_index(cvm: &[f64], measure: Measure) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (k, v) in cvm.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        let better = match best {
            None => true,
            Some(b) if measure.higher_is_better() => *v > cvm[b],
            Some(b) => *v < cvm[b],
        };
        if better {
            best = Some(k);
        }
    }
    best
}

/// Largest λ (smallest index) whose score is within one standard error of the best.
fn one_se_index(cvm: &[f64], cvsd: &[f64], index_min: usize, measure: Measure) -> usize {
    let se = if cvsd[index_min].is_finite() { cvsd[index_min] } else { 0.0 };
    let best = cvm[index_min];
    (0..=index_min)
        .find(|&k| {
            cvm[k].is_finite()
                && if measure.higher_is_better() {
                    cvm[k] >= best - se
                } else {
                    cvm[k] <= best + se
                }
        })
        .unwrap_or(index_min)
}
