//! Predictor ranking and the final refit.
//!
//! 1. Cross-validate the path on every prepared feature.
//! 2. Rank features by absolute standardized coefficient at the chosen λ.
//! 3. Keep the top `max_predictors` and cross-validate again on them alone.
//! 4. Optionally (gaussian only) refit the surviving set without penalty.
//!
//! An empty ranking yields an intercept-only model.

use log::{info, warn};
use nalgebra::{DMatrix, DVector};

use crate::domain::{Family, LambdaRule};
use crate::error::FitError;
use crate::fit::cv::{CvFit, CvSettings, cross_validate};
use crate::math::fit_ols_with_intercept;

#[derive(Debug, Clone, Copy)]
pub struct SelectionSettings {
    pub cv: CvSettings,
    pub lambda_rule: LambdaRule,
    /// `0` keeps every non-zero predictor.
    pub max_predictors: usize,
    pub relaxed: bool,
}

/// A predictor with a non-zero coefficient at the screening λ.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPredictor {
    /// Column in the screening matrix.
    pub index: usize,
    pub name: String,
    pub coefficient: f64,
}

/// Outcome of ranking and refitting.
#[derive(Debug, Clone)]
pub struct Selection {
    pub family: Family,
    pub screening: CvFit,
    pub ranking: Vec<RankedPredictor>,
    /// CV on the kept predictors; `None` for an intercept-only model.
    pub refit: Option<CvFit>,
    pub lambda_rule: LambdaRule,
    pub lambda: f64,
    pub intercept: f64,
    /// Columns of the screening matrix used by the final model.
    pub features: Vec<usize>,
    /// Coefficients aligned with `features`.
    pub coefficients: Vec<f64>,
    /// Whether the coefficients come from an unpenalized refit.
    pub relaxed: bool,
}

impl Selection {
    pub fn is_intercept_only(&self) -> bool {
        self.features.is_empty()
    }

    /// The CV run that fixed the final λ.
    pub fn final_cv(&self) -> &CvFit {
        self.refit.as_ref().unwrap_or(&self.screening)
    }
}

/// Non-zero coefficients at the rule's λ, largest magnitude first (ties keep column order).
pub fn rank_predictors(cv: &CvFit, names: &[String], rule: LambdaRule) -> Vec<RankedPredictor> {
    let beta = &cv.path.betas[cv.index(rule)];
    let mut ranked: Vec<RankedPredictor> = beta
        .iter()
        .enumerate()
        .filter(|(_, b)| **b != 0.0)
        .map(|(index, b)| RankedPredictor {
            index,
            name: names[index].clone(),
            coefficient: *b,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.coefficient
            .abs()
            .partial_cmp(&a.coefficient.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

pub fn fit_and_select(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    names: &[String],
    family: Family,
    settings: &SelectionSettings,
) -> Result<Selection, FitError> {
    let screening = cross_validate(x, y, family, &settings.cv)?;
    let rule = settings.lambda_rule;
    let ranking = rank_predictors(&screening, names, rule);

    if ranking.is_empty() {
        warn!(
            "No predictor is non-zero at {}; the model is intercept-only",
            rule.label()
        );
        let k = screening.index(rule);
        return Ok(Selection {
            family,
            lambda: screening.lambdas[k],
            intercept: screening.path.intercepts[k],
            screening,
            ranking,
            refit: None,
            lambda_rule: rule,
            features: Vec::new(),
            coefficients: Vec::new(),
            relaxed: false,
        });
    }

    let limit = if settings.max_predictors == 0 {
        ranking.len()
    } else {
        settings.max_predictors.min(ranking.len())
    };
    let mut kept: Vec<usize> = ranking[..limit].iter().map(|r| r.index).collect();
    kept.sort_unstable();
    info!(
        "Screening kept {} of {} ranked predictor(s) (limit {})",
        kept.len(),
        ranking.len(),
        settings.max_predictors
    );

    let x_kept = x.select_columns(kept.iter());
    let refit = cross_validate(&x_kept, y, family, &settings.cv)?;
    let k = refit.index(rule);
    let beta = &refit.path.betas[k];

    let active: Vec<usize> = (0..kept.len()).filter(|&j| beta[j] != 0.0).collect();
    let features: Vec<usize> = active.iter().map(|&j| kept[j]).collect();
    let mut coefficients: Vec<f64> = active.iter().map(|&j| beta[j]).collect();
    let mut intercept = refit.path.intercepts[k];
    let mut relaxed = false;

    if settings.relaxed && family == Family::Gaussian && !active.is_empty() {
        let x_active = x.select_columns(features.iter());
        match fit_ols_with_intercept(&x_active, y) {
            Some((b0, b)) => {
                intercept = b0;
                coefficients = b.iter().copied().collect();
                relaxed = true;
            }
            None => warn!("Relaxed refit is ill-conditioned; keeping penalized coefficients"),
        }
    } else if settings.relaxed && family == Family::Binomial {
        warn!("Relaxed refit applies to gaussian models only; ignored");
    }

    if features.is_empty() {
        warn!("Refit left no non-zero predictor; the model is intercept-only");
    }

    Ok(Selection {
        family,
        screening,
        ranking,
        lambda: refit.lambdas[k],
        refit: Some(refit),
        lambda_rule: rule,
        intercept,
        features,
        coefficients,
        relaxed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Measure;

    fn names(p: usize) -> Vec<String> {
        (0..p).map(|j| format!("x{j}")).collect()
    }

    fn design(n: usize) -> (DMatrix<f64>, DVector<f64>) {
        // Two informative columns with different strengths, three noise columns.
        let x = DMatrix::from_fn(n, 5, |i, j| {
            let t = i as f64 + 1.0;
            (t * (0.31 + 0.57 * j as f64)).sin()
        });
        let y = DVector::from_fn(n, |i, _| 0.2 + 3.0 * x[(i, 3)] - 1.0 * x[(i, 1)]);
        (x, y)
    }

    fn settings(max_predictors: usize, relaxed: bool) -> SelectionSettings {
        SelectionSettings {
            cv: CvSettings {
                nfolds: 5,
                nlambda: 40,
                measure: Measure::Mse,
                ..CvSettings::default()
            },
            lambda_rule: LambdaRule::Min,
            max_predictors,
            relaxed,
        }
    }

    #[test]
    fn ranking_orders_by_magnitude() {
        let (x, y) = design(100);
        let sel = fit_and_select(&x, &y, &names(5), Family::Gaussian, &settings(0, false)).unwrap();
        assert_eq!(sel.ranking[0].name, "x3");
        assert_eq!(sel.ranking[1].name, "x1");
        assert!(sel.ranking[1].coefficient < 0.0);
        assert!(
            sel.ranking
                .windows(2)
                .all(|w| w[0].coefficient.abs() >= w[1].coefficient.abs())
        );
    }

    #[test]
    fn max_predictors_caps_the_final_model() {
        let (x, y) = design(100);
        let sel = fit_and_select(&x, &y, &names(5), Family::Gaussian, &settings(1, false)).unwrap();
        assert_eq!(sel.features, vec![3]);
        assert_eq!(sel.coefficients.len(), 1);
        assert!(sel.refit.is_some());
    }

    #[test]
    fn relaxed_refit_recovers_unshrunk_coefficients() {
        let (x, y) = design(100);
        let sel = fit_and_select(&x, &y, &names(5), Family::Gaussian, &settings(2, true)).unwrap();
        assert!(sel.relaxed);
        assert_eq!(sel.features, vec![1, 3]);
        assert!((sel.coefficients[0] + 1.0).abs() < 1e-6);
        assert!((sel.coefficients[1] - 3.0).abs() < 1e-6);
        assert!((sel.intercept - 0.2).abs() < 1e-6);
    }

    fn handmade_cv(beta: &[f64]) -> CvFit {
        use crate::fit::path::PathFit;
        CvFit {
            measure: Measure::Mse,
            lambdas: vec![1.0, 0.5],
            cvm: vec![1.0, 0.8],
            cvsd: vec![0.1, 0.1],
            nzero: vec![0, beta.iter().filter(|b| **b != 0.0).count()],
            index_min: 1,
            index_1se: 0,
            fold_sizes: vec![3, 3, 3],
            path: PathFit {
                family: Family::Gaussian,
                lambdas: vec![1.0, 0.5],
                intercepts: vec![0.4, 0.3],
                betas: vec![DVector::zeros(beta.len()), DVector::from_row_slice(beta)],
                converged: vec![true, true],
            },
        }
    }

    #[test]
    fn rank_skips_zeros_and_keeps_column_order_on_ties() {
        let cv = handmade_cv(&[0.5, 0.0, -0.5, 2.0]);
        let ranked = rank_predictors(&cv, &names(4), LambdaRule::Min);
        let order: Vec<&str> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(order, vec!["x3", "x0", "x2"]);

        assert!(rank_predictors(&cv, &names(4), LambdaRule::OneSe).is_empty());
    }
}
