//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON (fitted model artifacts)
//! - reloaded later for scoring new loan files

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which quantity a model estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Loss Given Default: the fraction of exposure lost once a loan defaults.
    Lgd,
    /// Probability of Default: `loss > 0`.
    Pd,
}

impl TargetKind {
    pub fn display_name(self) -> &'static str {
        match self {
            TargetKind::Lgd => "LGD",
            TargetKind::Pd => "PD",
        }
    }

    /// Header of the single-column prediction CSV.
    pub fn output_column(self) -> &'static str {
        match self {
            TargetKind::Lgd => "lgd",
            TargetKind::Pd => "pd",
        }
    }

    pub fn family(self) -> Family {
        match self {
            TargetKind::Lgd => Family::Gaussian,
            TargetKind::Pd => Family::Binomial,
        }
    }

    pub fn default_measure(self) -> Measure {
        match self {
            TargetKind::Lgd => Measure::Mse,
            TargetKind::Pd => Measure::Auc,
        }
    }
}

/// Response distribution / link of a linear model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// Identity link, squared-error loss.
    Gaussian,
    /// Logit link, binomial deviance.
    Binomial,
}

/// Loss used to score held-out folds during cross-validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    /// Mean squared error.
    Mse,
    /// Mean absolute error.
    Mae,
    /// Mean deviance (squared error for gaussian, binomial deviance otherwise).
    Deviance,
    /// Misclassification rate at a 0.5 threshold (binomial only).
    Class,
    /// Area under the ROC curve (binomial only, higher is better).
    Auc,
}

impl Measure {
    pub fn name(self) -> &'static str {
        match self {
            Measure::Mse => "mse",
            Measure::Mae => "mae",
            Measure::Deviance => "deviance",
            Measure::Class => "class",
            Measure::Auc => "auc",
        }
    }

    pub fn higher_is_better(self) -> bool {
        matches!(self, Measure::Auc)
    }

    pub fn binomial_only(self) -> bool {
        matches!(self, Measure::Class | Measure::Auc)
    }
}

/// Which point on the cross-validated path is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum LambdaRule {
    /// The λ with the best mean CV error.
    #[serde(rename = "min")]
    #[value(name = "min")]
    Min,
    /// The largest λ whose CV error is within one standard error of the best.
    #[serde(rename = "1se")]
    #[value(name = "1se")]
    OneSe,
}

impl LambdaRule {
    pub fn label(self) -> &'static str {
        match self {
            LambdaRule::Min => "lambda.min",
            LambdaRule::OneSe => "lambda.1se",
        }
    }
}

/// Closed interval predictions are clipped to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipRange {
    pub lo: f64,
    pub hi: f64,
}

impl ClipRange {
    /// Finite bounds with `lo <= hi`; `apply` relies on this.
    pub fn is_valid(&self) -> bool {
        self.lo.is_finite() && self.hi.is_finite() && self.lo <= self.hi
    }

    pub fn apply(&self, v: f64) -> f64 {
        v.clamp(self.lo, self.hi)
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub train_path: PathBuf,
    pub id_column: String,
    pub target_column: String,

    /// LGD target = `loss / target_scale`.
    pub target_scale: f64,
    /// Train LGD only on rows with `loss > 0`.
    pub lgd_defaulted_only: bool,
    pub lgd_clip: Option<ClipRange>,

    pub freq_cut: f64,
    pub unique_cut: f64,
    pub corr_cutoff: Option<f64>,

    /// Elastic-net mixing: 1 = lasso, 0 = ridge.
    pub alpha: f64,
    pub nlambda: usize,
    pub lambda_min_ratio: Option<f64>,
    pub nfolds: usize,
    pub seed: u64,
    /// `None` picks the target's default measure.
    pub measure: Option<Measure>,
    pub lambda_rule: LambdaRule,
    /// `0` keeps every non-zero predictor.
    pub max_predictors: usize,
    pub relaxed: bool,
    pub max_iter: usize,
    pub tol: f64,

    /// Fraction of training rows held out for evaluation (0 disables).
    pub holdout: f64,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

impl PipelineConfig {
    pub fn measure_for(&self, target: TargetKind) -> Measure {
        self.measure.unwrap_or_else(|| target.default_measure())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            train_path: PathBuf::from("train.csv"),
            id_column: "id".to_string(),
            target_column: "loss".to_string(),
            target_scale: 100.0,
            lgd_defaulted_only: true,
            lgd_clip: Some(ClipRange { lo: 0.0, hi: 1.0 }),
            freq_cut: 95.0 / 5.0,
            unique_cut: 10.0,
            corr_cutoff: None,
            alpha: 1.0,
            nlambda: 100,
            lambda_min_ratio: None,
            nfolds: 10,
            seed: 42,
            measure: None,
            lambda_rule: LambdaRule::Min,
            max_predictors: 30,
            relaxed: false,
            max_iter: 10_000,
            tol: 1e-7,
            holdout: 0.2,
            plot: true,
            plot_width: 72,
            plot_height: 18,
        }
    }
}

/// Per-feature preprocessing parameters stored with a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTransform {
    pub name: String,
    pub median: f64,
    pub mean: f64,
    pub scale: f64,
    /// Coefficient on the standardized feature.
    pub coefficient: f64,
}

/// A saved model file (JSON).
///
/// Everything needed to score a new loan table: which columns to read, how to
/// impute and standardize them, and the linear predictor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    pub tool: String,
    pub fitted_at: DateTime<Utc>,
    pub target: TargetKind,
    pub family: Family,
    pub id_column: String,
    pub target_scale: f64,
    pub intercept: f64,
    pub features: Vec<FeatureTransform>,
    pub lambda: f64,
    pub alpha: f64,
    pub lambda_rule: LambdaRule,
    pub relaxed: bool,
    pub clip: Option<ClipRange>,
}
