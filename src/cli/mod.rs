//! Command-line parsing for the loan loss modeler.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! modeling code: every handler turns its args into a `PipelineConfig` (or a
//! `SynthConfig`) and hands that to the library.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{ClipRange, LambdaRule, Measure, PipelineConfig};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "loanloss", version, about = "LGD and PD models for loan portfolios")]
pub struct Cli {
    /// Worker threads for cross-validation (defaults to all cores).
    #[arg(long, global = true, env = "LOANLOSS_WORKERS")]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the Loss Given Default model (defaulted loans, gaussian).
    Lgd(TrainArgs),
    /// Fit the Probability of Default model (all loans, binomial).
    Pd(TrainArgs),
    /// Fit both models and score a test file into `lgd` and `pd` CSVs.
    Run(RunArgs),
    /// Score a test file with a previously exported model JSON.
    Score(ScoreArgs),
    /// Write a synthetic loan CSV (training or test layout).
    Synth(SynthArgs),
}

/// Options shared by every training command.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Training CSV with a `loss` column.
    #[arg(long, env = "LOANLOSS_TRAIN", value_name = "CSV", default_value = "train.csv")]
    pub train: PathBuf,

    /// Identifier column (kept as text, never a feature).
    #[arg(long, default_value = "id")]
    pub id_column: String,

    /// Loss column the targets are derived from.
    #[arg(long, default_value = "loss")]
    pub target_column: String,

    /// LGD = loss / scale.
    #[arg(long, default_value_t = 100.0)]
    pub target_scale: f64,

    /// Train LGD on every row instead of defaulted rows only.
    #[arg(long)]
    pub include_non_defaulted: bool,

    /// Lower bound for LGD predictions.
    #[arg(long, default_value_t = 0.0)]
    pub clip_lo: f64,

    /// Upper bound for LGD predictions.
    #[arg(long, default_value_t = 1.0)]
    pub clip_hi: f64,

    /// Do not clip LGD predictions.
    #[arg(long)]
    pub no_clip: bool,

    /// Near-zero-variance: most/second most frequent value ratio cutoff.
    #[arg(long, default_value_t = 95.0 / 5.0)]
    pub freq_cut: f64,

    /// Near-zero-variance: percent-distinct-values cutoff.
    #[arg(long, default_value_t = 10.0)]
    pub unique_cut: f64,

    /// Drop one of every pair of features with |r| above this value.
    #[arg(long)]
    pub corr_cutoff: Option<f64>,

    /// Elastic-net mixing (1 = lasso, 0 = ridge).
    #[arg(long, default_value_t = 1.0)]
    pub alpha: f64,

    /// Number of lambda values on the path.
    #[arg(long, default_value_t = 100)]
    pub nlambda: usize,

    /// Smallest lambda as a fraction of lambda_max (default depends on n vs p).
    #[arg(long)]
    pub lambda_min_ratio: Option<f64>,

    /// Cross-validation folds.
    #[arg(long, default_value_t = 10)]
    pub folds: usize,

    /// Seed for folds, holdout split.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// CV measure (default: mse for LGD, auc for PD).
    #[arg(long, value_enum)]
    pub measure: Option<Measure>,

    /// Which lambda to use.
    #[arg(long, value_enum, default_value_t = LambdaRule::Min)]
    pub lambda_rule: LambdaRule,

    /// Keep at most this many ranked predictors (0 = all non-zero).
    #[arg(long, default_value_t = 30)]
    pub max_predictors: usize,

    /// Refit the selected LGD predictors without penalty.
    #[arg(long)]
    pub relaxed: bool,

    /// Coordinate-descent pass limit per lambda.
    #[arg(long, default_value_t = 10_000)]
    pub max_iter: usize,

    /// Coordinate-descent convergence threshold.
    #[arg(long, default_value_t = 1e-7)]
    pub tol: f64,

    /// Fraction of training rows held out for evaluation (0 = evaluate in-sample).
    #[arg(long, default_value_t = 0.2)]
    pub holdout: f64,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 18)]
    pub height: usize,
}

impl ModelArgs {
    pub fn to_config(&self) -> PipelineConfig {
        PipelineConfig {
            train_path: self.train.clone(),
            id_column: self.id_column.clone(),
            target_column: self.target_column.clone(),
            target_scale: self.target_scale,
            lgd_defaulted_only: !self.include_non_defaulted,
            lgd_clip: (!self.no_clip).then_some(ClipRange {
                lo: self.clip_lo,
                hi: self.clip_hi,
            }),
            freq_cut: self.freq_cut,
            unique_cut: self.unique_cut,
            corr_cutoff: self.corr_cutoff,
            alpha: self.alpha,
            nlambda: self.nlambda,
            lambda_min_ratio: self.lambda_min_ratio,
            nfolds: self.folds,
            seed: self.seed,
            measure: self.measure,
            lambda_rule: self.lambda_rule,
            max_predictors: self.max_predictors,
            relaxed: self.relaxed,
            max_iter: self.max_iter,
            tol: self.tol,
            holdout: self.holdout,
            plot: !self.no_plot,
            plot_width: self.width,
            plot_height: self.height,
        }
    }
}

/// Train one model, optionally scoring a test file.
#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Test CSV to score after training.
    #[arg(long, value_name = "CSV")]
    pub test: Option<PathBuf>,

    /// Prediction CSV (requires --test; defaults to `<target>_predictions.csv`).
    #[arg(long, value_name = "CSV", requires = "test")]
    pub out: Option<PathBuf>,

    /// Export the fitted model as JSON.
    #[arg(long = "export-model", value_name = "JSON")]
    pub export_model: Option<PathBuf>,
}

/// Train both models and score one test file.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Test CSV to score.
    #[arg(long, env = "LOANLOSS_TEST", value_name = "CSV", default_value = "test.csv")]
    pub test: PathBuf,

    #[arg(long, value_name = "CSV", default_value = "lgd_predictions.csv")]
    pub lgd_out: PathBuf,

    #[arg(long, value_name = "CSV", default_value = "pd_predictions.csv")]
    pub pd_out: PathBuf,

    /// Export the LGD model as JSON.
    #[arg(long, value_name = "JSON")]
    pub export_lgd_model: Option<PathBuf>,

    /// Export the PD model as JSON.
    #[arg(long, value_name = "JSON")]
    pub export_pd_model: Option<PathBuf>,

    /// Print only a one-line summary per model.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Score a test file with a saved model.
#[derive(Debug, Args, Clone)]
pub struct ScoreArgs {
    /// Model JSON written by `--export-model`.
    #[arg(long, value_name = "JSON")]
    pub model: PathBuf,

    #[arg(long, value_name = "CSV")]
    pub test: PathBuf,

    /// Prediction CSV (single column named after the target).
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,
}

/// Synthetic data options.
#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    #[arg(short = 'n', long, default_value_t = 2_000)]
    pub rows: usize,

    /// Columns that drive default and loss.
    #[arg(long, default_value_t = 6)]
    pub informative: usize,

    /// Pure-noise columns.
    #[arg(long, default_value_t = 8)]
    pub noise: usize,

    /// Probability that a feature cell is blank.
    #[arg(long, default_value_t = 0.02)]
    pub missing_rate: f64,

    #[arg(long, default_value_t = 0.15)]
    pub default_rate: f64,

    /// Omit the `loss` column (test-file layout).
    #[arg(long)]
    pub no_target: bool,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}
