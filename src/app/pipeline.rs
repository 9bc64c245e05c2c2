//! Shared train / evaluate / score logic used by every subcommand.
//!
//! Workflow for one target:
//! load -> derive target -> holdout split -> prepare features -> CV + ranking
//! -> refit -> holdout evaluation -> portable `FittedModel`.
//!
//! The CLI handlers only decide what to print and where to write.

use chrono::Utc;
use log::{info, warn};
use nalgebra::{DMatrix, DVector};

use crate::domain::{ClipRange, FeatureTransform, FittedModel, PipelineConfig, TargetKind, derive_target};
use crate::error::AppError;
use crate::fit::{CvSettings, PathSettings, Selection, SelectionSettings, fit_and_select};
use crate::io::ingest::{IngestOptions, IngestedTable, load_table};
use crate::metrics::{
    ClassificationReport, RegressionReport, RocPoint, classification_report, regression_report, roc_curve,
};
use crate::models::LinearPredictor;
use crate::prep::{PrepSettings, Preprocessor, holdout_split};

/// Row accounting for a training run.
#[derive(Debug, Clone, Default)]
pub struct DataSummary {
    pub rows_read: usize,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    pub text_columns: Vec<String>,
    pub coerced: Vec<(String, usize)>,
    pub target_missing: usize,
    pub non_defaulted: usize,
    pub modeled_rows: usize,
    pub train_rows: usize,
    pub holdout_rows: usize,
    /// Positive share of the training response (PD only).
    pub positive_rate: Option<f64>,
}

/// Holdout (or in-sample) performance.
#[derive(Debug, Clone)]
pub enum Evaluation {
    Regression(RegressionReport),
    Classification {
        report: ClassificationReport,
        roc: Vec<RocPoint>,
    },
}

/// Everything computed for one target.
#[derive(Debug, Clone)]
pub struct ModelRun {
    pub kind: TargetKind,
    pub data: DataSummary,
    /// Preparation chain over every surviving feature (before ranking).
    pub prep: Preprocessor,
    pub selection: Selection,
    pub evaluation: Evaluation,
    /// `true` when no holdout was used and evaluation is on training rows.
    pub in_sample: bool,
    pub model: FittedModel,
}

/// Train and evaluate one model from `config.train_path`.
pub fn run_model(kind: TargetKind, config: &PipelineConfig) -> Result<ModelRun, AppError> {
    let ingested = load_table(
        &config.train_path,
        &IngestOptions {
            id_column: config.id_column.clone(),
            strict: false,
        },
    )?;
    run_model_on(kind, config, ingested)
}

/// Same as `run_model`, on an already loaded table.
pub fn run_model_on(
    kind: TargetKind,
    config: &PipelineConfig,
    ingested: IngestedTable,
) -> Result<ModelRun, AppError> {
    validate_config(config)?;

    let mut table = ingested.table;
    let loss = table.take_column(&config.target_column).ok_or_else(|| {
        AppError::new(
            2,
            format!("Target column `{}` not found in training data.", config.target_column),
        )
    })?;

    let target = derive_target(kind, &loss, config);
    if target.missing > 0 {
        warn!("Dropped {} row(s) with a missing `{}`", target.missing, config.target_column);
    }
    if target.non_defaulted > 0 {
        info!("{}: excluded {} non-defaulted row(s)", kind.display_name(), target.non_defaulted);
    }
    if target.len() < config.nfolds {
        return Err(AppError::new(
            3,
            format!(
                "{}: only {} usable training row(s); need at least {} for {}-fold CV.",
                kind.display_name(),
                target.len(),
                config.nfolds,
                config.nfolds
            ),
        ));
    }

    let table = table.select_rows(&target.rows);
    let split = holdout_split(&target.y, config.holdout, config.seed, kind == TargetKind::Pd);
    let train_table = table.select_rows(&split.train);
    let y_train: Vec<f64> = split.train.iter().map(|&i| target.y[i]).collect();
    let y_hold: Vec<f64> = split.holdout.iter().map(|&i| target.y[i]).collect();

    let data = DataSummary {
        rows_read: ingested.rows_read,
        rows_loaded: ingested.ids.len(),
        rows_skipped: ingested.row_errors.len(),
        text_columns: ingested.text_columns.clone(),
        coerced: ingested.coerced.clone(),
        target_missing: target.missing,
        non_defaulted: target.non_defaulted,
        modeled_rows: target.len(),
        train_rows: split.train.len(),
        holdout_rows: split.holdout.len(),
        positive_rate: (kind == TargetKind::Pd)
            .then(|| y_train.iter().sum::<f64>() / y_train.len() as f64),
    };
    info!(
        "{}: {} training row(s), {} holdout row(s)",
        kind.display_name(),
        data.train_rows,
        data.holdout_rows
    );

    let (prep, x_train) = Preprocessor::fit(
        &train_table,
        &PrepSettings {
            freq_cut: config.freq_cut,
            unique_cut: config.unique_cut,
            corr_cutoff: config.corr_cutoff,
        },
    )?;

    let y_vec = DVector::from_column_slice(&y_train);
    let selection = fit_and_select(
        &x_train,
        &y_vec,
        &prep.features,
        kind.family(),
        &selection_settings(kind, config),
    )?;

    let final_prep = prep.restrict(&selection.features);
    let predictor = LinearPredictor {
        family: kind.family(),
        intercept: selection.intercept,
        coefficients: selection.coefficients.clone(),
        clip: clip_for(kind, config),
    };

    let in_sample = split.holdout.is_empty();
    let (eval_x, eval_y) = if in_sample {
        (final_prep.transform(&train_table)?, y_train.clone())
    } else {
        (final_prep.transform(&table.select_rows(&split.holdout))?, y_hold)
    };
    let evaluation = evaluate(kind, &predictor, &eval_x, &eval_y);

    let model = build_model(kind, config, &final_prep, &selection, &predictor);

    Ok(ModelRun {
        kind,
        data,
        prep,
        selection,
        evaluation,
        in_sample,
        model,
    })
}

/// Score a loaded table with a fitted model: one prediction per row, input order.
pub fn score_table(model: &FittedModel, data: &IngestedTable) -> Result<Vec<f64>, AppError> {
    let n = data.rows_used();
    let x = prepared_matrix(model, data, n)?;
    let preds = predictor_for(model).predict_matrix(&x);

    if let Some(bad) = preds.iter().position(|p| !p.is_finite()) {
        return Err(AppError::new(
            4,
            format!("Non-finite prediction for row {} (id `{}`).", bad + 1, data.ids[bad]),
        ));
    }
    Ok(preds)
}

/// Load a test file strictly (every row must survive) and score it.
pub fn score_file(model: &FittedModel, path: &std::path::Path) -> Result<Vec<f64>, AppError> {
    let data = load_table(
        path,
        &IngestOptions {
            id_column: model.id_column.clone(),
            strict: true,
        },
    )?;
    let preds = score_table(model, &data)?;
    info!(
        "Scored {} row(s) of {} with the {} model",
        preds.len(),
        path.display(),
        model.target.display_name()
    );
    Ok(preds)
}

pub fn predictor_for(model: &FittedModel) -> LinearPredictor {
    LinearPredictor {
        family: model.family,
        intercept: model.intercept,
        coefficients: model.features.iter().map(|f| f.coefficient).collect(),
        clip: model.clip,
    }
}

/// Standardized design matrix for a scored table.
///
/// A feature whose cells all failed numeric coercion was set aside as a text
/// column at ingest; it is scored as all-missing, which imputes the median.
fn prepared_matrix(model: &FittedModel, data: &IngestedTable, n: usize) -> Result<DMatrix<f64>, AppError> {
    let mut values = Vec::with_capacity(n * model.features.len());
    for f in &model.features {
        let scaled = |v: f64| (v - f.mean) / f.scale;
        match data.table.column(&f.name) {
            Some(col) => values.extend(col.iter().map(|v| scaled(v.unwrap_or(f.median)))),
            None if data.text_columns.contains(&f.name) => {
                warn!("Feature `{}` has no numeric cells; imputing its median for every row", f.name);
                values.extend(std::iter::repeat_n(scaled(f.median), n));
            }
            None => {
                return Err(AppError::new(
                    2,
                    format!("Missing feature column `{}` in scoring data.", f.name),
                ));
            }
        }
    }
    Ok(DMatrix::from_vec(n, model.features.len(), values))
}

fn validate_config(config: &PipelineConfig) -> Result<(), AppError> {
    if !(0.0..1.0).contains(&config.holdout) {
        return Err(AppError::new(2, format!("Holdout fraction {} must be in [0, 1).", config.holdout)));
    }
    if !(config.target_scale.is_finite() && config.target_scale > 0.0) {
        return Err(AppError::new(2, "Target scale must be positive."));
    }
    if let Some(c) = config.corr_cutoff {
        if !(c > 0.0 && c <= 1.0) {
            return Err(AppError::new(2, format!("Correlation cutoff {c} must be in (0, 1].")));
        }
    }
    if let Some(clip) = config.lgd_clip {
        if !clip.is_valid() {
            return Err(AppError::new(2, "LGD clip range must satisfy lo <= hi."));
        }
    }
    if !(config.tol.is_finite() && config.tol > 0.0) {
        return Err(AppError::new(2, "Convergence tolerance must be positive."));
    }
    Ok(())
}

fn selection_settings(kind: TargetKind, config: &PipelineConfig) -> SelectionSettings {
    SelectionSettings {
        cv: CvSettings {
            path: PathSettings {
                alpha: config.alpha,
                max_iter: config.max_iter,
                tol: config.tol,
            },
            nfolds: config.nfolds,
            nlambda: config.nlambda,
            lambda_min_ratio: config.lambda_min_ratio,
            measure: config.measure_for(kind),
            seed: config.seed,
        },
        lambda_rule: config.lambda_rule,
        max_predictors: config.max_predictors,
        relaxed: config.relaxed,
    }
}

fn clip_for(kind: TargetKind, config: &PipelineConfig) -> Option<ClipRange> {
    match kind {
        TargetKind::Lgd => config.lgd_clip,
        TargetKind::Pd => None,
    }
}

fn evaluate(kind: TargetKind, predictor: &LinearPredictor, x: &DMatrix<f64>, y: &[f64]) -> Evaluation {
    let preds = predictor.predict_matrix(x);
    match kind {
        TargetKind::Lgd => Evaluation::Regression(regression_report(y, &preds)),
        TargetKind::Pd => Evaluation::Classification {
            report: classification_report(&preds, y),
            roc: roc_curve(&preds, y),
        },
    }
}

fn build_model(
    kind: TargetKind,
    config: &PipelineConfig,
    prep: &Preprocessor,
    selection: &Selection,
    predictor: &LinearPredictor,
) -> FittedModel {
    let features = prep
        .features
        .iter()
        .enumerate()
        .map(|(j, name)| FeatureTransform {
            name: name.clone(),
            median: prep.imputer.medians[j],
            mean: prep.scaler.means[j],
            scale: prep.scaler.scales[j],
            coefficient: predictor.coefficients[j],
        })
        .collect();

    FittedModel {
        tool: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        fitted_at: Utc::now(),
        target: kind,
        family: kind.family(),
        id_column: config.id_column.clone(),
        target_scale: config.target_scale,
        intercept: predictor.intercept,
        features,
        lambda: selection.lambda,
        alpha: config.alpha,
        lambda_rule: selection.lambda_rule,
        relaxed: selection.relaxed,
        clip: predictor.clip,
    }
}
