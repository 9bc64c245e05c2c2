//! Formatted terminal output: data accounting, CV path, predictor ranking,
//! final coefficients and holdout metrics.
//!
//! Formatting lives here so the fitting code never prints and output changes
//! stay in one file.

use crate::app::pipeline::{DataSummary, Evaluation, ModelRun};
use crate::domain::{FittedModel, PipelineConfig};
use crate::fit::{CvFit, RankedPredictor};
use crate::metrics::{ClassificationReport, RegressionReport};

/// Rows of the CV table shown besides `lambda.min` / `lambda.1se`.
const CV_TABLE_ROWS: usize = 12;

/// Ranked predictors listed in the report.
const RANKING_ROWS: usize = 30;

/// Format the full report of one trained model.
pub fn format_run_summary(run: &ModelRun, config: &PipelineConfig) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== loanloss - {} model ({:?}) ===\n",
        run.kind.display_name(),
        run.kind.family()
    ));
    out.push_str(&format!("Training file: {}\n", config.train_path.display()));
    out.push_str(&format_data_summary(&run.data));

    out.push_str("\nPreparation:\n");
    out.push_str(&format!("- features after filtering: {}\n", run.prep.features.len()));
    out.push_str(&format!(
        "- near-zero variance dropped ({}): {}\n",
        run.prep.dropped_nzv.len(),
        fmt_names(&run.prep.dropped_nzv)
    ));
    if config.corr_cutoff.is_some() {
        out.push_str(&format!(
            "- correlated dropped ({}): {}\n",
            run.prep.dropped_corr.len(),
            fmt_names(&run.prep.dropped_corr)
        ));
    }

    let sel = &run.selection;
    out.push_str(&format!(
        "\nScreening CV (alpha={}, {} folds, measure={}):\n",
        config.alpha,
        sel.screening.nfolds(),
        sel.screening.measure.name()
    ));
    out.push_str(&format_cv_table(&sel.screening));

    out.push_str(&format!("\nPredictor ranking at {}:\n", sel.lambda_rule.label()));
    out.push_str(&format_ranking(&sel.ranking, RANKING_ROWS));

    if let Some(refit) = &sel.refit {
        out.push_str(&format!("\nRefit CV on {} kept predictor(s):\n", refit.path.betas[0].len()));
        out.push_str(&format_cv_table(refit));
    }

    out.push_str("\nFinal model:\n");
    out.push_str(&format_model(&run.model));

    out.push_str(&format!(
        "\n{} evaluation ({} rows):\n",
        if run.in_sample { "In-sample" } else { "Holdout" },
        if run.in_sample { run.data.train_rows } else { run.data.holdout_rows }
    ));
    out.push_str(&format_evaluation(&run.evaluation));

    out
}

pub fn format_data_summary(data: &DataSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Rows: read={} loaded={} skipped={}\n",
        data.rows_read, data.rows_loaded, data.rows_skipped
    ));
    out.push_str(&format!(
        "Target: modeled={} (missing={}, non-defaulted excluded={})\n",
        data.modeled_rows, data.target_missing, data.non_defaulted
    ));
    out.push_str(&format!(
        "Split: train={} holdout={}\n",
        data.train_rows, data.holdout_rows
    ));
    if let Some(rate) = data.positive_rate {
        out.push_str(&format!("Default rate (train): {:.2}%\n", rate * 100.0));
    }
    if !data.text_columns.is_empty() {
        out.push_str(&format!("Text columns excluded: {}\n", fmt_names(&data.text_columns)));
    }
    let coerced: usize = data.coerced.iter().map(|(_, n)| n).sum();
    if coerced > 0 {
        out.push_str(&format!(
            "Non-numeric cells coerced to missing: {coerced} in {} column(s)\n",
            data.coerced.len()
        ));
    }
    out
}

/// A thinned CV table; the `lambda.min` and `lambda.1se` rows are always shown.
pub fn format_cv_table(cv: &CvFit) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {:>12} {:>6} {:>12} {:>12}\n",
        "lambda",
        "nzero",
        cv.measure.name(),
        "se"
    ));

    let step = cv.lambdas.len().div_ceil(CV_TABLE_ROWS).max(1);
    for k in 0..cv.lambdas.len() {
        let marker = if k == cv.index_min {
            "min"
        } else if k == cv.index_1se {
            "1se"
        } else if k % step == 0 {
            ""
        } else {
            continue;
        };
        out.push_str(
            format!(
                "  {:>12.4e} {:>6} {:>12.5} {:>12.5} {marker}\n",
                cv.lambdas[k], cv.nzero[k], cv.cvm[k], cv.cvsd[k]
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out.push_str(&format!(
        "  lambda.min={:.4e} lambda.1se={:.4e}\n",
        cv.lambda_min(),
        cv.lambda_1se()
    ));
    out
}

pub fn format_ranking(ranking: &[RankedPredictor], limit: usize) -> String {
    if ranking.is_empty() {
        return "  (no non-zero predictors; intercept-only)\n".to_string();
    }
    let mut out = String::new();
    out.push_str(&format!("  {:>4} {:<28} {:>12}\n", "rank", "feature", "coef"));
    for (i, r) in ranking.iter().take(limit).enumerate() {
        out.push_str(&format!(
            "  {:>4} {:<28} {:>12.6}\n",
            i + 1,
            truncate(&r.name, 28),
            r.coefficient
        ));
    }
    if ranking.len() > limit {
        out.push_str(&format!("  ... {} more\n", ranking.len() - limit));
    }
    out
}

pub fn format_model(model: &FittedModel) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "- lambda={:.4e} ({}){}\n",
        model.lambda,
        model.lambda_rule.label(),
        if model.relaxed { " relaxed" } else { "" }
    ));
    out.push_str(&format!("- intercept={:.6}\n", model.intercept));
    if let Some(clip) = model.clip {
        out.push_str(&format!("- predictions clipped to [{}, {}]\n", clip.lo, clip.hi));
    }
    for f in &model.features {
        out.push_str(&format!(
            "  {:<28} {:>12.6}  (median={:.4}, mean={:.4}, sd={:.4})\n",
            truncate(&f.name, 28),
            f.coefficient,
            f.median,
            f.mean,
            f.scale
        ));
    }
    out
}

pub fn format_evaluation(eval: &Evaluation) -> String {
    match eval {
        Evaluation::Regression(r) => format_regression(r),
        Evaluation::Classification { report, .. } => format_classification(report),
    }
}

fn format_regression(r: &RegressionReport) -> String {
    format!(
        "  MAE={:.5} RMSE={:.5} R2={}\n  mean actual={:.5} mean predicted={:.5}\n",
        r.mae,
        r.rmse,
        fmt_opt(Some(r.r2).filter(|v| v.is_finite())),
        r.mean_actual,
        r.mean_predicted
    )
}

fn format_classification(r: &ClassificationReport) -> String {
    let c = &r.confusion;
    format!(
        concat!(
            "  AUC={} Gini={} KS={}\n",
            "  log loss={:.5} accuracy@0.5={:.4}\n",
            "  defaults={} of {} | mean PD={:.4}\n",
            "  confusion@0.5: TP={} FP={} TN={} FN={}\n",
        ),
        fmt_opt(r.auc),
        fmt_opt(r.gini),
        fmt_opt(r.ks),
        r.log_loss,
        r.accuracy,
        r.positives,
        r.n,
        r.mean_predicted,
        c.tp,
        c.fp,
        c.tn,
        c.fn_
    )
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.4}"),
        None => "n/a".to_string(),
    }
}

fn fmt_names(names: &[String]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
