//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initializes logging
//! - parses CLI arguments
//! - sizes the rayon pool used by cross-validation
//! - runs training / scoring and prints reports and plots
//! - writes prediction CSVs and model JSON files

use std::path::{Path, PathBuf};

use clap::Parser;
use log::info;

use crate::cli::{Command, RunArgs, ScoreArgs, SynthArgs, TrainArgs};
use crate::data::{SynthConfig, generate_loans};
use crate::domain::{PipelineConfig, TargetKind};
use crate::error::AppError;
use crate::io::{read_model_json, write_model_json, write_predictions_csv, write_table_csv};

pub mod pipeline;

use pipeline::{Evaluation, ModelRun};

/// Entry point for the `loanloss` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = crate::cli::Cli::parse();
    let pool = build_pool(cli.workers)?;
    pool.install(|| dispatch(cli.command))
}

fn dispatch(command: Command) -> Result<(), AppError> {
    match command {
        Command::Lgd(args) => handle_train(TargetKind::Lgd, args),
        Command::Pd(args) => handle_train(TargetKind::Pd, args),
        Command::Run(args) => handle_run(args),
        Command::Score(args) => handle_score(args),
        Command::Synth(args) => handle_synth(args),
    }
}

fn build_pool(workers: Option<usize>) -> Result<rayon::ThreadPool, AppError> {
    if workers == Some(0) {
        return Err(AppError::new(2, "--workers must be at least 1."));
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.unwrap_or(0))
        .build()
        .map_err(|e| AppError::new(2, format!("Failed to build worker pool: {e}")))?;
    info!("Using {} worker thread(s)", pool.current_num_threads());
    Ok(pool)
}

fn handle_train(kind: TargetKind, args: TrainArgs) -> Result<(), AppError> {
    let config = args.model.to_config();
    // Reject a bad output request before spending time on training.
    let scoring = scoring_target(kind, &args)?;
    let run = pipeline::run_model(kind, &config)?;

    println!("{}", crate::report::format_run_summary(&run, &config));
    if config.plot {
        print_plots(&run, &config);
    }

    if let Some(path) = &args.export_model {
        write_model_json(path, &run.model)?;
        info!("Wrote {} model to {}", kind.display_name(), path.display());
    }

    if let Some((test, out)) = scoring {
        score_into(&run, &test, &out)?;
    }

    Ok(())
}

/// Test file and prediction path for `lgd` / `pd`, if scoring was requested.
fn scoring_target(kind: TargetKind, args: &TrainArgs) -> Result<Option<(PathBuf, PathBuf)>, AppError> {
    match (&args.test, &args.out) {
        (Some(test), out) => {
            if !test.exists() {
                return Err(AppError::new(2, format!("Test file '{}' not found.", test.display())));
            }
            let out = out.clone().unwrap_or_else(|| default_out(kind));
            Ok(Some((test.clone(), out)))
        }
        (None, Some(_)) => Err(AppError::new(2, "--out requires --test.")),
        (None, None) => Ok(None),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = args.model.to_config();

    // Check the test file before spending time on training.
    if !args.test.exists() {
        return Err(AppError::new(2, format!("Test file '{}' not found.", args.test.display())));
    }

    for (kind, out, export) in [
        (TargetKind::Lgd, &args.lgd_out, &args.export_lgd_model),
        (TargetKind::Pd, &args.pd_out, &args.export_pd_model),
    ] {
        let run = pipeline::run_model(kind, &config)?;
        if args.quiet {
            println!("{}", one_line_summary(&run));
        } else {
            println!("{}", crate::report::format_run_summary(&run, &config));
            if config.plot {
                print_plots(&run, &config);
            }
        }

        if let Some(path) = export {
            write_model_json(path, &run.model)?;
        }
        score_into(&run, &args.test, out)?;
    }

    Ok(())
}

fn handle_score(args: ScoreArgs) -> Result<(), AppError> {
    let model = read_model_json(&args.model)?;
    let preds = pipeline::score_file(&model, &args.test)?;
    write_predictions_csv(&args.out, model.target.output_column(), &preds)
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = SynthConfig {
        rows: args.rows,
        informative: args.informative,
        noise: args.noise,
        missing_rate: args.missing_rate,
        default_rate: args.default_rate,
        with_target: !args.no_target,
        seed: args.seed,
    };
    let data = generate_loans(&config)?;
    write_table_csv(&args.out, &data.headers, &data.rows)?;
    if config.with_target {
        info!(
            "{} of {} synthetic loan(s) defaulted",
            data.defaults,
            data.rows.len()
        );
    }
    Ok(())
}

fn score_into(run: &ModelRun, test: &Path, out: &Path) -> Result<(), AppError> {
    let preds = pipeline::score_file(&run.model, test)?;
    write_predictions_csv(out, run.kind.output_column(), &preds)
}

fn default_out(kind: TargetKind) -> PathBuf {
    PathBuf::from(format!("{}_predictions.csv", kind.output_column()))
}

fn print_plots(run: &ModelRun, config: &PipelineConfig) {
    let cv = run.selection.final_cv();
    println!(
        "{}",
        crate::plot::render_cv_plot(cv, config.plot_width, config.plot_height)
    );
    if let Evaluation::Classification { roc, .. } = &run.evaluation {
        println!(
            "{}",
            crate::plot::render_roc_plot(roc, config.plot_width, config.plot_height)
        );
    }
}

fn one_line_summary(run: &ModelRun) -> String {
    let metric = match &run.evaluation {
        Evaluation::Regression(r) => format!("RMSE={:.5} MAE={:.5}", r.rmse, r.mae),
        Evaluation::Classification { report, .. } => match report.auc {
            Some(auc) => format!("AUC={auc:.4} Gini={:.4}", 2.0 * auc - 1.0),
            None => "AUC=n/a".to_string(),
        },
    };
    format!(
        "{}: {} feature(s), lambda={:.4e} ({}), {}",
        run.kind.display_name(),
        run.model.features.len(),
        run.model.lambda,
        run.model.lambda_rule.label(),
        metric
    )
}
