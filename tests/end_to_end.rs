use std::path::{Path, PathBuf};

use loan_loss::app::pipeline::{run_model, score_file};
use loan_loss::data::{SynthConfig, generate_loans};
use loan_loss::domain::{Family, FeatureTransform, FittedModel, LambdaRule, PipelineConfig, TargetKind};
use loan_loss::io::{read_model_json, write_model_json, write_predictions_csv, write_table_csv};

fn write_synth(dir: &Path, name: &str, rows: usize, with_target: bool, seed: u64) -> PathBuf {
    let data = generate_loans(&SynthConfig {
        rows,
        with_target,
        seed,
        ..SynthConfig::default()
    })
    .unwrap();
    let path = dir.join(name);
    write_table_csv(&path, &data.headers, &data.rows).unwrap();
    path
}

fn read_column(path: &Path) -> (String, Vec<String>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader.headers().unwrap().get(0).unwrap().to_string();
    let values = reader
        .records()
        .map(|r| r.unwrap().get(0).unwrap().to_string())
        .collect();
    (header, values)
}

fn two_feature_pd_model() -> FittedModel {
    let feature = |name: &str, median: f64, mean: f64, coefficient: f64| FeatureTransform {
        name: name.to_string(),
        median,
        mean,
        scale: 1.0,
        coefficient,
    };
    FittedModel {
        tool: "loanloss".to_string(),
        fitted_at: chrono::Utc::now(),
        target: TargetKind::Pd,
        family: Family::Binomial,
        id_column: "id".to_string(),
        target_scale: 100.0,
        intercept: 0.0,
        features: vec![feature("f1", 1.0, 1.0, 1.0), feature("f2", 3.0, 2.0, 2.0)],
        lambda: 0.01,
        alpha: 1.0,
        lambda_rule: LambdaRule::Min,
        relaxed: false,
        clip: None,
    }
}

fn config(train: PathBuf) -> PipelineConfig {
    PipelineConfig {
        train_path: train,
        nlambda: 40,
        nfolds: 5,
        ..PipelineConfig::default()
    }
}

#[test]
fn both_models_score_every_test_row() {
    let dir = tempfile::tempdir().unwrap();
    let train = write_synth(dir.path(), "train.csv", 1_500, true, 11);
    let test = write_synth(dir.path(), "test.csv", 123, false, 12);
    let config = config(train);

    for kind in [TargetKind::Lgd, TargetKind::Pd] {
        let run = run_model(kind, &config).unwrap();
        let preds = score_file(&run.model, &test).unwrap();
        let out = dir.path().join(format!("{}.csv", kind.output_column()));
        write_predictions_csv(&out, kind.output_column(), &preds).unwrap();

        let (header, values) = read_column(&out);
        assert_eq!(header, kind.output_column());
        assert_eq!(values.len(), 123);
        for v in values {
            let p: f64 = v.parse().unwrap();
            assert!(p.is_finite());
            assert!((0.0..=1.0).contains(&p), "{kind:?} prediction {p} out of range");
        }
    }
}

#[test]
fn exported_model_scores_identically() {
    let dir = tempfile::tempdir().unwrap();
    let train = write_synth(dir.path(), "train.csv", 800, true, 21);
    let test = write_synth(dir.path(), "test.csv", 50, false, 22);

    let run = run_model(TargetKind::Pd, &config(train)).unwrap();
    let model_path = dir.path().join("pd.json");
    write_model_json(&model_path, &run.model).unwrap();
    let reloaded = read_model_json(&model_path).unwrap();

    let direct = score_file(&run.model, &test).unwrap();
    let via_file = score_file(&reloaded, &test).unwrap();
    assert_eq!(direct.len(), via_file.len());
    for (a, b) in direct.iter().zip(&via_file) {
        assert!((a - b).abs() < 1e-12);
    }
}

#[test]
fn test_file_with_blank_and_garbled_cells_keeps_row_count() {
    let dir = tempfile::tempdir().unwrap();
    let train = write_synth(dir.path(), "train.csv", 800, true, 31);
    let run = run_model(TargetKind::Pd, &config(train)).unwrap();

    let mut text = String::from("id");
    for f in &run.model.features {
        text.push(',');
        text.push_str(&f.name);
    }
    text.push('\n');
    for (i, cell) in ["", "NA", "oops", "1.5"].iter().enumerate() {
        text.push_str(&format!("r{i}"));
        for _ in &run.model.features {
            text.push(',');
            text.push_str(cell);
        }
        text.push('\n');
    }
    let test = dir.path().join("messy.csv");
    std::fs::write(&test, text).unwrap();

    let preds = score_file(&run.model, &test).unwrap();
    assert_eq!(preds.len(), 4);
    assert!(preds.iter().all(|p| (0.0..=1.0).contains(p)));
    // Blank, NA and unparseable cells all impute to the same medians.
    assert!((preds[0] - preds[1]).abs() < 1e-12);
    assert!((preds[1] - preds[2]).abs() < 1e-12);
}

#[test]
fn feature_with_only_garbled_cells_is_imputed_not_missing() {
    let dir = tempfile::tempdir().unwrap();
    let model = two_feature_pd_model();

    let garbled = dir.path().join("garbled.csv");
    std::fs::write(&garbled, "id,f1,f2\na,1.0,#VALUE!\nb,2.0,oops\n").unwrap();
    let blank = dir.path().join("blank.csv");
    std::fs::write(&blank, "id,f1,f2\na,1.0,\nb,2.0,\n").unwrap();

    let preds = score_file(&model, &garbled).unwrap();
    assert_eq!(preds.len(), 2);
    // f2 falls back to its median 3.0, i.e. +1 sd.
    let sigmoid = |eta: f64| 1.0 / (1.0 + (-eta).exp());
    assert!((preds[0] - sigmoid(2.0)).abs() < 1e-12);
    assert!((preds[1] - sigmoid(3.0)).abs() < 1e-12);
    assert_eq!(preds, score_file(&model, &blank).unwrap());
}

#[test]
fn missing_training_file_is_an_input_error() {
    let err = run_model(TargetKind::Lgd, &config(PathBuf::from("/nonexistent/train.csv"))).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}
