//! Read/write fitted model JSON files.
//!
//! A model file is the "portable" representation of a fitted LGD or PD model:
//! - which feature columns to read from a test file
//! - per-feature median (imputation), mean and scale (standardization)
//! - the linear predictor (intercept + coefficients) and its family
//!
//! The schema is defined by `domain::FittedModel`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::domain::FittedModel;
use crate::error::AppError;

/// Write a model JSON file.
pub fn write_model_json(path: &Path, model: &FittedModel) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create model JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, model)
        .map_err(|e| AppError::new(2, format!("Failed to write model JSON: {e}")))?;

    Ok(())
}

/// Read a model JSON file.
pub fn read_model_json(path: &Path) -> Result<FittedModel, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open model JSON '{}': {e}", path.display())))?;
    let model: FittedModel = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Failed to parse model JSON '{}': {e}", path.display())))?;

    validate_model(&model)?;
    Ok(model)
}

fn validate_model(model: &FittedModel) -> Result<(), AppError> {
    if !model.intercept.is_finite() {
        return Err(AppError::new(2, "Model JSON has a non-finite intercept."));
    }
    if let Some(clip) = model.clip {
        if !clip.is_valid() {
            return Err(AppError::new(
                2,
                format!("Model JSON has an invalid clip range [{}, {}].", clip.lo, clip.hi),
            ));
        }
    }
    for f in &model.features {
        if !(f.median.is_finite() && f.mean.is_finite() && f.coefficient.is_finite()) {
            return Err(AppError::new(
                2,
                format!("Model JSON has non-finite parameters for feature `{}`.", f.name),
            ));
        }
        if !(f.scale.is_finite() && f.scale > 0.0) {
            return Err(AppError::new(
                2,
                format!("Model JSON has an invalid scale for feature `{}`.", f.name),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClipRange, Family, FeatureTransform, LambdaRule, TargetKind};
    use chrono::Utc;

    fn sample_model() -> FittedModel {
        FittedModel {
            tool: "loanloss".to_string(),
            fitted_at: Utc::now(),
            target: TargetKind::Lgd,
            family: Family::Gaussian,
            id_column: "id".to_string(),
            target_scale: 100.0,
            intercept: 0.4,
            features: vec![FeatureTransform {
                name: "f1".to_string(),
                median: 1.0,
                mean: 1.2,
                scale: 0.5,
                coefficient: 0.1,
            }],
            lambda: 0.01,
            alpha: 1.0,
            lambda_rule: LambdaRule::Min,
            relaxed: false,
            clip: Some(ClipRange { lo: 0.0, hi: 1.0 }),
        }
    }

    #[test]
    fn model_file_survives_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lgd.json");
        let model = sample_model();

        write_model_json(&path, &model).unwrap();
        let back = read_model_json(&path).unwrap();

        assert_eq!(back.target, TargetKind::Lgd);
        assert_eq!(back.features, model.features);
        assert_eq!(back.clip, model.clip);
    }

    #[test]
    fn rejects_zero_scale() {
        let mut model = sample_model();
        model.features[0].scale = 0.0;
        let err = validate_model(&model).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn rejects_inverted_clip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lgd.json");
        let mut model = sample_model();
        model.clip = Some(ClipRange { lo: 1.0, hi: 0.0 });
        write_model_json(&path, &model).unwrap();

        let err = read_model_json(&path).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("clip"));
    }
}
