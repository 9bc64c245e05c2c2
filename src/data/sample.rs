//! Synthetic loan files for demos and end-to-end tests.
//!
//! Defaults are driven by a latent logistic score over the informative
//! columns; a defaulted loan's loss (percent of exposure, 1..=100) is drawn
//! from a second score over the same columns. The table also carries the
//! kinds of columns a real extract has and the pipeline must survive:
//! pure noise, a near-constant flag, a constant, a text grade, sporadic
//! missing cells and a few unparseable tokens.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::error::AppError;
use crate::math::{logit, sigmoid};

const GRADES: [&str; 5] = ["A", "B", "C", "D", "E"];

#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub rows: usize,
    pub informative: usize,
    pub noise: usize,
    /// Probability that any feature cell is blank.
    pub missing_rate: f64,
    /// Base default rate the latent score is centred on.
    pub default_rate: f64,
    /// Include the `loss` column (training files) or not (test files).
    pub with_target: bool,
    pub seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            rows: 2_000,
            informative: 6,
            noise: 8,
            missing_rate: 0.02,
            default_rate: 0.15,
            with_target: true,
            seed: 42,
        }
    }
}

/// A generated table, all cells as text.
#[derive(Debug, Clone)]
pub struct SyntheticLoans {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub defaults: usize,
}

pub fn generate_loans(config: &SynthConfig) -> Result<SyntheticLoans, AppError> {
    if config.rows == 0 {
        return Err(AppError::new(2, "Row count must be > 0."));
    }
    if config.informative == 0 {
        return Err(AppError::new(2, "At least one informative column is required."));
    }
    if !(0.0..1.0).contains(&config.missing_rate) {
        return Err(AppError::new(2, "Missing rate must be in [0, 1)."));
    }
    if !(config.default_rate > 0.0 && config.default_rate < 1.0) {
        return Err(AppError::new(2, "Default rate must be in (0, 1)."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut headers = vec!["id".to_string()];
    headers.extend((1..=config.informative).map(|k| format!("x{k}")));
    headers.extend((1..=config.noise).map(|k| format!("noise{k}")));
    headers.extend(["flag", "constant", "grade"].map(String::from));
    if config.with_target {
        headers.push("loss".to_string());
    }

    // Alternating signs, decaying strength.
    let pd_weights: Vec<f64> = (0..config.informative)
        .map(|k| (if k % 2 == 0 { 1.0 } else { -0.8 }) / (1.0 + 0.5 * k as f64))
        .collect();
    let lgd_weights: Vec<f64> = (0..config.informative)
        .map(|k| (if k % 3 == 0 { 0.6 } else { 0.25 }) / (1.0 + k as f64))
        .collect();
    let pd_offset = logit(config.default_rate);

    let mut rows = Vec::with_capacity(config.rows);
    let mut defaults = 0usize;

    for i in 0..config.rows {
        let signal: Vec<f64> = (0..config.informative).map(|_| normal.sample(&mut rng)).collect();

        let mut row = Vec::with_capacity(headers.len());
        row.push(format!("L{:06}", i + 1));
        for v in &signal {
            row.push(feature_cell(&mut rng, *v, config.missing_rate));
        }
        for _ in 0..config.noise {
            let v = normal.sample(&mut rng) * 2.0 + 5.0;
            row.push(feature_cell(&mut rng, v, config.missing_rate));
        }
        row.push(if rng.gen_bool(0.01) { "1" } else { "0" }.to_string());
        row.push("1".to_string());
        row.push(GRADES[rng.gen_range(0..GRADES.len())].to_string());

        let score: f64 = pd_offset + dot(&pd_weights, &signal) + 0.3 * normal.sample(&mut rng);
        let defaulted = rng.gen_bool(sigmoid(score));
        if defaulted {
            defaults += 1;
        }

        if config.with_target {
            let loss = if defaulted {
                let severity = sigmoid(dot(&lgd_weights, &signal) + 0.4 * normal.sample(&mut rng));
                (severity * 100.0).round().clamp(1.0, 100.0)
            } else {
                0.0
            };
            row.push(format!("{loss:.0}"));
        }

        rows.push(row);
    }

    Ok(SyntheticLoans {
        headers,
        rows,
        defaults,
    })
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// A numeric cell, occasionally blank or garbled.
fn feature_cell(rng: &mut StdRng, v: f64, missing_rate: f64) -> String {
    if missing_rate > 0.0 && rng.gen_bool(missing_rate) {
        return if rng.gen_bool(0.5) { String::new() } else { "NA".to_string() };
    }
    if rng.gen_bool(0.001) {
        return "#VALUE!".to_string();
    }
    format!("{v:.4}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_table() {
        let config = SynthConfig {
            rows: 50,
            ..SynthConfig::default()
        };
        let a = generate_loans(&config).unwrap();
        let b = generate_loans(&config).unwrap();
        assert_eq!(a.rows, b.rows);
    }

    #[test]
    fn training_file_has_loss_in_range() {
        let config = SynthConfig {
            rows: 500,
            ..SynthConfig::default()
        };
        let data = generate_loans(&config).unwrap();
        assert_eq!(data.headers.last().map(String::as_str), Some("loss"));
        assert_eq!(data.rows.len(), 500);
        assert!(data.defaults > 0 && data.defaults < 500);

        let mut positive = 0;
        for row in &data.rows {
            assert_eq!(row.len(), data.headers.len());
            let loss: f64 = row[row.len() - 1].parse().unwrap();
            assert!(loss == 0.0 || (1.0..=100.0).contains(&loss));
            if loss > 0.0 {
                positive += 1;
            }
        }
        assert_eq!(positive, data.defaults);
    }

    #[test]
    fn test_file_omits_loss() {
        let config = SynthConfig {
            rows: 10,
            with_target: false,
            ..SynthConfig::default()
        };
        let data = generate_loans(&config).unwrap();
        assert!(!data.headers.iter().any(|h| h == "loss"));
        assert!(data.rows.iter().all(|r| r.len() == data.headers.len()));
    }

    #[test]
    fn rejects_bad_settings() {
        let zero = SynthConfig {
            rows: 0,
            ..SynthConfig::default()
        };
        assert_eq!(generate_loans(&zero).unwrap_err().exit_code(), 2);

        let rate = SynthConfig {
            default_rate: 1.0,
            ..SynthConfig::default()
        };
        assert_eq!(generate_loans(&rate).unwrap_err().exit_code(), 2);
    }
}
