//! Cleaning and feature preparation.
//!
//! Steps, all learned on training rows only and then replayed unchanged on
//! holdout and test rows:
//!
//! 1. near-zero-variance filtering (`variance`)
//! 2. per-column median imputation (`impute`)
//! 3. optional high-correlation filtering (`correlation`)
//! 4. centering and scaling (`scale`)
//!
//! `split` provides the seeded train / holdout partition that decides which
//! rows count as training rows.

pub mod correlation;
pub mod impute;
pub mod scale;
pub mod split;
pub mod variance;

use log::{debug, info};
use nalgebra::DMatrix;

use crate::error::AppError;
use crate::io::ingest::LoanTable;

pub use correlation::*;
pub use impute::*;
pub use scale::*;
pub use split::*;
pub use variance::*;

/// Knobs for `Preprocessor::fit`.
#[derive(Debug, Clone)]
pub struct PrepSettings {
    pub freq_cut: f64,
    pub unique_cut: f64,
    pub corr_cutoff: Option<f64>,
}

/// Fitted preprocessing chain.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    /// Surviving feature names, in matrix column order.
    pub features: Vec<String>,
    pub imputer: MedianImputer,
    pub scaler: Standardizer,
    pub dropped_nzv: Vec<String>,
    pub dropped_corr: Vec<String>,
}

impl Preprocessor {
    /// Learn the chain from a training table and return the prepared matrix.
    pub fn fit(table: &LoanTable, settings: &PrepSettings) -> Result<(Self, DMatrix<f64>), AppError> {
        let stats = near_zero_variance(&table.names, &table.columns, settings.freq_cut, settings.unique_cut);

        let mut keep = Vec::new();
        let mut dropped_nzv = Vec::new();
        for (idx, stat) in stats.iter().enumerate() {
            if stat.drop() {
                debug!(
                    "Dropping `{}` (freq_ratio={:.2}, percent_unique={:.2}, zero_var={})",
                    stat.name, stat.freq_ratio, stat.percent_unique, stat.zero_var
                );
                dropped_nzv.push(stat.name.clone());
            } else {
                keep.push(idx);
            }
        }
        info!(
            "Near-zero-variance filter kept {} of {} column(s)",
            keep.len(),
            table.n_cols()
        );
        if keep.is_empty() {
            return Err(AppError::new(
                3,
                "No features survive near-zero-variance filtering.",
            ));
        }

        let kept = table.select_columns(&keep);
        let mut imputer = MedianImputer::fit(&kept.columns);
        let mut features = kept.names.clone();
        let mut x = imputed_matrix(&imputer, &kept);

        let mut dropped_corr = Vec::new();
        if let Some(cutoff) = settings.corr_cutoff {
            let drop = find_correlated(&x, cutoff);
            if !drop.is_empty() {
                let survivors: Vec<usize> = (0..features.len()).filter(|j| !drop.contains(j)).collect();
                dropped_corr = drop.iter().map(|&j| features[j].clone()).collect();
                info!(
                    "Correlation filter (|r| > {cutoff}) dropped {} column(s)",
                    dropped_corr.len()
                );
                features = survivors.iter().map(|&j| features[j].clone()).collect();
                imputer = imputer.subset(&survivors);
                x = x.select_columns(survivors.iter());
            }
        }

        let scaler = Standardizer::fit(&x);
        scaler.transform_in_place(&mut x);

        Ok((
            Self {
                features,
                imputer,
                scaler,
                dropped_nzv,
                dropped_corr,
            },
            x,
        ))
    }

    /// Replay the chain on another table (holdout or test).
    ///
    /// Every training feature must be present by name; extra columns are ignored.
    pub fn transform(&self, table: &LoanTable) -> Result<DMatrix<f64>, AppError> {
        let n = table.n_rows();
        let mut data = Vec::with_capacity(n * self.features.len());
        for (j, name) in self.features.iter().enumerate() {
            let col = table.column(name).ok_or_else(|| {
                AppError::new(2, format!("Missing feature column `{name}` in input table."))
            })?;
            let (m, s) = (self.scaler.means[j], self.scaler.scales[j]);
            data.extend(
                self.imputer
                    .transform_column(j, col)
                    .into_iter()
                    .map(|v| (v - m) / s),
            );
        }
        Ok(DMatrix::from_vec(n, self.features.len(), data))
    }

    /// Narrow the chain to a subset of its features (in the given order).
    pub fn restrict(&self, keep: &[usize]) -> Self {
        Self {
            features: keep.iter().map(|&j| self.features[j].clone()).collect(),
            imputer: self.imputer.subset(keep),
            scaler: self.scaler.subset(keep),
            dropped_nzv: self.dropped_nzv.clone(),
            dropped_corr: self.dropped_corr.clone(),
        }
    }
}

fn imputed_matrix(imputer: &MedianImputer, table: &LoanTable) -> DMatrix<f64> {
    let n = table.n_rows();
    let mut data = Vec::with_capacity(n * table.n_cols());
    for (j, col) in table.columns.iter().enumerate() {
        data.extend(imputer.transform_column(j, col));
    }
    DMatrix::from_vec(n, table.n_cols(), data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> PrepSettings {
        PrepSettings {
            freq_cut: 19.0,
            unique_cut: 10.0,
            corr_cutoff: None,
        }
    }

    fn table() -> LoanTable {
        LoanTable {
            names: vec!["f1".into(), "flat".into(), "f2".into()],
            columns: vec![
                vec![Some(1.0), Some(2.0), None, Some(4.0)],
                vec![Some(7.0); 4],
                vec![Some(0.5), None, Some(1.5), Some(3.0)],
            ],
        }
    }

    #[test]
    fn fit_drops_constant_columns_and_leaves_no_missing_values() {
        let (prep, x) = Preprocessor::fit(&table(), &settings()).unwrap();
        assert_eq!(prep.features, vec!["f1", "f2"]);
        assert_eq!(prep.dropped_nzv, vec!["flat"]);
        assert_eq!(x.shape(), (4, 2));
        assert!(x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn transform_replays_training_parameters() {
        let (prep, x) = Preprocessor::fit(&table(), &settings()).unwrap();
        let again = prep.transform(&table()).unwrap();
        assert!((x - again).abs().max() < 1e-12);
    }

    #[test]
    fn transform_requires_every_feature() {
        let (prep, _) = Preprocessor::fit(&table(), &settings()).unwrap();
        let test = LoanTable {
            names: vec!["f1".into()],
            columns: vec![vec![Some(1.0)]],
        };
        let err = prep.transform(&test).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("f2"));
    }

    #[test]
    fn all_constant_table_is_insufficient() {
        let t = LoanTable {
            names: vec!["a".into()],
            columns: vec![vec![Some(1.0); 3]],
        };
        let err = Preprocessor::fit(&t, &settings()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn correlation_filter_removes_duplicate_signal() {
        let t = LoanTable {
            names: vec!["a".into(), "b".into(), "c".into()],
            columns: vec![
                (0..20).map(|i| Some(i as f64)).collect(),
                (0..20).map(|i| Some(2.0 * i as f64 + 1.0)).collect(),
                (0..20).map(|i| Some(((i * 7) % 5) as f64)).collect(),
            ],
        };
        let mut s = settings();
        s.corr_cutoff = Some(0.95);
        let (prep, x) = Preprocessor::fit(&t, &s).unwrap();
        assert_eq!(prep.dropped_corr.len(), 1);
        assert_eq!(x.ncols(), 2);
        assert_eq!(prep.features.len(), 2);
    }
}
