//! Per-column median imputation.

use crate::math::median_mut;

/// Medians learned from training columns, applied to any later table.
#[derive(Debug, Clone, PartialEq)]
pub struct MedianImputer {
    pub medians: Vec<f64>,
}

impl MedianImputer {
    /// Learn one median per column from non-missing values.
    ///
    /// An all-missing column gets a median of `0.0`.
    pub fn fit(columns: &[Vec<Option<f64>>]) -> Self {
        let medians = columns
            .iter()
            .map(|col| {
                let mut present: Vec<f64> = col.iter().flatten().copied().collect();
                median_mut(&mut present).unwrap_or(0.0)
            })
            .collect();
        Self { medians }
    }

    /// Fill the missing cells of column `idx`.
    pub fn transform_column(&self, idx: usize, col: &[Option<f64>]) -> Vec<f64> {
        let median = self.medians[idx];
        col.iter().map(|v| v.unwrap_or(median)).collect()
    }

    pub fn subset(&self, keep: &[usize]) -> Self {
        Self {
            medians: keep.iter().map(|&i| self.medians[i]).collect(),
        }
    }
}
