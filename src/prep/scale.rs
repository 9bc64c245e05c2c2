//! Centering and scaling.

use nalgebra::DMatrix;

use crate::math::{mean, sample_sd};

/// Column means and sample standard deviations learned from training data.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl Standardizer {
    /// Fit on the columns of `x`. A zero or undefined sd becomes `1.0`, which
    /// leaves the (centered) column unchanged instead of dividing by zero.
    pub fn fit(x: &DMatrix<f64>) -> Self {
        let mut means = Vec::with_capacity(x.ncols());
        let mut scales = Vec::with_capacity(x.ncols());
        for col in x.column_iter() {
            let values: Vec<f64> = col.iter().copied().collect();
            means.push(mean(&values).unwrap_or(0.0));
            let sd = sample_sd(&values).unwrap_or(0.0);
            scales.push(if sd.is_finite() && sd > 1e-12 { sd } else { 1.0 });
        }
        Self { means, scales }
    }

    pub fn transform_in_place(&self, x: &mut DMatrix<f64>) {
        for (j, mut col) in x.column_iter_mut().enumerate() {
            let (m, s) = (self.means[j], self.scales[j]);
            for v in col.iter_mut() {
                *v = (*v - m) / s;
            }
        }
    }

    pub fn subset(&self, keep: &[usize]) -> Self {
        Self {
            means: keep.iter().map(|&i| self.means[i]).collect(),
            scales: keep.iter().map(|&i| self.scales[i]).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn standardized_columns_have_zero_mean_unit_sd() {
        let mut x = DMatrix::from_row_slice(4, 2, &[1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0]);
        let scaler = Standardizer::fit(&x);
        scaler.transform_in_place(&mut x);

        for col in x.column_iter() {
            let values: Vec<f64> = col.iter().copied().collect();
            assert_relative_eq!(mean(&values).unwrap(), 0.0, epsilon = 1e-12);
            assert_relative_eq!(sample_sd(&values).unwrap(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn constant_column_gets_unit_scale() {
        let x = DMatrix::from_row_slice(3, 1, &[5.0, 5.0, 5.0]);
        let scaler = Standardizer::fit(&x);
        assert_eq!(scaler.scales, vec![1.0]);
        assert_eq!(scaler.means, vec![5.0]);
    }
}
