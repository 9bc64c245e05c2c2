//! Linear predictor evaluation for the two supported families.
//!
//! - gaussian: `ŷ = b0 + xᵀβ` (identity link)
//! - binomial: `p̂ = 1 / (1 + exp(-(b0 + xᵀβ)))` (logit link)

use nalgebra::{DMatrix, DVector};

use crate::domain::{ClipRange, Family};
use crate::math::sigmoid;

#[derive(Debug, Clone, PartialEq)]
pub struct LinearPredictor {
    pub family: Family,
    pub intercept: f64,
    /// One coefficient per column of the prepared matrix.
    pub coefficients: Vec<f64>,
    pub clip: Option<ClipRange>,
}

impl LinearPredictor {
    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    /// Predict one prepared row.
    ///
    /// # Panics
    /// Panics if `row.len() != self.n_features()`.
    pub fn predict(&self, row: &[f64]) -> f64 {
        assert_eq!(row.len(), self.coefficients.len(), "feature count mismatch");
        let eta = self.intercept + row.iter().zip(&self.coefficients).map(|(x, b)| x * b).sum::<f64>();
        self.finish(eta)
    }

    /// Predict every row of a prepared matrix, in row order.
    pub fn predict_matrix(&self, x: &DMatrix<f64>) -> Vec<f64> {
        assert_eq!(x.ncols(), self.coefficients.len(), "feature count mismatch");
        let beta = DVector::from_column_slice(&self.coefficients);
        let eta = x * beta;
        eta.iter().map(|e| self.finish(e + self.intercept)).collect()
    }

    fn finish(&self, eta: f64) -> f64 {
        let v = match self.family {
            Family::Gaussian => eta,
            Family::Binomial => sigmoid(eta),
        };
        match self.clip {
            Some(range) => range.apply(v),
            None => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gaussian_is_identity_and_clips() {
        let m = LinearPredictor {
            family: Family::Gaussian,
            intercept: 0.5,
            coefficients: vec![0.25, -1.0],
            clip: Some(ClipRange { lo: 0.0, hi: 1.0 }),
        };
        assert_relative_eq!(m.predict(&[1.0, 0.0]), 0.75);
        assert_relative_eq!(m.predict(&[0.0, 2.0]), 0.0);
        assert_relative_eq!(m.predict(&[4.0, 0.0]), 1.0);
    }

    #[test]
    fn binomial_uses_logistic_link() {
        let m = LinearPredictor {
            family: Family::Binomial,
            intercept: 0.0,
            coefficients: vec![2.0],
            clip: None,
        };
        assert_relative_eq!(m.predict(&[0.0]), 0.5);
        assert!(m.predict(&[50.0]) <= 1.0);
        assert!(m.predict(&[-50.0]) >= 0.0);
    }

    #[test]
    fn matrix_prediction_matches_rows() {
        let m = LinearPredictor {
            family: Family::Binomial,
            intercept: -0.3,
            coefficients: vec![0.7, 0.1],
            clip: None,
        };
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, -1.0, 0.5, 0.0, 0.0]);
        let all = m.predict_matrix(&x);
        for (i, p) in all.iter().enumerate() {
            let row: Vec<f64> = x.row(i).iter().copied().collect();
            assert_relative_eq!(*p, m.predict(&row), epsilon = 1e-12);
        }
    }

    #[test]
    fn intercept_only_model() {
        let m = LinearPredictor {
            family: Family::Gaussian,
            intercept: 0.42,
            coefficients: Vec::new(),
            clip: None,
        };
        let x = DMatrix::<f64>::zeros(4, 0);
        assert_eq!(m.predict_matrix(&x), vec![0.42; 4]);
    }
}
