//! Error types.
//!
//! `AppError` is what reaches `main`: a message plus the process exit code.
//!
//! Exit codes:
//! - `2`: input, schema or configuration problem
//! - `3`: not enough usable data
//! - `4`: numerical / fitting failure

use thiserror::Error;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failures raised by the path fitters and cross-validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("Not enough rows to fit: {rows} rows for {folds} folds")]
    TooFewRows { rows: usize, folds: usize },

    #[error("Cross-validation needs at least 3 folds, got {0}")]
    TooFewFolds(usize),

    #[error("Design matrix has {rows} rows but the response has {got}")]
    DimensionMismatch { rows: usize, got: usize },

    #[error("Invalid elastic-net mixing parameter alpha={0} (must be in [0, 1])")]
    InvalidAlpha(f64),

    #[error("Invalid regularization path: {0}")]
    InvalidPath(String),

    #[error("Binomial response must contain both classes (got only {0})")]
    SingleClass(f64),

    #[error("Binomial response must be 0 or 1 (got {0})")]
    NonBinary(f64),

    #[error("Measure `{0}` is only defined for binomial models")]
    MeasureFamily(&'static str),

    #[error("Least-squares refit failed: design matrix is too ill-conditioned")]
    Singular,

    #[error("Non-finite values produced during fitting")]
    NonFinite,
}

impl FitError {
    fn exit_code(&self) -> u8 {
        match self {
            FitError::TooFewRows { .. } | FitError::TooFewFolds(_) | FitError::SingleClass(_) => 3,
            FitError::InvalidAlpha(_)
            | FitError::InvalidPath(_)
            | FitError::NonBinary(_)
            | FitError::MeasureFamily(_) => 2,
            FitError::DimensionMismatch { .. } | FitError::Singular | FitError::NonFinite => 4,
        }
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_errors_map_to_exit_codes() {
        let e: AppError = FitError::TooFewRows { rows: 4, folds: 10 }.into();
        assert_eq!(e.exit_code(), 3);
        assert!(e.message().contains("4 rows"));

        let e: AppError = FitError::InvalidAlpha(1.5).into();
        assert_eq!(e.exit_code(), 2);

        let e: AppError = FitError::Singular.into();
        assert_eq!(e.exit_code(), 4);
    }
}
