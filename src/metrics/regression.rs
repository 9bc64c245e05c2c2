//! Error metrics for continuous predictions.

/// Holdout summary of an LGD model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionReport {
    pub n: usize,
    pub mae: f64,
    pub rmse: f64,
    /// `1 - SSE / SST`; `NaN` when the actuals are constant.
    pub r2: f64,
    pub mean_actual: f64,
    pub mean_predicted: f64,
}

pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(actual.len(), predicted.len());
    if actual.is_empty() {
        return f64::NAN;
    }
    actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum::<f64>() / actual.len() as f64
}

pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(actual.len(), predicted.len());
    if actual.is_empty() {
        return f64::NAN;
    }
    actual.iter().zip(predicted).map(|(a, p)| (a - p) * (a - p)).sum::<f64>() / actual.len() as f64
}

pub fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return f64::NAN;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let sst: f64 = actual.iter().map(|a| (a - mean) * (a - mean)).sum();
    if sst <= 0.0 {
        return f64::NAN;
    }
    let sse: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p) * (a - p)).sum();
    1.0 - sse / sst
}

pub fn regression_report(actual: &[f64], predicted: &[f64]) -> RegressionReport {
    let n = actual.len();
    let avg = |v: &[f64]| if v.is_empty() { f64::NAN } else { v.iter().sum::<f64>() / v.len() as f64 };
    RegressionReport {
        n,
        mae: mean_absolute_error(actual, predicted),
        rmse: mean_squared_error(actual, predicted).sqrt(),
        r2: r_squared(actual, predicted),
        mean_actual: avg(actual),
        mean_predicted: avg(predicted),
    }
}
