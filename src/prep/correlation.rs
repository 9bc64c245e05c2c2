//! High-correlation filter.
//!
//! For every pair of predictors whose absolute Pearson correlation exceeds the
//! cutoff, the member with the larger mean absolute correlation (against all
//! predictors) is removed. Pairs are examined independently, so a column can
//! be removed because of any one of its partners.

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::prep::scale::Standardizer;

/// Return the (sorted) column indices to drop.
pub fn find_correlated(x: &DMatrix<f64>, cutoff: f64) -> Vec<usize> {
    let corr = correlation_matrix(x);
    let p = corr.ncols();
    if p < 2 {
        return Vec::new();
    }

    let mean_abs: Vec<f64> = (0..p)
        .map(|j| corr.column(j).iter().map(|v| v.abs()).sum::<f64>() / p as f64)
        .collect();

    let mut drop: Vec<usize> = (0..p)
        .into_par_iter()
        .flat_map_iter(|i| {
            let corr = &corr;
            let mean_abs = &mean_abs;
            ((i + 1)..p).filter_map(move |j| {
                if corr[(i, j)].abs() <= cutoff {
                    return None;
                }
                // Ties drop the later column.
                Some(if mean_abs[i] > mean_abs[j] { i } else { j })
            })
        })
        .collect();

    drop.sort_unstable();
    drop.dedup();
    drop
}

/// Pearson correlation of every column pair.
///
/// Constant columns correlate 0 with everything else.
pub fn correlation_matrix(x: &DMatrix<f64>) -> DMatrix<f64> {
    let n = x.nrows();
    let mut z = x.clone();
    Standardizer::fit(x).transform_in_place(&mut z);

    let denom = (n.max(2) - 1) as f64;
    let mut corr = z.transpose() * &z / denom;
    for j in 0..corr.ncols() {
        corr[(j, j)] = 1.0;
    }
    corr
}
