//! Near-zero-variance filtering.
//!
//! A predictor is uninformative when it is (almost) constant. We flag a column
//! when either:
//!
//! - it has at most one distinct non-missing value (zero variance), or
//! - its most common value dominates the second most common by more than
//!   `freq_cut` **and** the share of distinct values is at most `unique_cut`
//!   percent of all rows.
//!
//! Missing cells are ignored when counting values but still count towards the
//! row total used for `percent_unique`.

use std::collections::HashMap;

/// Per-column diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct NzvStat {
    pub name: String,
    /// Count of the most common value over the second most common.
    pub freq_ratio: f64,
    /// Distinct non-missing values as a percentage of all rows.
    pub percent_unique: f64,
    pub zero_var: bool,
    pub nzv: bool,
}

impl NzvStat {
    pub fn drop(&self) -> bool {
        self.zero_var || self.nzv
    }
}

/// Compute near-zero-variance diagnostics for every column.
pub fn near_zero_variance(
    names: &[String],
    columns: &[Vec<Option<f64>>],
    freq_cut: f64,
    unique_cut: f64,
) -> Vec<NzvStat> {
    names
        .iter()
        .zip(columns.iter())
        .map(|(name, col)| column_stat(name, col, freq_cut, unique_cut))
        .collect()
}

fn column_stat(name: &str, col: &[Option<f64>], freq_cut: f64, unique_cut: f64) -> NzvStat {
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for v in col.iter().flatten() {
        // Fold -0.0 into 0.0 so they count as one value.
        let key = if *v == 0.0 { 0.0_f64.to_bits() } else { v.to_bits() };
        *counts.entry(key).or_insert(0) += 1;
    }

    let n_unique = counts.len();
    let percent_unique = if col.is_empty() {
        0.0
    } else {
        100.0 * n_unique as f64 / col.len() as f64
    };

    if n_unique <= 1 {
        return NzvStat {
            name: name.to_string(),
            freq_ratio: 0.0,
            percent_unique,
            zero_var: true,
            nzv: true,
        };
    }

    let mut freq: Vec<usize> = counts.into_values().collect();
    freq.sort_unstable_by(|a, b| b.cmp(a));
    let freq_ratio = freq[0] as f64 / freq[1] as f64;

    NzvStat {
        name: name.to_string(),
        freq_ratio,
        percent_unique,
        zero_var: false,
        nzv: freq_ratio > freq_cut && percent_unique <= unique_cut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("f{i}")).collect()
    }

    #[test]
    fn constant_and_empty_columns_are_zero_variance() {
        let cols = vec![vec![Some(1.0); 10], vec![None; 10]];
        let stats = near_zero_variance(&names(2), &cols, 19.0, 10.0);
        assert!(stats[0].zero_var);
        assert!(stats[1].zero_var);
        assert!(stats.iter().all(NzvStat::drop));
    }

    #[test]
    fn dominant_value_with_few_uniques_is_flagged() {
        // 99 zeros and a single 1: ratio 99 > 19 and 2% unique <= 10%.
        let mut col = vec![Some(0.0); 99];
        col.push(Some(1.0));
        let stats = near_zero_variance(&names(1), &[col], 19.0, 10.0);
        assert!(!stats[0].zero_var);
        assert!(stats[0].nzv);
        assert!((stats[0].freq_ratio - 99.0).abs() < 1e-12);
        assert!((stats[0].percent_unique - 2.0).abs() < 1e-12);
    }

    #[test]
    fn continuous_column_is_kept() {
        let col: Vec<Option<f64>> = (0..50).map(|i| Some(i as f64 * 0.3)).collect();
        let stats = near_zero_variance(&names(1), &[col], 19.0, 10.0);
        assert!(!stats[0].drop());
        assert!((stats[0].freq_ratio - 1.0).abs() < 1e-12);
    }

    #[test]
    fn balanced_binary_column_is_kept() {
        let col: Vec<Option<f64>> = (0..100).map(|i| Some((i % 2) as f64)).collect();
        let stats = near_zero_variance(&names(1), &[col], 19.0, 10.0);
        assert!(!stats[0].drop());
    }

    #[test]
    fn missing_cells_count_towards_percent_unique_only() {
        let col = vec![Some(1.0), Some(2.0), None, None];
        let stats = near_zero_variance(&names(1), &[col], 19.0, 10.0);
        assert!((stats[0].percent_unique - 50.0).abs() < 1e-12);
        assert!((stats[0].freq_ratio - 1.0).abs() < 1e-12);
    }
}
