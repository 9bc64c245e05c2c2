//! Seeded train / holdout split.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    /// Ascending row indices.
    pub train: Vec<usize>,
    /// Ascending row indices; empty when the fraction is 0.
    pub holdout: Vec<usize>,
}

/// Hold out `fraction` of the rows.
///
/// With `stratify`, zeros and ones of a binary `y` are split separately so
/// both sets keep the class balance.
pub fn holdout_split(y: &[f64], fraction: f64, seed: u64, stratify: bool) -> Split {
    let groups: Vec<Vec<usize>> = if stratify {
        let (pos, neg): (Vec<usize>, Vec<usize>) = (0..y.len()).partition(|&i| y[i] > 0.5);
        vec![neg, pos]
    } else {
        vec![(0..y.len()).collect()]
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(y.len());
    let mut holdout = Vec::new();

    for mut group in groups {
        group.shuffle(&mut rng);
        let n_hold = ((group.len() as f64) * fraction).round() as usize;
        let n_hold = n_hold.min(group.len().saturating_sub(1));
        holdout.extend_from_slice(&group[..n_hold]);
        train.extend_from_slice(&group[n_hold..]);
    }

    train.sort_unstable();
    holdout.sort_unstable();
    Split { train, holdout }
}
