//! Ranking and calibration metrics for default probabilities.
//!
//! Labels are `0.0` / `1.0`; scores are any monotone risk score (the
//! predicted probability in practice).

use std::cmp::Ordering;

use crate::math::{P_EPS, binomial_deviance};

/// One vertex of the ROC curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RocPoint {
    /// Rows with `score >= threshold` are called positive.
    pub threshold: f64,
    pub fpr: f64,
    pub tpr: f64,
}

/// Counts at a fixed threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Confusion {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl Confusion {
    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    pub fn accuracy(&self) -> f64 {
        if self.total() == 0 {
            return f64::NAN;
        }
        (self.tp + self.tn) as f64 / self.total() as f64
    }
}

/// Holdout summary of a PD model.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub n: usize,
    pub positives: usize,
    /// `None` when only one class is present.
    pub auc: Option<f64>,
    pub gini: Option<f64>,
    pub ks: Option<f64>,
    pub log_loss: f64,
    pub confusion: Confusion,
    pub accuracy: f64,
    pub mean_predicted: f64,
}

/// ROC curve from the highest threshold down.
///
/// Tied scores form a single step. The first point is `(0, 0)` at
/// `threshold = +inf`, the last is `(1, 1)`. Empty when either class is absent.
pub fn roc_curve(scores: &[f64], labels: &[f64]) -> Vec<RocPoint> {
    debug_assert_eq!(scores.len(), labels.len());
    let pos = labels.iter().filter(|y| **y > 0.5).count();
    let neg = labels.len() - pos;
    if pos == 0 || neg == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));

    let mut points = Vec::with_capacity(order.len() + 1);
    points.push(RocPoint {
        threshold: f64::INFINITY,
        fpr: 0.0,
        tpr: 0.0,
    });

    let (mut tp, mut fp) = (0usize, 0usize);
    let mut i = 0;
    while i < order.len() {
        let threshold = scores[order[i]];
        while i < order.len() && scores[order[i]] == threshold {
            if labels[order[i]] > 0.5 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        points.push(RocPoint {
            threshold,
            fpr: fp as f64 / neg as f64,
            tpr: tp as f64 / pos as f64,
        });
    }
    points
}

/// Trapezoidal area under an ROC curve.
pub fn auc_from_roc(points: &[RocPoint]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    Some(
        points
            .windows(2)
            .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
            .sum(),
    )
}

pub fn auc(scores: &[f64], labels: &[f64]) -> Option<f64> {
    auc_from_roc(&roc_curve(scores, labels))
}

/// Kolmogorov-Smirnov statistic: largest `tpr - fpr` gap.
pub fn ks_statistic(points: &[RocPoint]) -> Option<f64> {
    points.iter().map(|p| p.tpr - p.fpr).reduce(f64::max)
}

/// Mean negative log-likelihood with probabilities clamped away from 0 and 1.
pub fn log_loss(probs: &[f64], labels: &[f64]) -> f64 {
    if probs.is_empty() {
        return f64::NAN;
    }
    let dev: f64 = labels
        .iter()
        .zip(probs)
        .map(|(y, p)| binomial_deviance(*y, p.clamp(P_EPS, 1.0 - P_EPS)))
        .sum();
    dev / (2.0 * probs.len() as f64)
}

/// Misclassification rate at `threshold`.
pub fn misclassification(probs: &[f64], labels: &[f64], threshold: f64) -> f64 {
    1.0 - confusion(probs, labels, threshold).accuracy()
}

/// Counts with `prob >= threshold` called positive, as on the ROC curve.
pub fn confusion(probs: &[f64], labels: &[f64], threshold: f64) -> Confusion {
    let mut c = Confusion::default();
    for (p, y) in probs.iter().zip(labels) {
        match (*p >= threshold, *y > 0.5) {
            (true, true) => c.tp += 1,
            (true, false) => c.fp += 1,
            (false, false) => c.tn += 1,
            (false, true) => c.fn_ += 1,
        }
    }
    c
}

pub fn classification_report(probs: &[f64], labels: &[f64]) -> ClassificationReport {
    let roc = roc_curve(probs, labels);
    let auc = auc_from_roc(&roc);
    let confusion = confusion(probs, labels, 0.5);
    ClassificationReport {
        n: labels.len(),
        positives: labels.iter().filter(|y| **y > 0.5).count(),
        auc,
        gini: auc.map(|a| 2.0 * a - 1.0),
        ks: ks_statistic(&roc),
        log_loss: log_loss(probs, labels),
        accuracy: confusion.accuracy(),
        confusion,
        mean_predicted: if probs.is_empty() {
            f64::NAN
        } else {
            probs.iter().sum::<f64>() / probs.len() as f64
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_ranking_has_unit_auc() {
        let scores = [0.9, 0.8, 0.3, 0.1];
        let labels = [1.0, 1.0, 0.0, 0.0];
        assert_relative_eq!(auc(&scores, &labels).unwrap(), 1.0);

        let roc = roc_curve(&scores, &labels);
        assert_relative_eq!(ks_statistic(&roc).unwrap(), 1.0);
    }

    #[test]
    fn reversed_ranking_has_zero_auc() {
        let scores = [0.1, 0.2, 0.8, 0.9];
        let labels = [1.0, 1.0, 0.0, 0.0];
        assert_relative_eq!(auc(&scores, &labels).unwrap(), 0.0);
    }

    #[test]
    fn ties_count_half() {
        // One positive and one negative share a score: the tied step is a diagonal.
        let scores = [0.5, 0.5];
        let labels = [1.0, 0.0];
        let roc = roc_curve(&scores, &labels);
        assert_eq!(roc.len(), 2);
        assert_relative_eq!(auc_from_roc(&roc).unwrap(), 0.5);
    }

    #[test]
    fn auc_matches_pairwise_count() {
        let scores = [0.9, 0.7, 0.7, 0.4, 0.2, 0.1];
        let labels = [1.0, 0.0, 1.0, 1.0, 0.0, 0.0];
        // Pairs (pos, neg) with pos scored higher, ties counted 0.5:
        // 0.9 beats 3, 0.7 beats 2 + ties 1, 0.4 beats 2 => 3 + 2.5 + 2 = 7.5 of 9.
        assert_relative_eq!(auc(&scores, &labels).unwrap(), 7.5 / 9.0, epsilon = 1e-12);
    }

    #[test]
    fn single_class_has_no_curve() {
        assert!(roc_curve(&[0.2, 0.4], &[0.0, 0.0]).is_empty());
        assert!(auc(&[0.2, 0.4], &[1.0, 1.0]).is_none());
    }

    #[test]
    fn confusion_at_a_tied_threshold_matches_the_roc_point() {
        let probs = [0.8, 0.5, 0.5, 0.1];
        let labels = [1.0, 1.0, 0.0, 0.0];
        let c = confusion(&probs, &labels, 0.5);
        assert_eq!(
            c,
            Confusion {
                tp: 2,
                fp: 1,
                tn: 1,
                fn_: 0
            }
        );

        let roc = roc_curve(&probs, &labels);
        let at_half = roc.iter().find(|p| p.threshold == 0.5).unwrap();
        assert_relative_eq!(at_half.tpr, c.tp as f64 / 2.0);
        assert_relative_eq!(at_half.fpr, c.fp as f64 / 2.0);
    }

    #[test]
    fn report_counts_confusion_at_half() {
        let probs = [0.9, 0.6, 0.4, 0.2];
        let labels = [1.0, 0.0, 1.0, 0.0];
        let r = classification_report(&probs, &labels);
        assert_eq!(
            r.confusion,
            Confusion {
                tp: 1,
                fp: 1,
                tn: 1,
                fn_: 1
            }
        );
        assert_relative_eq!(r.accuracy, 0.5);
        assert_relative_eq!(r.gini.unwrap(), 2.0 * r.auc.unwrap() - 1.0);
        assert!(r.log_loss > 0.0);
        assert_relative_eq!(misclassification(&probs, &labels, 0.5), 0.5);
    }
}
