//! Modeling targets derived from the raw `loss` column.
//!
//! `loss` is the percentage of exposure lost on the account; `0` means the
//! loan did not default.

use super::types::{PipelineConfig, TargetKind};

/// Training rows and their response values.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRows {
    /// Indices into the loaded table.
    pub rows: Vec<usize>,
    pub y: Vec<f64>,
    /// Rows dropped because `loss` was missing.
    pub missing: usize,
    /// Rows dropped because they never defaulted (LGD only).
    pub non_defaulted: usize,
}

impl TargetRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Build the response for `kind` from the loss column.
///
/// - PD: `1.0` when `loss > 0`, else `0.0`
/// - LGD: `loss / target_scale`, optionally restricted to `loss > 0`
pub fn derive_target(kind: TargetKind, loss: &[Option<f64>], config: &PipelineConfig) -> TargetRows {
    let mut out = TargetRows {
        rows: Vec::new(),
        y: Vec::new(),
        missing: 0,
        non_defaulted: 0,
    };

    for (i, value) in loss.iter().enumerate() {
        let Some(loss) = *value else {
            out.missing += 1;
            continue;
        };
        let y = match kind {
            TargetKind::Pd => {
                if loss > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            TargetKind::Lgd => {
                if config.lgd_defaulted_only && loss <= 0.0 {
                    out.non_defaulted += 1;
                    continue;
                }
                loss / config.target_scale
            }
        };
        out.rows.push(i);
        out.y.push(y);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loss() -> Vec<Option<f64>> {
        vec![Some(0.0), Some(25.0), None, Some(100.0), Some(0.0)]
    }

    #[test]
    fn pd_flags_any_positive_loss() {
        let t = derive_target(TargetKind::Pd, &loss(), &PipelineConfig::default());
        assert_eq!(t.rows, vec![0, 1, 3, 4]);
        assert_eq!(t.y, vec![0.0, 1.0, 1.0, 0.0]);
        assert_eq!(t.missing, 1);
        assert_eq!(t.non_defaulted, 0);
    }

    #[test]
    fn lgd_uses_defaulted_rows_as_fractions() {
        let t = derive_target(TargetKind::Lgd, &loss(), &PipelineConfig::default());
        assert_eq!(t.rows, vec![1, 3]);
        assert_eq!(t.y, vec![0.25, 1.0]);
        assert_eq!(t.non_defaulted, 2);
    }

    #[test]
    fn lgd_can_keep_every_row() {
        let config = PipelineConfig {
            lgd_defaulted_only: false,
            ..PipelineConfig::default()
        };
        let t = derive_target(TargetKind::Lgd, &loss(), &config);
        assert_eq!(t.len(), 4);
        assert_eq!(t.y[0], 0.0);
    }
}
