//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - model targets and families (`TargetKind`, `Family`)
//! - target derivation from the `loss` column
//! - cross-validation knobs (`Measure`, `LambdaRule`)
//! - the run configuration (`PipelineConfig`)
//! - the portable fitted artifact (`FittedModel`)

pub mod target;
pub mod types;

pub use target::*;
pub use types::*;
