//! `loan-loss` library crate.
//!
//! The binary (`loanloss`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the fitting pipeline can be driven from other tools (e.g. batch jobs)
//!
//! Layout: `io` reads and writes files, `prep` turns raw columns into a
//! standardized design matrix, `fit` runs the penalized path and
//! cross-validation, `models` / `metrics` score and evaluate, and
//! `app::pipeline` ties one target's workflow together.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod metrics;
pub mod models;
pub mod plot;
pub mod prep;
pub mod report;
