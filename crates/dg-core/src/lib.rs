//! digit-gauss core library.
//!
//! This library provides the statistical engine behind the `dg-core` binary:
//! - Per-class Gaussian estimation, likelihoods and posteriors
//! - The classification decision rule
//! - Generative sampling from class and per-label mixture models
//! - Projection + clustering evaluation against ground truth
//! - The explicit engine state holding fitted models
//! - Training-table loading, structured logging and exit codes
//!
//! The binary entry point is in `main.rs`.

pub mod cluster;
pub mod dataset;
pub mod decision;
pub mod engine;
pub mod exit_codes;
pub mod generate;
pub mod inference;
pub mod logging;
pub mod schema;

pub use engine::{
    Classification, ClusterSummary, Engine, EngineStatus, GeneratorSummary, ModelSummary, SlotState,
};
