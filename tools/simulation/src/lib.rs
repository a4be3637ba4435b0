//! Escrow Simulation Framework
//!
//! Drives the escrow engine with a seeded, partly adversarial workload and
//! audits every escrow after each step.
//!
//! # Modules
//! - `workload`: Run configuration and the deterministic action generator
//! - `runner`: Applies actions to the engine and reconciles after each step
//! - `metrics`: Applied/rejected counters and SOL volume totals
//! - `export`: Metrics and report JSON export

pub mod export;
pub mod metrics;
pub mod runner;
pub mod workload;

pub use metrics::SimMetrics;
pub use runner::{Simulation, Violation};
pub use workload::{Action, SimConfig, Workload};

/// Crate version constant
pub const VERSION: &str = "1.0.0";
