// SPDX-License-Identifier: PMPL-1.0-or-later

//! consensus-scan: multi-engine heuristic smart-contract scanning.
//!
//! Several independent engines read the same contract source and their
//! findings are merged into one deduplicated, confidence-scored result.
//!
//! PIPELINE:
//! 1. **Engines**: slither-, mythril- and custom-style heuristics over the
//!    source text, backed by a shared pattern library.
//! 2. **Orchestrator**: runs the requested engines on a bounded worker pool
//!    with a per-engine timeout; every engine gets an explicit outcome.
//! 3. **Consensus**: dedups findings by title and line numbers, elevates
//!    confidence where engines agree, and aggregates metrics.

pub mod config;
pub mod consensus;
pub mod engines;
pub mod errors;
pub mod logging;
pub mod orchestrator;
pub mod patterns;
pub mod report;
pub mod scan;
pub mod sweep;
pub mod types;

pub use consensus::{get_consensus_analysis, ConsensusAggregator, ElevationPolicy};
pub use engines::AnalyzerEngine;
pub use errors::AnalysisError;
pub use orchestrator::{analyze_contract, EngineRegistry, Orchestrator, RunOptions};
pub use scan::{scan_source, Scanner};
