// SPDX-License-Identifier: PMPL-1.0-or-later

//! Engine-level error taxonomy
//!
//! Every variant is recoverable at the orchestrator: the failing engine is
//! skipped and the remaining engines still report.

/// Errors raised while constructing or running an analyzer engine.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("external service unavailable: {engine}: {reason}")]
    ExternalService { engine: String, reason: String },

    #[error("engine {engine} timed out after {timeout_ms}ms")]
    Timeout { engine: String, timeout_ms: u64 },

    #[error("engine {engine} panicked during analysis")]
    Panicked { engine: String },

    #[error("invalid detection rule {rule}: {source}")]
    InvalidRule {
        rule: String,
        #[source]
        source: regex::Error,
    },
}

impl AnalysisError {
    pub fn external(engine: &str, reason: impl Into<String>) -> Self {
        AnalysisError::ExternalService {
            engine: engine.to_string(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable tag, used in serialized failure records
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::ExternalService { .. } => "external_service",
            AnalysisError::Timeout { .. } => "timeout",
            AnalysisError::Panicked { .. } => "panicked",
            AnalysisError::InvalidRule { .. } => "invalid_rule",
        }
    }
}
