// SPDX-License-Identifier: PMPL-1.0-or-later

//! Analyzer engines
//!
//! Each engine is a pure function of the contract source: no shared state, no
//! I/O. The three built-in engines emulate different tool styles over the same
//! text and are merged later by the consensus aggregator.

pub mod custom;
pub mod mythril;
pub mod rules;
pub mod slither;
pub mod source;

use crate::errors::AnalysisError;
use crate::types::StaticAnalysisResult;
use regex::Regex;
use std::sync::LazyLock;

pub use custom::CustomEngine;
pub use mythril::MythrilEngine;
pub use slither::SlitherEngine;
pub use source::SourceText;

/// A pluggable detection strategy over contract source text
pub trait AnalyzerEngine: Send + Sync {
    /// Registry key for this engine
    fn name(&self) -> &str;

    fn analyze(&self, source: &str) -> Result<StaticAnalysisResult, AnalysisError>;
}

static CONTROL_FLOW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:if|else|for|while|do|require|assert|revert)\b|&&|\|\|")
        .expect("control flow pattern is valid")
});

static CONTRACT_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:contract|library|interface)\s+[A-Za-z_]\w*")
        .expect("contract pattern is valid")
});

/// Reject input that is not source text.
///
/// NUL bytes only occur in binary payloads (bytecode dumps, archives).
pub(crate) fn ensure_text(engine: &str, source: &str) -> Result<(), AnalysisError> {
    if source.contains('\0') {
        return Err(AnalysisError::external(
            engine,
            "input contains NUL bytes and is not contract source text",
        ));
    }
    Ok(())
}

/// Number of branching keywords and short-circuit operators
pub(crate) fn control_flow_count(src: &SourceText<'_>) -> usize {
    CONTROL_FLOW.find_iter(src.masked()).count()
}

/// Number of contract, library and interface declarations
pub(crate) fn contract_count(src: &SourceText<'_>) -> usize {
    CONTRACT_DECL.find_iter(src.masked()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_text_rejects_binary() {
        assert!(ensure_text("slither", "contract A {}").is_ok());
        let err = ensure_text("slither", "\0\x01\x02").unwrap_err();
        assert!(matches!(err, AnalysisError::ExternalService { .. }));
    }

    #[test]
    fn test_counts_ignore_comments() {
        let src = SourceText::new(
            "// contract Ghost {}\ncontract A {\n  function f() public { if (x && y) { revert(); } }\n}\ninterface B {}\n",
        );
        assert_eq!(contract_count(&src), 2);
        assert_eq!(control_flow_count(&src), 3);
    }
}
