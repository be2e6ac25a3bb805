// SPDX-License-Identifier: PMPL-1.0-or-later

//! Mythril-style engine
//!
//! Looks for source constructs that compile to dangerous opcodes:
//! SELFDESTRUCT, DELEGATECALL, TIMESTAMP, ORIGIN, unchecked ADD/SUB/MUL and
//! INVALID (assert).

use crate::engines::rules::{RuleSet, RuleSpec};
use crate::engines::source::{is_keyword_at, SourceText};
use crate::engines::{ensure_text, AnalyzerEngine};
use crate::errors::AnalysisError;
use crate::types::*;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use std::time::Instant;
use tracing::debug;

static PRAGMA_MINOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"pragma\s+solidity\s*[\^~>=<]*\s*0\.(\d+)").expect("pragma pattern is valid")
});

static BRANCH_POINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:if|for|while|require|assert)\b|\?|&&|\|\|").expect("branch pattern is valid")
});

static CALLABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:function\s+[A-Za-z_]\w*|constructor|receive|fallback)\s*\(")
        .expect("callable pattern is valid")
});

static CONCRETE_CONTRACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bcontract\s+[A-Za-z_]\w*").expect("contract pattern is valid")
});

static RULES: &[RuleSpec] = &[
    RuleSpec {
        id: "selfdestruct",
        title: "Denial of Service",
        description: "The contract can be destroyed with selfdestruct. Once destroyed, every \
                      dependent contract and user loses access to its functionality and funds.",
        severity: Severity::Critical,
        category: "denial-of-service",
        pattern: r"\b(?:selfdestruct|suicide)\s*\(",
        recommendation: "Remove selfdestruct, or restrict it to a multisig behind a timelock.",
        cwe_id: Some("CWE-284"),
        swc_id: Some("SWC-106"),
        score: 0.9,
        gate: None,
    },
    RuleSpec {
        id: "delegatecall",
        title: "Delegatecall to Untrusted Callee",
        description: "delegatecall runs foreign code against this contract's storage. The \
                      target is not a compile-time constant, so it may be attacker controlled.",
        severity: Severity::Critical,
        category: "access-control",
        pattern: r"(?:address\(\s*([A-Za-z_]\w*)\s*\)|\b([A-Za-z_]\w*))\s*\.\s*delegatecall\s*\(",
        recommendation: "Delegate only to constant or immutable implementation addresses, \
                         or to an allow-list enforced on every call.",
        cwe_id: Some("CWE-829"),
        swc_id: Some("SWC-112"),
        score: 0.85,
        gate: Some(target_not_constant),
    },
    RuleSpec {
        id: "timestamp",
        title: "Timestamp Dependence",
        description: "Control flow depends on the block timestamp, which the block producer \
                      can shift within a tolerance.",
        severity: Severity::Low,
        category: "time-manipulation",
        pattern: r"\bblock\.timestamp\b|\bnow\b",
        recommendation: "Do not rely on block.timestamp for randomness or for precision below ~15 seconds.",
        cwe_id: Some("CWE-829"),
        swc_id: Some("SWC-116"),
        score: 0.6,
        gate: None,
    },
    RuleSpec {
        id: "tx-origin",
        title: "Authorization through tx.origin",
        description: "tx.origin is compared against an address, which authorizes whoever \
                      started the transaction rather than the immediate caller.",
        severity: Severity::High,
        category: "access-control",
        pattern: r"\btx\.origin\s*(?:==|!=)|(?:==|!=)\s*tx\.origin\b",
        recommendation: "Use msg.sender for authorization checks.",
        cwe_id: Some("CWE-477"),
        swc_id: Some("SWC-115"),
        score: 0.6,
        gate: None,
    },
    RuleSpec {
        id: "integer-overflow",
        title: "Integer Overflow and Underflow",
        description: "Arithmetic compiled without overflow checks can wrap around.",
        severity: Severity::High,
        category: "arithmetic",
        pattern: r"\b[A-Za-z_]\w*(?:\[[^\]]*\])*\s*(?:\+=|-=|\*=)|\b[A-Za-z_]\w*\s*=\s*[A-Za-z_]\w*(?:\[[^\]]*\])*\s*[-+*]\s*[A-Za-z_0-9]",
        recommendation: "Compile with Solidity 0.8 or later, or use SafeMath for every operation.",
        cwe_id: Some("CWE-190"),
        swc_id: Some("SWC-101"),
        score: 0.55,
        gate: Some(pre_checked_arithmetic),
    },
    RuleSpec {
        id: "assert-violation",
        title: "Assert Violation",
        description: "A reachable failing assert consumes all remaining gas and signals a \
                      broken invariant.",
        severity: Severity::Low,
        category: "assertion",
        pattern: r"\bassert\s*\(",
        recommendation: "Use require() for input validation; reserve assert() for invariants.",
        cwe_id: Some("CWE-670"),
        swc_id: Some("SWC-110"),
        score: 0.4,
        gate: None,
    },
];

/// The delegatecall target is neither `constant` nor `immutable`.
fn target_not_constant(src: &SourceText<'_>, caps: &Captures<'_>) -> bool {
    let Some(target) = caps.get(1).or_else(|| caps.get(2)) else {
        return true;
    };
    let target = target.as_str();
    !src.masked().lines().any(|line| {
        (line.contains(" constant ") || line.contains(" immutable ")) && contains_word(line, target)
    })
}

/// Only compilers before 0.8 emit unchecked arithmetic by default.
fn pre_checked_arithmetic(src: &SourceText<'_>, _caps: &Captures<'_>) -> bool {
    let Some(minor) = PRAGMA_MINOR
        .captures(src.masked())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
    else {
        return false;
    };
    minor < 8 && !src.masked().contains("SafeMath")
}

fn contains_word(text: &str, word: &str) -> bool {
    text.match_indices(word)
        .any(|(pos, _)| is_keyword_at(text, pos, word))
}

pub struct MythrilEngine {
    rules: RuleSet,
}

impl MythrilEngine {
    pub const NAME: &'static str = "mythril";

    pub fn new() -> Result<Self, AnalysisError> {
        Ok(Self {
            rules: RuleSet::compile(Self::NAME, RULES)?,
        })
    }

    fn metrics(&self, src: &SourceText<'_>) -> AnalysisMetrics {
        AnalysisMetrics {
            total_lines: src.total_lines(),
            complexity_score: BRANCH_POINT.find_iter(src.masked()).count(),
            functions_analyzed: CALLABLE.find_iter(src.masked()).count(),
            contracts_analyzed: CONCRETE_CONTRACT.find_iter(src.masked()).count(),
            gas_estimate: None,
        }
    }
}

impl AnalyzerEngine for MythrilEngine {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn analyze(&self, source: &str) -> Result<StaticAnalysisResult, AnalysisError> {
        let started = Instant::now();
        ensure_text(Self::NAME, source)?;
        let src = SourceText::new(source);

        let vulnerabilities = self.rules.run(&src);
        let metrics = self.metrics(&src);
        debug!(
            engine = Self::NAME,
            findings = vulnerabilities.len(),
            "analysis finished"
        );

        Ok(StaticAnalysisResult {
            tool: Self::NAME.to_string(),
            vulnerabilities,
            metrics,
            execution_time: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(source: &str) -> StaticAnalysisResult {
        MythrilEngine::new().unwrap().analyze(source).unwrap()
    }

    fn by_title<'a>(result: &'a StaticAnalysisResult, title: &str) -> Vec<&'a Vulnerability> {
        result.vulnerabilities.iter().filter(|v| v.title == title).collect()
    }

    #[test]
    fn test_selfdestruct_is_critical() {
        let result = analyze("contract K {\n  function kill() public {\n    selfdestruct(msg.sender);\n  }\n}\n");
        let dos = by_title(&result, "Denial of Service");
        assert_eq!(dos.len(), 1);
        assert_eq!(dos[0].severity, Severity::Critical);
        assert_eq!(dos[0].swc_id.as_deref(), Some("SWC-106"));
        assert_eq!(dos[0].line_numbers, vec![3]);
    }

    #[test]
    fn test_delegatecall_constant_target_is_skipped() {
        let mutable = "contract P {\n  address impl;\n  function f(bytes memory d) public {\n    impl.delegatecall(d);\n  }\n}\n";
        assert_eq!(by_title(&analyze(mutable), "Delegatecall to Untrusted Callee").len(), 1);

        let wrapped = mutable.replace("impl.delegatecall", "address(impl).delegatecall");
        assert_eq!(by_title(&analyze(&wrapped), "Delegatecall to Untrusted Callee").len(), 1);

        let constant = mutable.replace("address impl;", "address public constant impl = address(0x1);");
        assert!(by_title(&analyze(&constant), "Delegatecall to Untrusted Callee").is_empty());

        let immutable = mutable.replace("address impl;", "address private immutable impl;");
        assert!(by_title(&analyze(&immutable), "Delegatecall to Untrusted Callee").is_empty());
    }

    #[test]
    fn test_timestamp_and_now_are_low() {
        let result = analyze("uint a = block.timestamp;\nuint b = now;\nuint known = 1;\n");
        let ts = by_title(&result, "Timestamp Dependence");
        assert_eq!(ts.len(), 2);
        assert!(ts.iter().all(|v| v.severity == Severity::Low));
        assert_eq!(ts[1].line_numbers, vec![2]);
    }

    #[test]
    fn test_now_inside_string_is_ignored() {
        let result = analyze("contract R {\n  function f() public {\n    revert(\"not now\");\n  }\n}\n");
        assert!(by_title(&result, "Timestamp Dependence").is_empty());
    }

    #[test]
    fn test_overflow_only_before_0_8() {
        let old = "pragma solidity ^0.6.0;\ncontract C {\n  uint total;\n  function add(uint x) public { total += x; }\n}\n";
        let found = by_title(&analyze(old), "Integer Overflow and Underflow").len();
        assert_eq!(found, 1);

        let new = old.replace("^0.6.0", "^0.8.19");
        assert!(by_title(&analyze(&new), "Integer Overflow and Underflow").is_empty());

        let safe = format!("{}\nusing SafeMath for uint;\n", old);
        assert!(by_title(&analyze(&safe), "Integer Overflow and Underflow").is_empty());
    }

    #[test]
    fn test_tx_origin_only_in_comparisons() {
        let result = analyze("require(tx.origin == owner);\nemit Seen(tx.origin);\n");
        let origin = by_title(&result, "Authorization through tx.origin");
        assert_eq!(origin.len(), 1);
        assert_eq!(origin[0].line_numbers, vec![1]);
        assert_eq!(origin[0].confidence, Confidence::Medium);
    }

    #[test]
    fn test_metrics_count_callables() {
        let result = analyze("contract A {\n  constructor() {}\n  function f() public { if (x) {} }\n  receive() external payable {}\n}\ninterface I {}\n");
        assert_eq!(result.metrics.functions_analyzed, 3);
        assert_eq!(result.metrics.contracts_analyzed, 1);
        assert_eq!(result.metrics.complexity_score, 1);
        assert_eq!(result.metrics.total_lines, 6);
    }
}
