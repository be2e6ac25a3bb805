// SPDX-License-Identifier: PMPL-1.0-or-later

//! Slither-style engine
//!
//! Broad pattern-library sweep, a small table of source rules with
//! false-positive gates, and a hand-coded multi-line reentrancy check.

use crate::engines::rules::{RuleSet, RuleSpec};
use crate::engines::source::{FunctionSpan, SourceText};
use crate::engines::{contract_count, control_flow_count, ensure_text, AnalyzerEngine};
use crate::errors::AnalysisError;
use crate::patterns::PatternLibrary;
use crate::types::*;
use regex::{Captures, Regex};
use std::time::Instant;
use tracing::debug;

/// Lines after an external call that are searched for a storage write
const REENTRANCY_WINDOW: usize = 2;

/// Words that identify a price read as already smoothed or delayed
const PRICE_MITIGATIONS: &[&str] = &["delay", "twap"];

static RULES: &[RuleSpec] = &[
    RuleSpec {
        id: "oracle-manipulation",
        title: "Price Oracle Manipulation",
        description: "A spot price is read from an on-chain source and used directly. \
                      Flash loans can move such prices within a single transaction.",
        severity: Severity::High,
        category: "price-manipulation",
        pattern: r"\.\s*(?:getPrice|latestAnswer|latestRoundData|getReserves|getAmountsOut|spotPrice)\s*\(",
        recommendation: "Use a time-weighted average price or add a delay between price observation and use.",
        cwe_id: Some("CWE-682"),
        swc_id: None,
        score: 0.7,
        gate: Some(lacks_price_mitigation),
    },
    RuleSpec {
        id: "unchecked-token-transfer",
        title: "Unchecked Token Transfer",
        description: "The boolean returned by an ERC20 transfer is ignored. Tokens that return \
                      false instead of reverting will fail silently.",
        severity: Severity::Medium,
        category: "unchecked-return",
        pattern: r"(?m)^\s*[A-Za-z_][\w\.\[\]]*\.transfer(?:From)?\s*\([^;,]*,[^;]*\)\s*;",
        recommendation: "Wrap the call in require() or use SafeERC20.safeTransfer.",
        cwe_id: Some("CWE-252"),
        swc_id: Some("SWC-104"),
        score: 0.65,
        gate: None,
    },
    RuleSpec {
        id: "unprotected-initializer",
        title: "Unprotected Initializer",
        description: "An initialize function is callable by anyone; the first caller takes \
                      control of the contract.",
        severity: Severity::High,
        category: "access-control",
        pattern: r"function\s+initialize\s*\([^)]*\)[^{;]*\{",
        recommendation: "Guard the initializer with an `initializer` modifier or an access check.",
        cwe_id: Some("CWE-665"),
        swc_id: None,
        score: 0.6,
        gate: Some(initializer_unguarded),
    },
];

static REENTRANCY: RuleSpec = RuleSpec {
    id: "reentrancy",
    title: "Reentrancy",
    description: "State is written after an external call. The callee can re-enter the \
                  function before the write and observe stale state.",
    severity: Severity::High,
    category: "reentrancy",
    pattern: r"\.(?:call|send)\s*(?:\{[^}]*\})?\s*\(|\.call\.value\s*\(",
    recommendation: "Apply checks-effects-interactions: update state before the external call, \
                     or guard the function with a reentrancy lock.",
    cwe_id: Some("CWE-841"),
    swc_id: Some("SWC-107"),
    score: 0.85,
    gate: None,
};

fn lacks_price_mitigation(src: &SourceText<'_>, caps: &Captures<'_>) -> bool {
    let Some(found) = caps.get(0) else {
        return false;
    };
    let context = match src.enclosing_function(found.start()) {
        Some(func) => &src.masked()[func.start..func.body.end],
        None => src.masked(),
    };
    let context = context.to_ascii_lowercase();
    !PRICE_MITIGATIONS.iter().any(|kw| context.contains(kw))
}

fn initializer_unguarded(_src: &SourceText<'_>, caps: &Captures<'_>) -> bool {
    let header = caps.get(0).map_or("", |m| m.as_str());
    !(header.contains("initializer") || header.contains("only"))
}

pub struct SlitherEngine {
    library: PatternLibrary,
    rules: RuleSet,
    external_call: Regex,
    storage_write: Regex,
}

impl SlitherEngine {
    pub const NAME: &'static str = "slither";

    pub fn new() -> Result<Self, AnalysisError> {
        let compile = |rule: &str, pattern: &str| {
            Regex::new(pattern).map_err(|source| AnalysisError::InvalidRule {
                rule: rule.to_string(),
                source,
            })
        };

        Ok(Self {
            library: PatternLibrary::new()?,
            rules: RuleSet::compile(Self::NAME, RULES)?,
            external_call: compile(REENTRANCY.id, REENTRANCY.pattern)?,
            storage_write: compile(
                "storage-write",
                r"^\s*(?:\}\s*)?(?:(?:else\s+)?if\s*\(.*\)\s*\{?\s*|else(?:\s*\{\s*|\s+))?(?:delete\s+([A-Za-z_]\w*)|([A-Za-z_]\w*)(?:\[[^\]]*\])*(?:\.[A-Za-z_]\w*)*\s*(?:(?:[-+*/%|&^]|<<|>>)?=[^=]|\+\+|--))",
            )?,
        })
    }

    fn library_findings(&self, src: &SourceText<'_>) -> Vec<Vulnerability> {
        let mut findings = Vec::new();
        for detection in self.library.detect(src) {
            let pattern = detection.pattern;
            for hit in detection.matches {
                findings.push(Vulnerability {
                    id: format!("{}-{}-{}", Self::NAME, pattern.id, hit.line),
                    title: pattern.name.to_string(),
                    description: pattern.description.to_string(),
                    severity: pattern.severity,
                    category: pattern.category.to_string(),
                    line_numbers: vec![hit.line],
                    code_snippet: hit.snippet,
                    recommendation: pattern.recommendation.to_string(),
                    cwe_id: pattern.cwe_id.map(str::to_string),
                    swc_id: pattern.swc_id.map(str::to_string),
                    confidence: Confidence::from_score(hit.confidence),
                });
            }
        }
        findings
    }

    /// External call followed within two lines by a storage write.
    fn detect_reentrancy(&self, src: &SourceText<'_>) -> Vec<Vulnerability> {
        let mut findings = Vec::new();

        for call_line in 1..=src.line_count() {
            let Some(text) = src.masked_line(call_line) else {
                continue;
            };
            let Some(call) = self.external_call.find(text) else {
                continue;
            };

            let call_offset = src.line_start(call_line).unwrap_or(0) + call.start();
            let function = src.enclosing_function(call_offset);
            if let Some(func) = &function {
                let header = &src.masked()[func.start..func.body.start];
                if header.contains("nonReentrant") {
                    continue;
                }
            }

            let last = (call_line + REENTRANCY_WINDOW).min(src.line_count());
            let write_line = (call_line + 1..=last).find(|&candidate| {
                src.masked_line(candidate)
                    .and_then(|line| self.storage_write.captures(line))
                    .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
                    .is_some_and(|target| {
                        !is_statement_keyword(target.as_str())
                            && !function
                                .as_ref()
                                .is_some_and(|func| declares_local(src, func, target.as_str()))
                    })
            });

            if let Some(write_line) = write_line {
                findings.push(REENTRANCY.to_vulnerability(
                    Self::NAME,
                    vec![call_line, write_line],
                    src,
                ));
            }
        }

        findings
    }

    fn metrics(&self, src: &SourceText<'_>) -> AnalysisMetrics {
        AnalysisMetrics {
            total_lines: src.total_lines(),
            complexity_score: control_flow_count(src),
            functions_analyzed: src.functions().len(),
            contracts_analyzed: contract_count(src),
            gas_estimate: None,
        }
    }
}

impl AnalyzerEngine for SlitherEngine {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn analyze(&self, source: &str) -> Result<StaticAnalysisResult, AnalysisError> {
        let started = Instant::now();
        ensure_text(Self::NAME, source)?;
        let src = SourceText::new(source);

        let mut vulnerabilities = self.library_findings(&src);
        vulnerabilities.extend(self.rules.run(&src));
        vulnerabilities.extend(self.detect_reentrancy(&src));

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

fn is_statement_keyword(word: &str) -> bool {
    matches!(
        word,
        "return" | "emit" | "require" | "assert" | "revert" | "if" | "else" | "for" | "while"
    )
}

/// Whether `name` is a parameter or a memory/value local of `func`.
///
/// Storage pointers count as state, so `Position storage p` is not local.
fn declares_local(src: &SourceText<'_>, func: &FunctionSpan, name: &str) -> bool {
    let pattern = format!(
        r"\b([A-Za-z_]\w*)(?:\[\])?\s+(?:memory\s+|calldata\s+|payable\s+)?{}\s*[=;,)]",
        regex::escape(name)
    );
    let Ok(decl) = Regex::new(&pattern) else {
        return false;
    };
    let text = &src.masked()[func.start..func.body.end];
    let found = decl.captures_iter(text).any(|caps| {
        caps.get(1)
            .is_some_and(|ty| !matches!(ty.as_str(), "storage" | "return" | "emit" | "delete"))
    });
    found
}
