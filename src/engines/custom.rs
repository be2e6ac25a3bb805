// SPDX-License-Identifier: PMPL-1.0-or-later

//! Custom efficiency and style engine
//!
//! Tracks every reference to a contract-level state variable inside function
//! bodies and classifies it as a read or a write. Loop, repeated-read and
//! event checks work off that access list; division checks are a plain rule.

use crate::engines::rules::{RuleSet, RuleSpec};
use crate::engines::source::{is_keyword_at, SourceText};
use crate::engines::{contract_count, control_flow_count, ensure_text, AnalyzerEngine};
use crate::errors::AnalysisError;
use crate::types::*;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tracing::debug;

/// Reads of one variable in one function before caching it in memory pays off
const REPEATED_READ_THRESHOLD: usize = 3;

// Rough per-operation gas costs
const TX_BASE_GAS: u64 = 21_000;
const SSTORE_GAS: u64 = 20_000;
const SLOAD_GAS: u64 = 2_100;
const EXTERNAL_CALL_GAS: u64 = 2_600;
const LOOP_GAS: u64 = 1_000;

const COMPOUND_ASSIGN: &[&str] = &[
    "+=", "-=", "*=", "/=", "%=", "|=", "&=", "^=", "<<=", ">>=",
];

static RULES: &[RuleSpec] = &[RuleSpec {
    id: "division-by-zero",
    title: "Division by Zero",
    description: "A division uses a variable divisor that is never checked against zero \
                  earlier in the function; the call reverts with a panic when it is zero.",
    severity: Severity::Medium,
    category: "arithmetic",
    pattern: r"[\w\)\]]\s*/=?\s*([A-Za-z_]\w*)",
    recommendation: "Validate the divisor with require(divisor != 0) before dividing.",
    cwe_id: Some("CWE-369"),
    swc_id: None,
    score: 0.5,
    gate: Some(divisor_unchecked),
}];

static STORAGE_IN_LOOP: RuleSpec = RuleSpec {
    id: "storage-write-in-loop",
    title: "Storage Write in Loop",
    description: "A state variable is written on every loop iteration. Each SSTORE costs \
                  thousands of gas.",
    severity: Severity::Low,
    category: "gas-optimization",
    pattern: r"\b(?:for|while)\s*\(|\bdo\s*\{",
    recommendation: "Accumulate in a memory variable inside the loop and write storage once afterwards.",
    cwe_id: Some("CWE-1050"),
    swc_id: None,
    score: 0.75,
    gate: None,
};

static REPEATED_READ: RuleSpec = RuleSpec {
    id: "repeated-storage-read",
    title: "Repeated Storage Read",
    description: "The same state variable is read several times in one function; every \
                  read is a separate SLOAD.",
    severity: Severity::Info,
    category: "gas-optimization",
    pattern: r"\b[A-Za-z_]\w*\b",
    recommendation: "Cache the value in a local variable at the start of the function.",
    cwe_id: None,
    swc_id: None,
    score: 0.6,
    gate: None,
};

static MISSING_EVENT: RuleSpec = RuleSpec {
    id: "missing-event",
    title: "Missing Event Emission",
    description: "The function changes contract state but emits no event, so off-chain \
                  observers cannot track the change.",
    severity: Severity::Info,
    category: "best-practice",
    pattern: r"\bemit\b",
    recommendation: "Emit an event describing the state change.",
    cwe_id: Some("CWE-778"),
    swc_id: None,
    score: 0.45,
    gate: None,
};

const EXTERNAL_CALL: &str =
    r"\.(?:call|delegatecall|staticcall|send|transfer)\s*(?:\{[^}]*\})?\s*\(";

/// Divisor is a variable with no zero-check before the division.
///
/// UPPER_CASE divisors are taken to be constants.
fn divisor_unchecked(src: &SourceText<'_>, caps: &Captures<'_>) -> bool {
    let (Some(whole), Some(divisor)) = (caps.get(0), caps.get(1)) else {
        return false;
    };
    let name = divisor.as_str();
    if name
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    {
        return false;
    }

    let scope_start = src
        .enclosing_function(whole.start())
        .map_or(0, |func| func.start);
    let preceding = &src.masked()[scope_start..whole.start()];

    let name = regex::escape(name);
    let check = format!(
        r"\b{name}\s*(?:!=|>|==)\s*0\b|\b0\s*(?:!=|<|==)\s*{name}\b|\b{name}\s*>=\s*1\b"
    );
    Regex::new(&check).map_or(true, |re| !re.is_match(preceding))
}

/// Whether the `while` at `pos` follows the closing brace of a `do` block.
fn closes_do_block(text: &str, pos: usize) -> bool {
    if !is_keyword_at(text, pos, "while") {
        return false;
    }
    let before = text[..pos].trim_end();
    if !before.ends_with('}') {
        return false;
    }

    let mut depth = 0usize;
    for (idx, byte) in before.bytes().enumerate().rev() {
        match byte {
            b'}' => depth += 1,
            b'{' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let head = text[..idx].trim_end();
                    return head.ends_with("do") && is_keyword_at(text, head.len() - 2, "do");
                }
            }
            _ => {}
        }
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessKind {
    Read,
    Write,
}

/// One reference to a state variable inside a function body
#[derive(Debug, Clone)]
struct StorageAccess {
    var: String,
    offset: usize,
    /// Index into `SourceText::functions()`
    function: usize,
    kind: AccessKind,
}

pub struct CustomEngine {
    rules: RuleSet,
    loop_head: Regex,
    identifier: Regex,
    emit: Regex,
    external_call: Regex,
}

impl CustomEngine {
    pub const NAME: &'static str = "custom";

    pub fn new() -> Result<Self, AnalysisError> {
        let compile = |rule: &str, pattern: &str| {
            Regex::new(pattern).map_err(|source| AnalysisError::InvalidRule {
                rule: rule.to_string(),
                source,
            })
        };

        Ok(Self {
            rules: RuleSet::compile(Self::NAME, RULES)?,
            loop_head: compile(STORAGE_IN_LOOP.id, STORAGE_IN_LOOP.pattern)?,
            identifier: compile(REPEATED_READ.id, REPEATED_READ.pattern)?,
            emit: compile(MISSING_EVENT.id, MISSING_EVENT.pattern)?,
            external_call: compile("external-call", EXTERNAL_CALL)?,
        })
    }

    fn storage_accesses(&self, src: &SourceText<'_>) -> Vec<StorageAccess> {
        let vars: HashSet<String> = src
            .state_variables()
            .into_iter()
            .map(|var| var.name)
            .collect();
        if vars.is_empty() {
            return Vec::new();
        }

        let text = src.masked();
        let mut accesses = Vec::new();
        for (index, func) in src.functions().iter().enumerate() {
            let body = &text[func.body.clone()];
            for ident in self.identifier.find_iter(body) {
                if !vars.contains(ident.as_str()) {
                    continue;
                }
                let start = func.body.start + ident.start();
                let end = func.body.start + ident.end();
                if text[..start].ends_with('.') {
                    continue;
                }
                accesses.push(StorageAccess {
                    var: ident.as_str().to_string(),
                    offset: start,
                    function: index,
                    kind: classify(text, start, end),
                });
            }
        }
        accesses
    }

    /// Start offsets of loop headers; the `while` closing a `do` block is
    /// part of that loop, not a new one.
    fn loop_heads(&self, src: &SourceText<'_>) -> Vec<usize> {
        let text = src.masked();
        self.loop_head
            .find_iter(text)
            .map(|head| head.start())
            .filter(|&start| !closes_do_block(text, start))
            .collect()
    }

    fn loop_writes(&self, src: &SourceText<'_>, accesses: &[StorageAccess]) -> Vec<Vulnerability> {
        self.loop_heads(src)
            .into_iter()
            .filter_map(|head| {
                let block = src.block_after(head)?;
                let write = accesses
                    .iter()
                    .find(|a| a.kind == AccessKind::Write && block.contains(&a.offset))?;
                Some(STORAGE_IN_LOOP.to_vulnerability(
                    CustomEngine::NAME,
                    vec![src.line_of(head), src.line_of(write.offset)],
                    src,
                ))
            })
            .collect()
    }

    fn repeated_reads(&self, src: &SourceText<'_>, accesses: &[StorageAccess]) -> Vec<Vulnerability> {
        let mut reads: BTreeMap<(usize, &str), Vec<usize>> = BTreeMap::new();
        for access in accesses.iter().filter(|a| a.kind == AccessKind::Read) {
            reads
                .entry((access.function, access.var.as_str()))
                .or_default()
                .push(src.line_of(access.offset));
        }

        reads
            .into_values()
            .filter(|lines| lines.len() >= REPEATED_READ_THRESHOLD)
            .map(|lines| REPEATED_READ.to_vulnerability(CustomEngine::NAME, lines, src))
            .collect()
    }

    fn missing_events(&self, src: &SourceText<'_>, accesses: &[StorageAccess]) -> Vec<Vulnerability> {
        let mut reported = HashSet::new();
        let mut findings = Vec::new();

        for write in accesses.iter().filter(|a| a.kind == AccessKind::Write) {
            let Some(func) = src.enclosing_function(write.offset) else {
                continue;
            };
            if !reported.insert(func.start) {
                continue;
            }
            if self.emit.is_match(&src.masked()[func.body.clone()]) {
                continue;
            }
            findings.push(MISSING_EVENT.to_vulnerability(
                CustomEngine::NAME,
                vec![src.line_of(write.offset)],
                src,
            ));
        }
        findings
    }

    fn metrics(&self, src: &SourceText<'_>, accesses: &[StorageAccess]) -> AnalysisMetrics {
        let writes = accesses.iter().filter(|a| a.kind == AccessKind::Write).count() as u64;
        let reads = accesses.len() as u64 - writes;
        let calls = self.external_call.find_iter(src.masked()).count() as u64;
        let loops = self.loop_heads(src).len() as u64;

        AnalysisMetrics {
            total_lines: src.total_lines(),
            complexity_score: control_flow_count(src),
            functions_analyzed: src.functions().len(),
            contracts_analyzed: contract_count(src),
            gas_estimate: Some(
                TX_BASE_GAS
                    + writes * SSTORE_GAS
                    + reads * SLOAD_GAS
                    + calls * EXTERNAL_CALL_GAS
                    + loops * LOOP_GAS,
            ),
        }
    }
}

impl AnalyzerEngine for CustomEngine {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn analyze(&self, source: &str) -> Result<StaticAnalysisResult, AnalysisError> {
        let started = Instant::now();
        ensure_text(Self::NAME, source)?;
        let src = SourceText::new(source);
        let accesses = self.storage_accesses(&src);

        let mut vulnerabilities = self.rules.run(&src);
        vulnerabilities.extend(self.loop_writes(&src, &accesses));
        vulnerabilities.extend(self.repeated_reads(&src, &accesses));
        vulnerabilities.extend(self.missing_events(&src, &accesses));

        let metrics = self.metrics(&src, &accesses);
        debug!(
            engine = Self::NAME,
            findings = vulnerabilities.len(),
            storage_accesses = accesses.len(),
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

/// Decide whether the identifier at `start..end` is being written.
fn classify(text: &str, start: usize, end: usize) -> AccessKind {
    let before = text[..start].trim_end();
    if before.ends_with("++") || before.ends_with("--") {
        return AccessKind::Write;
    }
    if before.ends_with("delete") && is_keyword_at(before, before.len() - "delete".len(), "delete") {
        return AccessKind::Write;
    }

    let bytes = text.as_bytes();
    let mut idx = end;
    loop {
        while bytes.get(idx).is_some_and(u8::is_ascii_whitespace) {
            idx += 1;
        }
        match bytes.get(idx) {
            Some(b'[') => {
                let mut depth = 0usize;
                while let Some(byte) = bytes.get(idx) {
                    idx += 1;
                    match byte {
                        b'[' => depth += 1,
                        b']' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
            Some(b'.') => {
                let member: String = text[idx + 1..]
                    .chars()
                    .take_while(|c| c.is_alphanumeric() || *c == '_')
                    .collect();
                if member.is_empty() {
                    break;
                }
                idx += 1 + member.len();
                let called = text[idx..].trim_start().starts_with('(');
                if called && (member == "push" || member == "pop") {
                    return AccessKind::Write;
                }
            }
            _ => break,
        }
    }

    let rest = &text[idx.min(text.len())..];
    if rest.starts_with("==") || rest.starts_with("=>") {
        AccessKind::Read
    } else if rest.starts_with('=')
        || rest.starts_with("++")
        || rest.starts_with("--")
        || COMPOUND_ASSIGN.iter().any(|op| rest.starts_with(op))
    {
        AccessKind::Write
    } else {
        AccessKind::Read
    }
}
