// SPDX-License-Identifier: PMPL-1.0-or-later

//! Declarative detection rules and the generic runner that evaluates them
//!
//! A rule is static data: a pattern, the metadata attached to every finding it
//! produces, a match strength, and an optional false-positive gate. Engines
//! hold tables of rules; `RuleSet::run` is the only scanning loop.

use crate::engines::source::SourceText;
use crate::errors::AnalysisError;
use crate::types::{Confidence, Severity, Vulnerability};
use regex::{Captures, Regex};
use std::collections::HashSet;

/// Returns `true` when a match should be kept
pub type Gate = fn(&SourceText<'_>, &Captures<'_>) -> bool;

pub struct RuleSpec {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    pub category: &'static str,
    pub pattern: &'static str,
    pub recommendation: &'static str,
    pub cwe_id: Option<&'static str>,
    pub swc_id: Option<&'static str>,
    /// Match strength in [0, 1], mapped through `Confidence::from_score`
    pub score: f64,
    pub gate: Option<Gate>,
}

impl RuleSpec {
    pub fn confidence(&self) -> Confidence {
        Confidence::from_score(self.score)
    }

    /// Build the finding this rule reports for `lines`.
    ///
    /// `lines` must be non-empty; the snippet is taken around the first line.
    pub fn to_vulnerability(
        &self,
        engine: &str,
        mut lines: Vec<usize>,
        src: &SourceText<'_>,
    ) -> Vulnerability {
        lines.sort_unstable();
        lines.dedup();
        let anchor = lines.first().copied().unwrap_or(1);

        Vulnerability {
            id: format!("{}-{}-{}", engine, self.id, anchor),
            title: self.title.to_string(),
            description: self.description.to_string(),
            severity: self.severity,
            category: self.category.to_string(),
            code_snippet: src.snippet(anchor),
            line_numbers: lines,
            recommendation: self.recommendation.to_string(),
            cwe_id: self.cwe_id.map(str::to_string),
            swc_id: self.swc_id.map(str::to_string),
            confidence: self.confidence(),
        }
    }
}

struct CompiledRule {
    spec: &'static RuleSpec,
    regex: Regex,
}

/// A compiled rule table owned by one engine
pub struct RuleSet {
    engine: &'static str,
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn compile(engine: &'static str, specs: &'static [RuleSpec]) -> Result<Self, AnalysisError> {
        let rules = specs
            .iter()
            .map(|spec| {
                Regex::new(spec.pattern)
                    .map(|regex| CompiledRule { spec, regex })
                    .map_err(|source| AnalysisError::InvalidRule {
                        rule: spec.id.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { engine, rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule against the comment-masked source.
    ///
    /// A rule reports at most once per line.
    pub fn run(&self, src: &SourceText<'_>) -> Vec<Vulnerability> {
        let mut findings = Vec::new();

        for rule in &self.rules {
            let mut seen_lines = HashSet::new();
            for caps in rule.regex.captures_iter(src.masked()) {
                let Some(whole) = caps.get(0) else { continue };
                let line = src.line_of(whole.start());
                if seen_lines.contains(&line) {
                    continue;
                }
                if let Some(gate) = rule.spec.gate {
                    if !gate(src, &caps) {
                        continue;
                    }
                }
                seen_lines.insert(line);
                findings.push(rule.spec.to_vulnerability(self.engine, vec![line], src));
            }
        }

        findings
    }
}
