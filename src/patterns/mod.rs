// SPDX-License-Identifier: PMPL-1.0-or-later

//! Pattern library lookups
//!
//! Matches the static pattern table against source text and scores each hit.

pub mod library;

use crate::engines::source::SourceText;
use crate::errors::AnalysisError;
use regex::Regex;

pub use library::{VulnerabilityPattern, PATTERNS};

/// Bonus applied when a match sits on a guard line
const GUARD_BONUS: f64 = 0.1;

/// One hit of a pattern
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    pub line: usize,
    pub snippet: String,
    pub confidence: f64,
}

/// All hits of one pattern
#[derive(Debug, Clone)]
pub struct PatternDetection {
    pub pattern: &'static VulnerabilityPattern,
    pub matches: Vec<PatternMatch>,
}

pub struct PatternLibrary {
    compiled: Vec<(&'static VulnerabilityPattern, Regex)>,
}

impl PatternLibrary {
    pub fn new() -> Result<Self, AnalysisError> {
        Self::from_patterns(PATTERNS)
    }

    pub fn from_patterns(patterns: &'static [VulnerabilityPattern]) -> Result<Self, AnalysisError> {
        let compiled = patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern.regex)
                    .map(|regex| (pattern, regex))
                    .map_err(|source| AnalysisError::InvalidRule {
                        rule: pattern.id.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { compiled })
    }

    pub fn patterns(&self) -> impl Iterator<Item = &'static VulnerabilityPattern> + '_ {
        self.compiled.iter().map(|(pattern, _)| *pattern)
    }

    /// Run every pattern over `source`; patterns without hits are omitted.
    pub fn enhance_vulnerability_detection(&self, source: &str) -> Vec<PatternDetection> {
        let src = SourceText::new(source);
        self.detect(&src)
    }

    pub(crate) fn detect(&self, src: &SourceText<'_>) -> Vec<PatternDetection> {
        self.compiled
            .iter()
            .filter_map(|(pattern, regex)| {
                let mut matches: Vec<PatternMatch> = Vec::new();
                for found in regex.find_iter(src.masked()) {
                    let line = src.line_of(found.start());
                    if matches.last().is_some_and(|m| m.line == line) {
                        continue;
                    }
                    matches.push(PatternMatch {
                        line,
                        snippet: src.snippet(line),
                        confidence: score_match(pattern, src.masked_line(line).unwrap_or("")),
                    });
                }
                (!matches.is_empty()).then_some(PatternDetection { pattern, matches })
            })
            .collect()
    }
}

/// Matches on `require`/`if`/`assert` lines are more likely to drive control flow.
fn score_match(pattern: &VulnerabilityPattern, line: &str) -> f64 {
    let trimmed = line.trim_start();
    let guarded = ["require", "if", "assert"].iter().any(|kw| {
        trimmed.starts_with(kw)
            && trimmed[kw.len()..]
                .trim_start()
                .starts_with('(')
    });
    let score = if guarded {
        pattern.base_confidence + GUARD_BONUS
    } else {
        pattern.base_confidence
    };
    score.clamp(0.0, 1.0)
}
