// SPDX-License-Identifier: PMPL-1.0-or-later

//! Core type definitions for consensus-scan
//!
//! Findings, per-engine metrics and results, and the merged consensus view.
//! Severity and line numbers are fixed by the engine that emits a finding;
//! only confidence and recommendation may change during consensus.

use crate::orchestrator::EngineFailure;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Categorical risk level of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn all() -> [Severity; 5] {
        [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
            Severity::Info,
        ]
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Categorical certainty of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Map a numeric match strength onto a confidence tag.
    ///
    /// Strictly above 0.8 is HIGH, strictly above 0.5 is MEDIUM.
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 {
            Confidence::High
        } else if score > 0.5 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Low => write!(f, "LOW"),
            Confidence::Medium => write!(f, "MEDIUM"),
            Confidence::High => write!(f, "HIGH"),
        }
    }
}

/// A single defect reported by an engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub category: String,
    /// 1-indexed, ascending, no duplicates
    pub line_numbers: Vec<usize>,
    pub code_snippet: String,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwe_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swc_id: Option<String>,
    pub confidence: Confidence,
}

impl Vulnerability {
    /// Key under which findings from different engines are treated as the same defect.
    pub fn identity_key(&self) -> String {
        let lines: Vec<String> = self.line_numbers.iter().map(|l| l.to_string()).collect();
        format!("{}:{}", self.title, lines.join(","))
    }
}

/// Size and complexity figures produced by one engine run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetrics {
    pub total_lines: usize,
    pub complexity_score: usize,
    pub functions_analyzed: usize,
    pub contracts_analyzed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_estimate: Option<u64>,
}

/// Output of one engine invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticAnalysisResult {
    pub tool: String,
    pub vulnerabilities: Vec<Vulnerability>,
    pub metrics: AnalysisMetrics,
    #[serde(with = "duration_millis")]
    pub execution_time: Duration,
}

/// Merged view across all engines that completed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusResult {
    pub vulnerabilities: Vec<Vulnerability>,
    /// Unique merged findings over raw findings; 1.0 when nothing was reported
    pub confidence: f64,
    pub metrics: AnalysisMetrics,
}

/// Everything one scan of one source produced, ready to persist
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// RFC 3339 timestamp
    pub created_at: String,
    pub target: String,
    /// blake3 hex digest of the scanned source
    pub source_digest: String,
    pub engines_requested: Vec<String>,
    pub results: Vec<StaticAnalysisResult>,
    pub failures: Vec<EngineFailure>,
    pub consensus: ConsensusResult,
    pub severity_counts: SeverityCounts,
}

/// Number of findings per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn tally(vulnerabilities: &[Vulnerability]) -> Self {
        let mut counts = Self::default();
        for vuln in vulnerabilities {
            match vuln.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.info
    }
}

/// Serialize a `Duration` as whole milliseconds
pub mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
