// SPDX-License-Identifier: PMPL-1.0-or-later

//! Consensus aggregation
//!
//! Merges per-engine results into one deduplicated finding set. Two findings
//! with the same title and line numbers are the same defect, whatever their
//! description or category. A merge may raise confidence and extend the
//! recommendation; it never touches severity, title or line numbers.

use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Prefix for recommendation text appended during a merge
pub const ADDITIONAL_RECOMMENDATION: &str = "Additional recommendation: ";

/// How confidence changes when a second engine reports the same finding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElevationPolicy {
    /// Only LOW is raised, to MEDIUM or HIGH; MEDIUM stays MEDIUM
    #[default]
    Asymmetric,
    /// Keep the higher of the two confidences
    Monotonic,
}

impl ElevationPolicy {
    pub fn merge(self, existing: Confidence, incoming: Confidence) -> Confidence {
        match self {
            ElevationPolicy::Asymmetric => match (existing, incoming) {
                (Confidence::Low, Confidence::High) => Confidence::High,
                (Confidence::Low, Confidence::Medium) => Confidence::Medium,
                (current, _) => current,
            },
            ElevationPolicy::Monotonic => existing.max(incoming),
        }
    }
}

impl std::fmt::Display for ElevationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ElevationPolicy::Asymmetric => write!(f, "asymmetric"),
            ElevationPolicy::Monotonic => write!(f, "monotonic"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsensusAggregator {
    policy: ElevationPolicy,
}

impl ConsensusAggregator {
    pub fn new(policy: ElevationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ElevationPolicy {
        self.policy
    }

    /// Single pass over `results` in the order given.
    ///
    /// Output order is first-seen order. With no findings at all the ratio is 1.
    pub fn consensus(&self, results: &[StaticAnalysisResult]) -> ConsensusResult {
        let mut merged: Vec<Vulnerability> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut raw_count = 0usize;

        for vuln in results.iter().flat_map(|r| r.vulnerabilities.iter()) {
            raw_count += 1;
            match index.get(&vuln.identity_key()) {
                Some(&slot) => self.merge_into(&mut merged[slot], vuln),
                None => {
                    index.insert(vuln.identity_key(), merged.len());
                    merged.push(vuln.clone());
                }
            }
        }

        let confidence = if raw_count == 0 {
            1.0
        } else {
            merged.len() as f64 / raw_count as f64
        };

        ConsensusResult {
            vulnerabilities: merged,
            confidence,
            metrics: aggregate_metrics(results),
        }
    }

    fn merge_into(&self, existing: &mut Vulnerability, incoming: &Vulnerability) {
        existing.confidence = self.policy.merge(existing.confidence, incoming.confidence);
        if !existing.recommendation.contains(&incoming.recommendation) {
            existing.recommendation = format!(
                "{}\n\n{}{}",
                existing.recommendation, ADDITIONAL_RECOMMENDATION, incoming.recommendation
            );
        }
    }
}

/// Max of every count across engines; first gas estimate reported.
pub fn aggregate_metrics(results: &[StaticAnalysisResult]) -> AnalysisMetrics {
    results.iter().map(|r| &r.metrics).fold(AnalysisMetrics::default(), |acc, m| {
        AnalysisMetrics {
            total_lines: acc.total_lines.max(m.total_lines),
            complexity_score: acc.complexity_score.max(m.complexity_score),
            functions_analyzed: acc.functions_analyzed.max(m.functions_analyzed),
            contracts_analyzed: acc.contracts_analyzed.max(m.contracts_analyzed),
            gas_estimate: acc.gas_estimate.or(m.gas_estimate),
        }
    })
}

/// Merge with the default (asymmetric) elevation policy
pub fn get_consensus_analysis(results: &[StaticAnalysisResult]) -> ConsensusResult {
    ConsensusAggregator::default().consensus(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn vuln(title: &str, lines: &[usize], confidence: Confidence, recommendation: &str) -> Vulnerability {
        Vulnerability {
            id: format!("{}-{:?}", title, lines),
            title: title.to_string(),
            description: "d".to_string(),
            severity: Severity::High,
            category: "c".to_string(),
            line_numbers: lines.to_vec(),
            code_snippet: String::new(),
            recommendation: recommendation.to_string(),
            cwe_id: None,
            swc_id: None,
            confidence,
        }
    }

    fn result(tool: &str, vulnerabilities: Vec<Vulnerability>, metrics: AnalysisMetrics) -> StaticAnalysisResult {
        StaticAnalysisResult {
            tool: tool.to_string(),
            vulnerabilities,
            metrics,
            execution_time: Duration::from_millis(3),
        }
    }

    #[test]
    fn test_empty_input_full_confidence() {
        let merged = get_consensus_analysis(&[]);
        assert!(merged.vulnerabilities.is_empty());
        assert_eq!(merged.confidence, 1.0);
        assert_eq!(merged.metrics, AnalysisMetrics::default());

        let silent = [result("a", vec![], AnalysisMetrics::default())];
        assert_eq!(get_consensus_analysis(&silent).confidence, 1.0);
    }

    #[test]
    fn test_duplicate_key_merged_once() {
        let results = [
            result("a", vec![vuln("Reentrancy", &[4, 6], Confidence::Low, "Lock it.")], Default::default()),
            result("b", vec![vuln("Reentrancy", &[4, 6], Confidence::High, "Use CEI.")], Default::default()),
        ];
        let merged = get_consensus_analysis(&results);

        assert_eq!(merged.vulnerabilities.len(), 1);
        assert_eq!(merged.confidence, 0.5);
        let only = &merged.vulnerabilities[0];
        assert_eq!(only.confidence, Confidence::High);
        assert_eq!(only.recommendation, "Lock it.\n\nAdditional recommendation: Use CEI.");
        assert_eq!(only.severity, Severity::High);
    }

    #[test]
    fn test_different_lines_are_distinct() {
        let results = [result(
            "a",
            vec![
                vuln("Reentrancy", &[4, 6], Confidence::Low, "r"),
                vuln("Reentrancy", &[4], Confidence::Low, "r"),
            ],
            Default::default(),
        )];
        assert_eq!(get_consensus_analysis(&results).vulnerabilities.len(), 2);
    }

    #[test]
    fn test_recommendation_not_repeated() {
        let results = [
            result("a", vec![vuln("T", &[1], Confidence::Medium, "Use msg.sender for auth.")], Default::default()),
            result("b", vec![vuln("T", &[1], Confidence::Medium, "msg.sender")], Default::default()),
        ];
        let merged = get_consensus_analysis(&results);
        assert_eq!(merged.vulnerabilities[0].recommendation, "Use msg.sender for auth.");
    }

    #[test]
    fn test_elevation_policies() {
        use Confidence::*;
        let asym = ElevationPolicy::Asymmetric;
        assert_eq!(asym.merge(Low, High), High);
        assert_eq!(asym.merge(Low, Medium), Medium);
        assert_eq!(asym.merge(Medium, High), Medium);
        assert_eq!(asym.merge(High, Low), High);

        let mono = ElevationPolicy::Monotonic;
        assert_eq!(mono.merge(Medium, High), High);
        assert_eq!(mono.merge(High, Low), High);
        assert_eq!(mono.merge(Low, Low), Low);
    }

    #[test]
    fn test_metrics_max_and_first_gas() {
        let results = [
            result(
                "a",
                vec![],
                AnalysisMetrics {
                    total_lines: 10,
                    complexity_score: 7,
                    functions_analyzed: 1,
                    contracts_analyzed: 2,
                    gas_estimate: None,
                },
            ),
            result(
                "b",
                vec![],
                AnalysisMetrics {
                    total_lines: 12,
                    complexity_score: 3,
                    functions_analyzed: 4,
                    contracts_analyzed: 1,
                    gas_estimate: Some(50_000),
                },
            ),
            result(
                "c",
                vec![],
                AnalysisMetrics {
                    gas_estimate: Some(1),
                    ..Default::default()
                },
            ),
        ];
        let metrics = get_consensus_analysis(&results).metrics;
        assert_eq!(metrics.total_lines, 12);
        assert_eq!(metrics.complexity_score, 7);
        assert_eq!(metrics.functions_analyzed, 4);
        assert_eq!(metrics.contracts_analyzed, 2);
        assert_eq!(metrics.gas_estimate, Some(50_000));
    }
}
