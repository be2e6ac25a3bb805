// SPDX-License-Identifier: PMPL-1.0-or-later

//! Report generation logic

use crate::consensus::ConsensusAggregator;
use crate::orchestrator::OrchestrationReport;
use crate::types::*;

pub struct ReportGenerator;

impl ReportGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Merge an orchestration run into a report envelope.
    ///
    /// Failures and completed results are both kept so a reader can tell "no
    /// engine succeeded" from "no vulnerabilities found".
    pub fn generate(
        &self,
        target: &str,
        source: &str,
        engines_requested: &[String],
        run: OrchestrationReport,
        aggregator: &ConsensusAggregator,
    ) -> ScanReport {
        let failures = run.failures();
        let results = run.into_results();
        let consensus = aggregator.consensus(&results);
        let severity_counts = SeverityCounts::tally(&consensus.vulnerabilities);

        ScanReport {
            created_at: chrono::Utc::now().to_rfc3339(),
            target: target.to_string(),
            source_digest: blake3::hash(source.as_bytes()).to_hex().to_string(),
            engines_requested: engines_requested.to_vec(),
            results,
            failures,
            consensus,
            severity_counts,
        }
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}
