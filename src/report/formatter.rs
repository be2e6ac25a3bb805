// SPDX-License-Identifier: PMPL-1.0-or-later

//! Report formatting and output

use crate::report::output::ReportOutputFormat;
use crate::types::*;
use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

pub struct ReportFormatter;

impl ReportFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn print(&self, report: &ScanReport) {
        println!("\n{}", "=== CONSENSUS-SCAN REPORT ===".bold().cyan());
        println!("  Target: {}", report.target);
        println!("  Digest: {}", report.source_digest.dimmed());
        println!();

        self.print_engines(report);
        println!();

        self.print_findings(&report.consensus);
        println!();

        self.print_summary(report);
        println!();
    }

    fn print_engines(&self, report: &ScanReport) {
        println!("{}", "ENGINES".bold().yellow());

        for result in &report.results {
            println!(
                "  {:<10} {} ({} findings, {:.2}s)",
                result.tool,
                "OK".green(),
                result.vulnerabilities.len(),
                result.execution_time.as_secs_f64()
            );
        }
        for failure in &report.failures {
            println!(
                "  {:<10} {} {}",
                failure.engine,
                "FAILED".red(),
                failure.message.dimmed()
            );
        }
        if report.results.is_empty() && report.failures.is_empty() {
            println!("  {}", "No requested engine is registered".red());
        }
    }

    fn print_findings(&self, consensus: &ConsensusResult) {
        println!("{}", "FINDINGS".bold().yellow());

        if consensus.vulnerabilities.is_empty() {
            println!("  {}", "No vulnerabilities detected".green());
            return;
        }

        let mut ordered: Vec<&Vulnerability> = consensus.vulnerabilities.iter().collect();
        ordered.sort_by(|a, b| b.severity.cmp(&a.severity));

        for (i, vuln) in ordered.iter().enumerate() {
            let severity_color = match vuln.severity {
                Severity::Critical => "red",
                Severity::High => "yellow",
                Severity::Medium => "blue",
                Severity::Low => "green",
                Severity::Info => "white",
            };
            let lines: Vec<String> = vuln.line_numbers.iter().map(|l| l.to_string()).collect();
            let ids: Vec<&str> = [vuln.swc_id.as_deref(), vuln.cwe_id.as_deref()]
                .into_iter()
                .flatten()
                .collect();

            println!(
                "  {}. [{}] {} (line {}, confidence {})",
                i + 1,
                vuln.severity.to_string().color(severity_color),
                vuln.title.bold(),
                lines.join(", "),
                vuln.confidence
            );
            if !ids.is_empty() {
                println!("     {}", ids.join(" / ").dimmed());
            }
            for rec in vuln.recommendation.split("\n\n") {
                println!("     - {}", rec);
            }
        }
    }

    fn print_summary(&self, report: &ScanReport) {
        println!("{}", "SUMMARY".bold().yellow());

        let counts = &report.severity_counts;
        let parts: Vec<String> = Severity::all()
            .iter()
            .map(|s| format!("{} {}", counts.get(*s), s))
            .collect();
        println!("  {}", parts.join("  |  "));

        let metrics = &report.consensus.metrics;
        println!(
            "  Lines: {}  |  Contracts: {}  |  Functions: {}  |  Complexity: {}",
            metrics.total_lines,
            metrics.contracts_analyzed,
            metrics.functions_analyzed,
            metrics.complexity_score
        );
        if let Some(gas) = metrics.gas_estimate {
            println!("  Gas estimate: {}", gas);
        }
        println!(
            "  Consensus ratio: {}",
            format!("{:.2}", report.consensus.confidence).bold()
        );
    }

    pub fn save<P: AsRef<Path>>(
        &self,
        report: &ScanReport,
        path: P,
        format: ReportOutputFormat,
    ) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(path, format.serialize(report)?)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new()
    }
}
