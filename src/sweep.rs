// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sweep: batch scanning of every contract under a directory
//!
//! Walks the directory for `.sol` files, scans each one, and produces a
//! summary report sorted by finding count (highest first).

use crate::scan::Scanner;
use crate::types::ScanReport;
use anyhow::Result;
use colored::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SOURCE_EXTENSION: &str = "sol";

/// Directories that hold dependencies or build output, not audited sources
const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "target",
    "build",
    "out",
    "cache",
    "artifacts",
    "lib",
];

/// Configuration for a sweep run
pub struct SweepConfig {
    pub directory: PathBuf,
    /// Only keep files with findings
    pub findings_only: bool,
    /// Minimum number of findings to include
    pub min_findings: usize,
}

/// Results from scanning a single file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    pub path: PathBuf,
    pub finding_count: usize,
    pub critical_count: usize,
    pub high_count: usize,
    pub engines_failed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ScanReport>,
}

/// Complete sweep report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub created_at: String,
    pub directory: PathBuf,
    pub files_scanned: usize,
    pub files_with_findings: usize,
    pub total_findings: usize,
    pub total_critical: usize,
    pub results: Vec<FileResult>,
}

/// Every `.sol` file under `directory`, sorted
pub fn discover_sources(directory: &Path) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        anyhow::bail!("Not a directory: {}", directory.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(directory)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !SKIPPED_DIRS.contains(&e.file_name().to_str().unwrap_or(""))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some(SOURCE_EXTENSION))
        .map(|e| e.into_path())
        .collect();

    files.sort();
    Ok(files)
}

/// Scan every contract under the configured directory
pub fn run(config: &SweepConfig, scanner: &Scanner) -> Result<SweepReport> {
    let files = discover_sources(&config.directory)?;

    let mut results: Vec<FileResult> = files
        .par_iter()
        .map(|path| match scanner.scan_file(path) {
            Ok(report) => FileResult {
                path: path.clone(),
                finding_count: report.consensus.vulnerabilities.len(),
                critical_count: report.severity_counts.critical,
                high_count: report.severity_counts.high,
                engines_failed: report.failures.len(),
                error: None,
                report: Some(report),
            },
            Err(e) => FileResult {
                path: path.clone(),
                finding_count: 0,
                critical_count: 0,
                high_count: 0,
                engines_failed: 0,
                error: Some(format!("{:#}", e)),
                report: None,
            },
        })
        .collect();

    // Riskiest files first; path breaks ties so output is stable
    results.sort_by(|a, b| {
        b.finding_count
            .cmp(&a.finding_count)
            .then_with(|| a.path.cmp(&b.path))
    });

    if config.findings_only {
        results.retain(|r| r.finding_count > 0);
    }
    if config.min_findings > 0 {
        results.retain(|r| r.finding_count >= config.min_findings);
    }

    let files_with_findings = results.iter().filter(|r| r.finding_count > 0).count();
    let total_findings: usize = results.iter().map(|r| r.finding_count).sum();
    let total_critical: usize = results.iter().map(|r| r.critical_count).sum();

    Ok(SweepReport {
        created_at: chrono::Utc::now().to_rfc3339(),
        directory: config.directory.clone(),
        files_scanned: files.len(),
        files_with_findings,
        total_findings,
        total_critical,
        results,
    })
}

/// Print a summary table to the terminal
pub fn print_summary(report: &SweepReport) {
    println!("\n{}", "=== SWEEP SUMMARY ===".bold().cyan());
    println!(
        "Directory: {}  |  Files scanned: {}  |  With findings: {}",
        report.directory.display(),
        report.files_scanned,
        report.files_with_findings
    );
    println!(
        "Total findings: {}  |  Critical: {}",
        report.total_findings,
        report.total_critical.to_string().red()
    );
    println!();

    if report.results.is_empty() {
        println!("  No contracts with findings.");
        return;
    }

    println!(
        "  {:<48} {:>6} {:>6} {:>6} {:>7}",
        "File", "Total", "Crit", "High", "Failed"
    );
    println!("  {}", "-".repeat(78));

    for result in report.results.iter().take(20) {
        let name = result
            .path
            .strip_prefix(&report.directory)
            .unwrap_or(&result.path)
            .display()
            .to_string();
        if let Some(err) = &result.error {
            println!("  {:<48} {} {}", name, "ERROR:".red(), err);
        } else {
            println!(
                "  {:<48} {:>6} {:>6} {:>6} {:>7}",
                name,
                result.finding_count,
                result.critical_count,
                result.high_count,
                result.engines_failed,
            );
        }
    }

    if report.results.len() > 20 {
        println!("  ... and {} more files", report.results.len() - 20);
    }
    println!();
}
