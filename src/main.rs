// SPDX-License-Identifier: PMPL-1.0-or-later

//! consensus-scan: multi-engine heuristic smart-contract scanner
//!
//! Runs several independent analysis engines over Solidity source and merges
//! their findings into one deduplicated, confidence-scored report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use consensus_scan::config::ScanConfig;
use consensus_scan::consensus::ElevationPolicy;
use consensus_scan::logging::init_tracing;
use consensus_scan::orchestrator::EngineRegistry;
use consensus_scan::patterns::PatternLibrary;
use consensus_scan::report::{self, ReportOutputFormat};
use consensus_scan::scan::Scanner;
use consensus_scan::sweep::{self, SweepConfig};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "consensus-scan")]
#[command(version)]
#[command(about = "Multi-engine heuristic smart-contract scanner with consensus merging")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a contract file, or every .sol file under a directory
    Scan {
        /// Contract file or directory
        #[arg(value_name = "TARGET")]
        target: PathBuf,

        /// Engines to run (default: all registered)
        #[arg(short, long, value_delimiter = ',')]
        engines: Option<Vec<String>>,

        /// Serialize the report instead of printing a summary
        #[arg(short, long, value_enum)]
        format: Option<ReportOutputFormat>,

        /// Write the report to a file (format inferred from extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// YAML or JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Per-engine time limit in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Run engines one after another
        #[arg(long)]
        sequential: bool,

        /// Confidence elevation policy used when engines agree
        #[arg(long, value_enum)]
        elevation: Option<ElevationArg>,

        /// Directory scans: only list files with findings
        #[arg(long)]
        findings_only: bool,

        /// Directory scans: only list files with at least this many findings
        #[arg(long, default_value_t = 0)]
        min_findings: usize,

        /// Suppress terminal output
        #[arg(short, long)]
        quiet: bool,

        /// Debug logging on stderr
        #[arg(short, long)]
        verbose: bool,
    },

    /// List registered engines in execution order
    Engines,

    /// List the built-in vulnerability pattern library
    Patterns,
}

// CLI argument types
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ElevationArg {
    Asymmetric,
    Monotonic,
}

impl From<ElevationArg> for ElevationPolicy {
    fn from(arg: ElevationArg) -> Self {
        match arg {
            ElevationArg::Asymmetric => ElevationPolicy::Asymmetric,
            ElevationArg::Monotonic => ElevationPolicy::Monotonic,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            target,
            engines,
            format,
            output,
            config,
            timeout_ms,
            sequential,
            elevation,
            findings_only,
            min_findings,
            quiet,
            verbose,
        } => {
            init_tracing(verbose);

            let mut scan_config = match &config {
                Some(path) => ScanConfig::load(path)?,
                None => ScanConfig::default(),
            };
            if let Some(engines) = engines {
                scan_config.engines = engines;
            }
            if let Some(ms) = timeout_ms {
                scan_config.timeout_ms = ms;
            }
            if sequential {
                scan_config.parallel = false;
            }
            if let Some(policy) = elevation {
                scan_config.elevation = policy.into();
            }
            scan_config.validate()?;

            let scanner = Scanner::from_config(&scan_config)
                .context("building analysis engines")?;

            if target.is_dir() {
                let sweep_config = SweepConfig {
                    directory: target,
                    findings_only,
                    min_findings,
                };
                let sweep_report = sweep::run(&sweep_config, &scanner)?;
                emit(&sweep_report, format, output.as_deref(), quiet, sweep::print_summary)?;
            } else {
                let scan_report = scanner.scan_file(&target)?;
                emit(&scan_report, format, output.as_deref(), quiet, report::print_report)?;
            }
        }

        Commands::Engines => {
            let registry = EngineRegistry::with_defaults()?;
            println!("{}", "Registered engines (execution order):".bold());
            for (i, name) in registry.names().iter().enumerate() {
                println!("  {}. {}", i + 1, name);
            }
        }

        Commands::Patterns => {
            let library = PatternLibrary::new()?;
            println!("{}", "Pattern library:".bold());
            for pattern in library.patterns() {
                let swc = pattern.swc_id.unwrap_or("-");
                println!(
                    "  {:<24} {:<9} {:<8} {}",
                    pattern.id,
                    pattern.severity.to_string(),
                    swc,
                    pattern.name
                );
            }
        }
    }

    Ok(())
}

/// Write, serialize or print a report depending on the output flags
fn emit<T: Serialize>(
    report: &T,
    format: Option<ReportOutputFormat>,
    output: Option<&Path>,
    quiet: bool,
    print: fn(&T),
) -> Result<()> {
    match (output, format) {
        (Some(path), format) => {
            let format = format
                .or_else(|| ReportOutputFormat::from_path(path))
                .unwrap_or(ReportOutputFormat::Json);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, format.serialize(report)?)
                .with_context(|| format!("writing {}", path.display()))?;
            if !quiet {
                println!("Report saved to: {}", path.display());
            }
        }
        (None, Some(format)) => print!("{}", format.serialize(report)?),
        (None, None) => {
            if !quiet {
                print(report);
            }
        }
    }
    Ok(())
}
