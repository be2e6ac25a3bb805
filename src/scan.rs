// SPDX-License-Identifier: PMPL-1.0-or-later

//! Scan pipeline: orchestrator, consensus and report envelope in one call

use crate::config::ScanConfig;
use crate::consensus::ConsensusAggregator;
use crate::errors::AnalysisError;
use crate::orchestrator::{EngineRegistry, Orchestrator};
use crate::report::ReportGenerator;
use crate::types::ScanReport;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub struct Scanner {
    orchestrator: Orchestrator,
    aggregator: ConsensusAggregator,
    engines: Vec<String>,
}

impl Scanner {
    pub fn new(registry: EngineRegistry, config: &ScanConfig) -> Self {
        Self {
            orchestrator: Orchestrator::new(registry, config.run_options()),
            aggregator: ConsensusAggregator::new(config.elevation),
            engines: config.engines.clone(),
        }
    }

    /// Scanner over the built-in engines
    pub fn from_config(config: &ScanConfig) -> Result<Self, AnalysisError> {
        Ok(Self::new(EngineRegistry::with_defaults()?, config))
    }

    pub fn engines(&self) -> &[String] {
        &self.engines
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn scan_source(&self, target: &str, source: &str) -> ScanReport {
        let run = self.orchestrator.run(source, &self.engines);
        ReportGenerator::new().generate(target, source, &self.engines, run, &self.aggregator)
    }

    pub fn scan_file(&self, path: &Path) -> Result<ScanReport> {
        let source = read_source(path)?;
        Ok(self.scan_source(&path.display().to_string(), &source))
    }
}

/// Run every configured engine over `source` and merge the results.
pub fn scan_source(source: &str, config: &ScanConfig) -> Result<ScanReport, AnalysisError> {
    Ok(Scanner::from_config(config)?.scan_source("<memory>", source))
}

/// Read a source file as UTF-8, falling back to Windows-1252.
pub fn read_source(path: &Path) -> Result<String> {
    let raw_bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;

    match String::from_utf8(raw_bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            let raw_bytes = err.into_bytes();
            let (cow, _, had_errors) = encoding_rs::WINDOWS_1252.decode(&raw_bytes);
            if had_errors {
                anyhow::bail!(
                    "{} is neither UTF-8 nor Windows-1252 text",
                    path.display()
                );
            }
            Ok(cow.into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_latin1_fallback() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"// caf\xe9\ncontract A {}\n").unwrap();
        let text = read_source(file.path()).unwrap();
        assert!(text.starts_with("// café"));
    }

    #[test]
    fn test_scan_source_envelope() {
        let report = scan_source("contract A {\n  function k() public { selfdestruct(payable(msg.sender)); }\n}\n", &ScanConfig::default()).unwrap();
        assert_eq!(report.engines_requested, vec!["slither", "mythril", "custom"]);
        assert_eq!(report.results.len(), 3);
        assert!(report.failures.is_empty());
        assert_eq!(report.source_digest.len(), 64);
        assert!(report.severity_counts.critical >= 1);
    }
}
