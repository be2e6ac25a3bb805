// SPDX-License-Identifier: PMPL-1.0-or-later

//! Scan configuration
//!
//! Loaded from a YAML (or JSON) file; every field is optional. Command-line
//! flags are applied on top by the binary.

use crate::consensus::ElevationPolicy;
use crate::engines::{CustomEngine, MythrilEngine, SlitherEngine};
use crate::orchestrator::RunOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Engines to run, by registry name
    pub engines: Vec<String>,
    /// Per-engine wall-clock limit
    pub timeout_ms: u64,
    /// Worker pool size; 0 means one per engine
    pub worker_threads: usize,
    pub parallel: bool,
    pub elevation: ElevationPolicy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            engines: default_engines(),
            timeout_ms: 30_000,
            worker_threads: 0,
            parallel: true,
            elevation: ElevationPolicy::default(),
        }
    }
}

pub fn default_engines() -> Vec<String> {
    [SlitherEngine::NAME, MythrilEngine::NAME, CustomEngine::NAME]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

impl ScanConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", path.display()))?,
            _ => serde_yaml::from_str(&raw)
                .with_context(|| format!("parsing {}", path.display()))?,
        };
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// A zero timeout would fail every engine before it starts.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            anyhow::bail!("timeout_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            worker_threads: self.worker_threads,
            parallel: self.parallel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.engines, vec!["slither", "mythril", "custom"]);
        assert_eq!(config.run_options(), RunOptions::default());
        assert_eq!(config.elevation, ElevationPolicy::Asymmetric);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "engines: [mythril]\nelevation: monotonic\nparallel: false").unwrap();

        let config = ScanConfig::load(file.path()).unwrap();
        assert_eq!(config.engines, vec!["mythril"]);
        assert_eq!(config.elevation, ElevationPolicy::Monotonic);
        assert!(!config.parallel);
        assert_eq!(config.timeout_ms, 30_000);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "timeout_ms: 0").unwrap();
        let err = ScanConfig::load(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("timeout_ms must be greater than zero"));

        let config = ScanConfig {
            timeout_ms: 0,
            ..ScanConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(ScanConfig::default().validate().is_ok());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "timeout: 5").unwrap();
        let err = ScanConfig::load(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing"));
    }
}
