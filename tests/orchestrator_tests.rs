// SPDX-License-Identifier: PMPL-1.0-or-later

//! Orchestrator failure isolation and ordering

use consensus_scan::engines::{AnalyzerEngine, SlitherEngine};
use consensus_scan::errors::AnalysisError;
use consensus_scan::orchestrator::{EngineRegistry, EngineStatus, Orchestrator, RunOptions};
use consensus_scan::types::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const SOURCE: &str = "pragma solidity ^0.8.0;\ncontract A {\n    function f() public { selfdestruct(payable(msg.sender)); }\n}\n";

struct Offline;

impl AnalyzerEngine for Offline {
    fn name(&self) -> &str {
        "offline"
    }

    fn analyze(&self, _source: &str) -> Result<StaticAnalysisResult, AnalysisError> {
        Err(AnalysisError::external("offline", "service unreachable"))
    }
}

struct Counting(Arc<AtomicUsize>);

impl AnalyzerEngine for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    fn analyze(&self, _source: &str) -> Result<StaticAnalysisResult, AnalysisError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(StaticAnalysisResult {
            tool: "counting".to_string(),
            vulnerabilities: Vec::new(),
            metrics: AnalysisMetrics::default(),
            execution_time: Duration::ZERO,
        })
    }
}

struct Hangs;

impl AnalyzerEngine for Hangs {
    fn name(&self) -> &str {
        "hangs"
    }

    fn analyze(&self, _source: &str) -> Result<StaticAnalysisResult, AnalysisError> {
        std::thread::sleep(Duration::from_secs(10));
        Err(AnalysisError::external("hangs", "unreachable"))
    }
}

fn defaults() -> Orchestrator {
    Orchestrator::new(EngineRegistry::with_defaults().unwrap(), RunOptions::default())
}

#[test]
fn test_unknown_engine_is_silently_skipped() {
    let results = defaults().analyze_contract(SOURCE, &["slither", "doesNotExist"]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].tool, "slither");
}

#[test]
fn test_failing_engine_is_excluded() {
    let registry = EngineRegistry::builder()
        .with_engine(SlitherEngine::new().unwrap())
        .with_engine(Offline)
        .build();
    let orchestrator = Orchestrator::new(registry, RunOptions::default());

    let report = orchestrator.run(SOURCE, &["slither", "offline"]);
    assert_eq!(report.outcomes.len(), 2);
    assert!(report.outcomes[0].is_success());
    assert!(matches!(
        report.outcomes[1].status,
        EngineStatus::Failed(AnalysisError::ExternalService { .. })
    ));

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].engine, "offline");
    assert_eq!(failures[0].kind, "external_service");

    let results = report.into_results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].tool, "slither");
}

#[test]
fn test_all_engines_failing_gives_empty_list() {
    let registry = EngineRegistry::builder().with_engine(Offline).build();
    let orchestrator = Orchestrator::new(registry, RunOptions::default());
    assert!(orchestrator.analyze_contract(SOURCE, &["offline"]).is_empty());
    assert!(orchestrator.analyze_contract(SOURCE, &["nothing"]).is_empty());
}

#[test]
fn test_results_follow_registration_order() {
    for parallel in [true, false] {
        let orchestrator = Orchestrator::new(
            EngineRegistry::with_defaults().unwrap(),
            RunOptions {
                parallel,
                ..RunOptions::default()
            },
        );
        let tools: Vec<String> = orchestrator
            .analyze_contract(SOURCE, &["custom", "Mythril", "slither"])
            .into_iter()
            .map(|r| r.tool)
            .collect();
        assert_eq!(tools, vec!["slither", "mythril", "custom"]);
    }
}

#[test]
fn test_timeout_does_not_block_siblings() {
    let registry = EngineRegistry::builder()
        .with_engine(Hangs)
        .with_engine(SlitherEngine::new().unwrap())
        .build();
    let orchestrator = Orchestrator::new(
        registry,
        RunOptions {
            timeout: Duration::from_millis(250),
            worker_threads: 2,
            parallel: true,
        },
    );

    let started = std::time::Instant::now();
    let report = orchestrator.run(SOURCE, &["hangs", "slither"]);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(
        report.outcomes[0].error(),
        Some(AnalysisError::Timeout { timeout_ms: 250, .. })
    ));
    assert!(report.outcomes[1].is_success());
}

#[test]
fn test_each_engine_runs_once_per_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = EngineRegistry::builder()
        .with_engine(Counting(Arc::clone(&calls)))
        .build();
    let orchestrator = Orchestrator::new(registry, RunOptions::default());

    orchestrator.run(SOURCE, &["counting", "COUNTING"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_free_function_uses_default_registry() {
    let results = consensus_scan::analyze_contract(SOURCE, &["mythril"]).unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0]
        .vulnerabilities
        .iter()
        .any(|v| v.severity == Severity::Critical));
}
