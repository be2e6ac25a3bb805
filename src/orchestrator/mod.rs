// SPDX-License-Identifier: PMPL-1.0-or-later

//! Analysis orchestrator
//!
//! Runs the requested subset of registered engines over one source text and
//! records an explicit outcome per engine. A failing, panicking or hung engine
//! never aborts the batch.

pub mod registry;

use crate::engines::AnalyzerEngine;
use crate::errors::AnalysisError;
use crate::types::StaticAnalysisResult;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub use registry::{normalize_name, EngineRegistry, EngineRegistryBuilder};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Execution settings for one orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Wall-clock limit per engine
    pub timeout: Duration,
    /// Worker pool size; 0 means one worker per requested engine
    pub worker_threads: usize,
    pub parallel: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            worker_threads: 0,
            parallel: true,
        }
    }
}

#[derive(Debug)]
pub enum EngineStatus {
    Completed(StaticAnalysisResult),
    Failed(AnalysisError),
}

/// What happened to one engine in a run
#[derive(Debug)]
pub struct EngineOutcome {
    pub engine: String,
    pub status: EngineStatus,
}

impl EngineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, EngineStatus::Completed(_))
    }

    pub fn result(&self) -> Option<&StaticAnalysisResult> {
        match &self.status {
            EngineStatus::Completed(result) => Some(result),
            EngineStatus::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&AnalysisError> {
        match &self.status {
            EngineStatus::Completed(_) => None,
            EngineStatus::Failed(err) => Some(err),
        }
    }
}

/// Serializable record of a failed engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineFailure {
    pub engine: String,
    pub kind: String,
    pub message: String,
}

/// Outcomes of one run, in registration order
#[derive(Debug, Default)]
pub struct OrchestrationReport {
    pub outcomes: Vec<EngineOutcome>,
}

impl OrchestrationReport {
    pub fn results(&self) -> impl Iterator<Item = &StaticAnalysisResult> {
        self.outcomes.iter().filter_map(EngineOutcome::result)
    }

    pub fn failures(&self) -> Vec<EngineFailure> {
        self.outcomes
            .iter()
            .filter_map(|outcome| {
                outcome.error().map(|err| EngineFailure {
                    engine: outcome.engine.clone(),
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                })
            })
            .collect()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Drop failures and keep completed results
    pub fn into_results(self) -> Vec<StaticAnalysisResult> {
        self.outcomes
            .into_iter()
            .filter_map(|outcome| match outcome.status {
                EngineStatus::Completed(result) => Some(result),
                EngineStatus::Failed(_) => None,
            })
            .collect()
    }
}

pub struct Orchestrator {
    registry: EngineRegistry,
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(registry: EngineRegistry, options: RunOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Results of every requested engine that completed.
    ///
    /// Unknown names are skipped. An empty list means no requested engine
    /// exists or every one of them failed.
    pub fn analyze_contract<S: AsRef<str>>(&self, source: &str, names: &[S]) -> Vec<StaticAnalysisResult> {
        self.run(source, names).into_results()
    }

    /// Run the requested engines and report every outcome.
    pub fn run<S: AsRef<str>>(&self, source: &str, names: &[S]) -> OrchestrationReport {
        let engines = self.resolve(names);
        if engines.is_empty() {
            return OrchestrationReport::default();
        }

        let source: Arc<str> = Arc::from(source);
        let outcomes = if self.options.parallel && engines.len() > 1 {
            self.run_parallel(&engines, &source)
        } else {
            self.run_sequential(&engines, &source)
        };

        OrchestrationReport { outcomes }
    }

    /// Registered engines that were requested, in registration order
    fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Vec<(String, Arc<dyn AnalyzerEngine>)> {
        let requested: HashSet<String> = names.iter().map(|n| normalize_name(n.as_ref())).collect();

        for name in &requested {
            if self.registry.get(name).is_none() {
                debug!(engine = %name, "skipping unknown engine");
            }
        }

        self.registry
            .iter()
            .filter(|(name, _)| requested.contains(*name))
            .map(|(name, engine)| (name.to_string(), Arc::clone(engine)))
            .collect()
    }

    fn run_sequential(
        &self,
        engines: &[(String, Arc<dyn AnalyzerEngine>)],
        source: &Arc<str>,
    ) -> Vec<EngineOutcome> {
        engines
            .iter()
            .map(|(name, engine)| self.invoke(name, engine, source))
            .collect()
    }

    fn run_parallel(
        &self,
        engines: &[(String, Arc<dyn AnalyzerEngine>)],
        source: &Arc<str>,
    ) -> Vec<EngineOutcome> {
        let threads = match self.options.worker_threads {
            0 => engines.len(),
            n => n,
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|idx| format!("consensus-scan-worker-{}", idx))
            .build();

        match pool {
            // Indexed collect keeps input order whatever the completion order.
            Ok(pool) => pool.install(|| {
                engines
                    .par_iter()
                    .map(|(name, engine)| self.invoke(name, engine, source))
                    .collect::<Vec<_>>()
            }),
            Err(e) => {
                warn!(error = %e, "could not build worker pool; running engines sequentially");
                self.run_sequential(engines, source)
            }
        }
    }

    /// Run one engine on its own thread and wait at most `timeout`.
    ///
    /// A timed-out engine thread is left to finish on its own; its result is
    /// discarded.
    fn invoke(&self, name: &str, engine: &Arc<dyn AnalyzerEngine>, source: &Arc<str>) -> EngineOutcome {
        let started = Instant::now();
        let (tx, rx) = mpsc::channel();
        let worker_engine = Arc::clone(engine);
        let worker_source = Arc::clone(source);

        let spawned = thread::Builder::new()
            .name(format!("engine-{}", name))
            .spawn(move || {
                let _ = tx.send(worker_engine.analyze(&worker_source));
            });

        let status = match spawned {
            Err(e) => EngineStatus::Failed(AnalysisError::external(
                name,
                format!("could not start engine thread: {}", e),
            )),
            Ok(_) => match rx.recv_timeout(self.options.timeout) {
                Ok(Ok(result)) => EngineStatus::Completed(result),
                Ok(Err(err)) => EngineStatus::Failed(err),
                Err(mpsc::RecvTimeoutError::Timeout) => EngineStatus::Failed(AnalysisError::Timeout {
                    engine: name.to_string(),
                    timeout_ms: self.options.timeout.as_millis() as u64,
                }),
                Err(mpsc::RecvTimeoutError::Disconnected) => EngineStatus::Failed(AnalysisError::Panicked {
                    engine: name.to_string(),
                }),
            },
        };

        match &status {
            EngineStatus::Completed(result) => debug!(
                engine = %name,
                findings = result.vulnerabilities.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "engine completed"
            ),
            EngineStatus::Failed(err) => warn!(
                engine = %name,
                error = %err,
                "engine failed; continuing with remaining engines"
            ),
        }

        EngineOutcome {
            engine: name.to_string(),
            status,
        }
    }
}

/// Run `names` against a default registry with default options.
pub fn analyze_contract<S: AsRef<str>>(
    source: &str,
    names: &[S],
) -> Result<Vec<StaticAnalysisResult>, AnalysisError> {
    let orchestrator = Orchestrator::new(EngineRegistry::with_defaults()?, RunOptions::default());
    Ok(orchestrator.analyze_contract(source, names))
}
