// SPDX-License-Identifier: PMPL-1.0-or-later

//! Ordered engine registry
//!
//! Registration order is the order in which outcomes are reported, so merge
//! results downstream are reproducible.

use crate::engines::{AnalyzerEngine, CustomEngine, MythrilEngine, SlitherEngine};
use crate::errors::AnalysisError;
use std::sync::Arc;

/// Canonical form of an engine name: trimmed, lowercase
pub fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

#[derive(Clone, Default)]
pub struct EngineRegistry {
    engines: Vec<(String, Arc<dyn AnalyzerEngine>)>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// slither, mythril and custom, in that order
    pub fn with_defaults() -> Result<Self, AnalysisError> {
        Ok(Self::builder()
            .with_engine(SlitherEngine::new()?)
            .with_engine(MythrilEngine::new()?)
            .with_engine(CustomEngine::new()?)
            .build())
    }

    pub fn builder() -> EngineRegistryBuilder {
        EngineRegistryBuilder::new()
    }

    /// Add an engine; an engine with the same name keeps its slot and is replaced.
    pub fn register<E: AnalyzerEngine + 'static>(&mut self, engine: E) {
        self.register_arc(Arc::new(engine));
    }

    pub fn register_arc(&mut self, engine: Arc<dyn AnalyzerEngine>) {
        let name = normalize_name(engine.name());
        match self.engines.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = engine,
            None => self.engines.push((name, engine)),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AnalyzerEngine>> {
        let name = normalize_name(name);
        self.engines
            .iter()
            .find(|(existing, _)| *existing == name)
            .map(|(_, engine)| Arc::clone(engine))
    }

    pub fn names(&self) -> Vec<&str> {
        self.engines.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn AnalyzerEngine>)> {
        self.engines.iter().map(|(name, engine)| (name.as_str(), engine))
    }
}

pub struct EngineRegistryBuilder {
    registry: EngineRegistry,
}

impl EngineRegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: EngineRegistry::new(),
        }
    }

    pub fn with_engine<E: AnalyzerEngine + 'static>(mut self, engine: E) -> Self {
        self.registry.register(engine);
        self
    }

    pub fn with_shared(mut self, engine: Arc<dyn AnalyzerEngine>) -> Self {
        self.registry.register_arc(engine);
        self
    }

    pub fn build(self) -> EngineRegistry {
        self.registry
    }
}

impl Default for EngineRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
