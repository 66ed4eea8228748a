//! Mapping from mode names to implementations.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{EvaluationMode, GroundTruthMode, ModeKind, ReferenceFreeMode};
use crate::error::ConfigError;

/// Registered evaluation modes, built once and handed to the runner.
#[derive(Clone, Default)]
pub struct ModeRegistry {
    modes: BTreeMap<ModeKind, Arc<dyn EvaluationMode>>,
}

impl ModeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in modes: reference-free and ground-truth.
    pub fn standard(judge_concurrency: usize) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(
            ReferenceFreeMode::new().with_judge_concurrency(judge_concurrency),
        ));
        registry.register(Arc::new(
            GroundTruthMode::new().with_judge_concurrency(judge_concurrency),
        ));
        registry
    }

    /// Register a mode under its own kind, replacing any previous one.
    pub fn register(&mut self, mode: Arc<dyn EvaluationMode>) -> &mut Self {
        self.modes.insert(mode.kind(), mode);
        self
    }

    pub fn get(&self, kind: ModeKind) -> Result<Arc<dyn EvaluationMode>, ConfigError> {
        self.modes
            .get(&kind)
            .cloned()
            .ok_or_else(|| ConfigError::ModeNotRegistered {
                mode: kind.to_string(),
                registered: self.registered().iter().map(ToString::to_string).collect(),
            })
    }

    pub fn registered(&self) -> Vec<ModeKind> {
        self.modes.keys().copied().collect()
    }
}

impl std::fmt::Debug for ModeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeRegistry")
            .field("modes", &self.registered())
            .finish()
    }
}
