//! Evaluation modes.
//!
//! A mode decides which strategies to build from an [`EvaluationConfig`] and
//! runs them against the candidate responses. Mode names are a closed set
//! ([`ModeKind`]); implementations are looked up through a [`ModeRegistry`].

pub mod ground_truth;
pub mod reference_free;
pub mod registry;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{ConfigError, JudgeError, Result};
use crate::models::JudgeModel;
use crate::strategy::ScoringStrategy;
use crate::trace::{EvalTrace, GenerationTrace};
use crate::types::EvaluationConfig;

pub use ground_truth::GroundTruthMode;
pub use reference_free::ReferenceFreeMode;
pub use registry::ModeRegistry;

/// A recognized evaluation mode name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    ReferenceFree,
    GroundTruth,
    /// Recognized, but ships without an implementation.
    Comparison,
}

impl ModeKind {
    pub const ALL: [ModeKind; 3] = [
        ModeKind::ReferenceFree,
        ModeKind::GroundTruth,
        ModeKind::Comparison,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModeKind::ReferenceFree => "reference_free",
            ModeKind::GroundTruth => "ground_truth",
            ModeKind::Comparison => "comparison",
        }
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModeKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim();
        ModeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| ConfigError::UnknownMode {
                name: name.to_string(),
                valid: ModeKind::ALL.iter().map(|k| k.as_str().to_string()).collect(),
            })
    }
}

/// One way of turning candidate responses into judged traces.
#[async_trait]
pub trait EvaluationMode: Send + Sync {
    fn kind(&self) -> ModeKind;

    /// Judge `responses` according to `config`, returning traces in a
    /// deterministic, positional order.
    async fn run(
        &self,
        config: &EvaluationConfig,
        responses: &[GenerationTrace],
        judge: Arc<JudgeModel>,
    ) -> Result<Vec<EvalTrace>>;
}

/// Evaluate each strategy against the same responses, keeping strategy order.
///
/// At most `concurrency` judge calls are in flight; 0 is treated as 1. The
/// first failure, in strategy order, ends the run.
pub(crate) async fn drive_strategies<S: ScoringStrategy>(
    strategies: &[S],
    responses: &[String],
    concurrency: usize,
) -> std::result::Result<Vec<EvalTrace>, JudgeError> {
    let calls: Vec<_> = strategies
        .iter()
        .map(|strategy| strategy.evaluate(responses, None))
        .collect();
    stream::iter(calls)
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_kind_parses_known_names() {
        assert_eq!("reference_free".parse::<ModeKind>().unwrap(), ModeKind::ReferenceFree);
        assert_eq!(" ground_truth ".parse::<ModeKind>().unwrap(), ModeKind::GroundTruth);
        assert_eq!("comparison".parse::<ModeKind>().unwrap(), ModeKind::Comparison);
    }

    #[test]
    fn test_unknown_mode_lists_valid_names() {
        let err = "pairwise".parse::<ModeKind>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown evaluation mode 'pairwise'. Available modes: reference_free, ground_truth, comparison"
        );
    }

    #[test]
    fn test_mode_kind_serde_matches_display() {
        for kind in ModeKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.to_string());
            let yaml: ModeKind = serde_yaml::from_str(kind.as_str()).unwrap();
            assert_eq!(yaml, kind);
        }
    }
}
