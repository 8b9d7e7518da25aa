//! Pluggable persistence for resumable executions.
//!
//! A [`Checkpoint`] is a flat, serializable record of everything an
//! execution context needs to continue: the node about to run, the merged
//! state, per-node visit counts, and the step counter. The executor saves
//! one after every committed merge when configured with a [`Checkpointer`]
//! and `autosave`; [`Executor::resume`](super::Executor::resume) picks the
//! walk back up from the latest record.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::State;
use crate::types::NodeId;

/// Snapshot of one execution context at a merge boundary.
///
/// Node ids are stored in their [`NodeId::encode`] string form so the record
/// serializes flat.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    pub run_id: String,
    /// Encoded id of the node the run will execute next.
    pub current_node: String,
    pub state: State,
    pub visit_counts: FxHashMap<String, u32>,
    pub step: u64,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn capture(
        run_id: &str,
        current: &NodeId,
        state: &State,
        visits: &FxHashMap<NodeId, u32>,
        step: u64,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            current_node: current.encode(),
            state: state.clone(),
            visit_counts: visits.iter().map(|(id, n)| (id.encode(), *n)).collect(),
            step,
            created_at: Utc::now(),
        }
    }

    pub fn decode_current_node(&self) -> NodeId {
        NodeId::decode(&self.current_node)
    }

    pub fn decode_visit_counts(&self) -> FxHashMap<NodeId, u32> {
        self.visit_counts
            .iter()
            .map(|(id, n)| (NodeId::decode(id), *n))
            .collect()
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    #[error("run not found: {run_id}")]
    #[diagnostic(code(loomflow::checkpointer::not_found))]
    NotFound { run_id: String },

    #[error("checkpoint backend unavailable: {reason}")]
    #[diagnostic(code(loomflow::checkpointer::backend))]
    Backend { reason: String },
}

/// Saves and loads checkpoints.
///
/// `save` replaces the latest record for a run (idempotent on identical
/// input); `load_latest` returns `Ok(None)` for unknown runs.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError>;

    async fn load_latest(&self, run_id: &str) -> Result<Option<Checkpoint>, CheckpointerError>;

    async fn list_runs(&self) -> Result<Vec<String>, CheckpointerError>;
}

/// Volatile process-local checkpointer keeping only the latest record per
/// run. For tests and ephemeral executions.
#[derive(Default)]
pub struct InMemoryCheckpointer {
    inner: RwLock<FxHashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError> {
        let mut inner = self.inner.write().map_err(|e| CheckpointerError::Backend {
            reason: format!("poisoned lock: {e}"),
        })?;
        inner.insert(checkpoint.run_id.clone(), checkpoint);
        Ok(())
    }

    async fn load_latest(&self, run_id: &str) -> Result<Option<Checkpoint>, CheckpointerError> {
        let inner = self.inner.read().map_err(|e| CheckpointerError::Backend {
            reason: format!("poisoned lock: {e}"),
        })?;
        Ok(inner.get(run_id).cloned())
    }

    async fn list_runs(&self) -> Result<Vec<String>, CheckpointerError> {
        let inner = self.inner.read().map_err(|e| CheckpointerError::Backend {
            reason: format!("poisoned lock: {e}"),
        })?;
        let mut runs: Vec<String> = inner.keys().cloned().collect();
        runs.sort_unstable();
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(run_id: &str, step: u64) -> Checkpoint {
        let state = State::builder().with_value("k", json!("v")).build();
        let mut visits = FxHashMap::default();
        visits.insert(NodeId::named("a"), 1);
        Checkpoint::capture(run_id, &NodeId::named("b"), &state, &visits, step)
    }

    #[tokio::test]
    async fn save_replaces_latest() {
        let cp = InMemoryCheckpointer::new();
        cp.save(sample("run-1", 1)).await.unwrap();
        cp.save(sample("run-1", 2)).await.unwrap();
        let latest = cp.load_latest("run-1").await.unwrap().unwrap();
        assert_eq!(latest.step, 2);
    }

    #[tokio::test]
    async fn load_latest_is_none_for_unknown_runs() {
        let cp = InMemoryCheckpointer::new();
        assert!(cp.load_latest("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lists_runs_sorted() {
        let cp = InMemoryCheckpointer::new();
        cp.save(sample("run-b", 1)).await.unwrap();
        cp.save(sample("run-a", 1)).await.unwrap();
        assert_eq!(cp.list_runs().await.unwrap(), vec!["run-a", "run-b"]);
    }

    #[test]
    fn checkpoint_serde_round_trip() {
        let checkpoint = sample("run-1", 3);
        let encoded = serde_json::to_string(&checkpoint).unwrap();
        let decoded: Checkpoint = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, checkpoint);
        assert_eq!(decoded.decode_current_node(), NodeId::named("b"));
        assert_eq!(
            decoded.decode_visit_counts().get(&NodeId::named("a")),
            Some(&1)
        );
    }
}
