use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{Append, Reducer, Replace};
use crate::state::{State, StateDelta};

/// Associates state keys with merge strategies and applies deltas.
///
/// Unregistered keys fall back to [`Replace`]. The registry is baked into a
/// compiled graph and shared read-only across executions.
#[derive(Clone, Default)]
pub struct ReducerRegistry {
    reducers: FxHashMap<String, Arc<dyn Reducer>>,
}

impl std::fmt::Debug for ReducerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&str> = self.reducers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("ReducerRegistry")
            .field("registered_keys", &keys)
            .finish()
    }
}

impl ReducerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a merge strategy for one key, replacing any prior one.
    pub fn register(&mut self, key: impl Into<String>, reducer: impl Reducer + 'static) {
        self.reducers.insert(key.into(), Arc::new(reducer));
    }

    /// Convenience for the common append-preserving-order case.
    pub fn register_append(&mut self, key: impl Into<String>) {
        self.register(key, Append);
    }

    fn reducer_for(&self, key: &str) -> &dyn Reducer {
        static REPLACE: Replace = Replace;
        self.reducers
            .get(key)
            .map(Arc::as_ref)
            .unwrap_or(&REPLACE)
    }

    /// Shallow-merge a delta into the state.
    ///
    /// Only keys present in the delta are touched. The whole delta commits
    /// as one unit and the state version is bumped once; the executor calls
    /// this only after a handler returned successfully, so a failed handler
    /// commits nothing.
    pub fn merge(&self, state: &mut State, delta: StateDelta) {
        if delta.is_empty() {
            return;
        }
        for (key, value) in delta {
            let old = state.take(&key);
            let merged = self.reducer_for(&key).merge(old, value);
            state.put(key, merged);
        }
        state.bump_version();
    }
}
