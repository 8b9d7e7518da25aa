//! Accumulated execution state and read-only snapshots.
//!
//! [`State`] is a string-keyed map of JSON values owned by exactly one
//! execution context. Handlers never touch it directly: they receive a
//! [`StateSnapshot`] and return a [`StateDelta`] that the executor merges
//! through the [`ReducerRegistry`](crate::reducers::ReducerRegistry). The
//! state's version is bumped once per committed merge, so a snapshot's
//! version tells a caller exactly how many merges it reflects.
//!
//! # Examples
//!
//! ```rust
//! use loomflow::state::State;
//! use serde_json::json;
//!
//! let state = State::builder()
//!     .with_value("topic", json!("tidal power"))
//!     .with_value("history", json!([]))
//!     .build();
//!
//! let snapshot = state.snapshot();
//! assert_eq!(snapshot.get("topic"), Some(&json!("tidal power")));
//! assert_eq!(snapshot.version, 0);
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Partial update returned by a handler: the keys it wants merged.
///
/// Keys absent from the delta leave the corresponding state entries
/// untouched.
pub type StateDelta = FxHashMap<String, Value>;

/// The state accumulated across one execution.
///
/// Lives inside a single execution context; no run observes another run's
/// state. The compiled graph, by contrast, is shared read-only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    values: FxHashMap<String, Value>,
    version: u32,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> StateBuilder {
        StateBuilder::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn values(&self) -> &FxHashMap<String, Value> {
        &self.values
    }

    /// Number of committed merges reflected by this state.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Point-in-time read-only copy handed to handlers.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            values: self.values.clone(),
            version: self.version,
        }
    }

    /// Remove and return the current value for a key. Reducer plumbing:
    /// the registry takes the old value out, merges, and reinserts.
    pub(crate) fn take(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub(crate) fn put(&mut self, key: String, value: Value) {
        self.values.insert(key, value);
    }

    pub(crate) fn bump_version(&mut self) {
        self.version = self.version.saturating_add(1);
    }
}

/// Immutable view of [`State`] at a point in time.
///
/// Independent of the originating state: later merges do not show through.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    pub values: FxHashMap<String, Value>,
    pub version: u32,
}

impl StateSnapshot {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

/// Fluent constructor for initial state.
#[derive(Debug, Default)]
pub struct StateBuilder {
    values: FxHashMap<String, Value>,
}

impl StateBuilder {
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn build(self) -> State {
        State {
            values: self.values,
            version: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_is_deep_copy() {
        let mut state = State::builder().with_value("k", json!("v")).build();
        let snap = state.snapshot();
        state.put("k".into(), json!("changed"));
        state.put("extra".into(), json!(1));
        assert_eq!(snap.get("k"), Some(&json!("v")));
        assert!(!snap.contains_key("extra"));
    }

    #[test]
    fn builder_starts_at_version_zero() {
        let state = State::builder()
            .with_value("a", json!(1))
            .with_value("b", json!([true, null]))
            .build();
        assert_eq!(state.version(), 0);
        assert_eq!(state.get("b"), Some(&json!([true, null])));
    }

    #[test]
    fn version_saturates() {
        let mut state = State::new();
        state.version = u32::MAX;
        state.bump_version();
        assert_eq!(state.version(), u32::MAX);
    }

    #[test]
    fn serde_round_trip() {
        let state = State::builder().with_value("n", json!(42)).build();
        let encoded = serde_json::to_string(&state).unwrap();
        let decoded: State = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, state);
    }
}
