//! Merge strategies for accumulating handler deltas into state.
//!
//! Every state key has a reducer deciding how a new partial value combines
//! with the existing one. Reducers are total and deterministic: given any old
//! value (or none) and any delta value they produce a merged value and never
//! fail. Keys without a registered reducer use [`Replace`].

mod append;
mod registry;
mod replace;

pub use append::Append;
pub use registry::ReducerRegistry;
pub use replace::Replace;

use serde_json::Value;

/// A deterministic, total merge function for one state key.
pub trait Reducer: Send + Sync {
    /// Merge a delta value into the existing value for a key.
    ///
    /// `old` is `None` when the key is not yet present; the reducer supplies
    /// its own identity in that case. Must be infallible.
    fn merge(&self, old: Option<Value>, delta: Value) -> Value;
}

#[cfg(test)]
mod tests;
