use serde_json::Value;

use super::Reducer;

/// Default reducer: the delta value wins outright.
///
/// Idempotent: merging the same delta twice leaves the same value as
/// merging it once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Replace;

impl Reducer for Replace {
    fn merge(&self, _old: Option<Value>, delta: Value) -> Value {
        delta
    }
}
