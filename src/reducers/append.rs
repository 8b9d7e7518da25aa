use serde_json::Value;

use super::Reducer;

/// Order-preserving concatenation: old elements first, then the delta's.
///
/// Both sides are treated as ordered sequences. A non-array side is coerced
/// to a one-element sequence and `Null` to an empty one, keeping the reducer
/// total. Never deduplicates; callers wanting dedup do it in the handler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Append;

fn into_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

impl Reducer for Append {
    fn merge(&self, old: Option<Value>, delta: Value) -> Value {
        let mut items = old.map(into_items).unwrap_or_default();
        items.extend(into_items(delta));
        Value::Array(items)
    }
}
