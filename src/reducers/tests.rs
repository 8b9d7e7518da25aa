use serde_json::json;

use super::{Append, Reducer, ReducerRegistry, Replace};
use crate::state::{State, StateDelta};

fn delta(pairs: &[(&str, serde_json::Value)]) -> StateDelta {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn replace_is_idempotent() {
    let mut registry = ReducerRegistry::new();
    registry.register("answer", Replace);
    let mut state = State::new();

    registry.merge(&mut state, delta(&[("answer", json!("42"))]));
    let once = state.get("answer").cloned();
    registry.merge(&mut state, delta(&[("answer", json!("42"))]));

    assert_eq!(state.get("answer").cloned(), once);
    assert_eq!(state.get("answer"), Some(&json!("42")));
}

#[test]
fn append_preserves_order() {
    let append = Append;
    let first = append.merge(None, json!(["a"]));
    let second = append.merge(Some(first), json!(["b"]));
    assert_eq!(second, json!(["a", "b"]));
}

#[test]
fn append_never_deduplicates() {
    let append = Append;
    let merged = append.merge(Some(json!(["x"])), json!(["x", "x"]));
    assert_eq!(merged, json!(["x", "x", "x"]));
}

#[test]
fn append_coerces_scalars_to_sequences() {
    let append = Append;
    assert_eq!(append.merge(Some(json!("a")), json!("b")), json!(["a", "b"]));
    assert_eq!(append.merge(None, json!(null)), json!([]));
}

#[test]
fn unregistered_keys_replace() {
    let registry = ReducerRegistry::new();
    let mut state = State::builder().with_value("k", json!([1, 2])).build();

    registry.merge(&mut state, delta(&[("k", json!("flat"))]));

    assert_eq!(state.get("k"), Some(&json!("flat")));
}

#[test]
fn merge_touches_only_delta_keys() {
    let mut registry = ReducerRegistry::new();
    registry.register_append("history");
    let mut state = State::builder()
        .with_value("history", json!(["first"]))
        .with_value("topic", json!("rivers"))
        .build();

    registry.merge(&mut state, delta(&[("history", json!(["second"]))]));

    assert_eq!(state.get("history"), Some(&json!(["first", "second"])));
    assert_eq!(state.get("topic"), Some(&json!("rivers")));
}

#[test]
fn merge_bumps_version_once_per_commit() {
    let registry = ReducerRegistry::new();
    let mut state = State::new();
    assert_eq!(state.version(), 0);

    registry.merge(&mut state, delta(&[("a", json!(1)), ("b", json!(2))]));
    assert_eq!(state.version(), 1);

    registry.merge(&mut state, StateDelta::default());
    assert_eq!(state.version(), 1, "empty delta must not bump the version");
}
