//! Helpers over `serde_json::Value`, which serves as the in-memory value
//! model.
//!
//! `serde_json::Value` already gives the six-variant tagged union, acyclic
//! trees, and the number semantics deltas depend on: integers and floats stay
//! distinct (`1` != `1.0`), while mathematically equal values within a family
//! compare equal regardless of source spelling (`1e2` == `100.0`). With the
//! default `BTreeMap` backing (no `preserve_order` feature), object keys
//! enumerate in lexicographic order, so serialization is deterministic.

use serde_json::Value;

/// The six kinds of JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

/// Which of the six variants `value` is.
pub fn kind(value: &Value) -> ValueKind {
    match value {
        Value::Null => ValueKind::Null,
        Value::Bool(_) => ValueKind::Bool,
        Value::Number(_) => ValueKind::Number,
        Value::String(_) => ValueKind::String,
        Value::Array(_) => ValueKind::Array,
        Value::Object(_) => ValueKind::Object,
    }
}

/// Canonical compact JSON text. Equal values always serialize identically,
/// so byte length is a usable size measure for minimization.
pub fn compact(value: &Value) -> String {
    serde_json::to_string(value).expect("serializing a Value cannot fail")
}

/// Byte length of the canonical compact serialization.
pub fn json_size(value: &Value) -> usize {
    compact(value).len()
}

/// Multi-line pretty rendering, one string per line, 2-space indent.
pub(crate) fn pretty_lines(value: &Value) -> Vec<String> {
    serde_json::to_string_pretty(value)
        .expect("serializing a Value cannot fail")
        .lines()
        .map(str::to_owned)
        .collect()
}
