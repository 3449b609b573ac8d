use jdelta_core::{patch, DeltaError, Stanza};
use serde_json::{json, Value};

/// Helper: parse a stanza list from its wire form.
fn stanzas(wire: Value) -> Vec<Stanza> {
    serde_json::from_value(wire).expect("wire form must parse")
}

// ============================================================================
// Mapping semantics
// ============================================================================

#[test]
fn replace_existing_key() {
    let original = json!({"foo": "bar"});
    let patched = patch(&original, &stanzas(json!([[["foo"], "baz"]]))).unwrap();
    assert_eq!(patched, json!({"foo": "baz"}));
}

#[test]
fn replacement_creates_missing_key() {
    let original = json!({"foo": "bar"});
    let patched = patch(&original, &stanzas(json!([[["baz"], ["quux"]]]))).unwrap();
    assert_eq!(patched, json!({"foo": "bar", "baz": ["quux"]}));
}

#[test]
fn delete_removes_key() {
    let original = json!({"foo": "bar", "baz": "quux"});
    let patched = patch(&original, &stanzas(json!([[["baz"]]]))).unwrap();
    assert_eq!(patched, json!({"foo": "bar"}));
}

#[test]
fn replacement_with_null_is_not_a_deletion() {
    let original = json!({"foo": "bar"});
    let patched = patch(&original, &stanzas(json!([[["foo"], null]]))).unwrap();
    assert_eq!(patched, json!({"foo": null}));
}

#[test]
fn delete_missing_key_is_path_not_found() {
    let original = json!({"foo": "bar"});
    let result = patch(&original, &stanzas(json!([[["baz"]]])));
    assert!(matches!(result, Err(DeltaError::PathNotFound { .. })));
}

// ============================================================================
// Sequence semantics
// ============================================================================

#[test]
fn set_existing_index() {
    let original = json!([17, 3.141593, null]);
    let patched = patch(&original, &stanzas(json!([[[1], 3.14159265]]))).unwrap();
    assert_eq!(patched, json!([17, 3.14159265, null]));
}

#[test]
fn append_at_length() {
    let original = json!(["a", "b"]);
    let patched = patch(&original, &stanzas(json!([[[2], "c"]]))).unwrap();
    assert_eq!(patched, json!(["a", "b", "c"]));
}

#[test]
fn append_beyond_length_is_path_not_found() {
    let original = json!(["a", "b"]);
    let result = patch(&original, &stanzas(json!([[[5], "c"]])));
    assert!(matches!(result, Err(DeltaError::PathNotFound { .. })));
}

#[test]
fn deletion_shifts_later_indices_down() {
    let original = json!(["a", "b", "c"]);
    let patched = patch(&original, &stanzas(json!([[[1]]]))).unwrap();
    assert_eq!(patched, json!(["a", "c"]));
}

#[test]
fn descending_deletes_keep_addresses_valid() {
    let original = json!(["a", "b", "c", "d"]);
    let patched = patch(&original, &stanzas(json!([[[2]], [[1]]]))).unwrap();
    assert_eq!(patched, json!(["a", "d"]));
}

#[test]
fn stanzas_apply_strictly_in_order() {
    // The same two stanzas in ascending order hit a shifted element; the
    // engine must not reorder or second-guess them.
    let original = json!(["a", "b", "c", "d"]);
    let patched = patch(&original, &stanzas(json!([[[1]], [[2]]]))).unwrap();
    assert_eq!(patched, json!(["a", "c"]));
}

#[test]
fn string_key_into_array_is_path_not_found() {
    let original = json!(["a", "b"]);
    let result = patch(&original, &stanzas(json!([[["x"], 1]])));
    assert!(matches!(result, Err(DeltaError::PathNotFound { .. })));
}

// ============================================================================
// Root addressing
// ============================================================================

#[test]
fn empty_keypath_replaces_the_root() {
    let original = json!({"anything": true});
    let patched = patch(&original, &stanzas(json!([[[], 5]]))).unwrap();
    assert_eq!(patched, json!(5));
}

#[test]
fn empty_keypath_deletion_is_path_not_found() {
    let original = json!({"anything": true});
    let result = patch(&original, &stanzas(json!([[[]]])));
    assert!(matches!(result, Err(DeltaError::PathNotFound { .. })));
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn unresolvable_first_segment_is_path_not_found_not_a_no_op() {
    let original = json!({"x": 1});
    let result = patch(&original, &stanzas(json!([[["y", "z"], 2]])));
    assert!(matches!(result, Err(DeltaError::PathNotFound { .. })));
}

#[test]
fn descending_through_scalar_is_type_mismatch() {
    let original = json!({"x": 1});
    let result = patch(&original, &stanzas(json!([[["x", "y"], 2]])));
    assert!(matches!(result, Err(DeltaError::TypeMismatch { .. })));
}

#[test]
fn failing_patch_returns_no_partial_result() {
    let original = json!({"a": 1, "b": 2});
    // First stanza would apply; the second cannot. The caller must see an
    // error, never a half-patched value.
    let result = patch(&original, &stanzas(json!([[["a"], 10], [["missing", "deep"], 0]])));
    assert!(result.is_err());
    assert_eq!(original, json!({"a": 1, "b": 2}));
}

#[test]
fn input_is_never_mutated() {
    let original = json!({"a": [1, 2, 3]});
    let before = original.clone();
    let _ = patch(&original, &stanzas(json!([[["a", 0], 99]]))).unwrap();
    assert_eq!(original, before);
}

// ============================================================================
// Wire form
// ============================================================================

#[test]
fn stanza_list_round_trips_through_json() {
    let wire = json!([[["tags", 1]], [["meta", "version"], 2], [[], null]]);
    let parsed: Vec<Stanza> = serde_json::from_value(wire.clone()).unwrap();
    assert_eq!(serde_json::to_value(&parsed).unwrap(), wire);
}

#[test]
fn overlong_stanza_is_rejected() {
    let result: Result<Vec<Stanza>, _> = serde_json::from_value(json!([[["a"], 1, "i"]]));
    assert!(result.is_err());
}

#[test]
fn non_array_stanza_is_rejected() {
    let result: Result<Vec<Stanza>, _> = serde_json::from_value(json!(["not a stanza"]));
    assert!(result.is_err());
}
