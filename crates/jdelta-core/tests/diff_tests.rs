use jdelta_core::{diff, diff_with_options, patch, DiffOptions, Stanza};
use serde_json::{json, Value};

/// Helper: the wire form of a stanza list, for literal comparison.
fn wire(stanzas: &[Stanza]) -> Value {
    serde_json::to_value(stanzas).expect("stanza lists always serialize")
}

/// Helper: diff then patch, asserting the round trip lands on `right`.
fn assert_round_trip(left: &Value, right: &Value) {
    let stanzas = diff(left, right);
    let patched = patch(left, &stanzas).expect("diff output must apply cleanly");
    assert_eq!(
        &patched, right,
        "round trip failed\n  left:    {left}\n  right:   {right}\n  stanzas: {}",
        wire(&stanzas)
    );
}

// ============================================================================
// No-op diffs
// ============================================================================

#[test]
fn equal_values_diff_to_nothing() {
    let cases = [
        json!(null),
        json!(true),
        json!(42),
        json!("spam"),
        json!([1, [2, [3]]]),
        json!({"a": {"b": [null, false]}}),
    ];
    for value in &cases {
        assert!(diff(value, value).is_empty(), "non-empty diff for {value}");
    }
}

#[test]
fn numerically_equal_spellings_diff_to_nothing() {
    // Formatting alone must never register as a change.
    let left: Value = serde_json::from_str("100.0").unwrap();
    let right: Value = serde_json::from_str("1e2").unwrap();
    assert!(diff(&left, &right).is_empty());

    let left: Value = serde_json::from_str(r#"{"n": 0.5}"#).unwrap();
    let right: Value = serde_json::from_str(r#"{"n": 5e-1}"#).unwrap();
    assert!(diff(&left, &right).is_empty());
}

#[test]
fn integer_and_float_are_distinct() {
    // The source text distinguished them, so the diff must too.
    let left: Value = serde_json::from_str("1").unwrap();
    let right: Value = serde_json::from_str("1.0").unwrap();
    let stanzas = diff(&left, &right);
    assert_eq!(stanzas.len(), 1);
    assert_round_trip(&left, &right);
}

// ============================================================================
// Objects
// ============================================================================

#[test]
fn added_key_emits_single_replacement() {
    let left = json!({"foo": "bar"});
    let right = json!({"foo": "bar", "baz": ["quux"]});
    let stanzas = diff(&left, &right);
    assert_eq!(wire(&stanzas), json!([[["baz"], ["quux"]]]));
    assert_round_trip(&left, &right);
}

#[test]
fn removed_key_emits_deletion() {
    let left = json!({"foo": "bar", "baz": "quux"});
    let right = json!({"foo": "bar"});
    let stanzas = diff(&left, &right);
    assert_eq!(wire(&stanzas), json!([[["baz"]]]));
    assert_round_trip(&left, &right);
}

#[test]
fn changed_scalar_replaces_at_key() {
    let left = json!({"k": 0});
    let right = json!({"k": 1});
    assert_eq!(wire(&diff(&left, &right)), json!([[["k"], 1]]));
}

#[test]
fn nested_change_accumulates_keypath() {
    let left = json!({"a": {"b": [1, 2]}});
    let right = json!({"a": {"b": [1, 2, 3]}});
    let stanzas = diff(&left, &right);
    assert_eq!(wire(&stanzas), json!([[["a", "b", 2], 3]]));
    assert_round_trip(&left, &right);
}

#[test]
fn object_keys_emit_in_lexicographic_order() {
    let left = json!({"apple": 0, "keep": true, "other": [1, 2, 3, 4]});
    let right = json!({"apple": 2, "keep": true, "mango": 3, "other": [1, 2, 3, 4], "zebra": 1});
    let stanzas = diff(&left, &right);
    let keys: Vec<String> = stanzas
        .iter()
        .map(|s| serde_json::to_string(&s.path()).unwrap())
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_round_trip(&left, &right);
}

// ============================================================================
// Arrays
// ============================================================================

#[test]
fn mid_array_deletion_targets_original_index() {
    let left = json!(["a", "b", "c"]);
    let right = json!(["a", "c"]);
    // Index 1 ("b") goes away; addressing index 2 would touch a shifted
    // element.
    assert_eq!(wire(&diff(&left, &right)), json!([[[1]]]));
    assert_round_trip(&left, &right);
}

#[test]
fn multi_delete_runs_in_descending_index_order() {
    let left = json!(["a", "b", "c", "d"]);
    let right = json!(["a", "d"]);
    let stanzas = diff(&left, &right);
    assert_eq!(wire(&stanzas), json!([[[2]], [[1]]]));
    assert_round_trip(&left, &right);
}

#[test]
fn insertion_leaves_common_elements_untouched() {
    let left = json!(["spam", "spam", "spam", "spam"]);
    let right = json!(["spam", "spam", "spam", "pickled eggs", "spam"]);
    let stanzas = diff(&left, &right);
    assert_eq!(
        wire(&stanzas),
        json!([[[3], "pickled eggs"], [[4], "spam"]])
    );
    // No deletions: every original element survives in the result.
    assert!(stanzas
        .iter()
        .all(|s| matches!(s, Stanza::Replace { .. })));
    assert_round_trip(&left, &right);
}

#[test]
fn append_uses_next_index() {
    let left = json!([1, 2, 3]);
    let right = json!([1, 2, 3, 4]);
    assert_eq!(wire(&diff(&left, &right)), json!([[[3], 4]]));
    assert_round_trip(&left, &right);
}

#[test]
fn paired_compound_elements_recurse_instead_of_replacing() {
    let left = json!([{"name": "alpha", "tags": ["x", "y", "z"], "rank": 1}]);
    let right = json!([{"name": "alpha", "tags": ["x", "y", "z"], "rank": 2}]);
    let stanzas = diff(&left, &right);
    assert_eq!(wire(&stanzas), json!([[[0, "rank"], 2]]));
    assert_round_trip(&left, &right);
}

#[test]
fn front_insertion_still_round_trips() {
    // Patching can only overwrite or append, so a front insertion costs a
    // rewrite of the tail (or collapses to a whole-node replacement).
    let left = json!(["a", "b"]);
    let right = json!(["x", "a", "b"]);
    assert_round_trip(&left, &right);
}

#[test]
fn transposition_is_delete_plus_insert_not_move() {
    let left = json!(["x", "a"]);
    let right = json!(["a", "x"]);
    assert_round_trip(&left, &right);
}

// ============================================================================
// Minimization
// ============================================================================

#[test]
fn disjoint_objects_collapse_to_whole_replacement() {
    let left = json!({"a": "x"});
    let right = json!({"b": "y"});
    // Structural output would be a delete plus a replace, which serializes
    // larger than replacing the node outright.
    assert_eq!(wire(&diff(&left, &right)), json!([[[], {"b": "y"}]]));
}

#[test]
fn disjoint_arrays_collapse_to_whole_replacement() {
    let left = json!([1, 2, 3]);
    let right = json!([4, 5, 6]);
    assert_eq!(wire(&diff(&left, &right)), json!([[[], [4, 5, 6]]]));
}

#[test]
fn structural_output_wins_when_smaller() {
    let left = json!({"shared": [1, 2, 3, 4, 5, 6, 7, 8], "n": 1});
    let right = json!({"shared": [1, 2, 3, 4, 5, 6, 7, 8], "n": 2});
    assert_eq!(wire(&diff(&left, &right)), json!([[["n"], 2]]));
}

#[test]
fn kind_mismatch_replaces_wholesale() {
    let left = json!({"a": 1});
    let right = json!([1]);
    assert_eq!(wire(&diff(&left, &right)), json!([[[], [1]]]));

    let left = json!("text");
    let right = json!({"a": 1});
    assert_eq!(wire(&diff(&left, &right)), json!([[[], {"a": 1}]]));
}

// ============================================================================
// Fast (non-minimal) mode
// ============================================================================

#[test]
fn fast_mode_round_trips() {
    let options = DiffOptions { minimal: false };
    let cases = [
        (json!(["a", "b", "c"]), json!(["a", "c"])),
        (json!({"a": {"b": 1}}), json!({"a": {"b": 2}, "c": 3})),
        (json!([1, 2]), json!([1, 2, 3, 4])),
        (json!({"x": [0, 1]}), json!("scalar")),
    ];
    for (left, right) in &cases {
        let stanzas = diff_with_options(left, right, &options);
        assert_eq!(&patch(left, &stanzas).unwrap(), right);
    }
}

#[test]
fn fast_mode_can_be_larger_but_never_wrong() {
    let left = json!([1, 2, 3, 4, 5]);
    let right = json!([9, 1, 2, 3, 4, 5]);
    let minimal = diff(&left, &right);
    let fast = diff_with_options(&left, &right, &DiffOptions { minimal: false });
    assert_eq!(patch(&left, &fast).unwrap(), right);
    let minimal_len = serde_json::to_string(&minimal).unwrap().len();
    let fast_len = serde_json::to_string(&fast).unwrap().len();
    assert!(minimal_len <= fast_len);
}
