//! Structural diff engine — computes a stanza list turning one value into
//! another.
//!
//! The engine recurses over matching container kinds, accumulating keypaths:
//!
//! - Equal values (deep equality) contribute nothing.
//! - Objects diff over the union of their keys, visited in lexicographic
//!   order: left-only keys delete, right-only keys replace, shared keys
//!   recurse.
//! - Arrays align by longest common subsequence (deep equality, quadratic
//!   DP, no move detection). Unmatched left elements delete at their
//!   original indices; unmatched right elements force a rewrite of every
//!   later final index, because patching only overwrites or appends.
//! - Anything else is a single whole-node replacement.
//!
//! At every compound node the structural result competes against a single
//! whole-node replacement on serialized size; the smaller wins, and ties keep
//! the structural form (it degrades more gracefully when the udiff rendering
//! is later hand-edited).
//!
//! Array deletions are emitted in descending index order ahead of any
//! replacement on the same array — deleting index `i` before `i + 1` would
//! leave the latter addressing a shifted element.

use crate::path::{Keypath, PathSegment};
use crate::stanza::Stanza;
use serde_json::{Map, Value};

/// Options controlling diff generation.
#[derive(Debug, Clone, Copy)]
pub struct DiffOptions {
    /// Spend extra time and memory searching for the smallest encoding.
    /// When `false`, arrays are compared index by index and no size
    /// minimization runs — faster, but the output can be much larger.
    pub minimal: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self { minimal: true }
    }
}

/// Compute a stanza list sufficient to convert `left` into `right`.
///
/// The result is deterministic and, applied with [`crate::patch`],
/// reconstructs `right` exactly. Neither input is mutated.
pub fn diff(left: &Value, right: &Value) -> Vec<Stanza> {
    diff_with_options(left, right, &DiffOptions::default())
}

/// As [`diff`], with explicit [`DiffOptions`].
pub fn diff_with_options(left: &Value, right: &Value, options: &DiffOptions) -> Vec<Stanza> {
    diff_at(left, right, &Keypath::new(), options)
}

fn diff_at(left: &Value, right: &Value, path: &Keypath, options: &DiffOptions) -> Vec<Stanza> {
    if left == right {
        return Vec::new();
    }
    let structural = match (left, right) {
        (Value::Object(left_map), Value::Object(right_map)) => {
            object_diff(left_map, right_map, path, options)
        }
        (Value::Array(left_items), Value::Array(right_items)) => {
            if options.minimal {
                array_diff(left_items, right_items, path, options)
            } else {
                indexed_diff(left_items, right_items, path, options)
            }
        }
        _ => return vec![Stanza::replace(path.clone(), right.clone())],
    };
    if options.minimal {
        minimize(structural, path, right)
    } else {
        structural
    }
}

/// Keep the structural stanza list unless a single whole-node replacement
/// serializes smaller. Ties keep the structural form.
fn minimize(structural: Vec<Stanza>, path: &Keypath, right: &Value) -> Vec<Stanza> {
    let replacement = vec![Stanza::replace(path.clone(), right.clone())];
    if encoded_len(&replacement) < encoded_len(&structural) {
        replacement
    } else {
        structural
    }
}

fn encoded_len(stanzas: &[Stanza]) -> usize {
    serde_json::to_string(stanzas)
        .expect("serializing stanzas cannot fail")
        .len()
}

fn object_diff(
    left: &Map<String, Value>,
    right: &Map<String, Value>,
    path: &Keypath,
    options: &DiffOptions,
) -> Vec<Stanza> {
    let mut keys: Vec<&String> = left.keys().chain(right.keys()).collect();
    keys.sort();
    keys.dedup();

    let mut out = Vec::new();
    for key in keys {
        let child = path.child(PathSegment::Key(key.clone()));
        match (left.get(key), right.get(key)) {
            (Some(old), Some(new)) => out.extend(diff_at(old, new, &child, options)),
            (Some(_), None) => out.push(Stanza::delete(child)),
            (None, Some(new)) => out.push(Stanza::replace(child, new.clone())),
            (None, None) => {}
        }
    }
    out
}

fn array_diff(
    left: &[Value],
    right: &[Value],
    path: &Keypath,
    options: &DiffOptions,
) -> Vec<Stanza> {
    let matches = lcs_pairs(left, right);

    let mut deletions: Vec<usize> = Vec::new();
    // (final index, left index) of elements paired across a change run.
    let mut paired_changes: Vec<(usize, usize)> = Vec::new();
    // Final index of the first pure insertion, if any. Overwrite-or-append
    // patching cannot shift elements, so everything from here on is
    // rewritten outright.
    let mut rewrite_from: Option<usize> = None;

    let end = (left.len(), right.len());
    let (mut li, mut ri) = (0usize, 0usize);
    for &(ml, mr) in matches.iter().chain(std::iter::once(&end)) {
        let paired = (ml - li).min(mr - ri);
        if rewrite_from.is_none() {
            for offset in 0..paired {
                paired_changes.push((ri + offset, li + offset));
            }
        }
        for index in (li + paired)..ml {
            deletions.push(index);
        }
        if ri + paired < mr && rewrite_from.is_none() {
            rewrite_from = Some(ri + paired);
        }
        li = ml + 1;
        ri = mr + 1;
    }

    let mut out = Vec::new();
    deletions.sort_unstable_by(|a, b| b.cmp(a));
    for index in deletions {
        out.push(Stanza::delete(path.child(PathSegment::Index(index))));
    }
    for (final_index, left_index) in paired_changes {
        let child = path.child(PathSegment::Index(final_index));
        out.extend(diff_at(&left[left_index], &right[final_index], &child, options));
    }
    if let Some(from) = rewrite_from {
        for index in from..right.len() {
            let child = path.child(PathSegment::Index(index));
            out.push(Stanza::replace(child, right[index].clone()));
        }
    }
    out
}

/// Index-by-index comparison for the fast path: no alignment, so an element
/// inserted at the front re-diffs everything after it, but cost stays linear.
fn indexed_diff(
    left: &[Value],
    right: &[Value],
    path: &Keypath,
    options: &DiffOptions,
) -> Vec<Stanza> {
    let mut out = Vec::new();
    for index in (right.len()..left.len()).rev() {
        out.push(Stanza::delete(path.child(PathSegment::Index(index))));
    }
    for index in 0..left.len().min(right.len()) {
        let child = path.child(PathSegment::Index(index));
        out.extend(diff_at(&left[index], &right[index], &child, options));
    }
    for index in left.len()..right.len() {
        out.push(Stanza::replace(
            path.child(PathSegment::Index(index)),
            right[index].clone(),
        ));
    }
    out
}

/// Longest common subsequence by equality: the matched index pairs, strictly
/// increasing on both sides. Quadratic time and space in the input lengths.
pub(crate) fn lcs_pairs<T: PartialEq>(left: &[T], right: &[T]) -> Vec<(usize, usize)> {
    let cols = right.len() + 1;
    let mut table = vec![0usize; (left.len() + 1) * cols];
    for i in (0..left.len()).rev() {
        for j in (0..right.len()).rev() {
            table[i * cols + j] = if left[i] == right[j] {
                table[(i + 1) * cols + j + 1] + 1
            } else {
                table[(i + 1) * cols + j].max(table[i * cols + j + 1])
            };
        }
    }

    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if left[i] == right[j] {
            pairs.push((i, j));
            i += 1;
            j += 1;
        } else if table[(i + 1) * cols + j] >= table[i * cols + j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}
