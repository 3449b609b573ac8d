//! Patch engine — applies a stanza list to a value, producing a new value.
//!
//! Stanzas apply strictly in list order; the engine never reorders or
//! rewrites them. Producers (the diff engine, the udiff decoder) are
//! responsible for ordering stanzas so that sequence indices stay valid as
//! the structure mutates — in particular, multi-index deletions on one array
//! must arrive in descending index order.
//!
//! Application is all-or-nothing: the input is cloned up front, and a failed
//! stanza returns an error without exposing the partially mutated clone.

use crate::error::{DeltaError, Result};
use crate::path::{Keypath, PathSegment};
use crate::stanza::Stanza;
use serde_json::Value;

/// Apply `stanzas` to `original`, producing the patched value.
///
/// `original` is never mutated. Fails with [`DeltaError::PathNotFound`] when
/// a stanza's keypath does not resolve in the progressively mutated
/// structure, and with [`DeltaError::TypeMismatch`] when a non-terminal
/// segment addresses a scalar.
pub fn patch(original: &Value, stanzas: &[Stanza]) -> Result<Value> {
    let mut patched = original.clone();
    for stanza in stanzas {
        apply(&mut patched, stanza)?;
    }
    Ok(patched)
}

fn apply(root: &mut Value, stanza: &Stanza) -> Result<()> {
    let path = stanza.path();
    let Some((last, parents)) = path.segments().split_last() else {
        // The empty keypath addresses the root: replacement swaps the whole
        // value; deletion has no parent to delete from.
        return match stanza {
            Stanza::Replace { value, .. } => {
                *root = value.clone();
                Ok(())
            }
            Stanza::Delete { .. } => Err(DeltaError::PathNotFound { path: path.clone() }),
        };
    };

    let parent = navigate_mut(root, parents, path)?;
    match stanza {
        Stanza::Delete { .. } => delete_child(parent, last, path),
        Stanza::Replace { value, .. } => set_child(parent, last, value, path),
    }
}

/// Walk `segments` down from `root`, returning the addressed container.
fn navigate_mut<'a>(
    root: &'a mut Value,
    segments: &[PathSegment],
    full_path: &Keypath,
) -> Result<&'a mut Value> {
    let mut node = root;
    for (depth, segment) in segments.iter().enumerate() {
        let not_found = || DeltaError::PathNotFound {
            path: full_path.truncated(depth + 1),
        };
        node = match segment {
            PathSegment::Key(key) => match node {
                Value::Object(map) => map.get_mut(key).ok_or_else(not_found)?,
                Value::Array(_) => return Err(not_found()),
                _ => {
                    return Err(DeltaError::TypeMismatch {
                        path: full_path.truncated(depth),
                    })
                }
            },
            PathSegment::Index(index) => match node {
                Value::Array(items) => items.get_mut(*index).ok_or_else(not_found)?,
                Value::Object(_) => return Err(not_found()),
                _ => {
                    return Err(DeltaError::TypeMismatch {
                        path: full_path.truncated(depth),
                    })
                }
            },
        };
    }
    Ok(node)
}

fn delete_child(parent: &mut Value, segment: &PathSegment, path: &Keypath) -> Result<()> {
    match (parent, segment) {
        (Value::Object(map), PathSegment::Key(key)) => match map.remove(key) {
            Some(_) => Ok(()),
            None => Err(DeltaError::PathNotFound { path: path.clone() }),
        },
        (Value::Array(items), PathSegment::Index(index)) if *index < items.len() => {
            // Removal shifts later indices down by one, hence the producers'
            // descending-delete discipline.
            items.remove(*index);
            Ok(())
        }
        (Value::Object(_) | Value::Array(_), _) => {
            Err(DeltaError::PathNotFound { path: path.clone() })
        }
        _ => Err(DeltaError::TypeMismatch { path: path.clone() }),
    }
}

fn set_child(parent: &mut Value, segment: &PathSegment, value: &Value, path: &Keypath) -> Result<()> {
    match (parent, segment) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.insert(key.clone(), value.clone());
            Ok(())
        }
        (Value::Array(items), PathSegment::Index(index)) if *index < items.len() => {
            items[*index] = value.clone();
            Ok(())
        }
        (Value::Array(items), PathSegment::Index(index)) if *index == items.len() => {
            items.push(value.clone());
            Ok(())
        }
        (Value::Object(_) | Value::Array(_), _) => {
            Err(DeltaError::PathNotFound { path: path.clone() })
        }
        _ => Err(DeltaError::TypeMismatch { path: path.clone() }),
    }
}
