//! # jdelta-core
//!
//! Structural diffs for JSON: compute a minimal delta between two values,
//! apply it to reconstruct the target, and exchange it as a human-legible,
//! re-parseable unified-diff text.
//!
//! A delta is a list of *stanzas*, each a deletion or a replacement at a
//! *keypath*. On the wire a stanza list is plain JSON — `[keypath]` deletes,
//! `[keypath, value]` replaces — so deltas are themselves JSON values.
//!
//! ## Quick start
//!
//! ```rust
//! use jdelta_core::{diff, patch};
//! use serde_json::json;
//!
//! let left = json!({"foo": "bar"});
//! let right = json!({"foo": "bar", "baz": ["quux"]});
//!
//! let stanzas = diff(&left, &right);
//! assert_eq!(serde_json::to_string(&stanzas).unwrap(), r#"[[["baz"],["quux"]]]"#);
//! assert_eq!(patch(&left, &stanzas).unwrap(), right);
//! ```
//!
//! ## Modules
//!
//! - [`diff`] — structural diff engine with LCS array alignment and size
//!   minimization
//! - [`patch`] — applies a stanza list, all-or-nothing
//! - [`udiff`] — `diff -u`-inspired text codec with elision of unchanged
//!   context
//! - [`sparse`] — extended-JSON grammar (`...` elision markers) and parser
//! - [`path`] / [`stanza`] — keypaths and the stanza wire form
//! - [`value`] — helpers over `serde_json::Value`, the in-memory value model
//! - [`error`] — typed failures (`ParseError`, `PathNotFound`, …)
//!
//! All operations are pure, synchronous functions over immutable inputs:
//! nothing here mutates its arguments, performs I/O, or holds global state,
//! so values can be shared freely across threads.

pub mod diff;
pub mod error;
pub mod patch;
pub mod path;
pub mod sparse;
pub mod stanza;
pub mod udiff;
pub mod value;

pub use diff::{diff, diff_with_options, DiffOptions};
pub use error::{DeltaError, Result};
pub use patch::patch;
pub use path::{Keypath, PathSegment};
pub use sparse::{SparseObject, SparseSlot, SparseValue};
pub use stanza::Stanza;
pub use udiff::{
    read_header, reconstruct_diff, reconstruct_diff_reverse, udiff, upatch, upatch_reverse,
    UdiffHeader,
};
pub use value::{compact, json_size, kind, ValueKind};
