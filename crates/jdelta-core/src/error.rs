//! Error types for diff, patch, and udiff operations.

use crate::path::Keypath;
use thiserror::Error;

/// Errors that can occur while parsing, patching, or reconstructing deltas.
#[derive(Error, Debug)]
pub enum DeltaError {
    /// The input string was not valid JSON (standard-parser boundary).
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input did not match the extended-JSON grammar.
    /// Includes the byte offset where parsing stopped.
    #[error("parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    /// A patch stanza addressed a node that does not exist.
    #[error("path not found: {path}")]
    PathNotFound { path: Keypath },

    /// A keypath segment tried to descend through a scalar.
    #[error("type mismatch at {path}: segment addresses a non-container")]
    TypeMismatch { path: Keypath },

    /// An elided udiff region could not be recovered from any source.
    #[error("cannot recover elided content at {path}")]
    AmbiguousElision { path: Keypath },
}

/// Convenience alias used throughout jdelta-core.
pub type Result<T> = std::result::Result<T, DeltaError>;
