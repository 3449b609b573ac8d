//! Diff stanzas — the unit operations a delta is made of.
//!
//! A stanza is either a deletion or a replacement at a keypath. On the wire
//! a stanza list is a JSON array of arrays: `[keypath]` deletes the addressed
//! node, `[keypath, value]` creates or overwrites it. A replacement value of
//! `null` is still a replacement — deletion is distinguished by arity, not by
//! the payload.
//!
//! Stanza lists are ordered. Producers are responsible for emitting an order
//! that stays valid as sequence indices shift; see the diff engine's
//! descending-delete discipline.

use crate::path::Keypath;
use serde::de::{self, IgnoredAny, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// One diff operation at a keypath.
#[derive(Debug, Clone, PartialEq)]
pub enum Stanza {
    /// Remove the node at `path`.
    Delete { path: Keypath },
    /// Create or overwrite the node at `path` with `value`.
    Replace { path: Keypath, value: Value },
}

impl Stanza {
    /// A deletion stanza.
    pub fn delete(path: Keypath) -> Self {
        Stanza::Delete { path }
    }

    /// A replacement stanza.
    pub fn replace(path: Keypath, value: Value) -> Self {
        Stanza::Replace { path, value }
    }

    /// The keypath this stanza operates on.
    pub fn path(&self) -> &Keypath {
        match self {
            Stanza::Delete { path } | Stanza::Replace { path, .. } => path,
        }
    }

    /// Split off the first path segment, yielding the same operation
    /// expressed relative to the child the segment addresses.
    pub(crate) fn descend(&self) -> Option<(&crate::path::PathSegment, Stanza)> {
        let (first, rest) = self.path().split_first()?;
        let relative = match self {
            Stanza::Delete { .. } => Stanza::Delete { path: rest },
            Stanza::Replace { value, .. } => Stanza::Replace {
                path: rest,
                value: value.clone(),
            },
        };
        Some((first, relative))
    }
}

impl Serialize for Stanza {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Stanza::Delete { path } => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element(path)?;
                seq.end()
            }
            Stanza::Replace { path, value } => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(path)?;
                seq.serialize_element(value)?;
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Stanza {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StanzaVisitor;

        impl<'de> Visitor<'de> for StanzaVisitor {
            type Value = Stanza;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a [keypath] or [keypath, value] array")
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Stanza, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let path: Keypath = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let value: Option<Value> = seq.next_element()?;
                if seq.next_element::<IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(3, &self));
                }
                Ok(match value {
                    Some(value) => Stanza::Replace { path, value },
                    None => Stanza::Delete { path },
                })
            }
        }

        deserializer.deserialize_seq(StanzaVisitor)
    }
}
