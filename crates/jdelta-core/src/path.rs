//! Keypaths — ordered addresses of nodes inside a JSON value tree.
//!
//! A keypath is a sequence of segments, each either a mapping key or a
//! sequence index. The empty keypath addresses the root value itself.
//! Resolution is unambiguous: a keypath names exactly one node, or nothing.
//!
//! On the wire a keypath is a JSON array mixing strings and non-negative
//! integers, e.g. `["tags", 1]`; the serde impls below produce and accept
//! exactly that shape.

use serde::de::{self, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// One step of a keypath: a mapping key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    /// A key into a JSON object.
    Key(String),
    /// An index into a JSON array.
    Index(usize),
}

/// An ordered address of a node inside a JSON value. Empty = the root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Keypath(Vec<PathSegment>);

impl Keypath {
    /// The empty keypath, addressing the root.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if this keypath addresses the root.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The segments in order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Append a segment in place.
    pub fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    /// Remove and return the last segment.
    pub fn pop(&mut self) -> Option<PathSegment> {
        self.0.pop()
    }

    /// A new keypath with `segment` appended.
    pub fn child(&self, segment: PathSegment) -> Keypath {
        let mut segments = self.0.clone();
        segments.push(segment);
        Keypath(segments)
    }

    /// The first `count` segments as a new keypath.
    pub fn truncated(&self, count: usize) -> Keypath {
        Keypath(self.0[..count.min(self.0.len())].to_vec())
    }

    /// Split off the first segment, returning it with the remaining path.
    pub fn split_first(&self) -> Option<(&PathSegment, Keypath)> {
        let (first, rest) = self.0.split_first()?;
        Some((first, Keypath(rest.to_vec())))
    }

    /// Follow the keypath down from `root`. Returns the addressed node, or
    /// `None` if any segment fails to resolve.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut node = root;
        for segment in &self.0 {
            node = match (segment, node) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
                (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
                _ => return None,
            };
        }
        Some(node)
    }
}

impl From<Vec<PathSegment>> for Keypath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Keypath(segments)
    }
}

impl fmt::Display for Keypath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Key(key) if is_bare_key(key) => write!(f, ".{key}")?,
                PathSegment::Key(key) => write!(f, "[{key:?}]")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Keys matching `^[A-Za-z_][A-Za-z0-9_]*$` display in dotted form; anything
/// else is bracketed and quoted.
fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Serialize for PathSegment {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            PathSegment::Key(key) => serializer.serialize_str(key),
            PathSegment::Index(index) => serializer.serialize_u64(*index as u64),
        }
    }
}

impl<'de> Deserialize<'de> for PathSegment {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SegmentVisitor;

        impl Visitor<'_> for SegmentVisitor {
            type Value = PathSegment;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string key or a non-negative integer index")
            }

            fn visit_str<E: de::Error>(self, key: &str) -> std::result::Result<PathSegment, E> {
                Ok(PathSegment::Key(key.to_owned()))
            }

            fn visit_u64<E: de::Error>(self, index: u64) -> std::result::Result<PathSegment, E> {
                usize::try_from(index)
                    .map(PathSegment::Index)
                    .map_err(|_| E::custom("sequence index out of range"))
            }

            fn visit_i64<E: de::Error>(self, index: i64) -> std::result::Result<PathSegment, E> {
                usize::try_from(index)
                    .map(PathSegment::Index)
                    .map_err(|_| E::custom("negative sequence index"))
            }
        }

        deserializer.deserialize_any(SegmentVisitor)
    }
}

impl Serialize for Keypath {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for segment in &self.0 {
            seq.serialize_element(segment)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Keypath {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<PathSegment>::deserialize(deserializer).map(Keypath)
    }
}
