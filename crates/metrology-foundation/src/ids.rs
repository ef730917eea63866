//! Identifiers for declared quantity and unit types.
//!
//! Declared types are named by dotted paths (e.g. `"Units.UnitOfLength"`),
//! mirroring the namespace the annotation parser found them in. Identity is
//! purely structural: two declarations naming the same path refer to the
//! same type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Hierarchical dot-separated name of a declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Path {
    /// Ordered segments of the path.
    pub segments: Vec<String>,
}

impl Path {
    /// Creates a path from its segments.
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Creates a path from a dot-separated string.
    ///
    /// Empty segments are kept so that malformed names survive a round trip
    /// unchanged.
    pub fn from_path_str(s: &str) -> Self {
        Self {
            segments: s.split('.').map(String::from).collect(),
        }
    }

    /// Get the path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Check if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Get the last segment, the type's simple name.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Get the namespace (all segments except the last).
    pub fn namespace(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            None
        } else {
            Some(Self::new(self.segments[..self.segments.len() - 1].to_vec()))
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self::from_path_str(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Self::from_path_str(&s)
    }
}

impl From<Path> for String {
    fn from(p: Path) -> Self {
        p.to_string()
    }
}

/// Identity of a declared quantity or unit type.
///
/// Whether a `TypeId` denotes a quantity or a unit is decided by the
/// declarations attached to it, not by the identifier itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub Path);

impl TypeId {
    /// Creates a new identifier from a path.
    pub fn new(p: impl Into<Path>) -> Self {
        Self(p.into())
    }

    /// Returns a reference to the underlying path.
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// The unqualified type name.
    pub fn name(&self) -> &str {
        self.0.last().unwrap_or_default()
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TypeId {
    fn from(s: &str) -> Self {
        Self(Path::from_path_str(s))
    }
}

impl From<String> for TypeId {
    fn from(s: String) -> Self {
        Self(Path::from_path_str(&s))
    }
}

impl From<Path> for TypeId {
    fn from(p: Path) -> Self {
        Self(p)
    }
}
