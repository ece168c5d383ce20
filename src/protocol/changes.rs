//! Change payloads and property addressing.
//!
//! A [`ChangeSet`] maps serialized [`PropertyPath`]s to new field values.
//! Both transports carry the same change set: the socket wraps it in an
//! `update` message, HTTP posts it as `{"changes": ...}`.
//!
//! # Path Serialization
//!
//! | Path | Key |
//! |------|-----|
//! | `Flat("title")` | `title` |
//! | `Nested("blocks", 1, "text")` | `blocks,1,text` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// PropertyPath
// ============================================================================

/// Structured address of a changed form field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyPath {
    /// Top-level field addressed by its own mapping key.
    Flat(String),

    /// Field inside an instance of a repeatable block.
    Nested {
        /// Mapping key of the block container.
        parent_key: String,
        /// Zero-based position of the block instance among its siblings.
        item_index: usize,
        /// Mapping key of the field inside the instance.
        child_key: String,
    },
}

impl PropertyPath {
    /// Creates a flat path.
    #[inline]
    #[must_use]
    pub fn flat(key: impl Into<String>) -> Self {
        Self::Flat(key.into())
    }

    /// Creates a block-relative path.
    #[inline]
    #[must_use]
    pub fn nested(
        parent_key: impl Into<String>,
        item_index: usize,
        child_key: impl Into<String>,
    ) -> Self {
        Self::Nested {
            parent_key: parent_key.into(),
            item_index,
            child_key: child_key.into(),
        }
    }

    /// Returns the mapping key of the field itself.
    #[inline]
    #[must_use]
    pub fn leaf_key(&self) -> &str {
        match self {
            Self::Flat(key) => key,
            Self::Nested { child_key, .. } => child_key,
        }
    }

    /// Returns `true` for block-relative paths.
    #[inline]
    #[must_use]
    pub fn is_nested(&self) -> bool {
        matches!(self, Self::Nested { .. })
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat(key) => f.write_str(key),
            Self::Nested {
                parent_key,
                item_index,
                child_key,
            } => write!(f, "{parent_key},{item_index},{child_key}"),
        }
    }
}

impl From<&str> for PropertyPath {
    fn from(key: &str) -> Self {
        Self::Flat(key.to_string())
    }
}

impl From<String> for PropertyPath {
    fn from(key: String) -> Self {
        Self::Flat(key)
    }
}

// ============================================================================
// ChangeSet
// ============================================================================

/// Field changes sent in one update.
///
/// An empty change set never goes on the wire: the session controller
/// replaces it with the full form state first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(Map<String, Value>);

impl ChangeSet {
    /// Creates an empty change set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a change set holding a single field.
    #[must_use]
    pub fn single(path: &PropertyPath, value: Value) -> Self {
        let mut changes = Self::new();
        changes.insert(path, value);
        changes
    }

    /// Sets the value for a path, replacing any previous value.
    pub fn insert(&mut self, path: &PropertyPath, value: Value) {
        self.0.insert(path.to_string(), value);
    }

    /// Returns the value stored under a serialized key.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns `true` if no field changed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of changed fields.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over serialized keys and values.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Returns the underlying JSON object.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ChangeSet {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ============================================================================
// Tests
// ============================================================================
