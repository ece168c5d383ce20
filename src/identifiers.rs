//! Type-safe identifiers.
//!
//! Newtype wrappers keep the session's string keys apart at compile time:
//! a webspace key can't be passed where a language code is expected.
//!
//! | Type | Wraps | Used for |
//! |------|-------|----------|
//! | [`ContentId`] | `String` | Content item being edited |
//! | [`WebspaceKey`] | `String` | Webspace the content lives in |
//! | [`LanguageCode`] | `String` | Localization being edited |
//! | [`UserId`] | `String` | Editing user, sent in socket messages |
//! | [`NodeId`] | `usize` | Node in a form [`Document`](crate::form::Document) |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// String Identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[inline]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` if the identifier is empty.
            #[inline]
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of the content item under preview.
    ///
    /// Empty for content that has never been saved.
    ContentId
);

string_id!(
    /// Key of the webspace the content belongs to.
    WebspaceKey
);

string_id!(
    /// Language code of the localization being edited.
    LanguageCode
);

string_id!(
    /// Identifier of the editing user.
    UserId
);

// ============================================================================
// NodeId
// ============================================================================

/// Index of a node inside a form [`Document`](crate::form::Document) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Creates a node id from an arena index.
    #[inline]
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the arena index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
