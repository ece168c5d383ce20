//! Form model and field addressing.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `dom` | Arena tree of form nodes ([`Document`], [`Node`]) |
//! | `path` | Event target → [`PropertyPath`](crate::protocol::PropertyPath) |
//! | `data` | Full form state for full-state syncs |

// ============================================================================
// Submodules
// ============================================================================

/// Full form state collection.
pub mod data;

/// Form document model.
pub mod dom;

/// Field path resolution.
pub mod path;

// ============================================================================
// Re-exports
// ============================================================================

pub use data::collect;
pub use dom::{
    Document, ElementBinding, MappingDescriptor, MappingKey, Node, PREVIEW_UPDATE_CLASS,
    SharedDocument,
};
pub use path::{bound_element, resolve};
