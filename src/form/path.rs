//! Field path resolution.
//!
//! Maps an event target to the [`PropertyPath`] used as its change key.
//!
//! # Algorithm
//!
//! 1. Walk up from the target (inclusive) to the first bound node. Its
//!    mapping key is the leaf key.
//! 2. Above the leaf, find the nearest block instance and, separately,
//!    the nearest node with a mapping key.
//! 3. Both found: `Nested(container key, instance position, leaf key)`.
//!    Otherwise: `Flat(leaf key)`.
//!
//! A descriptor-list container key resolves to its first descriptor's
//! `data`, whatever the instance's actual block type is.

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};
use crate::identifiers::NodeId;
use crate::protocol::PropertyPath;

use super::dom::Document;

// ============================================================================
// Resolution
// ============================================================================

/// Returns the nearest bound node at or above `target`.
///
/// # Errors
///
/// - [`Error::NodeNotFound`] for unknown ids
/// - [`Error::UnboundField`] if nothing above `target` is bound
pub fn bound_element(document: &Document, target: NodeId) -> Result<NodeId> {
    document.node(target)?;

    document
        .ancestors_inclusive(target)
        .find(|id| document.node(*id).is_ok_and(|node| node.is_bound()))
        .ok_or_else(|| Error::unbound_field(target))
}

/// Resolves the property path for an event target.
///
/// # Errors
///
/// - [`Error::NodeNotFound`] for unknown ids
/// - [`Error::UnboundField`] if nothing above `target` is bound
/// - [`Error::InvalidMapping`] if the leaf or container key is unusable
pub fn resolve(document: &Document, target: NodeId) -> Result<PropertyPath> {
    let leaf = bound_element(document, target)?;
    let leaf_key = primary_key(document, leaf)?;

    let mut instance = None;
    let mut container = None;

    for id in document.ancestors(leaf) {
        let node = document.node(id)?;

        if instance.is_none() && node.is_block_instance() {
            instance = Some(id);
        }
        if container.is_none() && node.mapping_key().is_some() {
            container = Some(id);
        }
        if instance.is_some() && container.is_some() {
            break;
        }
    }

    match (instance, container) {
        (Some(instance), Some(container)) => Ok(PropertyPath::Nested {
            parent_key: primary_key(document, container)?,
            item_index: document.index_in_parent(instance)?,
            child_key: leaf_key,
        }),
        _ => Ok(PropertyPath::Flat(leaf_key)),
    }
}

/// Reads the key a node contributes to a path.
fn primary_key(document: &Document, id: NodeId) -> Result<String> {
    let mapping = document
        .node(id)?
        .mapping_key()
        .ok_or_else(|| Error::invalid_mapping(id, "missing mapping key"))?;

    mapping
        .primary()
        .map(str::to_string)
        .ok_or_else(|| Error::invalid_mapping(id, "empty descriptor list"))
}

// ============================================================================
// Tests
// ============================================================================
