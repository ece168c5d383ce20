//! Form document model.
//!
//! An arena tree standing in for the rendered form. Nodes carry only what
//! the preview needs to know about them:
//!
//! | Field | Form markup equivalent |
//! |-------|------------------------|
//! | [`Node::mapping`] | `data-mapper-property` |
//! | [`Node::is_block_instance`] | `data-mapper-property-tpl` instance marker |
//! | [`Node::binding`] | editable widget bound to the node |
//! | [`Node::has_class`] | CSS classes, e.g. `preview-update` |
//!
//! # Example
//!
//! ```
//! use preview_sync::form::{Document, Node};
//! use serde_json::json;
//!
//! let mut doc = Document::new();
//! let title = doc
//!     .append(doc.root(), Node::new("input").mapping("title").bound(json!("Hello")))
//!     .unwrap();
//!
//! assert_eq!(doc.value(title).unwrap(), &json!("Hello"));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::NodeId;

// ============================================================================
// Types
// ============================================================================

/// A document shared between the editing UI and the event bridge.
pub type SharedDocument = Arc<RwLock<Document>>;

/// Class flagging nodes whose edits are pushed to the preview.
pub const PREVIEW_UPDATE_CLASS: &str = "preview-update";

// ============================================================================
// MappingKey
// ============================================================================

/// Value of a node's mapping-key attribute.
///
/// Simple fields declare a plain key. Block containers may declare a list
/// of descriptor objects instead, one per block type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingKey {
    /// Plain key.
    Key(String),
    /// Descriptor list.
    Descriptors(Vec<MappingDescriptor>),
}

impl MappingKey {
    /// Parses a raw attribute value.
    ///
    /// JSON arrays become descriptor lists; anything else is a plain key.
    #[must_use]
    pub fn parse_attribute(raw: &str) -> Self {
        let trimmed = raw.trim_start();
        if trimmed.starts_with('[')
            && let Ok(descriptors) = serde_json::from_str::<Vec<MappingDescriptor>>(trimmed)
        {
            return Self::Descriptors(descriptors);
        }
        Self::Key(raw.to_string())
    }

    /// Returns the key used in property paths.
    ///
    /// For descriptor lists only the first descriptor's `data` counts.
    #[inline]
    #[must_use]
    pub fn primary(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Descriptors(descriptors) => descriptors.first().map(|d| d.data.as_str()),
        }
    }
}

impl From<&str> for MappingKey {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for MappingKey {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

/// One entry of a descriptor-list mapping key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingDescriptor {
    /// Property key.
    pub data: String,

    /// Remaining descriptor fields (type, template, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MappingDescriptor {
    /// Creates a descriptor with only a key.
    #[inline]
    #[must_use]
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            extra: Map::new(),
        }
    }
}

// ============================================================================
// ElementBinding
// ============================================================================

/// Editable widget bound to a node.
///
/// Its presence marks the node as the canonical editable unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementBinding {
    /// Current widget value.
    pub value: Value,
}

// ============================================================================
// Node
// ============================================================================

/// A form node.
#[derive(Debug, Clone, Default)]
pub struct Node {
    tag: String,
    classes: Vec<String>,
    mapping: Option<MappingKey>,
    block_instance: bool,
    binding: Option<ElementBinding>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    /// Creates a detached node.
    #[inline]
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Sets the mapping key.
    #[inline]
    #[must_use]
    pub fn mapping(mut self, key: impl Into<MappingKey>) -> Self {
        self.mapping = Some(key.into());
        self
    }

    /// Marks the node as an instance of a repeatable block.
    #[inline]
    #[must_use]
    pub fn block_instance(mut self) -> Self {
        self.block_instance = true;
        self
    }

    /// Binds an editable widget holding `value`.
    #[inline]
    #[must_use]
    pub fn bound(mut self, value: Value) -> Self {
        self.binding = Some(ElementBinding { value });
        self
    }

    /// Adds a CSS class.
    #[inline]
    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Flags the node for preview updates.
    #[inline]
    #[must_use]
    pub fn preview_update(self) -> Self {
        self.class(PREVIEW_UPDATE_CLASS)
    }

    /// Returns the tag name.
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the mapping key attribute.
    #[inline]
    #[must_use]
    pub fn mapping_key(&self) -> Option<&MappingKey> {
        self.mapping.as_ref()
    }

    /// Returns `true` for repeatable block instances.
    #[inline]
    #[must_use]
    pub fn is_block_instance(&self) -> bool {
        self.block_instance
    }

    /// Returns the bound widget, if any.
    #[inline]
    #[must_use]
    pub fn binding(&self) -> Option<&ElementBinding> {
        self.binding.as_ref()
    }

    /// Returns `true` if an editable widget is bound here.
    #[inline]
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Returns `true` if the node has the class.
    #[inline]
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Returns the parent node.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the child nodes in document order.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

// ============================================================================
// Document
// ============================================================================

/// Arena-backed form tree.
///
/// Detached nodes stay in the arena but are unreachable from the root.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a document holding only a root `form` node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("form")],
        }
    }

    /// Wraps the document for sharing.
    #[inline]
    #[must_use]
    pub fn into_shared(self) -> SharedDocument {
        Arc::new(RwLock::new(self))
    }

    /// Returns the root node.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    /// Returns a node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for unknown ids.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| Error::node_not_found(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .ok_or_else(|| Error::node_not_found(id))
    }

    /// Appends `node` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] if `parent` doesn't exist.
    pub fn append(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId> {
        self.node(parent)?;

        let id = NodeId::new(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.node_mut(parent)?.children.push(id);

        Ok(id)
    }

    /// Removes a node and its subtree from its parent.
    ///
    /// Later siblings move up one position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for unknown ids.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        let parent = self.node_mut(id)?.parent.take();
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|child| *child != id);
        }
        Ok(())
    }

    /// Iterates over strict ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            document: self,
            next: self.nodes.get(id.index()).and_then(|n| n.parent),
        }
    }

    /// Iterates over `id` followed by its ancestors.
    pub fn ancestors_inclusive(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            document: self,
            next: self.nodes.get(id.index()).map(|_| id),
        }
    }

    /// Returns the zero-based position of a node among its siblings.
    ///
    /// Detached nodes and the root report `0`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for unknown ids.
    pub fn index_in_parent(&self, id: NodeId) -> Result<usize> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(0);
        };

        Ok(self
            .node(parent)?
            .children
            .iter()
            .position(|child| *child == id)
            .unwrap_or_default())
    }

    /// Returns the value of the widget bound to `id`.
    ///
    /// # Errors
    ///
    /// - [`Error::NodeNotFound`] for unknown ids
    /// - [`Error::UnboundField`] if no widget is bound
    pub fn value(&self, id: NodeId) -> Result<&Value> {
        self.node(id)?
            .binding
            .as_ref()
            .map(|binding| &binding.value)
            .ok_or_else(|| Error::unbound_field(id))
    }

    /// Updates the value of the widget bound to `id`.
    ///
    /// # Errors
    ///
    /// - [`Error::NodeNotFound`] for unknown ids
    /// - [`Error::UnboundField`] if no widget is bound
    pub fn set_value(&mut self, id: NodeId, value: Value) -> Result<()> {
        let binding = self
            .node_mut(id)?
            .binding
            .as_mut()
            .ok_or_else(|| Error::unbound_field(id))?;
        binding.value = value;
        Ok(())
    }

    /// Returns the number of nodes in the arena.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if only the root exists.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }
}

// ============================================================================
// Ancestors
// ============================================================================

/// Iterator over a node's ancestor chain.
pub struct Ancestors<'a> {
    document: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self
            .document
            .nodes
            .get(current.index())
            .and_then(|node| node.parent);
        Some(current)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_append_links_parent_and_child() {
        let mut doc = Document::new();
        let child = doc.append(doc.root(), Node::new("div")).unwrap();

        assert_eq!(doc.node(child).unwrap().parent(), Some(doc.root()));
        assert_eq!(doc.node(doc.root()).unwrap().children(), &[child]);
    }

    #[test]
    fn test_append_to_missing_parent() {
        let mut doc = Document::new();
        let err = doc.append(NodeId::new(99), Node::new("div")).unwrap_err();
        assert!(matches!(err, Error::NodeNotFound { .. }));
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let mut doc = Document::new();
        let outer = doc.append(doc.root(), Node::new("div")).unwrap();
        let inner = doc.append(outer, Node::new("div")).unwrap();
        let leaf = doc.append(inner, Node::new("input")).unwrap();

        let chain: Vec<_> = doc.ancestors(leaf).collect();
        assert_eq!(chain, vec![inner, outer, doc.root()]);

        let inclusive: Vec<_> = doc.ancestors_inclusive(leaf).collect();
        assert_eq!(inclusive.first(), Some(&leaf));
        assert_eq!(inclusive.len(), 4);
    }

    #[test]
    fn test_index_in_parent_after_detach() {
        let mut doc = Document::new();
        let a = doc.append(doc.root(), Node::new("li")).unwrap();
        let b = doc.append(doc.root(), Node::new("li")).unwrap();
        let c = doc.append(doc.root(), Node::new("li")).unwrap();

        assert_eq!(doc.index_in_parent(c).unwrap(), 2);
        doc.detach(a).unwrap();
        assert_eq!(doc.index_in_parent(b).unwrap(), 0);
        assert_eq!(doc.index_in_parent(c).unwrap(), 1);
    }

    #[test]
    fn test_value_requires_binding() {
        let mut doc = Document::new();
        let plain = doc.append(doc.root(), Node::new("div")).unwrap();
        let input = doc
            .append(doc.root(), Node::new("input").bound(json!("a")))
            .unwrap();

        assert!(matches!(doc.value(plain), Err(Error::UnboundField { .. })));
        doc.set_value(input, json!("b")).unwrap();
        assert_eq!(doc.value(input).unwrap(), &json!("b"));
    }

    #[test]
    fn test_parse_plain_attribute() {
        assert_eq!(
            MappingKey::parse_attribute("title"),
            MappingKey::Key("title".to_string())
        );
    }

    #[test]
    fn test_parse_descriptor_attribute() {
        let key = MappingKey::parse_attribute(
            r#"[{"data":"blocks","tpl":"text-block"},{"data":"images"}]"#,
        );
        assert_eq!(key.primary(), Some("blocks"));
        if let MappingKey::Descriptors(list) = &key {
            assert_eq!(list.len(), 2);
            assert_eq!(list[0].extra.get("tpl"), Some(&json!("text-block")));
        } else {
            panic!("Expected descriptor list");
        }
    }

    #[test]
    fn test_parse_bracketed_non_json_stays_plain() {
        assert_eq!(MappingKey::parse_attribute("[oops").primary(), Some("[oops"));
    }

    #[test]
    fn test_empty_descriptor_list_has_no_primary() {
        assert_eq!(MappingKey::Descriptors(Vec::new()).primary(), None);
    }

    #[test]
    fn test_preview_update_class() {
        let node = Node::new("input").preview_update();
        assert!(node.has_class(PREVIEW_UPDATE_CLASS));
        assert!(!node.has_class("other"));
    }
}
