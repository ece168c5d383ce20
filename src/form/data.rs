//! Full form state collection.
//!
//! Builds the payload for a full-state sync: every bound field keyed by its
//! mapping key, with repeatable blocks collected into arrays of objects.
//!
//! ```text
//! form
//! ├── input[title]                    → "title": "..."
//! └── div[blocks]                     → "blocks": [
//!     ├── div(instance)                     { "text": "..." },
//!     │   └── input[text]
//!     └── div(instance)                     { "text": "..." }
//!         └── input[text]                 ]
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value};
use tracing::trace;

use crate::identifiers::NodeId;
use crate::protocol::ChangeSet;

use super::dom::Document;

// ============================================================================
// Collection
// ============================================================================

/// Collects the whole form into a change set.
#[must_use]
pub fn collect(document: &Document) -> ChangeSet {
    let mut data = Map::new();
    collect_children(document, document.root(), &mut data);
    trace!(fields = data.len(), "Collected form state");
    ChangeSet::from(data)
}

/// Collects the fields under `parent` into `out`.
fn collect_children(document: &Document, parent: NodeId, out: &mut Map<String, Value>) {
    let Ok(node) = document.node(parent) else {
        return;
    };

    for &child in node.children() {
        let Ok(child_node) = document.node(child) else {
            continue;
        };
        let key = child_node
            .mapping_key()
            .and_then(|mapping| mapping.primary())
            .map(str::to_string);

        match (key, child_node.binding()) {
            (Some(key), Some(binding)) => {
                out.insert(key, binding.value.clone());
            }
            (Some(key), None) => {
                out.insert(key, collect_container(document, child));
            }
            (None, _) => collect_children(document, child, out),
        }
    }
}

/// Collects a keyed, unbound container.
///
/// Containers holding block instances become arrays; anything else is
/// collected as a nested object.
fn collect_container(document: &Document, container: NodeId) -> Value {
    let mut instances = Vec::new();
    find_instances(document, container, &mut instances);

    if instances.is_empty() {
        let mut object = Map::new();
        collect_children(document, container, &mut object);
        return Value::Object(object);
    }

    Value::Array(
        instances
            .into_iter()
            .map(|instance| {
                let mut object = Map::new();
                collect_children(document, instance, &mut object);
                Value::Object(object)
            })
            .collect(),
    )
}

/// Finds the outermost block instances below `id`.
fn find_instances(document: &Document, id: NodeId, out: &mut Vec<NodeId>) {
    let Ok(node) = document.node(id) else {
        return;
    };

    for &child in node.children() {
        match document.node(child) {
            Ok(child_node) if child_node.is_block_instance() => out.push(child),
            Ok(_) => find_instances(document, child, out),
            Err(_) => {}
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::form::dom::Node;

    #[test]
    fn test_empty_form() {
        assert!(collect(&Document::new()).is_empty());
    }

    #[test]
    fn test_flat_fields_through_wrappers() {
        let mut doc = Document::new();
        let section = doc.append(doc.root(), Node::new("section")).unwrap();
        doc.append(section, Node::new("input").mapping("title").bound(json!("Home")))
            .unwrap();
        doc.append(doc.root(), Node::new("input").mapping("url").bound(json!("/home")))
            .unwrap();

        let data = collect(&doc).into_inner();
        assert_eq!(Value::Object(data), json!({"title": "Home", "url": "/home"}));
    }

    #[test]
    fn test_blocks_become_array() {
        let mut doc = Document::new();
        doc.append(doc.root(), Node::new("input").mapping("title").bound(json!("T")))
            .unwrap();
        let blocks = doc
            .append(doc.root(), Node::new("div").mapping("blocks"))
            .unwrap();
        for text in ["first", "second"] {
            let instance = doc
                .append(blocks, Node::new("div").block_instance())
                .unwrap();
            doc.append(instance, Node::new("input").mapping("text").bound(json!(text)))
                .unwrap();
        }

        let data = collect(&doc).into_inner();
        assert_eq!(
            Value::Object(data),
            json!({
                "title": "T",
                "blocks": [{"text": "first"}, {"text": "second"}]
            })
        );
    }

    #[test]
    fn test_keyed_group_without_instances_is_object() {
        let mut doc = Document::new();
        let seo = doc
            .append(doc.root(), Node::new("fieldset").mapping("ext"))
            .unwrap();
        doc.append(seo, Node::new("input").mapping("keywords").bound(json!("cms")))
            .unwrap();

        let data = collect(&doc).into_inner();
        assert_eq!(Value::Object(data), json!({"ext": {"keywords": "cms"}}));
    }

    #[test]
    fn test_bound_widget_children_are_not_descended() {
        let mut doc = Document::new();
        let widget = doc
            .append(doc.root(), Node::new("div").mapping("tags").bound(json!(["a"])))
            .unwrap();
        doc.append(widget, Node::new("input").mapping("inner").bound(json!("x")))
            .unwrap();

        let data = collect(&doc).into_inner();
        assert_eq!(Value::Object(data), json!({"tags": ["a"]}));
    }

    #[test]
    fn test_detached_nodes_are_skipped() {
        let mut doc = Document::new();
        let gone = doc
            .append(doc.root(), Node::new("input").mapping("old").bound(json!(1)))
            .unwrap();
        doc.detach(gone).unwrap();

        assert!(collect(&doc).is_empty());
    }
}
