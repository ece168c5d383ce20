//! Application events and the bridge into the session controller.
//!
//! Publishers put [`PreviewEvent`]s on an [`EventBus`]. Once the session is
//! ready, an [`EventBridge`] task turns them into controller calls.
//!
//! # Routing
//!
//! | Event | Controller call |
//! |-------|-----------------|
//! | `focusout` / `change` / `keyup` | `send_field_update(resolve(node), value(node))` |
//! | `preview.update` | `send_field_update(resolve(element), value)` |
//! | `preview.update-property` | `send_field_update(path, value)` |
//! | `preview.update-only` | `send_update({})` (whole form) |
//!
//! DOM events only count when they happen inside a node carrying the
//! `preview-update` class. Keystroke-level updates (`keyup`, or
//! `preview.update` with `change_on_key`) are dropped on HTTP.
//!
//! Element-based events are ignored while the session has no content id.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::form::{self, PREVIEW_UPDATE_CLASS, SharedDocument};
use crate::identifiers::NodeId;
use crate::protocol::{ChangeSet, PropertyPath};
use crate::session::SessionController;
use crate::transport::TransportMethod;

// ============================================================================
// Constants
// ============================================================================

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

// ============================================================================
// DomEvent
// ============================================================================

/// Form DOM event kinds the preview listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomEventKind {
    /// Field lost focus.
    FocusOut,
    /// Key released inside a field.
    KeyUp,
    /// Field value committed.
    Change,
}

impl DomEventKind {
    /// Returns the DOM event name.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FocusOut => "focusout",
            Self::KeyUp => "keyup",
            Self::Change => "change",
        }
    }

    /// Returns `true` for per-keystroke events.
    #[inline]
    #[must_use]
    pub const fn is_keystroke(self) -> bool {
        matches!(self, Self::KeyUp)
    }
}

/// A DOM event raised on a form node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomEvent {
    /// Event kind.
    pub kind: DomEventKind,
    /// Node the event was raised on.
    pub target: NodeId,
}

// ============================================================================
// PreviewEvent
// ============================================================================

/// Events exchanged over the [`EventBus`].
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewEvent {
    /// DOM event from the form.
    Dom(DomEvent),

    /// `preview.update`: a widget reports a new value.
    Update {
        /// Node whose property changed.
        element: NodeId,
        /// New value.
        value: Value,
        /// Raised per keystroke.
        change_on_key: bool,
    },

    /// `preview.update-property`: explicit path and value.
    UpdateProperty {
        /// Changed property.
        path: PropertyPath,
        /// New value.
        value: Value,
    },

    /// `preview.update-only`: resend the whole form.
    UpdateOnly,

    /// `preview.initiated`: the session is ready.
    Initiated,
}

impl PreviewEvent {
    /// Returns the event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Dom(event) => event.kind.name(),
            Self::Update { .. } => "preview.update",
            Self::UpdateProperty { .. } => "preview.update-property",
            Self::UpdateOnly => "preview.update-only",
            Self::Initiated => "preview.initiated",
        }
    }
}

// ============================================================================
// EventBus
// ============================================================================

/// Broadcast bus for [`PreviewEvent`]s.
///
/// Cloning yields another handle to the same bus.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PreviewEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    /// Creates a bus buffering `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PreviewEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event. Returns the number of subscribers reached.
    pub fn publish(&self, event: PreviewEvent) -> usize {
        let name = event.name();
        match self.sender.send(event) {
            Ok(count) => count,
            Err(_) => {
                trace!(event = name, "No subscribers");
                0
            }
        }
    }

    /// Publishes a DOM event.
    pub fn dom(&self, kind: DomEventKind, target: NodeId) -> usize {
        self.publish(PreviewEvent::Dom(DomEvent { kind, target }))
    }

    /// Publishes `preview.update`.
    pub fn update(&self, element: NodeId, value: Value, change_on_key: bool) -> usize {
        self.publish(PreviewEvent::Update {
            element,
            value,
            change_on_key,
        })
    }

    /// Publishes `preview.update-property`.
    pub fn update_property(&self, path: impl Into<PropertyPath>, value: Value) -> usize {
        self.publish(PreviewEvent::UpdateProperty {
            path: path.into(),
            value,
        })
    }

    /// Publishes `preview.update-only`.
    pub fn update_only(&self) -> usize {
        self.publish(PreviewEvent::UpdateOnly)
    }

    /// Returns the number of live subscribers.
    #[inline]
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

// ============================================================================
// EventBridge
// ============================================================================

/// Translates bus events into controller calls.
pub struct EventBridge {
    controller: Arc<SessionController>,
    document: SharedDocument,
}

impl fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBridge")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl EventBridge {
    /// Creates a bridge for `controller` over `document`.
    #[must_use]
    pub fn new(controller: Arc<SessionController>, document: SharedDocument) -> Self {
        Self {
            controller,
            document,
        }
    }

    /// Runs the bridge on its own task until the bus closes.
    pub fn spawn(self, events: broadcast::Receiver<PreviewEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(events))
    }

    async fn run(self, mut events: broadcast::Receiver<PreviewEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.handle(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event bridge lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        debug!("Event bridge terminated");
    }

    /// Handles one event.
    pub fn handle(&self, event: PreviewEvent) {
        match event {
            PreviewEvent::Dom(event) => self.on_dom(event),

            PreviewEvent::Update {
                element,
                value,
                change_on_key,
            } => self.on_update(element, value, change_on_key),

            PreviewEvent::UpdateProperty { path, value } => {
                self.controller.send_field_update(&path, value);
            }

            PreviewEvent::UpdateOnly => self.controller.send_update(ChangeSet::new()),

            PreviewEvent::Initiated => {}
        }
    }

    fn on_dom(&self, event: DomEvent) {
        if !self.accepts(event.kind.is_keystroke(), event.kind.name()) {
            return;
        }

        let resolved = {
            let document = self.document.read();
            Self::delegate(&document, event.target).map(|node| -> Result<(PropertyPath, Value)> {
                let path = form::resolve(&document, node)?;
                let element = form::bound_element(&document, node)?;
                Ok((path, document.value(element)?.clone()))
            })
        };

        match resolved {
            None => trace!(node = %event.target, "Outside preview-update nodes"),
            Some(Ok((path, value))) => self.controller.send_field_update(&path, value),
            Some(Err(e)) if e.is_path_error() => {
                debug!(node = %event.target, error = %e, "Event dropped");
            }
            Some(Err(e)) => warn!(node = %event.target, error = %e, "Event dropped"),
        }
    }

    fn on_update(&self, element: NodeId, value: Value, change_on_key: bool) {
        if !self.accepts(change_on_key, "preview.update") {
            return;
        }

        let path: Result<PropertyPath> = form::resolve(&self.document.read(), element);
        match path {
            Ok(path) => self.controller.send_field_update(&path, value),
            Err(e) if e.is_path_error() => debug!(%element, error = %e, "Event dropped"),
            Err(e) => warn!(%element, error = %e, "Event dropped"),
        }
    }

    /// Applies the content-id and keystroke rules.
    fn accepts(&self, keystroke: bool, event: &'static str) -> bool {
        if !self.controller.info().has_content() {
            trace!(event, "No content id, event ignored");
            return false;
        }

        if keystroke && self.controller.transport_method() == TransportMethod::Http {
            trace!(event, "Keystroke update suppressed on HTTP");
            return false;
        }

        true
    }

    /// Returns the nearest `preview-update` node at or above `target`.
    fn delegate(document: &form::Document, target: NodeId) -> Option<NodeId> {
        document.ancestors_inclusive(target).find(|id| {
            document
                .node(*id)
                .is_ok_and(|node| node.has_class(PREVIEW_UPDATE_CLASS))
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
