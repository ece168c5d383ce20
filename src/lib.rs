//! Preview Sync - live preview channel for content editing forms.
//!
//! Pushes form edits to a preview server while the user types, over a
//! WebSocket when the host has one and over plain HTTP otherwise.
//!
//! # Architecture
//!
//! - **Transport**: [`WebSocketChannel`] or [`HttpChannel`] behind one
//!   [`TransportChannel`] trait, chosen once per session
//! - **Session**: [`SessionController`] owns the session state, opens the
//!   channel and falls back to HTTP if the socket never opens
//! - **Form**: an arena [`Document`] standing in for the rendered form;
//!   field paths are resolved from it
//! - **Bridge**: [`EventBridge`] turns application and DOM events into
//!   controller calls
//!
//! Failures never reach the editing UI: they switch transport or drop the
//! update.
//!
//! # Quick Start
//!
//! ```no_run
//! use preview_sync::{Preview, PreviewConfig, Result, SessionInfo};
//! use preview_sync::form::{Document, Node};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut form = Document::new();
//!     let title = form.append(
//!         form.root(),
//!         Node::new("input").mapping("title").bound(json!("")).preview_update(),
//!     )?;
//!
//!     let preview = Preview::builder()
//!         .config(
//!             PreviewConfig::builder()
//!                 .ws_url("ws://localhost")
//!                 .ws_port(9876)
//!                 .http_base("http://localhost:8000")
//!                 .build()?,
//!         )
//!         .session(SessionInfo::new("123-abc", "sulu_io", "en", "1"))
//!         .document(form.into_shared())
//!         .build()?;
//!
//!     preview.start().await;
//!
//!     preview.document().write().set_value(title, json!("Hello"))?;
//!     preview.events().dom(preview_sync::DomEventKind::FocusOut, title);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | Event bus and [`EventBridge`] |
//! | [`config`] | [`PreviewConfig`] and its builder |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`form`] | Form document, path resolution, full-state collection |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`preview`] | [`Preview`] facade |
//! | [`protocol`] | Wire messages and change sets |
//! | [`session`] | Session state and controller |
//! | [`transport`] | Capability probe and transport channels |

// ============================================================================
// Modules
// ============================================================================

/// Application events and the event bridge.
pub mod bridge;

/// Endpoint and timeout configuration.
///
/// Use [`PreviewConfig::builder()`] to create a validated configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Form document model.
pub mod form;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Preview facade.
pub mod preview;

/// Wire messages and change sets.
pub mod protocol;

/// Preview session.
pub mod session;

/// Transport layer.
///
/// Capability probe, socket abstraction and the two transport channels.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{DomEvent, DomEventKind, EventBridge, EventBus, PreviewEvent};

// Configuration
pub use config::{PreviewConfig, PreviewConfigBuilder};

// Error types
pub use error::{Error, Result};

// Form types
pub use form::{Document, Node, SharedDocument};

// Identifier types
pub use identifiers::{ContentId, LanguageCode, NodeId, UserId, WebspaceKey};

// Preview types
pub use preview::{Preview, PreviewBuilder};

// Protocol types
pub use protocol::{ChangeSet, PropertyPath};

// Session types
pub use session::{Initialization, SessionController, SessionInfo, SessionState};

// Transport types
pub use transport::{
    Host, HttpChannel, TransportChannel, TransportMethod, Transports, WebSocketChannel,
};
