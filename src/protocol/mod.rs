//! Preview wire protocol.
//!
//! This module defines what goes over either transport.
//!
//! # Protocol Overview
//!
//! | Type | Transport | Direction | Purpose |
//! |------|-----------|-----------|---------|
//! | [`UpdateMessage`] `start` | WebSocket | Client → Server | Open the preview run |
//! | [`UpdateMessage`] `update` | WebSocket | Client → Server | Push field changes |
//! | [`InboundMessage`] | WebSocket | Server → Client | Diagnostics only |
//! | [`ChangeSet`] | HTTP | Client → Server | `POST .../update` body `{"changes": ...}` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `changes` | [`ChangeSet`] and [`PropertyPath`] |
//! | `message` | Socket message types |

// ============================================================================
// Submodules
// ============================================================================

/// Change payloads and property addressing.
pub mod changes;

/// Socket message types.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use changes::{ChangeSet, PropertyPath};
pub use message::{InboundMessage, MessageCommand, MessageKind, MessageParams, UpdateMessage};
