//! Error types for preview synchronization.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Configuration is the only place errors reach a caller. Everything
//! past [`Preview::start`](crate::Preview::start) degrades instead:
//! connection errors switch transport, path errors drop the update.
//!
//! ```ignore
//! use preview_sync::{PreviewConfig, Result};
//!
//! fn config() -> Result<PreviewConfig> {
//!     PreviewConfig::builder()
//!         .ws_url("ws://localhost")
//!         .ws_port(9876)
//!         .http_base("http://localhost:8000")
//!         .build()
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Form | [`Error::UnboundField`], [`Error::InvalidMapping`], [`Error::NodeNotFound`] |
//! | External | [`Error::Json`], [`Error::WebSocket`], [`Error::Http`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::NodeId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned by [`PreviewConfigBuilder::build`](crate::config::PreviewConfigBuilder::build)
    /// and [`PreviewBuilder::build`](crate::preview::PreviewBuilder::build).
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Realtime connection failed before it was opened.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Realtime connection did not open in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Socket closed before reaching the open state.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Form Errors
    // ========================================================================
    /// No ancestor of the event target carries bound element metadata.
    #[error("No bound element above node {node}")]
    UnboundField {
        /// Node the search started from.
        node: NodeId,
    },

    /// Mapping key attribute is missing or unusable.
    #[error("Invalid mapping key on node {node}: {message}")]
    InvalidMapping {
        /// Node carrying the attribute.
        node: NodeId,
        /// What is wrong with it.
        message: String,
    },

    /// Node id does not exist in the document.
    #[error("Node not found: {node}")]
    NodeNotFound {
        /// The missing node.
        node: NodeId,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates an unbound field error.
    #[inline]
    pub fn unbound_field(node: NodeId) -> Self {
        Self::UnboundField { node }
    }

    /// Creates an invalid mapping error.
    #[inline]
    pub fn invalid_mapping(node: NodeId, message: impl Into<String>) -> Self {
        Self::InvalidMapping {
            node,
            message: message.into(),
        }
    }

    /// Creates a node not found error.
    #[inline]
    pub fn node_not_found(node: NodeId) -> Self {
        Self::NodeNotFound { node }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error should trigger transport fallback.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error comes from field path resolution.
    #[inline]
    #[must_use]
    pub fn is_path_error(&self) -> bool {
        matches!(
            self,
            Self::UnboundField { .. } | Self::InvalidMapping { .. } | Self::NodeNotFound { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing ws_port");
        assert_eq!(err.to_string(), "Configuration error: missing ws_port");
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("x").is_connection_error());
        assert!(Error::connection_timeout(10).is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::config("x").is_connection_error());
    }

    #[test]
    fn test_is_path_error() {
        let node = NodeId::new(3);
        assert!(Error::unbound_field(node).is_path_error());
        assert!(Error::invalid_mapping(node, "empty").is_path_error());
        assert!(!Error::ConnectionClosed.is_path_error());
    }

    #[test]
    fn test_invalid_mapping_display() {
        let err = Error::invalid_mapping(NodeId::new(7), "empty descriptor list");
        assert_eq!(
            err.to_string(),
            "Invalid mapping key on node 7: empty descriptor list"
        );
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
