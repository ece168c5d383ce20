//! Preview transport layer.
//!
//! Updates travel over one of two channels behind [`TransportChannel`]:
//!
//! ```text
//! ┌──────────────────┐   ws://host:port (JSON frames)    ┌──────────────────┐
//! │                  │ ────────────────────────────────► │                  │
//! │ SessionController│                                   │  Preview server  │
//! │                  │   GET .../start, POST .../update  │                  │
//! │                  │ ────────────────────────────────► │                  │
//! └──────────────────┘        (fallback)                 └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `probe` | [`Host`] and the realtime capability probe |
//! | `socket` | Socket abstraction and native connector |
//! | `websocket` | [`WebSocketChannel`] |
//! | `http` | [`HttpChannel`] |

// ============================================================================
// Submodules
// ============================================================================

/// HTTP fallback channel.
pub mod http;

/// Transport capability probe.
pub mod probe;

/// Socket abstraction and native connector.
pub mod socket;

/// Realtime channel.
pub mod websocket;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::PreviewConfig;
use crate::error::Result;
use crate::protocol::ChangeSet;
use crate::session::SessionInfo;

// ============================================================================
// Re-exports
// ============================================================================

pub use http::HttpChannel;
pub use probe::{Host, MOZ_WEBSOCKET, WEBSOCKET, supports_realtime};
pub use socket::{
    BridgedConnector, ReadyState, SocketBackend, SocketConnector, SocketEvent, SocketEventSink,
    SocketHandle, TungsteniteConnector,
};
pub use websocket::WebSocketChannel;

// ============================================================================
// TransportMethod
// ============================================================================

/// Transport carrying preview updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportMethod {
    /// Realtime socket.
    WebSocket,
    /// Request/response fallback.
    Http,
}

impl fmt::Display for TransportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WebSocket => f.write_str("websocket"),
            Self::Http => f.write_str("http"),
        }
    }
}

// ============================================================================
// TransportChannel
// ============================================================================

/// A way of getting change sets to the preview server.
#[async_trait]
pub trait TransportChannel: Send + Sync {
    /// Which transport this is.
    fn method(&self) -> TransportMethod;

    /// Starts the preview run. Resolves once the channel is ready.
    ///
    /// # Errors
    ///
    /// A connection error means the channel will never become ready.
    async fn open(&self, session: &SessionInfo) -> Result<()>;

    /// Sends changes without waiting for the outcome.
    ///
    /// Never fails: undeliverable changes are dropped.
    fn send(&self, changes: ChangeSet);
}

// ============================================================================
// Transports
// ============================================================================

/// Channels available to a session.
///
/// `realtime` is only present when the host passed the capability probe.
#[derive(Clone)]
pub struct Transports {
    /// Preferred channel.
    pub realtime: Option<Arc<dyn TransportChannel>>,
    /// Fallback channel.
    pub http: Arc<dyn TransportChannel>,
}

impl fmt::Debug for Transports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transports")
            .field("realtime", &self.realtime.as_ref().map(|c| c.method()))
            .field("http", &self.http.method())
            .finish()
    }
}

impl Transports {
    /// Probes the host and builds the channels it supports.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`](crate::Error::Http) if the HTTP client can't be built.
    pub fn negotiate(host: &mut Host, config: &PreviewConfig) -> Result<Self> {
        let realtime = if supports_realtime(host) {
            host.websocket().map(|connector| {
                Arc::new(WebSocketChannel::new(connector, config)) as Arc<dyn TransportChannel>
            })
        } else {
            None
        };

        debug!(realtime = realtime.is_some(), "Transports negotiated");

        Ok(Self {
            realtime,
            http: Arc::new(HttpChannel::new(config)?),
        })
    }

    /// Returns the method `initialize` starts with.
    #[inline]
    #[must_use]
    pub fn preferred(&self) -> TransportMethod {
        if self.realtime.is_some() {
            TransportMethod::WebSocket
        } else {
            TransportMethod::Http
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PreviewConfig {
        PreviewConfig::builder()
            .ws_url("ws://localhost")
            .ws_port(9876)
            .http_base("http://localhost:8000")
            .build()
            .unwrap()
    }

    #[test]
    fn test_method_display() {
        assert_eq!(TransportMethod::WebSocket.to_string(), "websocket");
        assert_eq!(TransportMethod::Http.to_string(), "http");
    }

    #[test]
    fn test_negotiate_without_websocket() {
        let transports = Transports::negotiate(&mut Host::empty(), &config()).unwrap();
        assert!(transports.realtime.is_none());
        assert_eq!(transports.preferred(), TransportMethod::Http);
        assert_eq!(transports.http.method(), TransportMethod::Http);
    }

    #[test]
    fn test_negotiate_with_websocket() {
        let transports = Transports::negotiate(&mut Host::native(), &config()).unwrap();
        assert_eq!(transports.preferred(), TransportMethod::WebSocket);
        assert_eq!(
            transports.realtime.as_ref().map(|c| c.method()),
            Some(TransportMethod::WebSocket)
        );
    }
}
