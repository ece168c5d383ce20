//! Transport capability probe.
//!
//! A [`Host`] lists the socket implementations the environment provides,
//! by name. Realtime preview needs one registered under [`WEBSOCKET`] or
//! the vendor-prefixed [`MOZ_WEBSOCKET`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use super::socket::{SocketConnector, TungsteniteConnector};

// ============================================================================
// Constants
// ============================================================================

/// Standard implementation name.
pub const WEBSOCKET: &str = "WebSocket";

/// Vendor-prefixed implementation name.
pub const MOZ_WEBSOCKET: &str = "MozWebSocket";

// ============================================================================
// Host
// ============================================================================

/// Socket implementations available in the current environment.
#[derive(Clone, Default)]
pub struct Host {
    implementations: FxHashMap<String, Arc<dyn SocketConnector>>,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.implementations.keys().collect();
        names.sort();
        f.debug_struct("Host")
            .field("implementations", &names)
            .finish()
    }
}

impl Host {
    /// Creates a host without any socket implementation.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a host with the native `tokio-tungstenite` implementation.
    #[must_use]
    pub fn native() -> Self {
        Self::empty().with_implementation(WEBSOCKET, TungsteniteConnector)
    }

    /// Registers an implementation under `name`.
    #[must_use]
    pub fn with_implementation(
        mut self,
        name: impl Into<String>,
        connector: impl SocketConnector + 'static,
    ) -> Self {
        self.register(name, Arc::new(connector));
        self
    }

    /// Registers a shared implementation under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, connector: Arc<dyn SocketConnector>) {
        self.implementations.insert(name.into(), connector);
    }

    /// Returns the implementation registered under `name`.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn SocketConnector>> {
        self.implementations.get(name).cloned()
    }

    /// Returns `true` if an implementation is registered under `name`.
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.implementations.contains_key(name)
    }

    /// Returns the implementation under the standard name.
    #[inline]
    #[must_use]
    pub fn websocket(&self) -> Option<Arc<dyn SocketConnector>> {
        self.get(WEBSOCKET)
    }
}

// ============================================================================
// Probe
// ============================================================================

/// Returns `true` if the host can open realtime connections.
///
/// A vendor-prefixed implementation is re-registered under [`WEBSOCKET`]
/// so callers only ever look up the standard name.
pub fn supports_realtime(host: &mut Host) -> bool {
    if let Some(prefixed) = host.get(MOZ_WEBSOCKET) {
        debug!("Using vendor-prefixed WebSocket implementation");
        host.register(WEBSOCKET, prefixed);
        return true;
    }

    if host.contains(WEBSOCKET) {
        return true;
    }

    info!("Host doesn't support WebSockets");
    false
}

// ============================================================================
// Tests
// ============================================================================
