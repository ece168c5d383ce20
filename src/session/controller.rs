//! Session controller and transport fallback.
//!
//! The controller owns the session record and the active channel. Nothing
//! else writes either.
//!
//! # Fallback
//!
//! | Realtime outcome | Result |
//! |------------------|--------|
//! | opens | `Ready(WebSocket)` |
//! | errors, closes or times out before opening | switch to HTTP once, `Ready(Http)` |
//! | closes after opening | stays `Ready(WebSocket)`, sends are dropped |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::form::{self, SharedDocument};
use crate::protocol::{ChangeSet, PropertyPath};
use crate::transport::{TransportChannel, TransportMethod, Transports};

use super::state::{Session, SessionInfo, SessionState};

// ============================================================================
// Initialization
// ============================================================================

/// Outcome of [`SessionController::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initialization {
    /// This call brought the session up on the given transport.
    Ready(TransportMethod),
    /// An earlier call already started initialization.
    AlreadyInitiated,
}

// ============================================================================
// SessionController
// ============================================================================

/// Owns the preview session and routes updates to the active channel.
pub struct SessionController {
    /// Session record.
    session: Mutex<Session>,
    /// Channels to choose from.
    transports: Transports,
    /// Channel that reported ready. Written once.
    active: RwLock<Option<Arc<dyn TransportChannel>>>,
    /// Form used for full-state syncs.
    document: SharedDocument,
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("session", &*self.session.lock())
            .field("transports", &self.transports)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Creates an uninitialized controller.
    #[must_use]
    pub fn new(info: SessionInfo, transports: Transports, document: SharedDocument) -> Self {
        Self {
            session: Mutex::new(Session::new(info)),
            transports,
            active: RwLock::new(None),
            document,
        }
    }

    /// Brings the session up.
    ///
    /// Resolves once a channel is ready. A realtime channel that fails
    /// before opening is replaced by HTTP; the caller never sees the failure.
    pub async fn initialize(&self) -> Initialization {
        let (info, method) = {
            let mut session = self.session.lock();
            if session.initiated {
                debug!("Preview already initiated");
                return Initialization::AlreadyInitiated;
            }

            let method = self.transports.preferred();
            session.initiated = true;
            session.transport_method = method;
            session.state = SessionState::Connecting(method);
            (session.info.clone(), method)
        };

        let method = match (method, &self.transports.realtime) {
            (TransportMethod::WebSocket, Some(realtime)) => match realtime.open(&info).await {
                Ok(()) => {
                    self.session.lock().connection_opened = true;
                    self.activate(Arc::clone(realtime));
                    TransportMethod::WebSocket
                }
                Err(e) => {
                    warn!(error = %e, "Realtime connection failed, falling back to HTTP");
                    self.fall_back(&info).await
                }
            },
            _ => self.open_http(&info).await,
        };

        self.session.lock().state = SessionState::Ready(method);
        info!(%method, "Preview ready");

        Initialization::Ready(method)
    }

    /// Sends changes over the active channel.
    ///
    /// An empty change set sends the whole form instead. Dropped before
    /// initialization and while no channel is ready.
    pub fn send_update(&self, changes: ChangeSet) {
        if !self.is_initiated() {
            trace!("Preview not initiated, update dropped");
            return;
        }

        let Some(channel) = self.active.read().clone() else {
            debug!("No channel ready, update dropped");
            return;
        };

        let changes = if changes.is_empty() {
            form::collect(&self.document.read())
        } else {
            changes
        };

        trace!(method = %channel.method(), fields = changes.len(), "Sending update");
        channel.send(changes);
    }

    /// Sends a single field change.
    ///
    /// A `null` or empty-string value carries no patch, so the whole form
    /// is sent instead.
    pub fn send_field_update(&self, path: &PropertyPath, value: Value) {
        let changes = if is_blank(&value) {
            ChangeSet::new()
        } else {
            ChangeSet::single(path, value)
        };

        self.send_update(changes);
    }

    /// Returns the lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.lock().state
    }

    /// Returns the selected transport.
    #[inline]
    #[must_use]
    pub fn transport_method(&self) -> TransportMethod {
        self.session.lock().transport_method
    }

    /// Returns `true` once `initialize` has been called.
    #[inline]
    #[must_use]
    pub fn is_initiated(&self) -> bool {
        self.session.lock().initiated
    }

    /// Returns `true` if the realtime socket ever opened.
    #[inline]
    #[must_use]
    pub fn is_connection_opened(&self) -> bool {
        self.session.lock().connection_opened
    }

    /// Returns a snapshot of the session record.
    #[must_use]
    pub fn session(&self) -> Session {
        self.session.lock().clone()
    }

    /// Returns the session identity.
    #[must_use]
    pub fn info(&self) -> SessionInfo {
        self.session.lock().info.clone()
    }
}

// ============================================================================
// Transitions
// ============================================================================

impl SessionController {
    /// `Connecting(WebSocket)` → `Connecting(Http)`.
    async fn fall_back(&self, info: &SessionInfo) -> TransportMethod {
        {
            let mut session = self.session.lock();
            session.transport_method = TransportMethod::Http;
            session.state = SessionState::Connecting(TransportMethod::Http);
        }

        self.open_http(info).await
    }

    /// Opens the HTTP channel and makes it active.
    async fn open_http(&self, info: &SessionInfo) -> TransportMethod {
        if let Err(e) = self.transports.http.open(info).await {
            warn!(error = %e, "HTTP preview start failed, continuing");
        }

        self.activate(Arc::clone(&self.transports.http));
        TransportMethod::Http
    }

    fn activate(&self, channel: Arc<dyn TransportChannel>) {
        *self.active.write() = Some(channel);
    }
}

/// Returns `true` for values that carry no change.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

// ============================================================================
// Tests
// ============================================================================
