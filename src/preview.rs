//! Preview facade.
//!
//! Wires the pieces together in the order the editing UI expects:
//!
//! 1. [`PreviewBuilder::build`] probes the host and prepares both channels
//! 2. [`Preview::start`] initializes the session
//! 3. Once ready, the event bridge starts listening
//! 4. `preview.initiated` is published, once
//!
//! # Example
//!
//! ```no_run
//! use preview_sync::{Preview, PreviewConfig, SessionInfo, form::Document};
//!
//! # async fn example() -> preview_sync::Result<()> {
//! let config = PreviewConfig::builder()
//!     .ws_url("ws://localhost")
//!     .ws_port(9876)
//!     .http_base("http://localhost:8000")
//!     .build()?;
//!
//! let preview = Preview::builder()
//!     .config(config)
//!     .session(SessionInfo::new("123-abc", "sulu_io", "en", "1"))
//!     .document(Document::new().into_shared())
//!     .build()?;
//!
//! preview.start().await;
//! preview.events().update_property("title", "Hello".into());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::bridge::{DEFAULT_EVENT_CAPACITY, EventBridge, EventBus, PreviewEvent};
use crate::config::PreviewConfig;
use crate::error::{Error, Result};
use crate::form::{Document, SharedDocument};
use crate::session::{Initialization, SessionController, SessionInfo};
use crate::transport::{Host, Transports};

// ============================================================================
// Preview
// ============================================================================

/// A live preview for one form.
#[derive(Debug)]
pub struct Preview {
    /// Session controller.
    controller: Arc<SessionController>,
    /// Event bus shared with publishers.
    events: EventBus,
    /// Form being edited.
    document: SharedDocument,
    /// Bridge task, set once ready.
    bridge: Mutex<Option<JoinHandle<()>>>,
}

impl Preview {
    /// Creates a preview builder.
    #[inline]
    #[must_use]
    pub fn builder() -> PreviewBuilder {
        PreviewBuilder::new()
    }

    /// Starts the preview.
    ///
    /// Resolves once a channel is ready. Later calls return
    /// [`Initialization::AlreadyInitiated`] and publish nothing.
    pub async fn start(&self) -> Initialization {
        let outcome = self.controller.initialize().await;

        if let Initialization::Ready(method) = outcome {
            let bridge = EventBridge::new(Arc::clone(&self.controller), Arc::clone(&self.document));
            *self.bridge.lock() = Some(bridge.spawn(self.events.subscribe()));

            debug!(%method, "Event bridge started");
            self.events.publish(PreviewEvent::Initiated);
        }

        outcome
    }

    /// Returns the event bus.
    #[inline]
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Returns the session controller.
    #[inline]
    #[must_use]
    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    /// Returns the form document.
    #[inline]
    #[must_use]
    pub fn document(&self) -> &SharedDocument {
        &self.document
    }
}

impl Drop for Preview {
    fn drop(&mut self) {
        if let Some(bridge) = self.bridge.lock().take() {
            bridge.abort();
        }
    }
}

// ============================================================================
// PreviewBuilder
// ============================================================================

/// Builder for [`Preview`].
#[derive(Debug, Default)]
pub struct PreviewBuilder {
    config: Option<PreviewConfig>,
    host: Option<Host>,
    session: Option<SessionInfo>,
    document: Option<SharedDocument>,
    transports: Option<Transports>,
    capacity: Option<usize>,
}

impl PreviewBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the endpoints and timeouts.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: PreviewConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the host environment probed for socket support.
    ///
    /// Defaults to [`Host::native`].
    #[inline]
    #[must_use]
    pub fn host(mut self, host: Host) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets the session identity.
    #[inline]
    #[must_use]
    pub fn session(mut self, session: SessionInfo) -> Self {
        self.session = Some(session);
        self
    }

    /// Sets the form document. Defaults to an empty form.
    #[inline]
    #[must_use]
    pub fn document(mut self, document: SharedDocument) -> Self {
        self.document = Some(document);
        self
    }

    /// Uses prepared channels instead of probing the host.
    #[inline]
    #[must_use]
    pub fn transports(mut self, transports: Transports) -> Self {
        self.transports = Some(transports);
        self
    }

    /// Sets the event bus capacity.
    #[inline]
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Builds the preview.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the session or the configuration is missing
    /// - [`Error::Http`] if the HTTP client can't be built
    pub fn build(self) -> Result<Preview> {
        let session = self.session.ok_or_else(|| {
            Error::config(
                "Session is required. Use .session() to set it.\n\
                 Example: Preview::builder().session(SessionInfo::new(id, webspace, language, user))",
            )
        })?;

        let transports = match self.transports {
            Some(transports) => transports,
            None => {
                let config = self.config.ok_or_else(|| {
                    Error::config("Configuration is required. Use .config() to set it.")
                })?;
                let mut host = self.host.unwrap_or_else(Host::native);
                Transports::negotiate(&mut host, &config)?
            }
        };

        let document = self
            .document
            .unwrap_or_else(|| Document::new().into_shared());

        debug!(?transports, content = %session.content_id, "Preview built");

        Ok(Preview {
            controller: Arc::new(SessionController::new(
                session,
                transports,
                Arc::clone(&document),
            )),
            events: EventBus::new(self.capacity.unwrap_or(DEFAULT_EVENT_CAPACITY)),
            document,
            bridge: Mutex::new(None),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
