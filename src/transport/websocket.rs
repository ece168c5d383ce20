//! Realtime channel.
//!
//! # Lifecycle
//!
//! 1. `open` asks the connector for a socket and waits for `Open`
//! 2. On `Open`: write the `start` message, report ready
//! 3. `Error`, `Close` or the connect timeout before `Open`: report a
//!    connection error so the controller can fall back
//! 4. After `Open`: a background task logs inbound frames and the eventual
//!    close; nothing reconnects
//!
//! Sends go out only while the socket's ready-state is `Open`.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::config::PreviewConfig;
use crate::error::{Error, Result};
use crate::protocol::{ChangeSet, InboundMessage, UpdateMessage};
use crate::session::SessionInfo;

use super::socket::{ReadyState, SharedReadyState, SocketConnector, SocketEvent};
use super::{TransportChannel, TransportMethod};

// ============================================================================
// Types
// ============================================================================

/// Socket state kept after a successful open.
struct OpenSocket {
    /// Frame queue.
    outbound: mpsc::UnboundedSender<String>,
    /// Shared ready-state.
    ready_state: SharedReadyState,
    /// Identity stamped on every message.
    session: SessionInfo,
}

// ============================================================================
// WebSocketChannel
// ============================================================================

/// Realtime channel over a host socket implementation.
pub struct WebSocketChannel {
    /// Socket implementation.
    connector: Arc<dyn SocketConnector>,
    /// `{ws_url}:{ws_port}`.
    endpoint: Url,
    /// Time allowed to reach `Open`.
    connect_timeout: Duration,
    /// Set once the socket opened.
    socket: Mutex<Option<OpenSocket>>,
}

impl WebSocketChannel {
    /// Creates a channel for the configured endpoint.
    #[must_use]
    pub fn new(connector: Arc<dyn SocketConnector>, config: &PreviewConfig) -> Self {
        Self {
            connector,
            endpoint: config.ws_endpoint().clone(),
            connect_timeout: config.connect_timeout(),
            socket: Mutex::new(None),
        }
    }

    /// Returns the socket ready-state, or `None` before the socket opened.
    #[must_use]
    pub fn ready_state(&self) -> Option<ReadyState> {
        self.socket
            .lock()
            .as_ref()
            .map(|socket| socket.ready_state.get())
    }

    /// Waits for the first lifecycle event that settles the connection.
    async fn wait_open(events: &mut mpsc::UnboundedReceiver<SocketEvent>) -> Result<()> {
        loop {
            match events.recv().await {
                Some(SocketEvent::Open) => return Ok(()),
                Some(SocketEvent::Error(message)) => return Err(Error::connection(message)),
                Some(SocketEvent::Close) | None => return Err(Error::ConnectionClosed),
                Some(SocketEvent::Message(_)) => {
                    trace!("Frame before open ignored");
                }
            }
        }
    }

    /// Logs socket activity after the open.
    async fn run_inbound(mut events: mpsc::UnboundedReceiver<SocketEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                SocketEvent::Message(text) => match InboundMessage::parse(&text) {
                    Ok(message) => {
                        debug!(command = ?message.command(), payload = %message.payload, "Message");
                    }
                    Err(e) => {
                        warn!(error = %e, frame = %text, "Malformed inbound frame");
                    }
                },

                SocketEvent::Error(message) => {
                    warn!(error = %message, "Socket error after open");
                }

                SocketEvent::Close => {
                    info!("Preview socket closed, later updates will be dropped");
                    break;
                }

                SocketEvent::Open => {}
            }
        }

        debug!("Inbound loop terminated");
    }
}

#[async_trait]
impl TransportChannel for WebSocketChannel {
    fn method(&self) -> TransportMethod {
        TransportMethod::WebSocket
    }

    async fn open(&self, session: &SessionInfo) -> Result<()> {
        info!(url = %self.endpoint, "Connect to url");

        let mut handle = self.connector.connect(&self.endpoint);

        timeout(self.connect_timeout, Self::wait_open(&mut handle.events))
            .await
            .map_err(|_| Error::connection_timeout(self.connect_timeout.as_millis() as u64))??;

        info!("Connection established");

        let start = UpdateMessage::start(session).to_frame()?;
        handle
            .outbound
            .send(start)
            .map_err(|_| Error::ConnectionClosed)?;

        *self.socket.lock() = Some(OpenSocket {
            outbound: handle.outbound,
            ready_state: handle.ready_state,
            session: session.clone(),
        });

        tokio::spawn(Self::run_inbound(handle.events));

        Ok(())
    }

    fn send(&self, changes: ChangeSet) {
        let guard = self.socket.lock();
        let Some(socket) = guard.as_ref() else {
            debug!("Socket never opened, update dropped");
            return;
        };

        let state = socket.ready_state.get();
        if state != ReadyState::Open {
            debug!(?state, "Socket not open, update dropped");
            return;
        }

        let frame = match UpdateMessage::update(&socket.session, changes).to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Failed to encode update");
                return;
            }
        };

        if socket.outbound.send(frame).is_err() {
            debug!("Socket task gone, update dropped");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
