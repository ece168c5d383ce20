//! Socket abstraction and the native connector.
//!
//! A [`SocketConnector`] opens a socket the way a browser constructs a
//! `WebSocket`: the call returns immediately with a [`SocketHandle`], and
//! the lifecycle arrives later as [`SocketEvent`]s.
//!
//! ```text
//! ┌──────────────────┐   outbound frames   ┌──────────────────┐
//! │  SocketHandle    │ ──────────────────► │  SocketBackend   │
//! │  (channel side)  │ ◄────────────────── │  (I/O side)      │
//! └──────────────────┘   SocketEvent       └──────────────────┘
//!           └────────── shared ReadyState ──────────┘
//! ```
//!
//! [`TungsteniteConnector`] drives the backend with `tokio-tungstenite`.
//! [`BridgedConnector`] hands backends to the embedding application, for
//! hosts whose socket implementation lives elsewhere (and for tests).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};
use url::Url;

// ============================================================================
// SocketEvent
// ============================================================================

/// Lifecycle notification from a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Connection established.
    Open,
    /// Text frame received.
    Message(String),
    /// Transport error.
    Error(String),
    /// Connection closed.
    Close,
}

// ============================================================================
// ReadyState
// ============================================================================

/// Socket ready-state, mirroring the browser `WebSocket.readyState` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadyState {
    /// Not yet open.
    Connecting = 0,
    /// Open; frames may be sent.
    Open = 1,
    /// Close in progress.
    Closing = 2,
    /// Closed or never opened.
    Closed = 3,
}

impl ReadyState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Ready-state shared by both ends of a socket.
#[derive(Debug, Clone)]
pub struct SharedReadyState(Arc<AtomicU8>);

impl SharedReadyState {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(ReadyState::Connecting as u8)))
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn get(&self) -> ReadyState {
        ReadyState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: ReadyState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

// ============================================================================
// SocketHandle
// ============================================================================

/// Channel side of a socket.
pub struct SocketHandle {
    /// Frames to send.
    pub outbound: mpsc::UnboundedSender<String>,
    /// Lifecycle events.
    pub events: mpsc::UnboundedReceiver<SocketEvent>,
    /// Shared ready-state.
    pub ready_state: SharedReadyState,
}

impl SocketHandle {
    /// Creates a connected handle/backend pair in the `Connecting` state.
    #[must_use]
    pub fn pair() -> (SocketHandle, SocketBackend) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let ready_state = SharedReadyState::new();

        let handle = SocketHandle {
            outbound: outbound_tx,
            events: event_rx,
            ready_state: ready_state.clone(),
        };
        let backend = SocketBackend {
            events: SocketEventSink {
                tx: event_tx,
                ready_state,
            },
            outbound: outbound_rx,
        };

        (handle, backend)
    }
}

impl fmt::Debug for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketHandle")
            .field("ready_state", &self.ready_state.get())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SocketBackend
// ============================================================================

/// I/O side of a socket.
pub struct SocketBackend {
    /// Reports lifecycle events to the handle.
    pub events: SocketEventSink,
    /// Frames queued by the handle. Yields `None` once the handle is dropped.
    pub outbound: mpsc::UnboundedReceiver<String>,
}

/// Reports socket lifecycle events and keeps the ready-state in step.
#[derive(Debug, Clone)]
pub struct SocketEventSink {
    tx: mpsc::UnboundedSender<SocketEvent>,
    ready_state: SharedReadyState,
}

impl SocketEventSink {
    /// Marks the socket open.
    pub fn open(&self) {
        self.ready_state.set(ReadyState::Open);
        self.emit(SocketEvent::Open);
    }

    /// Delivers a text frame.
    pub fn message(&self, text: impl Into<String>) {
        self.emit(SocketEvent::Message(text.into()));
    }

    /// Reports a transport error.
    pub fn error(&self, message: impl Into<String>) {
        self.emit(SocketEvent::Error(message.into()));
    }

    /// Marks the socket closed.
    pub fn close(&self) {
        self.ready_state.set(ReadyState::Closed);
        self.emit(SocketEvent::Close);
    }

    /// Returns the current ready-state.
    #[inline]
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.ready_state.get()
    }

    fn emit(&self, event: SocketEvent) {
        if self.tx.send(event).is_err() {
            trace!("Socket handle dropped, event discarded");
        }
    }
}

// ============================================================================
// SocketConnector
// ============================================================================

/// Opens sockets.
///
/// `connect` must not block: connection progress is reported through the
/// returned handle's events.
pub trait SocketConnector: Send + Sync {
    /// Starts connecting to `url`.
    fn connect(&self, url: &Url) -> SocketHandle;
}

// ============================================================================
// TungsteniteConnector
// ============================================================================

/// Native connector backed by `tokio-tungstenite`.
///
/// Each socket runs on its own tokio task. Must be used inside a runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

impl SocketConnector for TungsteniteConnector {
    fn connect(&self, url: &Url) -> SocketHandle {
        let (handle, backend) = SocketHandle::pair();
        tokio::spawn(Self::run_socket(url.clone(), backend));
        handle
    }
}

impl TungsteniteConnector {
    /// Socket task: connect, then pump frames both ways until either side ends.
    async fn run_socket(url: Url, mut backend: SocketBackend) {
        let ws_stream = match connect_async(url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                debug!(%url, error = %e, "WebSocket connect failed");
                backend.events.error(e.to_string());
                backend.events.close();
                return;
            }
        };

        backend.events.open();
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            backend.events.message(text.as_str());
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            backend.events.error(e.to_string());
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                frame = backend.outbound.recv() => {
                    match frame {
                        Some(text) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                warn!(error = %e, "Failed to send frame");
                                backend.events.error(e.to_string());
                                break;
                            }
                        }

                        None => {
                            debug!("Socket handle dropped, closing");
                            let _ = ws_write.close().await;
                            break;
                        }
                    }
                }
            }
        }

        backend.events.close();
        debug!("Socket task terminated");
    }
}

// ============================================================================
// BridgedConnector
// ============================================================================

/// Connector whose sockets are driven by the embedding application.
///
/// Every `connect` call forwards the endpoint and the [`SocketBackend`]
/// through the receiver returned by [`BridgedConnector::channel`]. The
/// application reports lifecycle through [`SocketBackend::events`].
#[derive(Debug, Clone)]
pub struct BridgedConnector {
    backends: mpsc::UnboundedSender<(Url, SocketBackend)>,
}

impl BridgedConnector {
    /// Creates a connector and the receiver its backends arrive on.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<(Url, SocketBackend)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { backends: tx }, rx)
    }
}

impl SocketConnector for BridgedConnector {
    fn connect(&self, url: &Url) -> SocketHandle {
        let (handle, backend) = SocketHandle::pair();

        if let Err(mpsc::error::SendError((url, backend))) =
            self.backends.send((url.clone(), backend))
        {
            warn!(%url, "No socket bridge listening, connection refused");
            backend.events.error("socket bridge unavailable");
            backend.events.close();
        }

        handle
    }
}

// ============================================================================
// Tests
// ============================================================================
