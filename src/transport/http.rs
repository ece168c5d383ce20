//! HTTP fallback channel.
//!
//! # Endpoints
//!
//! | Step | Request |
//! |------|---------|
//! | open | `GET {base}/admin/content/preview/{id}/start?webspace={ws}&language={lang}` |
//! | send | `POST {base}/admin/content/preview/{id}/update?webspace={ws}&language={lang}` |
//!
//! The `send` body is `{"changes": {...}}`. Any completed start request
//! counts as ready, whatever its status.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::PreviewConfig;
use crate::error::{Error, Result};
use crate::protocol::ChangeSet;
use crate::session::SessionInfo;

use super::{TransportChannel, TransportMethod};

// ============================================================================
// Types
// ============================================================================

/// Body of an update request.
#[derive(Debug, Serialize)]
struct UpdateBody {
    changes: ChangeSet,
}

/// Preview route action.
#[derive(Debug, Clone, Copy)]
enum Action {
    Start,
    Update,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Update => "update",
        }
    }
}

// ============================================================================
// HttpChannel
// ============================================================================

/// Request/response channel used when no socket is available.
#[derive(Debug)]
pub struct HttpChannel {
    /// Shared client.
    client: reqwest::Client,
    /// Base URL of the preview routes.
    base: Url,
    /// Identity of the opened session.
    session: Mutex<Option<SessionInfo>>,
}

impl HttpChannel {
    /// Creates a channel for the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the client can't be built.
    pub fn new(config: &PreviewConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;

        Ok(Self::with_client(client, config.http_base().clone()))
    }

    /// Creates a channel with an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base: Url) -> Self {
        Self {
            client,
            base,
            session: Mutex::new(None),
        }
    }

    /// Builds the route for `action`.
    fn endpoint(&self, session: &SessionInfo, action: Action) -> Result<Url> {
        let mut url = self.base.clone();

        url.path_segments_mut()
            .map_err(|()| Error::config(format!("HTTP base URL cannot be a base: {}", self.base)))?
            .pop_if_empty()
            .extend([
                "admin",
                "content",
                "preview",
                session.content_id.as_str(),
                action.as_str(),
            ]);

        url.query_pairs_mut()
            .clear()
            .append_pair("webspace", session.webspace_key.as_str())
            .append_pair("language", session.language_code.as_str());

        Ok(url)
    }
}

#[async_trait]
impl TransportChannel for HttpChannel {
    fn method(&self) -> TransportMethod {
        TransportMethod::Http
    }

    async fn open(&self, session: &SessionInfo) -> Result<()> {
        let url = self.endpoint(session, Action::Start)?;
        *self.session.lock() = Some(session.clone());

        match self.client.get(url.clone()).send().await {
            Ok(response) => {
                debug!(%url, status = %response.status(), "Preview started");
            }
            Err(e) => {
                warn!(%url, error = %e, "Preview start request failed, continuing");
            }
        }

        Ok(())
    }

    fn send(&self, changes: ChangeSet) {
        let Some(session) = self.session.lock().clone() else {
            debug!("HTTP channel not opened, update dropped");
            return;
        };

        let url = match self.endpoint(&session, Action::Update) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Failed to build update URL");
                return;
            }
        };

        let request = self.client.post(url.clone()).json(&UpdateBody { changes });

        tokio::spawn(async move {
            match request.send().await {
                Ok(response) => debug!(%url, status = %response.status(), "Update sent"),
                Err(e) => warn!(%url, error = %e, "Update request failed"),
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
