//! Session identity and state.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::identifiers::{ContentId, LanguageCode, UserId, WebspaceKey};
use crate::transport::TransportMethod;

// ============================================================================
// SessionInfo
// ============================================================================

/// Identity of one preview run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Content under preview. Empty for unsaved content.
    pub content_id: ContentId,
    /// Webspace of the content.
    pub webspace_key: WebspaceKey,
    /// Language being edited.
    pub language_code: LanguageCode,
    /// Editing user.
    pub user_id: UserId,
}

impl SessionInfo {
    /// Creates session identity.
    #[must_use]
    pub fn new(
        content_id: impl Into<ContentId>,
        webspace_key: impl Into<WebspaceKey>,
        language_code: impl Into<LanguageCode>,
        user_id: impl Into<UserId>,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            webspace_key: webspace_key.into(),
            language_code: language_code.into(),
            user_id: user_id.into(),
        }
    }

    /// Returns `true` if there is saved content to preview.
    #[inline]
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.content_id.is_empty()
    }
}

// ============================================================================
// SessionState
// ============================================================================

/// Lifecycle of a session.
///
/// ```text
/// Uninitialized ──► Connecting(WebSocket) ──► Ready(WebSocket)
///                          │
///                          ▼ (socket failed before open)
/// Uninitialized ──► Connecting(Http) ───────► Ready(Http)
/// ```
///
/// `Ready` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// `initialize` not called yet.
    #[default]
    Uninitialized,
    /// Waiting for the channel to report ready.
    Connecting(TransportMethod),
    /// Channel ready; updates flow.
    Ready(TransportMethod),
}

impl SessionState {
    /// Returns `true` once a channel is ready.
    #[inline]
    #[must_use]
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::Connecting(method) => write!(f, "connecting({method})"),
            Self::Ready(method) => write!(f, "ready({method})"),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Mutable session record owned by the controller.
#[derive(Debug, Clone)]
pub struct Session {
    /// Identity.
    pub info: SessionInfo,
    /// Transport currently selected.
    pub transport_method: TransportMethod,
    /// `initialize` has been called.
    pub initiated: bool,
    /// The realtime socket reached the open state.
    pub connection_opened: bool,
    /// Lifecycle state.
    pub state: SessionState,
}

impl Session {
    /// Creates an uninitialized session.
    #[must_use]
    pub fn new(info: SessionInfo) -> Self {
        Self {
            info,
            transport_method: TransportMethod::WebSocket,
            initiated: false,
            connection_opened: false,
            state: SessionState::Uninitialized,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_uninitialized() {
        let session = Session::new(SessionInfo::new("1", "sulu_io", "en", "1"));
        assert!(!session.initiated);
        assert!(!session.connection_opened);
        assert_eq!(session.state, SessionState::Uninitialized);
    }

    #[test]
    fn test_has_content() {
        assert!(SessionInfo::new("1", "ws", "en", "u").has_content());
        assert!(!SessionInfo::new("", "ws", "en", "u").has_content());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(
            SessionState::Connecting(TransportMethod::WebSocket).to_string(),
            "connecting(websocket)"
        );
        assert_eq!(SessionState::Ready(TransportMethod::Http).to_string(), "ready(http)");
        assert!(SessionState::Ready(TransportMethod::Http).is_ready());
        assert!(!SessionState::Uninitialized.is_ready());
    }
}
