//! Socket message types.
//!
//! Every outbound socket frame is an [`UpdateMessage`] serialized as JSON
//! text. Inbound frames carry no protocol meaning for this client and are
//! only parsed for diagnostics.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::{ContentId, LanguageCode, UserId, WebspaceKey};
use crate::session::SessionInfo;

use super::ChangeSet;

// ============================================================================
// UpdateMessage
// ============================================================================

/// An outbound socket message.
///
/// # Format
///
/// ```json
/// {
///   "command": "update",
///   "content": "123",
///   "type": "form",
///   "user": "1",
///   "webspaceKey": "sulu_io",
///   "languageCode": "en",
///   "params": { "changes": { "title": "Hello" } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessage {
    /// Message command.
    pub command: MessageCommand,

    /// Content under preview.
    pub content: ContentId,

    /// Payload kind (always `form`).
    #[serde(rename = "type")]
    pub kind: MessageKind,

    /// Editing user.
    pub user: UserId,

    /// Webspace of the content.
    pub webspace_key: WebspaceKey,

    /// Language being edited.
    pub language_code: LanguageCode,

    /// Command parameters.
    pub params: MessageParams,
}

impl UpdateMessage {
    /// Creates the `start` message announcing a new preview run.
    #[must_use]
    pub fn start(session: &SessionInfo) -> Self {
        Self::with_command(session, MessageCommand::Start, MessageParams::default())
    }

    /// Creates an `update` message carrying field changes.
    #[must_use]
    pub fn update(session: &SessionInfo, changes: ChangeSet) -> Self {
        Self::with_command(
            session,
            MessageCommand::Update,
            MessageParams {
                changes: Some(changes),
            },
        )
    }

    fn with_command(session: &SessionInfo, command: MessageCommand, params: MessageParams) -> Self {
        Self {
            command,
            content: session.content_id.clone(),
            kind: MessageKind::Form,
            user: session.user_id.clone(),
            webspace_key: session.webspace_key.clone(),
            language_code: session.language_code.clone(),
            params,
        }
    }

    /// Serializes the message into a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// MessageCommand
// ============================================================================

/// Outbound command discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageCommand {
    /// Opens the preview run. Sent once per connection.
    Start,
    /// Carries field changes.
    Update,
}

// ============================================================================
// MessageKind
// ============================================================================

/// Payload kind discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Changes originate from a content form.
    Form,
}

// ============================================================================
// MessageParams
// ============================================================================

/// Command parameters. Empty for `start`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageParams {
    /// Changed fields (only for `update`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<ChangeSet>,
}

// ============================================================================
// InboundMessage
// ============================================================================

/// A frame received from the preview server.
///
/// The server may push arbitrary JSON. It is logged and otherwise ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Parsed frame.
    pub payload: Value,
}

impl InboundMessage {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) for malformed frames.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self {
            payload: serde_json::from_str(text)?,
        })
    }

    /// Returns the `command` field if the server sent one.
    #[inline]
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        self.payload.get("command").and_then(|v| v.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
