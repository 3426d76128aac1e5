//! Wire frame envelope exchanged with connected clients.
//!
//! Every frame on the socket is a JSON object of the shape
//! `{"type": <kind>, "content": <string>}`. Chat payloads travel as
//! [`FrameKind::Message`]; presence notices carry the affected user id
//! in `content`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::UserId;

/// Discriminator for [`Frame`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    /// Opaque chat payload.
    Message,
    /// A connection for the user in `content` was registered.
    UserConnected,
    /// A connection for the user in `content` was closed.
    UserDisconnected,
}

impl FrameKind {
    /// Returns `true` for the two presence kinds.
    #[must_use]
    pub const fn is_presence(self) -> bool {
        matches!(self, Self::UserConnected | Self::UserDisconnected)
    }
}

/// One application-level frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Frame {
    /// Frame type.
    #[serde(rename = "type")]
    pub kind: FrameKind,
    /// Payload; may be empty for presence frames.
    #[serde(default)]
    pub content: String,
}

impl Frame {
    /// Builds a chat `message` frame.
    #[must_use]
    pub fn message(content: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Message,
            content: content.into(),
        }
    }

    /// Builds a `user_connected` presence frame for `user`.
    #[must_use]
    pub fn user_connected(user: &UserId) -> Self {
        Self {
            kind: FrameKind::UserConnected,
            content: user.to_string(),
        }
    }

    /// Builds a `user_disconnected` presence frame for `user`.
    #[must_use]
    pub fn user_disconnected(user: &UserId) -> Self {
        Self {
            kind: FrameKind::UserDisconnected,
            content: user.to_string(),
        }
    }

    /// Serializes the frame to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
