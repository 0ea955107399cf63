//! Whiteboard notification sink.
//!
//! Pushes small structured messages to the connected front-end over the
//! session's reliable data channel. Fire-and-forget UX sugar: the caller
//! does not await acknowledgement and the core never retries.

use crate::error::MediaError;
use crate::session::MediaSession;
use serde::{Deserialize, Serialize};

/// Logical channel the front-end listens on for whiteboard updates.
pub const WHITEBOARD_TOPIC: &str = "whiteboard_update";

/// Wire shape of a front-end notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationMessage {
    /// Message tag; the front-end dispatches on this.
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

/// Publishes a whiteboard update to all connected peers.
///
/// Serializes `{"type": "whiteboard_update", "content": <text>}` as UTF-8
/// JSON and requests reliable delivery. Transport failures propagate to the
/// caller of the tool that triggered the update; nothing here retries or
/// suppresses them.
pub async fn notify_whiteboard(
    session: &dyn MediaSession,
    text: &str,
) -> Result<(), MediaError> {
    let message = NotificationMessage {
        kind: WHITEBOARD_TOPIC.to_string(),
        content: text.to_string(),
    };
    let payload = serde_json::to_vec(&message)
        .map_err(|e| MediaError::Publish(format!("failed to serialize notification: {}", e)))?;

    session.publish_data(&payload, WHITEBOARD_TOPIC, true).await
}
