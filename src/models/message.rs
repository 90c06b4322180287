// ABOUTME: Chat message model with two-phase identity (pending until the server confirms)

use crate::chat::timestamp::{parse_local, LocalInstant};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    Text,
    // Older rooms store attachments as FILE.
    #[serde(alias = "FILE")]
    Image,
}

/// Temporary identifier handed out for an optimistic insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingId(Uuid);

impl PendingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PendingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PendingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pending-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageId {
    Pending(PendingId),
    Confirmed(String),
}

impl MessageId {
    pub fn is_pending(&self) -> bool {
        matches!(self, MessageId::Pending(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Pending(id) => id.fmt(f),
            MessageId::Confirmed(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    /// Text body, or an image URI (device-local before upload, remote after).
    pub content: String,
    pub kind: MessageKind,
    /// Local timestamp string, no zone marker.
    pub sent_at: String,
    pub sender_id: String,
    pub sender_name: String,
    pub is_from_user: bool,
}

impl ChatMessage {
    pub fn instant(&self) -> LocalInstant {
        parse_local(&self.sent_at)
    }

    pub fn is_pending(&self) -> bool {
        self.id.is_pending()
    }

    pub fn is_image(&self) -> bool {
        self.kind == MessageKind::Image
    }
}
