// ABOUTME: Wire definitions for the chat REST history and the room WebSocket
// JSON chat events plus the plain-text PING/PONG keep-alive pair

use crate::models::{ChatMessage, MessageId, MessageKind, UserIdentity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PING: &str = "PING";
pub const PONG: &str = "PONG";

// ============================================
// Chat events
// ============================================

/// One chat record, as returned by the history endpoint and relayed on the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub sender: String,
    #[serde(default, alias = "sender_role")]
    pub sender_role: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl ChatRecord {
    /// Outbound event as composed by this client.
    pub fn outbound(
        sender: impl Into<String>,
        sender_role: impl Into<String>,
        content: impl Into<String>,
        kind: MessageKind,
        sent_at: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            room_id: None,
            sender: sender.into(),
            sender_role: Some(sender_role.into()),
            content: content.into(),
            kind,
            sent_at: Some(sent_at.into()),
            created_at: None,
        }
    }

    /// Server timestamp wins over the client's.
    pub fn timestamp(&self) -> Option<&str> {
        self.created_at.as_deref().or(self.sent_at.as_deref())
    }

    /// Map into the store's model. `fallback_time` covers events with no timestamp.
    pub fn into_message(self, identity: &UserIdentity, counterpart_name: &str, fallback_time: &str) -> ChatMessage {
        let is_from_user = self.sender == identity.user_id;
        let sent_at = self.timestamp().unwrap_or(fallback_time).to_string();
        let id = match self.id {
            Some(id) if !id.is_empty() => MessageId::Confirmed(id),
            _ => MessageId::Confirmed(Uuid::new_v4().to_string()),
        };
        ChatMessage {
            id,
            content: self.content,
            kind: self.kind,
            sent_at,
            sender_name: if is_from_user {
                identity.display_name().to_string()
            } else {
                counterpart_name.to_string()
            },
            sender_id: self.sender,
            is_from_user,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================
// Socket frames
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Ping,
    Pong,
    Event(ChatRecord),
}

impl Frame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        match text.trim() {
            PING => Ok(Frame::Ping),
            PONG => Ok(Frame::Pong),
            other => serde_json::from_str(other).map(Frame::Event),
        }
    }

    pub fn is_keepalive(&self) -> bool {
        matches!(self, Frame::Ping | Frame::Pong)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> UserIdentity {
        UserIdentity::new("arch-1", Some("Sari".to_string()))
    }

    #[test]
    fn test_keepalive_frames_are_not_events() {
        assert_eq!(Frame::parse("PONG").unwrap(), Frame::Pong);
        assert_eq!(Frame::parse("PING\n").unwrap(), Frame::Ping);
        assert!(Frame::parse("PONG").unwrap().is_keepalive());
    }

    #[test]
    fn test_event_frame_accepts_both_role_spellings() {
        let camel = r#"{"sender":"u-1","senderRole":"user","content":"Halo","type":"TEXT"}"#;
        let snake = r#"{"sender":"u-1","sender_role":"user","content":"Halo","type":"TEXT"}"#;
        for raw in [camel, snake] {
            let Frame::Event(record) = Frame::parse(raw).unwrap() else {
                panic!("expected event");
            };
            assert_eq!(record.sender_role.as_deref(), Some("user"));
        }
    }

    #[test]
    fn test_legacy_file_kind_maps_to_image() {
        let raw = r#"{"id":"m1","sender":"u-1","content":"https://cdn/x.png","type":"FILE","createdAt":"2024-01-01T10:00:00Z"}"#;
        let Frame::Event(record) = Frame::parse(raw).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(record.kind, MessageKind::Image);
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        assert!(Frame::parse("hello").is_err());
        assert!(Frame::parse(r#"{"content":"no sender"}"#).is_err());
    }

    #[test]
    fn test_outbound_event_shape() {
        let record = ChatRecord::outbound("arch-1", "architect", "Hello", MessageKind::Text, "2024-01-01T10:30:00.000");
        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(value["sender"], "arch-1");
        assert_eq!(value["senderRole"], "architect");
        assert_eq!(value["type"], "TEXT");
        assert_eq!(value["sentAt"], "2024-01-01T10:30:00.000");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_into_message_marks_own_and_peer_messages() {
        let own = ChatRecord::outbound("arch-1", "architect", "x", MessageKind::Text, "2024-01-01T10:00:00");
        let peer = ChatRecord { sender: "u-1".to_string(), ..own.clone() };

        let own = own.into_message(&identity(), "Budi", "fallback");
        let peer = peer.into_message(&identity(), "Budi", "fallback");

        assert!(own.is_from_user);
        assert_eq!(own.sender_name, "Sari");
        assert!(!peer.is_from_user);
        assert_eq!(peer.sender_name, "Budi");
        assert_eq!(peer.sent_at, "2024-01-01T10:00:00");
    }

    #[test]
    fn test_missing_timestamp_uses_fallback() {
        let raw = r#"{"sender":"u-1","content":"Halo","type":"TEXT"}"#;
        let record: ChatRecord = serde_json::from_str(raw).unwrap();
        let message = record.into_message(&identity(), "Budi", "2024-02-02T02:02:02.000");
        assert_eq!(message.sent_at, "2024-02-02T02:02:02.000");
        assert!(!message.is_pending());
    }
}
