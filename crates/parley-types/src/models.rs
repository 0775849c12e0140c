use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of content carried in a room message. For `Image` and `Audio` the
/// message content is a server-relative media path, not the media itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    Audio,
}

/// A message in a public room, as stored and broadcast by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender: String,
    pub content: String,
    #[serde(default, with = "crate::time::option")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message_type: MessageKind,
}

/// A direct message between two users.
///
/// `content` is a ciphertext envelope on the wire and in server storage;
/// it only becomes readable text on a participant's client at display
/// time. `id` and `timestamp` are assigned server-side and are absent on
/// first publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub sender: String,
    pub receiver: String,
    pub content: String,
    #[serde(
        default,
        with = "crate::time::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A room as the join endpoint returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_id: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// A registered user. The server may include more fields; only these are
/// meaningful to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: Option<String>,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_kind_wire_strings() {
        assert_eq!(serde_json::to_string(&MessageKind::Text).unwrap(), "\"TEXT\"");
        assert_eq!(serde_json::to_string(&MessageKind::Image).unwrap(), "\"IMAGE\"");
        assert_eq!(
            serde_json::from_str::<MessageKind>("\"AUDIO\"").unwrap(),
            MessageKind::Audio
        );
    }

    #[test]
    fn chat_message_defaults_to_text() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"sender":"alice","content":"hi"}"#).unwrap();
        assert_eq!(msg.message_type, MessageKind::Text);
        assert!(msg.timestamp.is_none());
    }

    #[test]
    fn outgoing_private_message_omits_server_fields() {
        let msg = PrivateMessage {
            id: None,
            sender: "alice".into(),
            receiver: "bob".into(),
            content: "envelope".into(),
            timestamp: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"sender":"alice","receiver":"bob","content":"envelope"}"#
        );
    }

    #[test]
    fn stored_private_message_round_trips() {
        let json = r#"{
            "id":"65f1",
            "sender":"bob",
            "receiver":"alice",
            "content":"c2FsdA==",
            "timestamp":"2026-03-01T10:00:00.000Z"
        }"#;
        let msg: PrivateMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id.as_deref(), Some("65f1"));
        assert!(msg.timestamp.is_some());
    }

    #[test]
    fn room_without_messages_parses() {
        let room: Room = serde_json::from_str(r#"{"roomId":"lobby"}"#).unwrap();
        assert_eq!(room.room_id, "lobby");
        assert!(room.messages.is_empty());
    }

    #[test]
    fn user_ignores_unknown_fields() {
        let user: User =
            serde_json::from_str(r#"{"id":"1","username":"alice","password":"x"}"#).unwrap();
        assert_eq!(user.username, "alice");
    }
}
