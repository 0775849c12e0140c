//! Request and response bodies for the REST endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::MessageKind;

/// Body for room creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRequest {
    pub room_id: String,
}

/// Response to a successful room creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreated {
    pub room_id: String,
}

/// Body for both registration and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Body published to a room's send destination over the gateway. The
/// timestamp travels as an ISO string because the server binds it to a
/// local date-time, not an epoch value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub sender: String,
    pub content: String,
    pub room_id: String,
    pub message_type: MessageKind,
    #[serde(with = "crate::time::required")]
    pub message_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn send_request_uses_camel_case_and_iso_time() {
        let req = SendMessageRequest {
            sender: "alice".into(),
            content: "hi".into(),
            room_id: "lobby".into(),
            message_type: MessageKind::Text,
            message_time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"roomId\":\"lobby\""));
        assert!(json.contains("\"messageType\":\"TEXT\""));
        assert!(json.contains("\"messageTime\":\"2026-01-01T00:00:00.000Z\""));
    }

    #[test]
    fn send_request_round_trips() {
        let json = r#"{"sender":"bob","content":"/media/1_a.png","roomId":"lobby","messageType":"IMAGE","messageTime":"2026-01-01T00:00:00.000Z"}"#;
        let req: SendMessageRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.message_type, MessageKind::Image);
        assert_eq!(req.message_time, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }
}
