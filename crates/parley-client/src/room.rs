//! A joined room on a live gateway session.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};

use parley_api::ApiClient;
use parley_gateway::{GatewaySession, SessionEvent, SubscriptionId};
use parley_types::api::SendMessageRequest;
use parley_types::models::{ChatMessage, MessageKind, PrivateMessage};

/// heart-beat offer to the broker, milliseconds (can-send, want-receive).
const HEARTBEAT: (u64, u64) = (10_000, 10_000);

/// Cap on waiting for the goodbye handshake when leaving. Longer than
/// the gateway's own receipt grace, so the normal path never trips it.
const LEAVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Chat traffic after decoding, ready for display.
#[derive(Debug)]
pub enum ChatEvent {
    Room(ChatMessage),
    Private(PrivateMessage),
    /// Broker-reported trouble; the session usually closes right after.
    Error(String),
    /// The gateway is gone. No further events follow.
    Disconnected,
}

/// A room the user is in, together with their private queue, on one
/// gateway session.
#[derive(Debug)]
pub struct RoomChat {
    api: ApiClient,
    gateway: GatewaySession,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    username: String,
    room_id: String,
    history: Vec<ChatMessage>,
    room_subscription: SubscriptionId,
    private_subscription: SubscriptionId,
}

impl RoomChat {
    /// Join `room_id` as `username`: confirm the room exists over REST,
    /// pull the latest history page, connect the gateway and subscribe to
    /// the room topic plus the user's private queue.
    pub async fn join(
        api: ApiClient,
        ws_url: &str,
        username: &str,
        room_id: &str,
    ) -> Result<Self> {
        let room = api
            .join_room(room_id)
            .await
            .with_context(|| format!("joining room {}", room_id))?;
        let history = api
            .room_messages(&room.room_id, 0, parley_api::rooms::DEFAULT_PAGE_SIZE)
            .await
            .context("loading room history")?;

        let (gateway, events) = GatewaySession::connect(ws_url, HEARTBEAT)
            .await
            .context("connecting to gateway")?;
        let room_subscription = gateway.subscribe(&format!("/topic/room/{}", room.room_id))?;
        let private_subscription = gateway.subscribe(&format!("/user/{}/private", username))?;

        Ok(Self {
            api,
            gateway,
            events,
            username: username.to_owned(),
            room_id: room.room_id,
            history,
            room_subscription,
            private_subscription,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// History loaded at join time, oldest first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Publish a text message to the room. It comes back through the
    /// topic subscription like everyone else's.
    pub fn send_text(&self, text: &str) -> Result<()> {
        self.publish(text.to_owned(), MessageKind::Text)
    }

    /// Upload a local file and publish its media path as an IMAGE or
    /// AUDIO message (TEXT for anything unrecognized).
    pub async fn send_media(&self, path: &Path) -> Result<MessageKind> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin");
        let media_path = self
            .api
            .upload_file(filename, bytes)
            .await
            .context("uploading file")?;
        let kind = kind_for_filename(filename);
        self.publish(media_path, kind)?;
        Ok(kind)
    }

    /// Send a sealed private message through the gateway. The broker
    /// delivers it to the receiver only; the sender echoes locally.
    pub fn send_private(&self, message: &PrivateMessage) -> Result<()> {
        self.gateway
            .send_json("/app/private", message)
            .context("publishing private message")
    }

    /// Next decoded event, `None` once the gateway is gone and drained.
    pub async fn next_event(&mut self) -> Option<ChatEvent> {
        loop {
            match self.events.recv().await? {
                // join() already saw the handshake complete.
                SessionEvent::Connected => continue,
                SessionEvent::Message {
                    subscription, body, ..
                } => match self.decode(&subscription, &body) {
                    Some(event) => return Some(event),
                    None => continue,
                },
                SessionEvent::ProtocolError(reason) => return Some(ChatEvent::Error(reason)),
                SessionEvent::Closed => return Some(ChatEvent::Disconnected),
            }
        }
    }

    /// Say goodbye to the broker and wait for the session to wind down.
    /// The gateway closes the socket once the DISCONNECT receipt arrives;
    /// the event stream ending confirms the goodbye went out.
    pub async fn leave(mut self) {
        if let Err(e) = self.gateway.disconnect() {
            debug!("Gateway already closed: {}", e);
            return;
        }
        let drained = async {
            while let Some(event) = self.events.recv().await {
                if matches!(event, SessionEvent::Closed) {
                    break;
                }
            }
        };
        if timeout(LEAVE_TIMEOUT, drained).await.is_err() {
            debug!("Gateway shutdown timed out");
        }
    }

    /// Route by subscription id; the broker rewrites user-queue
    /// destinations, so the id is the reliable key.
    fn decode(&self, subscription: &str, body: &str) -> Option<ChatEvent> {
        if subscription == self.room_subscription.as_str() {
            match serde_json::from_str::<ChatMessage>(body) {
                Ok(message) => Some(ChatEvent::Room(message)),
                Err(e) => {
                    warn!("Undecodable room message: {}", e);
                    None
                }
            }
        } else if subscription == self.private_subscription.as_str() {
            match serde_json::from_str::<PrivateMessage>(body) {
                Ok(message) => Some(ChatEvent::Private(message)),
                Err(e) => {
                    warn!("Undecodable private message: {}", e);
                    None
                }
            }
        } else {
            debug!("Message for unknown subscription {}", subscription);
            None
        }
    }

    fn publish(&self, content: String, kind: MessageKind) -> Result<()> {
        let request = SendMessageRequest {
            sender: self.username.clone(),
            content,
            room_id: self.room_id.clone(),
            message_type: kind,
            message_time: Utc::now(),
        };
        self.gateway
            .send_json(&format!("/app/sendMessage/{}", self.room_id), &request)
            .context("publishing room message")
    }
}

/// Message kind by file extension, standing in for the MIME sniff a
/// browser upload would do.
pub fn kind_for_filename(name: &str) -> MessageKind {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp") => MessageKind::Image,
        Some("wav" | "mp3" | "ogg" | "m4a" | "flac" | "aac") => MessageKind::Audio,
        _ => MessageKind::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_kinds() {
        assert_eq!(kind_for_filename("cat.PNG"), MessageKind::Image);
        assert_eq!(kind_for_filename("song.mp3"), MessageKind::Audio);
        assert_eq!(kind_for_filename("recording.wav"), MessageKind::Audio);
        assert_eq!(kind_for_filename("notes.txt"), MessageKind::Text);
        assert_eq!(kind_for_filename("no-extension"), MessageKind::Text);
        assert_eq!(kind_for_filename("archive.tar.gz"), MessageKind::Text);
    }
}
