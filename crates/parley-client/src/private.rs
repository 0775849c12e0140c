//! One private conversation and its encryption.

use anyhow::{Context, Result};

use parley_api::ApiClient;
use parley_crypto::{decrypt_message, derive_shared_secret, encrypt_message};
use parley_types::models::PrivateMessage;

/// A conversation between `me` and one counterpart. The shared secret is
/// derived once at construction; both sides compute the same one
/// regardless of who constructs first.
#[derive(Debug, Clone)]
pub struct PrivateChat {
    me: String,
    counterpart: String,
    secret: String,
}

impl PrivateChat {
    pub fn new(me: impl Into<String>, counterpart: impl Into<String>) -> Self {
        let me = me.into();
        let counterpart = counterpart.into();
        let secret = derive_shared_secret(&me, &counterpart);
        Self {
            me,
            counterpart,
            secret,
        }
    }

    pub fn counterpart(&self) -> &str {
        &self.counterpart
    }

    /// Build the outgoing record with sealed content. The server assigns
    /// id and timestamp on save.
    pub fn seal(&self, text: &str) -> Result<PrivateMessage> {
        let content = encrypt_message(text, &self.secret)
            .with_context(|| format!("sealing message for {}", self.counterpart))?;
        Ok(PrivateMessage {
            id: None,
            sender: self.me.clone(),
            receiver: self.counterpart.clone(),
            content,
            timestamp: None,
        })
    }

    /// Swap the envelope for readable text. Bodies that do not open with
    /// this conversation's secret stay as they are.
    pub fn open(&self, mut message: PrivateMessage) -> PrivateMessage {
        message.content = decrypt_message(&message.content, &self.secret).into_text();
        message
    }

    /// Whether a message belongs to this conversation, in either
    /// direction.
    pub fn involves(&self, message: &PrivateMessage) -> bool {
        (message.sender == self.me && message.receiver == self.counterpart)
            || (message.sender == self.counterpart && message.receiver == self.me)
    }

    /// The stored conversation, decrypted for display, oldest first.
    pub async fn history(&self, api: &ApiClient) -> Result<Vec<PrivateMessage>> {
        let messages = api
            .private_history(&self.me, &self.counterpart)
            .await
            .with_context(|| format!("loading conversation with {}", self.counterpart))?;
        Ok(messages.into_iter().map(|m| self.open(m)).collect())
    }
}
