//! Sealed message envelopes.
//!
//! Wire layout, before base64: `salt (16) || nonce (12) || ciphertext+tag`.
//! The salt is hashed together with the conversation secret to produce the
//! AES key, so every envelope uses a fresh key and nonce even when the
//! secret and plaintext repeat.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};
use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha2::{Digest, Sha256};

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Smallest decodable envelope: empty plaintext still carries a tag.
const MIN_ENVELOPE_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// Outcome of opening an incoming message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decrypted {
    /// The body was a valid envelope for this secret; here is the text.
    Plaintext(String),
    /// The body was not readable with this secret and is returned as-is.
    /// Covers plain unencrypted text, envelopes sealed for another pair,
    /// and corrupted data.
    PassThrough(String),
}

impl Decrypted {
    /// The displayable text either way.
    pub fn into_text(self) -> String {
        match self {
            Decrypted::Plaintext(text) | Decrypted::PassThrough(text) => text,
        }
    }

    pub fn is_plaintext(&self) -> bool {
        matches!(self, Decrypted::Plaintext(_))
    }
}

/// Seal `plaintext` under the conversation secret.
///
/// Draws a fresh salt and nonce from the OS RNG on every call, so the same
/// message encrypted twice yields two different envelopes.
pub fn encrypt_message(plaintext: &str, secret: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let key = derive_cipher_key(secret, &salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    let mut envelope = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    envelope.extend_from_slice(&salt);
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(envelope))
}

/// Open an incoming message body.
///
/// Never errors: anything that does not decode and decrypt to non-empty
/// text under this secret comes back as [`Decrypted::PassThrough`], so a
/// mixed history of encrypted and legacy plain messages always renders.
pub fn decrypt_message(message: &str, secret: &str) -> Decrypted {
    match try_open(message, secret) {
        Some(text) if !text.is_empty() => Decrypted::Plaintext(text),
        _ => Decrypted::PassThrough(message.to_owned()),
    }
}

fn try_open(message: &str, secret: &str) -> Option<String> {
    let raw = BASE64.decode(message).ok()?;
    if raw.len() < MIN_ENVELOPE_LEN {
        return None;
    }
    let (salt, rest) = raw.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let key = derive_cipher_key(secret, salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .ok()?;
    String::from_utf8(plaintext).ok()
}

/// Per-envelope AES key: SHA-256 over the secret followed by the salt.
fn derive_cipher_key(secret: &str, salt: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(salt);
    hasher.finalize().into()
}
