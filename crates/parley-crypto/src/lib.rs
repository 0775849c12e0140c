//! End-to-end encryption for private messages.
//!
//! Two participants derive the same conversation secret from their
//! usernames alone ([`derive_shared_secret`]), so no key exchange happens
//! over the wire. Message bodies are sealed into self-contained base64
//! envelopes ([`encrypt_message`]) that carry their own salt and nonce;
//! opening one ([`decrypt_message`]) never fails, it falls back to handing
//! the input back untouched so unreadable history still renders.
//!
//! This scheme hides content from the server but authenticates nobody:
//! anyone who knows both usernames can derive the secret. It is privacy
//! from casual observation, not a hard cryptographic boundary.

pub mod envelope;
pub mod secret;

pub use envelope::{Decrypted, decrypt_message, encrypt_message};
pub use secret::derive_shared_secret;
