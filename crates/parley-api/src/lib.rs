//! REST client for the chat server.
//!
//! A single [`ApiClient`] covers every endpoint under `/api/v1`: rooms and
//! their history, account registration and login, private-conversation
//! history, user search and media upload. Methods are grouped into modules
//! by resource; all of them live on `ApiClient`.

mod client;
mod error;

pub mod files;
pub mod messages;
pub mod rooms;
pub mod users;

pub use client::ApiClient;
pub use error::ApiError;
