use tracing::debug;

use parley_types::api::{RoomCreated, RoomRequest};
use parley_types::models::{ChatMessage, Room};

use crate::client::ApiClient;
use crate::error::ApiError;

/// History window the client asks for when entering a room.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

impl ApiClient {
    /// Create a room. Fails with 400 ("Room already exists!") when the id
    /// is taken.
    pub async fn create_room(&self, room_id: &str) -> Result<RoomCreated, ApiError> {
        let url = self.endpoint("/api/v1/rooms")?;
        debug!("Creating room {}", room_id);
        let resp = self
            .http
            .post(url)
            .json(&RoomRequest {
                room_id: room_id.to_owned(),
            })
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Fetch a room to join it. 404 means no such room.
    pub async fn join_room(&self, room_id: &str) -> Result<Room, ApiError> {
        let url = self.endpoint(&format!("/api/v1/rooms/{}", room_id))?;
        let resp = self.http.get(url).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// One page of room history, in chronological order.
    ///
    /// The server pages from the end of history: page 0 is the newest
    /// `size` messages, already oldest-first within the page.
    pub async fn room_messages(
        &self,
        room_id: &str,
        page: u32,
        size: u32,
    ) -> Result<Vec<ChatMessage>, ApiError> {
        let mut url = self.endpoint(&format!("/api/v1/rooms/{}/messages", room_id))?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("size", &size.to_string());
        let resp = self.http.get(url).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}
