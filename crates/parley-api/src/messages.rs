use parley_types::models::PrivateMessage;

use crate::client::ApiClient;
use crate::error::ApiError;

impl ApiClient {
    /// Every private message between two users, oldest first.
    ///
    /// The server matches both directions, so argument order only needs to
    /// name the two participants. Bodies are ciphertext envelopes; callers
    /// decrypt them for display.
    pub async fn private_history(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<PrivateMessage>, ApiError> {
        let url = self.endpoint(&format!("/api/v1/messages/{}/{}", user_a, user_b))?;
        let resp = self.http.get(url).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}
