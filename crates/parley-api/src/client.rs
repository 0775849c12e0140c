use reqwest::{Client, Response};
use url::Url;

use crate::error::ApiError;

/// HTTP client for the chat server's REST endpoints.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub(crate) http: Client,
    base: Url,
}

impl ApiClient {
    /// Build a client for the server at `base_url`, e.g.
    /// `http://localhost:8080`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(base_url)?;
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve an absolute endpoint path against the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    /// Map a non-success response to [`ApiError::Rejected`], keeping the
    /// server's text body as the message.
    pub(crate) async fn check(resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(ApiError::Rejected { status, message })
    }
}
