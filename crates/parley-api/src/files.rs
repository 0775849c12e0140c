use reqwest::multipart::{Form, Part};
use tracing::debug;
use url::Url;

use crate::client::ApiClient;
use crate::error::ApiError;

impl ApiClient {
    /// Upload media and get back the server-relative path (`/media/<name>`)
    /// to use as message content.
    pub async fn upload_file(&self, filename: &str, bytes: Vec<u8>) -> Result<String, ApiError> {
        let url = self.endpoint("/api/v1/files/upload")?;
        debug!("Uploading {} ({} bytes)", filename, bytes.len());
        let part = Part::bytes(bytes).file_name(filename.to_owned());
        let form = Form::new().part("file", part);
        let resp = self.http.post(url).multipart(form).send().await?;
        Ok(Self::check(resp).await?.text().await?)
    }

    /// Absolute URL for a server-relative media path, for fetching or
    /// showing a link.
    pub fn media_url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url().join(path)?)
    }
}
