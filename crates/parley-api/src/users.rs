use tracing::debug;

use parley_types::api::Credentials;
use parley_types::models::User;

use crate::client::ApiClient;
use crate::error::ApiError;

impl ApiClient {
    /// Register a new account. Taken usernames come back as 400 with a
    /// text reason.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let url = self.endpoint("/api/v1/users/register")?;
        debug!("Registering user {}", username);
        let resp = self
            .http
            .post(url)
            .json(&Credentials {
                username: username.to_owned(),
                password: password.to_owned(),
            })
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Log in with existing credentials. Unknown user or wrong password is
    /// a 401.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let url = self.endpoint("/api/v1/users/login")?;
        debug!("Logging in as {}", username);
        let resp = self
            .http
            .post(url)
            .json(&Credentials {
                username: username.to_owned(),
                password: password.to_owned(),
            })
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Username substring search, for finding someone to message.
    pub async fn search_users(&self, query: &str) -> Result<Vec<User>, ApiError> {
        let mut url = self.endpoint("/api/v1/users/search")?;
        url.query_pairs_mut().append_pair("query", query);
        let resp = self.http.get(url).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}
