use reqwest::StatusCode;

/// Errors from REST calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never completed: connection refused, DNS, timeout, or a
    /// body that failed to read or parse.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status. `message` is the
    /// response body, which the server fills with a human-readable reason
    /// ("Room already exists!", "Invalid password", ...).
    #[error("server rejected request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    /// The configured base URL and endpoint path do not combine into a
    /// valid URL.
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Status code, if the server produced one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status(),
            ApiError::Url(_) => None,
        }
    }

    /// True when the server said the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}
