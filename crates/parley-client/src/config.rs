use std::env;
use std::path::PathBuf;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
pub const DEFAULT_SESSION_FILE: &str = "parley-session.json";

/// Runtime configuration, all of it from the environment (after the
/// binary has loaded `.env`).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub ws_url: String,
    pub session_file: PathBuf,
}

impl ClientConfig {
    /// Read `PARLEY_SERVER_URL`, `PARLEY_WS_URL` and `PARLEY_SESSION_FILE`,
    /// deriving the gateway URL from the server URL when unset.
    pub fn from_env() -> Self {
        let server_url =
            env::var("PARLEY_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_owned());
        let ws_url = env::var("PARLEY_WS_URL").unwrap_or_else(|_| default_ws_url(&server_url));
        let session_file = env::var("PARLEY_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SESSION_FILE));
        Self {
            server_url,
            ws_url,
            session_file,
        }
    }
}

/// Gateway endpoint for a given REST base URL. The broker speaks plain
/// WebSocket under `/chat/websocket`.
pub fn default_ws_url(server_url: &str) -> String {
    format!(
        "{}/chat/websocket",
        server_url
            .trim_end_matches('/')
            .replace("http://", "ws://")
            .replace("https://", "wss://")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_mirrors_scheme() {
        assert_eq!(
            default_ws_url("http://localhost:8080"),
            "ws://localhost:8080/chat/websocket"
        );
        assert_eq!(
            default_ws_url("https://chat.example.com"),
            "wss://chat.example.com/chat/websocket"
        );
    }

    #[test]
    fn trailing_slash_does_not_double_up() {
        assert_eq!(
            default_ws_url("http://localhost:8080/"),
            "ws://localhost:8080/chat/websocket"
        );
    }
}
