//! STOMP 1.2 frame codec.
//!
//! ```text
//! COMMAND LF
//! header:value LF
//! ...
//! LF
//! body NUL
//! ```
//!
//! Header octets are escaped (`\\`, `\n`, `\r`, `\c` for colon) in every
//! frame except CONNECT and CONNECTED. A body is read via `content-length`
//! when the header is present, otherwise up to the first NUL. A WebSocket
//! message carrying nothing but an EOL is a heartbeat, not a frame.

use std::fmt;
use std::time::Duration;

/// Frame commands used by the chat broker. Transactions and acks are not
/// part of this dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Message,
    Receipt,
    Error,
    Disconnect,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Connected => "CONNECTED",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
            Command::Disconnect => "DISCONNECT",
        }
    }

    fn parse(text: &str) -> Result<Self, FrameError> {
        Ok(match text {
            // STOMP is an accepted alias for CONNECT since 1.1.
            "CONNECT" | "STOMP" => Command::Connect,
            "CONNECTED" => Command::Connected,
            "SEND" => Command::Send,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            "DISCONNECT" => Command::Disconnect,
            other => return Err(FrameError::UnknownCommand(other.to_owned())),
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame is empty")]
    Empty,
    #[error("unknown STOMP command: {0}")]
    UnknownCommand(String),
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),
    #[error("bad escape sequence in header")]
    BadEscape,
    #[error("frame header section is not valid UTF-8")]
    NotUtf8,
    #[error("content-length is not a number")]
    BadContentLength,
    #[error("frame is truncated")]
    Truncated,
    #[error("frame body has no NUL terminator")]
    MissingTerminator,
}

/// One STOMP frame. Headers keep wire order; on lookup the first
/// occurrence of a repeated name wins, as the protocol requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Frame {
            command,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// First value for `name`, if any.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Body as text, when it is UTF-8.
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Serialize for the wire. Adds `content-length` when there is a body.
    pub fn encode(&self) -> Vec<u8> {
        let escape = self.escaped_headers();
        let mut out = Vec::with_capacity(64 + self.body.len());
        out.extend_from_slice(self.command.as_str().as_bytes());
        out.push(b'\n');
        for (name, value) in &self.headers {
            if escape {
                out.extend_from_slice(escape_header(name).as_bytes());
                out.push(b':');
                out.extend_from_slice(escape_header(value).as_bytes());
            } else {
                out.extend_from_slice(name.as_bytes());
                out.push(b':');
                out.extend_from_slice(value.as_bytes());
            }
            out.push(b'\n');
        }
        if !self.body.is_empty() {
            out.extend_from_slice(format!("content-length:{}\n", self.body.len()).as_bytes());
        }
        out.push(b'\n');
        out.extend_from_slice(&self.body);
        out.push(0);
        out
    }

    /// Parse one frame from a WebSocket message. EOLs left over from a
    /// preceding frame are skipped; both LF and CRLF line endings are
    /// accepted.
    pub fn parse(raw: &[u8]) -> Result<Frame, FrameError> {
        let mut pos = 0;
        while pos < raw.len() && (raw[pos] == b'\n' || raw[pos] == b'\r') {
            pos += 1;
        }
        if pos >= raw.len() {
            return Err(FrameError::Empty);
        }

        let (command_line, next) = take_line(raw, pos)?;
        let command = Command::parse(command_line)?;
        pos = next;

        let mut frame = Frame::new(command);
        loop {
            let (line, next) = take_line(raw, pos)?;
            pos = next;
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| FrameError::MalformedHeader(line.to_owned()))?;
            if frame.escaped_headers() {
                frame
                    .headers
                    .push((unescape_header(name)?, unescape_header(value)?));
            } else {
                frame.headers.push((name.to_owned(), value.to_owned()));
            }
        }

        let content_length = frame
            .header_value("content-length")
            .map(|v| v.parse::<usize>().map_err(|_| FrameError::BadContentLength))
            .transpose()?;

        frame.body = match content_length {
            Some(len) => {
                // The length is peer-supplied; the index math must not wrap.
                let end = pos
                    .checked_add(len)
                    .filter(|&end| end < raw.len())
                    .ok_or(FrameError::Truncated)?;
                if raw[end] != 0 {
                    return Err(FrameError::MissingTerminator);
                }
                raw[pos..end].to_vec()
            }
            None => {
                let rel = raw[pos..]
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or(FrameError::MissingTerminator)?;
                raw[pos..pos + rel].to_vec()
            }
        };

        Ok(frame)
    }

    /// CONNECT and CONNECTED keep raw headers for 1.0 compatibility;
    /// everything else escapes.
    fn escaped_headers(&self) -> bool {
        !matches!(self.command, Command::Connect | Command::Connected)
    }
}

/// A message carrying nothing but an EOL is a keepalive.
pub fn is_heartbeat(raw: &[u8]) -> bool {
    raw == b"\n" || raw == b"\r\n"
}

/// Parse a `heart-beat` header value, `"<sx>,<sy>"` in milliseconds.
pub fn parse_heart_beat(value: &str) -> Option<(u64, u64)> {
    let (sx, sy) = value.split_once(',')?;
    Some((sx.trim().parse().ok()?, sy.trim().parse().ok()?))
}

/// Effective heartbeat intervals after the handshake.
///
/// `client` is what we offered (can-send, want-receive) and `server` what
/// CONNECTED carried back. Returns (outgoing, incoming); `None` turns that
/// direction off.
pub fn negotiate_heartbeat(
    client: (u64, u64),
    server: (u64, u64),
) -> (Option<Duration>, Option<Duration>) {
    let outgoing = if client.0 == 0 || server.1 == 0 {
        None
    } else {
        Some(Duration::from_millis(client.0.max(server.1)))
    };
    let incoming = if client.1 == 0 || server.0 == 0 {
        None
    } else {
        Some(Duration::from_millis(client.1.max(server.0)))
    };
    (outgoing, incoming)
}

/// Next line starting at `pos`, without its LF or CRLF ending.
fn take_line(raw: &[u8], pos: usize) -> Result<(&str, usize), FrameError> {
    let rel = raw[pos..]
        .iter()
        .position(|&b| b == b'\n')
        .ok_or(FrameError::Truncated)?;
    let mut line = &raw[pos..pos + rel];
    if line.last() == Some(&b'\r') {
        line = &line[..line.len() - 1];
    }
    let text = std::str::from_utf8(line).map_err(|_| FrameError::NotUtf8)?;
    Ok((text, pos + rel + 1))
}

fn escape_header(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(text: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            // STOMP 1.2 treats undefined escapes as a fatal error.
            _ => return Err(FrameError::BadEscape),
        }
    }
    Ok(out)
}
