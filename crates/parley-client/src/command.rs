//! Parsing for lines typed at the prompt.

use std::path::PathBuf;

/// A line typed at the prompt. Anything not starting with `/` is chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    Upload(PathBuf),
    Users(String),
    Msg { to: String, text: String },
    Close,
    Leave,
    Help,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        if !line.starts_with('/') {
            return Command::Say(line.to_owned());
        }

        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        match name {
            "/upload" if !rest.is_empty() => Command::Upload(PathBuf::from(rest)),
            "/users" if !rest.is_empty() => Command::Users(rest.to_owned()),
            "/msg" => {
                if let Some((to, text)) = rest.split_once(char::is_whitespace) {
                    let text = text.trim();
                    if !text.is_empty() {
                        return Command::Msg {
                            to: to.to_owned(),
                            text: text.to_owned(),
                        };
                    }
                }
                Command::Unknown(line.to_owned())
            }
            "/close" => Command::Close,
            "/leave" => Command::Leave,
            "/help" => Command::Help,
            _ => Command::Unknown(line.to_owned()),
        }
    }
}
