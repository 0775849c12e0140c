//! `parley` binary: a line-oriented chat client.
//!
//! Plain input goes to the room you joined, or to the open private
//! conversation. `/help` lists the commands.

use std::io::Write as _;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use parley_api::{ApiClient, ApiError};
use parley_client::command::Command;
use parley_client::config::ClientConfig;
use parley_client::format::time_ago;
use parley_client::private::PrivateChat;
use parley_client::room::{ChatEvent, RoomChat};
use parley_client::session::{SavedSession, SessionStore};
use parley_client::validate;
use parley_types::models::{ChatMessage, MessageKind, PrivateMessage};

type Lines = tokio::io::Lines<BufReader<tokio::io::Stdin>>;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=info".into()),
        )
        .init();

    let config = ClientConfig::from_env();
    let api = ApiClient::new(&config.server_url)
        .with_context(|| format!("invalid server URL {}", config.server_url))?;
    let store = SessionStore::new(&config.session_file);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // Pick up where we left off, or walk through sign-in and room choice.
    let mut room_chat = match resume(&store, &api, &config).await {
        Some(chat) => chat,
        None => {
            let username = sign_in(&api, &mut lines).await?;
            let chat = choose_room(&api, &config, &username, &mut lines).await?;
            let session = SavedSession {
                username,
                room_id: chat.room_id().to_owned(),
            };
            if let Err(e) = store.save(&session) {
                warn!("Could not save session: {:#}", e);
            }
            chat
        }
    };

    println!("-- {} as {} --", room_chat.room_id(), room_chat.username());
    for message in room_chat.history() {
        print_room_message(room_chat.api(), message, room_chat.username());
    }
    println!("(/help for commands)");

    run(&mut room_chat, &mut lines, &store).await?;

    room_chat.leave().await;
    Ok(())
}

/// Input/event loop for a joined room. Returns when the user leaves,
/// stdin closes, or the gateway goes away.
async fn run(room_chat: &mut RoomChat, lines: &mut Lines, store: &SessionStore) -> Result<()> {
    let mut open_chat: Option<PrivateChat> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                match Command::parse(&line) {
                    Command::Empty => {}
                    Command::Say(text) => match &open_chat {
                        Some(chat) => send_sealed(room_chat, chat, &text),
                        None => {
                            if let Err(e) = room_chat.send_text(&text) {
                                println!("Send failed: {:#}", e);
                            }
                        }
                    },
                    Command::Msg { to, text } => {
                        let reuse = open_chat
                            .as_ref()
                            .is_some_and(|chat| chat.counterpart() == to);
                        if !reuse {
                            let chat = PrivateChat::new(room_chat.username(), to.as_str());
                            match chat.history(room_chat.api()).await {
                                Ok(history) => {
                                    println!("-- conversation with {} --", chat.counterpart());
                                    for message in &history {
                                        print_private(message, room_chat.username());
                                    }
                                }
                                Err(e) => println!("Could not load conversation: {:#}", e),
                            }
                            open_chat = Some(chat);
                        }
                        if let Some(chat) = &open_chat {
                            send_sealed(room_chat, chat, &text);
                        }
                    }
                    Command::Close => match open_chat.take() {
                        Some(chat) => println!("Closed conversation with {}", chat.counterpart()),
                        None => println!("No conversation open."),
                    },
                    Command::Users(query) => match room_chat.api().search_users(&query).await {
                        Ok(users) if users.is_empty() => println!("Nobody matches {:?}", query),
                        Ok(users) => {
                            for user in users {
                                println!("{}", user.username);
                            }
                        }
                        Err(e) => println!("Search failed: {:#}", e),
                    },
                    Command::Upload(path) => match room_chat.send_media(&path).await {
                        Ok(kind) => {
                            let noun = match kind {
                                MessageKind::Image => "image",
                                MessageKind::Audio => "audio",
                                MessageKind::Text => "file",
                            };
                            println!("Shared {} as {}", path.display(), noun);
                        }
                        Err(e) => println!("Upload failed: {:#}", e),
                    },
                    Command::Leave => {
                        if let Err(e) = store.clear() {
                            warn!("Could not clear session file: {:#}", e);
                        }
                        break;
                    }
                    Command::Help => print_help(),
                    Command::Unknown(cmd) => println!("Unknown command {:?} (try /help)", cmd),
                }
            }
            event = room_chat.next_event() => match event {
                Some(ChatEvent::Room(message)) => {
                    print_room_message(room_chat.api(), &message, room_chat.username());
                }
                Some(ChatEvent::Private(message)) => match &open_chat {
                    Some(chat) if chat.involves(&message) => {
                        let opened = chat.open(message);
                        print_private(&opened, room_chat.username());
                    }
                    _ => println!(
                        "* message from {} (open with /msg {} <text>)",
                        message.sender, message.sender
                    ),
                },
                Some(ChatEvent::Error(reason)) => warn!("Gateway error: {}", reason),
                Some(ChatEvent::Disconnected) | None => {
                    println!("Connection lost.");
                    break;
                }
            },
        }
    }
    Ok(())
}

/// Rejoin the room remembered from last time. A stale or broken session
/// file just falls through to the interactive flow.
async fn resume(store: &SessionStore, api: &ApiClient, config: &ClientConfig) -> Option<RoomChat> {
    let saved = store.load()?;
    info!("Resuming {} in room {}", saved.username, saved.room_id);
    match RoomChat::join(api.clone(), &config.ws_url, &saved.username, &saved.room_id).await {
        Ok(chat) => Some(chat),
        Err(e) => {
            warn!("Saved session unusable: {:#}", e);
            if let Err(e) = store.clear() {
                warn!("Could not clear session file: {:#}", e);
            }
            None
        }
    }
}

/// Log in or register until a login succeeds; returns the username.
/// Registration deliberately does not log you in, it loops back so the
/// fresh credentials get exercised once.
async fn sign_in(api: &ApiClient, lines: &mut Lines) -> Result<String> {
    loop {
        let choice = prompt(lines, "(l)ogin or (r)egister? ").await?;
        let register = match choice.trim() {
            "l" | "login" => false,
            "r" | "register" => true,
            _ => {
                println!("Please answer l or r.");
                continue;
            }
        };
        // Format rules are a registration-time gate; signing in takes the
        // credentials as typed so pre-existing accounts stay reachable.
        let (username, password) = if register {
            (
                prompt_valid(lines, "username: ", validate::username).await?,
                prompt_valid(lines, "password: ", validate::password).await?,
            )
        } else {
            (
                prompt_valid(lines, "username: ", validate::credential).await?,
                prompt_valid(lines, "password: ", validate::credential).await?,
            )
        };

        if register {
            match api.register(&username, &password).await {
                Ok(user) => println!("Registered {}. Please log in.", user.username),
                Err(ApiError::Rejected { message, .. }) => println!("{}", message),
                Err(e) => return Err(e).context("registering"),
            }
            continue;
        }
        match api.login(&username, &password).await {
            Ok(user) => return Ok(user.username),
            Err(ApiError::Rejected { message, .. }) => println!("{}", message),
            Err(e) => return Err(e).context("logging in"),
        }
    }
}

/// Join or create a room until a join succeeds.
async fn choose_room(
    api: &ApiClient,
    config: &ClientConfig,
    username: &str,
    lines: &mut Lines,
) -> Result<RoomChat> {
    loop {
        let choice = prompt(lines, "(j)oin or (c)reate a room? ").await?;
        let create = match choice.trim() {
            "j" | "join" => false,
            "c" | "create" => true,
            _ => {
                println!("Please answer j or c.");
                continue;
            }
        };
        let room_id = prompt_valid(lines, "room id: ", validate::room_id).await?;

        if create {
            match api.create_room(&room_id).await {
                Ok(room) => println!("Created room {}", room.room_id),
                Err(ApiError::Rejected { message, .. }) => {
                    println!("{}", message);
                    continue;
                }
                Err(e) => return Err(e).context("creating room"),
            }
        }
        match RoomChat::join(api.clone(), &config.ws_url, username, &room_id).await {
            Ok(chat) => return Ok(chat),
            Err(e) if is_not_found(&e) => println!("Room not found!"),
            Err(e) => return Err(e),
        }
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<ApiError>()
        .is_some_and(ApiError::is_not_found)
}

/// Seal `text` for the open conversation and publish it. The broker only
/// delivers to the receiver, so our own half is echoed locally.
fn send_sealed(room_chat: &RoomChat, chat: &PrivateChat, text: &str) {
    match chat.seal(text) {
        Ok(message) => match room_chat.send_private(&message) {
            Ok(()) => println!("[you -> {}] {}", chat.counterpart(), text),
            Err(e) => println!("Send failed: {:#}", e),
        },
        Err(e) => println!("Could not seal message: {:#}", e),
    }
}

fn print_room_message(api: &ApiClient, message: &ChatMessage, me: &str) {
    let when = message
        .timestamp
        .map(|ts| time_ago(ts, Utc::now()))
        .unwrap_or_else(|| "just now".into());
    let sender = if message.sender == me {
        "you"
    } else {
        message.sender.as_str()
    };
    let content = match message.message_type {
        MessageKind::Text => message.content.clone(),
        // Media content is a server-relative path; show it resolved.
        MessageKind::Image | MessageKind::Audio => api
            .media_url(&message.content)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| message.content.clone()),
    };
    println!("[{}] {}: {}", when, sender, content);
}

fn print_private(message: &PrivateMessage, me: &str) {
    let when = message
        .timestamp
        .map(|ts| time_ago(ts, Utc::now()))
        .unwrap_or_else(|| "just now".into());
    let sender = if message.sender == me {
        "you"
    } else {
        message.sender.as_str()
    };
    println!("[{}] {} (private): {}", when, sender, message.content);
}

async fn prompt(lines: &mut Lines, label: &str) -> Result<String> {
    print!("{}", label);
    std::io::stdout().flush()?;
    lines
        .next_line()
        .await
        .context("reading stdin")?
        .context("stdin closed")
}

async fn prompt_valid(
    lines: &mut Lines,
    label: &str,
    check: fn(&str) -> Result<(), &'static str>,
) -> Result<String> {
    loop {
        let value = prompt(lines, label).await?;
        match check(&value) {
            Ok(()) => return Ok(value),
            Err(reason) => println!("{}", reason),
        }
    }
}

fn print_help() {
    println!("Plain text goes to the room, or to the open private conversation.");
    println!("  /msg <user> <text>   message a user (end-to-end encrypted)");
    println!("  /close               stop messaging privately, talk to the room");
    println!("  /users <query>       search usernames");
    println!("  /upload <path>       share a file with the room");
    println!("  /leave               leave the room and forget the session");
    println!("  /help                this text");
}
