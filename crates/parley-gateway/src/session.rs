//! A live STOMP session over a WebSocket.
//!
//! `connect` performs the CONNECT/CONNECTED handshake, then splits the
//! socket: a writer task drains an outbound queue and emits timed LF
//! keepalives, a reader task parses inbound frames into [`SessionEvent`]s
//! and watches for heartbeat silence. Both tasks exit on socket loss; the
//! event stream always ends with [`SessionEvent::Closed`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Interval, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite};
use tracing::{debug, trace, warn};
use url::Url;
use uuid::Uuid;

use crate::frame::{self, Command, Frame, FrameError};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the writer holds the socket open for the DISCONNECT receipt.
const DISCONNECT_GRACE: Duration = Duration::from_secs(3);

/// Consecutive silent heartbeat intervals before the reader gives up.
const MAX_MISSED_HEARTBEATS: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid gateway URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("WebSocket connect failed: {0}")]
    Connect(#[from] tungstenite::Error),
    #[error("gateway handshake timed out")]
    Timeout,
    #[error("STOMP handshake failed: {0}")]
    Handshake(String),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("gateway session is closed")]
    Closed,
}

/// Identifier handed back by [`GatewaySession::subscribe`]; matches the
/// `subscription` header on incoming messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the reader task reports back to the application.
#[derive(Debug)]
pub enum SessionEvent {
    /// Handshake completed; subscriptions can be made.
    Connected,
    /// A broker MESSAGE frame.
    Message {
        destination: String,
        subscription: String,
        body: String,
    },
    /// A STOMP ERROR frame or unreadable traffic. The broker usually
    /// closes right after sending one.
    ProtocolError(String),
    /// The socket is gone; no further events will arrive.
    Closed,
}

enum Outbound {
    Frame(Frame),
    /// DISCONNECT, then close once its receipt is acknowledged.
    Goodbye(Frame),
}

/// Handle to a connected session. Clones share the same socket.
#[derive(Debug, Clone)]
pub struct GatewaySession {
    outbound: mpsc::UnboundedSender<Outbound>,
    next_subscription: Arc<AtomicU64>,
}

impl GatewaySession {
    /// Open the WebSocket, run the STOMP handshake and spawn the reader
    /// and writer tasks.
    ///
    /// `heartbeat` is the client's `heart-beat` offer in milliseconds
    /// (can-send, want-receive); the effective intervals come out of the
    /// CONNECTED reply. The first event on the returned receiver is
    /// [`SessionEvent::Connected`].
    pub async fn connect(
        ws_url: &str,
        heartbeat: (u64, u64),
    ) -> Result<(GatewaySession, mpsc::UnboundedReceiver<SessionEvent>), GatewayError> {
        let url = Url::parse(ws_url)?;
        let (socket, _) = timeout(CONNECT_TIMEOUT, connect_async(ws_url))
            .await
            .map_err(|_| GatewayError::Timeout)??;
        let (mut sink, mut stream) = socket.split();

        let connect = Frame::new(Command::Connect)
            .header("accept-version", "1.2")
            .header("host", url.host_str().unwrap_or("localhost"))
            .header("heart-beat", format!("{},{}", heartbeat.0, heartbeat.1));
        sink.send(ws_message(&connect)).await?;

        let connected = timeout(CONNECT_TIMEOUT, wait_connected(&mut stream))
            .await
            .map_err(|_| GatewayError::Timeout)??;

        let server_beat = connected
            .header_value("heart-beat")
            .and_then(frame::parse_heart_beat)
            .unwrap_or((0, 0));
        let (outgoing, incoming) = frame::negotiate_heartbeat(heartbeat, server_beat);
        debug!(
            "Gateway connected to {} (keepalive {:?}, watchdog {:?})",
            ws_url, outgoing, incoming
        );

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        // Receipt acknowledgements cross from the reader to the writer,
        // which keeps the socket open until the DISCONNECT receipt lands.
        let (receipt_tx, receipt_rx) = mpsc::unbounded_channel();

        let _ = event_tx.send(SessionEvent::Connected);
        tokio::spawn(write_loop(sink, outbound_rx, receipt_rx, outgoing));
        tokio::spawn(read_loop(stream, event_tx, receipt_tx, incoming));

        let session = GatewaySession {
            outbound: outbound_tx,
            next_subscription: Arc::new(AtomicU64::new(0)),
        };
        Ok((session, event_rx))
    }

    /// Subscribe to a broker destination. Messages for it carry the
    /// returned id in their `subscription` header.
    pub fn subscribe(&self, destination: &str) -> Result<SubscriptionId, GatewayError> {
        let n = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        let id = SubscriptionId(format!("sub-{}", n));
        let frame = Frame::new(Command::Subscribe)
            .header("id", id.as_str())
            .header("destination", destination);
        self.dispatch(frame)?;
        Ok(id)
    }

    /// SEND a JSON payload to an application destination.
    pub fn send_json<T: Serialize>(
        &self,
        destination: &str,
        payload: &T,
    ) -> Result<(), GatewayError> {
        let body = serde_json::to_vec(payload)?;
        let frame = Frame::new(Command::Send)
            .header("destination", destination)
            .header("content-type", "application/json")
            .with_body(body);
        self.dispatch(frame)
    }

    /// Send DISCONNECT and close the socket. Queued frames flush first;
    /// the writer then waits for the broker's RECEIPT (bounded by a short
    /// grace period) before the WebSocket close.
    pub fn disconnect(&self) -> Result<(), GatewayError> {
        let frame =
            Frame::new(Command::Disconnect).header("receipt", Uuid::new_v4().to_string());
        self.outbound
            .send(Outbound::Goodbye(frame))
            .map_err(|_| GatewayError::Closed)
    }

    fn dispatch(&self, frame: Frame) -> Result<(), GatewayError> {
        self.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| GatewayError::Closed)
    }
}

async fn wait_connected(stream: &mut SplitStream<Socket>) -> Result<Frame, GatewayError> {
    while let Some(item) = stream.next().await {
        let raw: Vec<u8> = match item? {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(data) => data,
            Message::Close(_) => {
                return Err(GatewayError::Handshake(
                    "server closed during handshake".into(),
                ));
            }
            _ => continue,
        };
        if frame::is_heartbeat(&raw) {
            continue;
        }
        let frame = Frame::parse(&raw)?;
        return match frame.command {
            Command::Connected => Ok(frame),
            Command::Error => Err(GatewayError::Handshake(
                frame
                    .header_value("message")
                    .unwrap_or("server sent ERROR")
                    .to_owned(),
            )),
            other => Err(GatewayError::Handshake(format!(
                "unexpected {} during handshake",
                other
            ))),
        };
    }
    Err(GatewayError::Handshake(
        "connection closed during handshake".into(),
    ))
}

async fn write_loop(
    mut sink: SplitSink<Socket, Message>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    mut receipts: mpsc::UnboundedReceiver<()>,
    keepalive: Option<Duration>,
) {
    let mut ticker = keepalive.map(tokio::time::interval);
    if let Some(ticker) = ticker.as_mut() {
        // The first tick is immediate; swallow it.
        ticker.tick().await;
    }

    loop {
        tokio::select! {
            item = outbound.recv() => match item {
                Some(Outbound::Frame(frame)) => {
                    trace!("-> {}", frame.command);
                    if let Err(e) = sink.send(ws_message(&frame)).await {
                        debug!("Gateway write failed: {}", e);
                        break;
                    }
                }
                Some(Outbound::Goodbye(frame)) => {
                    trace!("-> {}", frame.command);
                    if sink.send(ws_message(&frame)).await.is_ok() {
                        // A vanished broker ends the wait early: the reader
                        // drops its end of the channel on socket loss.
                        let _ = timeout(DISCONNECT_GRACE, receipts.recv()).await;
                    }
                    let _ = sink.close().await;
                    break;
                }
                None => {
                    let _ = sink.close().await;
                    break;
                }
            },
            _ = tick(&mut ticker) => {
                if sink.send(Message::Text("\n".into())).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn read_loop(
    mut stream: SplitStream<Socket>,
    events: mpsc::UnboundedSender<SessionEvent>,
    receipts: mpsc::UnboundedSender<()>,
    incoming: Option<Duration>,
) {
    let mut watchdog = incoming.map(tokio::time::interval);
    if let Some(watchdog) = watchdog.as_mut() {
        watchdog.tick().await;
    }
    let mut strikes = 0u32;

    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(msg)) => {
                    strikes = 0;
                    let raw: Vec<u8> = match msg {
                        Message::Text(text) => text.into_bytes(),
                        Message::Binary(data) => data,
                        Message::Close(_) => {
                            let _ = events.send(SessionEvent::Closed);
                            return;
                        }
                        _ => continue,
                    };
                    if frame::is_heartbeat(&raw) {
                        trace!("<- heartbeat");
                        continue;
                    }
                    handle_frame(&raw, &events, &receipts);
                }
                Some(Err(e)) => {
                    let _ = events.send(SessionEvent::ProtocolError(format!(
                        "transport error: {}",
                        e
                    )));
                    let _ = events.send(SessionEvent::Closed);
                    return;
                }
                None => {
                    let _ = events.send(SessionEvent::Closed);
                    return;
                }
            },
            _ = tick(&mut watchdog) => {
                strikes += 1;
                if strikes >= MAX_MISSED_HEARTBEATS {
                    warn!(
                        "Heartbeat timeout (missed {} intervals), dropping session",
                        strikes
                    );
                    let _ = events.send(SessionEvent::ProtocolError("heartbeat timeout".into()));
                    let _ = events.send(SessionEvent::Closed);
                    return;
                }
            }
        }
    }
}

fn handle_frame(
    raw: &[u8],
    events: &mpsc::UnboundedSender<SessionEvent>,
    receipts: &mpsc::UnboundedSender<()>,
) {
    match Frame::parse(raw) {
        Ok(frame) => match frame.command {
            Command::Message => {
                let destination = frame
                    .header_value("destination")
                    .unwrap_or_default()
                    .to_owned();
                let subscription = frame
                    .header_value("subscription")
                    .unwrap_or_default()
                    .to_owned();
                let body = String::from_utf8_lossy(&frame.body).into_owned();
                trace!("<- MESSAGE for {} ({} bytes)", destination, body.len());
                let _ = events.send(SessionEvent::Message {
                    destination,
                    subscription,
                    body,
                });
            }
            Command::Error => {
                let reason = frame
                    .header_value("message")
                    .map(str::to_owned)
                    .unwrap_or_else(|| String::from_utf8_lossy(&frame.body).into_owned());
                warn!("Broker ERROR: {}", reason);
                let _ = events.send(SessionEvent::ProtocolError(reason));
            }
            Command::Receipt => {
                trace!("<- RECEIPT {}", frame.header_value("receipt-id").unwrap_or(""));
                // The only receipt this session ever requests is the
                // DISCONNECT one, so no id matching is needed.
                let _ = receipts.send(());
            }
            other => {
                debug!("Ignoring unexpected {} frame", other);
            }
        },
        Err(e) => {
            let _ = events.send(SessionEvent::ProtocolError(format!(
                "unreadable frame: {}",
                e
            )));
        }
    }
}

/// Waits on the interval when there is one, forever when there is none.
async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn ws_message(frame: &Frame) -> Message {
    match String::from_utf8(frame.encode()) {
        Ok(text) => Message::Text(text),
        Err(e) => Message::Binary(e.into_bytes()),
    }
}
