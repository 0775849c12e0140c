/// End-to-end test for a joined room: a scripted HTTP server answers the
/// REST calls and a scripted STOMP broker on a loopback WebSocket carries
/// the live traffic, including an encrypted private exchange.
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use parley_api::{ApiClient, ApiError};
use parley_client::private::PrivateChat;
use parley_client::room::{ChatEvent, RoomChat};
use parley_crypto::{derive_shared_secret, encrypt_message};
use parley_gateway::{Command, Frame, frame};

type BrokerSocket = WebSocketStream<TcpStream>;

/// Serve canned responses in order, one connection each.
async fn scripted_http(responses: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let Ok(n) = stream.read(&mut buf).await else {
                    return;
                };
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });
    base
}

fn http_response(status_line: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body,
    )
}

/// Headers plus `content-length` bytes of body, if any.
fn request_complete(raw: &[u8]) -> bool {
    let Some(header_end) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let headers = String::from_utf8_lossy(&raw[..header_end]);
    let content_length = headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);
    raw.len() >= header_end + 4 + content_length
}

async fn bind_broker() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/chat/websocket", listener.local_addr().unwrap());
    (listener, url)
}

async fn next_frame(ws: &mut BrokerSocket) -> Option<Frame> {
    while let Some(item) = ws.next().await {
        let raw = match item.ok()? {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(data) => data,
            Message::Close(_) => return None,
            _ => continue,
        };
        if frame::is_heartbeat(&raw) {
            continue;
        }
        return Frame::parse(&raw).ok();
    }
    None
}

async fn send_frame(ws: &mut BrokerSocket, frame: Frame) {
    let text = String::from_utf8(frame.encode()).unwrap();
    ws.send(Message::Text(text)).await.unwrap();
}

fn message_frame(destination: &str, subscription: &str, body: Vec<u8>) -> Frame {
    Frame::new(Command::Message)
        .header("destination", destination)
        .header("message-id", "m-1")
        .header("subscription", subscription)
        .with_body(body)
}

#[tokio::test]
async fn room_and_private_traffic_end_to_end() {
    let room_json = r#"{"roomId":"lobby","messages":[]}"#;
    let history_json = r#"[{"sender":"bob","content":"early bird","timestamp":"2026-03-01T10:00:00.000Z","messageType":"TEXT"}]"#;
    let base = scripted_http(vec![
        http_response("200 OK", room_json),
        http_response("200 OK", history_json),
    ])
    .await;

    let (listener, ws_url) = bind_broker().await;
    let broker = tokio::spawn(async move {
        let mut ws = accept_and_connect(&listener).await;

        // One subscription for the room topic, one for the user queue.
        let first = next_frame(&mut ws).await.unwrap();
        let second = next_frame(&mut ws).await.unwrap();
        let (room_sub, private_sub) = match first.header_value("destination") {
            Some("/topic/room/lobby") => (first, second),
            _ => (second, first),
        };
        assert_eq!(
            room_sub.header_value("destination"),
            Some("/topic/room/lobby")
        );
        assert_eq!(
            private_sub.header_value("destination"),
            Some("/user/alice/private")
        );
        let room_id = room_sub.header_value("id").unwrap().to_owned();
        let private_id = private_sub.header_value("id").unwrap().to_owned();

        // The room send arrives as JSON with a server-bindable timestamp.
        let send = next_frame(&mut ws).await.unwrap();
        assert_eq!(send.command, Command::Send);
        assert_eq!(
            send.header_value("destination"),
            Some("/app/sendMessage/lobby")
        );
        let sent = send.body_text().unwrap();
        assert!(sent.contains(r#""content":"hello room""#));
        assert!(sent.contains(r#""messageType":"TEXT""#));
        assert!(sent.contains(r#""messageTime":""#));

        // Broadcast it back on the topic, timestamp stamped.
        let broadcast = serde_json::to_vec(&serde_json::json!({
            "sender": "alice",
            "content": "hello room",
            "timestamp": "2026-03-01T10:05:00.000Z",
            "messageType": "TEXT",
        }))
        .unwrap();
        send_frame(
            &mut ws,
            message_frame("/topic/room/lobby", &room_id, broadcast),
        )
        .await;

        // The private send carries ciphertext, not the typed text.
        let private = next_frame(&mut ws).await.unwrap();
        assert_eq!(private.header_value("destination"), Some("/app/private"));
        let sealed = private.body_text().unwrap();
        assert!(sealed.contains(r#""sender":"alice""#));
        assert!(sealed.contains(r#""receiver":"bob""#));
        assert!(!sealed.contains("secret plan"));

        // Bob answers; the broker delivers to alice's queue.
        let secret = derive_shared_secret("bob", "alice");
        let reply = serde_json::to_vec(&serde_json::json!({
            "id": "7",
            "sender": "bob",
            "receiver": "alice",
            "content": encrypt_message("on my way", &secret).unwrap(),
            "timestamp": "2026-03-01T10:06:00.000Z",
        }))
        .unwrap();
        send_frame(
            &mut ws,
            message_frame("/user/alice/private", &private_id, reply),
        )
        .await;

        let disconnect = next_frame(&mut ws).await.unwrap();
        assert_eq!(disconnect.command, Command::Disconnect);
        let receipt = disconnect.header_value("receipt").unwrap().to_owned();
        send_frame(
            &mut ws,
            Frame::new(Command::Receipt).header("receipt-id", receipt),
        )
        .await;
    });

    let api = ApiClient::new(&base).unwrap();
    let mut room_chat = RoomChat::join(api, &ws_url, "alice", "lobby").await.unwrap();
    assert_eq!(room_chat.room_id(), "lobby");
    assert_eq!(room_chat.history().len(), 1);
    assert_eq!(room_chat.history()[0].sender, "bob");

    room_chat.send_text("hello room").unwrap();
    match room_chat.next_event().await {
        Some(ChatEvent::Room(message)) => {
            assert_eq!(message.sender, "alice");
            assert_eq!(message.content, "hello room");
        }
        other => panic!("expected a room message, got {:?}", other),
    }

    let chat = PrivateChat::new("alice", "bob");
    let sealed = chat.seal("secret plan").unwrap();
    room_chat.send_private(&sealed).unwrap();

    match room_chat.next_event().await {
        Some(ChatEvent::Private(message)) => {
            assert!(chat.involves(&message));
            let opened = chat.open(message);
            assert_eq!(opened.content, "on my way");
        }
        other => panic!("expected a private message, got {:?}", other),
    }

    // leave() returns only after the goodbye completed on the wire.
    room_chat.leave().await;
    broker.await.unwrap();
}

async fn accept_and_connect(listener: &TcpListener) -> BrokerSocket {
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
    let connect = next_frame(&mut ws).await.unwrap();
    assert_eq!(connect.command, Command::Connect);
    assert_eq!(connect.header_value("heart-beat"), Some("10000,10000"));
    send_frame(
        &mut ws,
        Frame::new(Command::Connected)
            .header("version", "1.2")
            .header("heart-beat", "0,0"),
    )
    .await;
    ws
}

#[tokio::test]
async fn join_vanished_room_reports_not_found() {
    let base = scripted_http(vec![http_response("404 Not Found", "Room not found!")]).await;

    let api = ApiClient::new(&base).unwrap();
    let err = RoomChat::join(api, "ws://127.0.0.1:9/chat/websocket", "alice", "ghost")
        .await
        .unwrap_err();

    // The REST failure must stay downcastable through the context chain.
    let api_err = err.downcast_ref::<ApiError>().expect("ApiError in chain");
    assert!(api_err.is_not_found());
}
