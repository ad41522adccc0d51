//! Integration tests for the connection layer.
//!
//! Most tests drive a [`Connection`] over an in-memory duplex pipe and
//! play the client side by hand: write the upgrade request, read the
//! response, then exchange masked/unmasked frames byte by byte.

use std::time::Duration;

use mclord_protocol::handshake::{accept_token, switching_protocols_response};
use mclord_protocol::{frame, DisconnectReason, ServerMessage};
use mclord_transport::{Connection, TcpTransport, TransportError};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

const KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";
const MASK: [u8; 4] = [9, 8, 7, 6];
const TIMEOUT: Duration = Duration::from_secs(30);

fn upgrade_request(key: &str) -> String {
    format!(
        "GET / HTTP/1.1\r\nHost: localhost\r\nUpgrade: websocket\r\n\
         Connection: Upgrade\r\nSec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Version: 13\r\n\r\n"
    )
}

/// Opens a server-side connection and returns the client end of the pipe.
fn open_pair() -> (Connection, DuplexStream) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    (Connection::open(server, TIMEOUT), client)
}

async fn read_server_frame(client: &mut DuplexStream) -> String {
    let mut header = [0u8; 2];
    client.read_exact(&mut header).await.expect("frame header");
    assert_eq!(header[0], frame::FINAL_TEXT_FRAME);
    let mut payload = vec![0u8; usize::from(header[1])];
    client.read_exact(&mut payload).await.expect("frame payload");
    String::from_utf8(payload).expect("utf-8")
}

async fn upgraded_pair() -> (Connection, DuplexStream) {
    let (mut conn, mut client) = open_pair();
    client
        .write_all(upgrade_request(KEY).as_bytes())
        .await
        .unwrap();
    conn.accept_handshake().await.expect("handshake");

    let expected = switching_protocols_response(&accept_token(KEY));
    let mut response = vec![0u8; expected.len()];
    client.read_exact(&mut response).await.unwrap();
    assert_eq!(String::from_utf8(response).unwrap(), expected);
    (conn, client)
}

#[tokio::test]
async fn test_handshake_answers_with_accept_token() {
    let (conn, _client) = upgraded_pair().await;
    assert!(!conn.peer().is_closed());
}

#[tokio::test]
async fn test_bad_handshake_gets_400_then_eof() {
    let (mut conn, mut client) = open_pair();
    client
        .write_all(b"POST / HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();

    let err = conn.accept_handshake().await.unwrap_err();
    assert!(matches!(err, TransportError::HandshakeRejected(_)));
    conn.peer().close();

    let mut response = String::new();
    client.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
}

#[tokio::test]
async fn test_read_message_tokenizes_frames() {
    let (mut conn, mut client) = upgraded_pair().await;
    client
        .write_all(&frame::encode_masked(b"san Nf3", MASK).unwrap())
        .await
        .unwrap();
    client
        .write_all(&frame::encode_masked(b"resign", MASK).unwrap())
        .await
        .unwrap();

    assert_eq!(conn.read_message().await.unwrap(), vec!["san", "Nf3"]);
    assert_eq!(conn.read_message().await.unwrap(), vec!["resign"]);
}

#[tokio::test]
async fn test_unmasked_frame_is_a_violation() {
    let (mut conn, mut client) = upgraded_pair().await;
    client.write_all(&[0x81, 0x02, b'h', b'i']).await.unwrap();

    let err = conn.read_message().await.unwrap_err();
    assert!(err.is_protocol_violation());
}

#[tokio::test]
async fn test_client_hangup_is_not_a_violation() {
    let (mut conn, client) = upgraded_pair().await;
    drop(client);

    let err = conn.read_message().await.unwrap_err();
    assert!(matches!(err, TransportError::Protocol(_)));
    assert!(!err.is_protocol_violation());
}

#[tokio::test]
async fn test_sent_messages_arrive_as_frames() {
    let (conn, mut client) = upgraded_pair().await;
    conn.peer()
        .send(&ServerMessage::TimeSync { host: 100, opponent: 200 })
        .unwrap();
    assert_eq!(read_server_frame(&mut client).await, "time_sync 100 200");
}

#[tokio::test]
async fn test_close_flushes_queue_then_shuts_down() {
    let (conn, mut client) = upgraded_pair().await;
    let peer = conn.peer().clone();
    peer.send(&ServerMessage::Move("e4".into())).unwrap();
    peer.send(&ServerMessage::Disconnect(DisconnectReason::YouLost))
        .unwrap();
    peer.close();

    assert_eq!(read_server_frame(&mut client).await, "san e4");
    assert_eq!(read_server_frame(&mut client).await, "disconnect:you_lost");
    let mut rest = Vec::new();
    client.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_close_wakes_pending_read() {
    let (mut conn, _client) = upgraded_pair().await;
    let peer = conn.peer().clone();

    let reader = tokio::spawn(async move { conn.read_message().await });
    tokio::task::yield_now().await;
    peer.close();

    let result = reader.await.unwrap();
    assert!(matches!(result, Err(TransportError::Closed)));
}

#[tokio::test(start_paused = true)]
async fn test_read_times_out() {
    let (client, server) = tokio::io::duplex(1024);
    let mut conn = Connection::open(server, Duration::from_secs(2));

    let err = conn.accept_handshake().await.unwrap_err();
    assert!(matches!(err, TransportError::TimedOut(d) if d == Duration::from_secs(2)));
    drop(client);
}

#[tokio::test(start_paused = true)]
async fn test_close_releases_writer_blocked_on_stalled_reader() {
    let (mut client, server) = tokio::io::duplex(16);
    let conn = Connection::open(server, TIMEOUT);
    let peer = conn.peer().clone();
    for _ in 0..8 {
        peer.send(&ServerMessage::Disconnect(DisconnectReason::OpponentDisconnected))
            .unwrap();
    }
    tokio::task::yield_now().await;

    // The client never reads, so the writer is stuck mid-frame.
    peer.close();
    drop(conn);
    tokio::time::sleep(Duration::from_secs(60)).await;

    // Once both halves of the server end are gone the pipe is broken.
    let err = client.write_all(b"x").await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
}

#[tokio::test]
async fn test_tcp_transport_binds_ephemeral_port() {
    let transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = transport.local_addr().unwrap();
    assert_ne!(addr.port(), 0);

    let client = tokio::spawn(async move {
        tokio::net::TcpStream::connect(addr).await.unwrap()
    });
    let (stream, peer_addr) = transport.accept().await.unwrap();
    let client = client.await.unwrap();

    assert_eq!(peer_addr, client.local_addr().unwrap());
    assert!(stream.nodelay().unwrap());
}
