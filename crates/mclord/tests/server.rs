//! End-to-end tests: a real server on an ephemeral port, driven by
//! `tokio-tungstenite` clients.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use mclord::{ServerBuilder, ServerConfig};
use mclord_room::ChessRules;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        ..ServerConfig::default()
    }
}

/// Starts a server on a random port and returns the address.
async fn start_server(config: ServerConfig) -> String {
    let server = ServerBuilder::new(config)
        .build::<ChessRules>()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, text: &str) {
    ws.send(Message::Text(text.into())).await.expect("send");
}

/// Waits for the next text message.
async fn recv(ws: &mut ClientWs) -> String {
    loop {
        let msg = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return text.as_str().to_owned();
        }
    }
}

/// Waits until the server hangs up.
async fn expect_closed(ws: &mut ClientWs) {
    let next = tokio::time::timeout(RECV_TIMEOUT, ws.next())
        .await
        .expect("timed out waiting for close");
    match next {
        None | Some(Err(_)) | Some(Ok(Message::Close(_))) => {}
        Some(Ok(other)) => panic!("expected close, got {other:?}"),
    }
}

/// Hosts a room and returns the host's socket plus the invitation code.
async fn host(addr: &str) -> (ClientWs, String) {
    let mut ws = connect(addr).await;
    send(&mut ws, "mclord_host").await;
    let reply = recv(&mut ws).await;
    let code = reply
        .strip_prefix("host_ok ")
        .unwrap_or_else(|| panic!("expected host_ok, got {reply:?}"))
        .to_owned();
    assert_eq!(code.len(), 4);
    (ws, code)
}

/// Hosts and joins a game. Returns `(white, black)`.
async fn start_game(addr: &str) -> (ClientWs, ClientWs) {
    let (mut host_ws, code) = host(addr).await;
    let mut opp_ws = connect(addr).await;
    send(&mut opp_ws, &format!("mclord_connect {code}")).await;

    let host_start = recv(&mut host_ws).await;
    let opp_start = recv(&mut opp_ws).await;
    match (host_start.as_str(), opp_start.as_str()) {
        ("ok_starting white", "ok_starting black") => (host_ws, opp_ws),
        ("ok_starting black", "ok_starting white") => (opp_ws, host_ws),
        other => panic!("unexpected start messages: {other:?}"),
    }
}

// =========================================================================
// Dispatch
// =========================================================================

#[tokio::test]
async fn test_quick_stats_reports_counts() {
    let addr = start_server(test_config()).await;
    let (_host_ws, _code) = host(&addr).await;

    let mut ws = connect(&addr).await;
    send(&mut ws, "mclord_quick_stats").await;
    assert_eq!(recv(&mut ws).await, "mclord_ok 2 1");
    expect_closed(&mut ws).await;
}

#[tokio::test]
async fn test_unknown_command_is_protocol_error() {
    let addr = start_server(test_config()).await;
    let mut ws = connect(&addr).await;

    send(&mut ws, "hello there").await;
    assert_eq!(recv(&mut ws).await, "disconnect:protocol_error");
    expect_closed(&mut ws).await;
}

#[tokio::test]
async fn test_connect_to_unknown_code() {
    let addr = start_server(test_config()).await;
    let mut ws = connect(&addr).await;

    send(&mut ws, "mclord_connect 0af3").await;
    assert_eq!(recv(&mut ws).await, "disconnect:invalid_code");
    expect_closed(&mut ws).await;
}

#[tokio::test]
async fn test_third_player_is_turned_away() {
    let addr = start_server(test_config()).await;
    let (mut host_ws, code) = host(&addr).await;

    let mut opp_ws = connect(&addr).await;
    send(&mut opp_ws, &format!("mclord_connect {code}")).await;
    assert!(recv(&mut opp_ws).await.starts_with("ok_starting "));
    assert!(recv(&mut host_ws).await.starts_with("ok_starting "));

    let mut third = connect(&addr).await;
    send(&mut third, &format!("mclord_connect {code}")).await;
    assert_eq!(recv(&mut third).await, "disconnect:already_in_game");
    expect_closed(&mut third).await;
}

#[tokio::test]
async fn test_room_limit_refuses_hosting() {
    let config = ServerConfig {
        max_rooms: 1,
        ..test_config()
    };
    let addr = start_server(config).await;
    let (_first, _code) = host(&addr).await;

    let mut second = connect(&addr).await;
    send(&mut second, "mclord_host").await;
    assert_eq!(recv(&mut second).await, "disconnect:overloaded");
}

// =========================================================================
// Admission
// =========================================================================

#[tokio::test]
async fn test_soft_limit_handshakes_then_disconnects() {
    let config = ServerConfig {
        max_online_players: 1,
        max_online_players_hard: 2,
        ..test_config()
    };
    let addr = start_server(config).await;
    let (_host_ws, _code) = host(&addr).await;

    let mut late = connect(&addr).await;
    assert_eq!(recv(&mut late).await, "disconnect:overloaded");
    expect_closed(&mut late).await;
}

#[tokio::test]
async fn test_hard_limit_refuses_handshake() {
    let config = ServerConfig {
        max_online_players: 1,
        max_online_players_hard: 1,
        ..test_config()
    };
    let addr = start_server(config).await;
    let (_host_ws, _code) = host(&addr).await;

    let result = tokio_tungstenite::connect_async(format!("ws://{addr}")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_slot_is_released_after_session_ends() {
    let config = ServerConfig {
        max_online_players: 1,
        max_online_players_hard: 1,
        ..test_config()
    };
    let addr = start_server(config).await;

    let mut first = connect(&addr).await;
    send(&mut first, "mclord_quick_stats").await;
    assert_eq!(recv(&mut first).await, "mclord_ok 1 0");
    expect_closed(&mut first).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut second = connect(&addr).await;
    send(&mut second, "mclord_quick_stats").await;
    assert_eq!(recv(&mut second).await, "mclord_ok 1 0");
}

// =========================================================================
// Play
// =========================================================================

#[tokio::test]
async fn test_moves_are_relayed_and_resign_ends_game() {
    let addr = start_server(test_config()).await;
    let (mut white, mut black) = start_game(&addr).await;

    send(&mut white, "san e4").await;
    assert_eq!(recv(&mut black).await, "san e4");
    send(&mut black, "san e5").await;
    assert_eq!(recv(&mut white).await, "san e5");

    send(&mut black, "resign now").await;
    assert_eq!(recv(&mut white).await, "disconnect:opponent_resigned");
    assert_eq!(recv(&mut black).await, "disconnect:you_resigned");
    expect_closed(&mut white).await;
    expect_closed(&mut black).await;
}

#[tokio::test]
async fn test_bare_resign_is_protocol_error() {
    let addr = start_server(test_config()).await;
    let (mut white, mut black) = start_game(&addr).await;

    send(&mut white, "resign").await;
    assert_eq!(recv(&mut white).await, "disconnect:protocol_error");
    assert_eq!(recv(&mut black).await, "disconnect:opponent_disconnected");
}

#[tokio::test]
async fn test_checkmate_ends_game() {
    let addr = start_server(test_config()).await;
    let (mut white, mut black) = start_game(&addr).await;

    for (mover, san) in [("w", "f3"), ("b", "e5"), ("w", "g4"), ("b", "Qh4#")] {
        let (from, to) = if mover == "w" {
            (&mut white, &mut black)
        } else {
            (&mut black, &mut white)
        };
        send(from, &format!("san {san}")).await;
        assert_eq!(recv(to).await, format!("san {san}"));
    }

    assert_eq!(recv(&mut black).await, "disconnect:you_won");
    assert_eq!(recv(&mut white).await, "disconnect:you_lost");
    expect_closed(&mut white).await;
    expect_closed(&mut black).await;
}

#[tokio::test]
async fn test_out_of_turn_move_ends_both_sessions() {
    let addr = start_server(test_config()).await;
    let (mut white, mut black) = start_game(&addr).await;

    send(&mut black, "san e5").await;
    assert_eq!(recv(&mut black).await, "disconnect:protocol_error");
    assert_eq!(recv(&mut white).await, "disconnect:opponent_disconnected");
    expect_closed(&mut white).await;
}

#[tokio::test]
async fn test_illegal_move_is_protocol_error() {
    let addr = start_server(test_config()).await;
    let (mut white, mut black) = start_game(&addr).await;

    send(&mut white, "san Ke2").await;
    assert_eq!(recv(&mut white).await, "disconnect:protocol_error");
    assert_eq!(recv(&mut black).await, "disconnect:opponent_disconnected");
}

#[tokio::test]
async fn test_opponent_hangup_notifies_host() {
    let addr = start_server(test_config()).await;
    let (white, mut black) = start_game(&addr).await;

    drop(white);
    assert_eq!(recv(&mut black).await, "disconnect:opponent_disconnected");
    expect_closed(&mut black).await;
}

#[tokio::test]
async fn test_move_before_opponent_joins_is_protocol_error() {
    let addr = start_server(test_config()).await;
    let (mut host_ws, _code) = host(&addr).await;

    send(&mut host_ws, "san e4").await;
    assert_eq!(recv(&mut host_ws).await, "disconnect:protocol_error");
}

// =========================================================================
// Timers
// =========================================================================

#[tokio::test]
async fn test_host_times_out_without_opponent() {
    let config = ServerConfig {
        host_wait_secs: 1,
        ..test_config()
    };
    let addr = start_server(config).await;
    let (mut host_ws, code) = host(&addr).await;

    assert_eq!(recv(&mut host_ws).await, "disconnect:host_timeout");
    expect_closed(&mut host_ws).await;

    let mut late = connect(&addr).await;
    send(&mut late, &format!("mclord_connect {code}")).await;
    assert_eq!(recv(&mut late).await, "disconnect:invalid_code");
}

#[tokio::test]
async fn test_clock_runs_out_for_white() {
    let config = ServerConfig {
        player_time_secs: 1,
        ..test_config()
    };
    let addr = start_server(config).await;
    let (mut white, mut black) = start_game(&addr).await;

    assert_eq!(recv(&mut white).await, "disconnect:timed_out_black");
    assert_eq!(recv(&mut black).await, "disconnect:timed_out_black");
}
