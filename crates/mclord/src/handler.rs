//! Per-connection handler: handshake, dispatch, play, teardown.
//!
//! Each admitted connection gets its own session running this handler.
//! The flow is:
//!   1. Upgrade handshake (a bad request gets a 400 and ends here)
//!   2. Soft-overloaded connections are told `overloaded` and end here
//!   3. One initial command: host, quick stats, or connect
//!   4. Loop: `san <move>` / `resign` until the game ends
//!   5. Teardown, on every path
//!
//! The session never writes to a socket itself; everything goes through
//! [`PeerHandle`](mclord_transport::PeerHandle) queues, and a peer closed
//! by anyone else (room, watchdog, opponent's teardown) wakes the pending
//! read with [`TransportError::Closed`](mclord_transport::TransportError::Closed).

use std::net::SocketAddr;
use std::sync::Arc;

use mclord_protocol::{ClientCommand, DisconnectReason, GameCommand, ServerMessage};
use mclord_room::{GameRoom, MoveOutcome, RulesEngine};
use mclord_session::{AdmissionDecision, OnlinePermit, Role, SessionPhase};
use mclord_transport::Connection;
use tokio::net::TcpStream;
use tracing::Instrument;

use crate::McLordError;
use crate::server::ServerState;

/// Runs one connection from accept to close.
pub(crate) async fn handle_connection<R>(
    stream: TcpStream,
    addr: SocketAddr,
    decision: AdmissionDecision,
    permit: OnlinePermit,
    state: Arc<ServerState<R>>,
) where
    R: RulesEngine + Default,
{
    let conn = Connection::open(stream, state.read_timeout);
    let span = tracing::info_span!("session", conn = %conn.peer().id(), %addr);
    let session = Session {
        conn,
        state,
        binding: None,
        phase: SessionPhase::Handshaking,
    };
    session.run(decision, permit).instrument(span).await;
}

struct Session<R> {
    conn: Connection,
    state: Arc<ServerState<R>>,
    /// The room this session plays in, once hosting or joining succeeded.
    binding: Option<(Arc<GameRoom<R>>, Role)>,
    phase: SessionPhase,
}

impl<R> Session<R>
where
    R: RulesEngine + Default,
{
    async fn run(mut self, decision: AdmissionDecision, permit: OnlinePermit) {
        match self.drive(decision).await {
            Ok(()) => tracing::debug!(phase = %self.phase, "session finished"),
            Err(err) => {
                if let Some(reason) = notice_for(&err) {
                    self.conn.peer().notify(&ServerMessage::Disconnect(reason));
                }
                tracing::debug!(phase = %self.phase, error = %err, "session ended");
            }
        }
        self.teardown(permit).await;
    }

    async fn drive(&mut self, decision: AdmissionDecision) -> Result<(), McLordError> {
        self.conn.accept_handshake().await?;

        if decision == AdmissionDecision::AcceptThenDisconnect {
            self.conn
                .peer()
                .notify(&ServerMessage::Disconnect(DisconnectReason::Overloaded));
            return Ok(());
        }

        self.phase = SessionPhase::Dispatching;
        let tokens = self.conn.read_message().await?;
        match ClientCommand::parse(&tokens)? {
            ClientCommand::Host => {
                self.phase = SessionPhase::Hosting;
                let peer = self.conn.peer().clone();
                let room = self.state.registry.host(peer).await?;
                self.binding = Some((room, Role::Host));
            }
            ClientCommand::QuickStats => {
                self.phase = SessionPhase::Stats;
                let stats = ServerMessage::Stats {
                    online: self.state.admission.online(),
                    rooms: self.state.registry.len().await,
                };
                self.conn.peer().notify(&stats);
                return Ok(());
            }
            ClientCommand::Connect(code) => {
                self.phase = SessionPhase::Joining;
                let peer = self.conn.peer().clone();
                let room = self.state.registry.join(code, peer).await?;
                self.binding = Some((room, Role::Opponent));
            }
        }

        self.phase = SessionPhase::Playing;
        self.play().await
    }

    async fn play(&mut self) -> Result<(), McLordError> {
        let Some((room, role)) = self.binding.clone() else {
            return Ok(());
        };

        loop {
            let tokens = self.conn.read_message().await?;
            match GameCommand::parse(&tokens)? {
                GameCommand::Resign => {
                    room.resign(role).await?;
                    return Ok(());
                }
                GameCommand::Move(san) => {
                    if room.apply_move(role, &san).await? == MoveOutcome::Finished {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs on every exit path: closes this peer, releases the online
    /// slot, and dissolves the room if this session was bound to one.
    async fn teardown(mut self, permit: OnlinePermit) {
        self.phase = SessionPhase::Closed;
        self.conn.peer().close();
        drop(permit);

        if let Some((room, role)) = self.binding.take() {
            self.state.registry.release(&room, role).await;
        }
    }
}

/// The `disconnect:` notice owed to the client for `err`, if any.
fn notice_for(err: &McLordError) -> Option<DisconnectReason> {
    match err {
        McLordError::Protocol(_) => Some(DisconnectReason::ProtocolError),
        McLordError::Transport(e) if e.is_protocol_violation() => {
            Some(DisconnectReason::ProtocolError)
        }
        McLordError::Transport(_) | McLordError::Config(_) => None,
        McLordError::Room(e) => e.disconnect_reason(),
    }
}
