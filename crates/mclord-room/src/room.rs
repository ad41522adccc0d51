//! A single match between a host and an opponent.
//!
//! A `GameRoom` is shared (`Arc`) between the registry, both players'
//! session handlers, and the watchdog. Everything that changes during play
//! lives behind one per-room lock, so a move, a resignation and a clock
//! tick on the same room never interleave.
//!
//! ```text
//!   created ──join_second──► playing ──┬── checkmate ──► finished
//!      │                               ├── resign
//!      │                               └── clock ≤ 0 ──► expired
//!      └── host wait exceeded ─────────────────────────► expired
//! ```

use std::fmt;

use mclord_protocol::{Color, DisconnectReason, InvitationCode, ServerMessage, frame};
use mclord_session::Role;
use mclord_transport::PeerHandle;
use tokio::sync::Mutex;

use crate::{ORPHAN_GRACE_TICKS, RoomConfig, RoomError, RulesEngine, TIME_SYNC_INTERVAL_TICKS};

/// Result of a successfully applied move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Play continues; the turn passed to the other side.
    Continue,
    /// The move ended the game. Both players were notified and closed.
    Finished,
}

/// What one tick did to a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomTick {
    /// Waiting or clock counters advanced.
    Aged,
    /// A player's connection is closed; the room was left alone.
    Skipped,
    /// The room is done and should be removed from the registry.
    Expired,
}

/// Mutable play state, guarded by the room lock.
struct PlayState<R> {
    /// Set once by [`GameRoom::join_second`], never cleared.
    opponent: Option<PeerHandle>,
    mover: Role,
    host_remaining: i64,
    opponent_remaining: i64,
    waiting_ticks: u32,
    ticks_existed: u64,
    /// Consecutive ticks spent with a closed player.
    orphan_ticks: u32,
    rules: R,
}

/// One match: two seats, two clocks, one position.
pub struct GameRoom<R> {
    code: InvitationCode,
    host: PeerHandle,
    host_color: Color,
    config: RoomConfig,
    state: Mutex<PlayState<R>>,
}

impl<R> fmt::Debug for GameRoom<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameRoom")
            .field("code", &self.code.to_string())
            .field("host", &self.host.id())
            .field("host_color", &self.host_color)
            .finish_non_exhaustive()
    }
}

impl<R: RulesEngine> GameRoom<R> {
    /// Creates a room owned by `host`, waiting for an opponent.
    pub fn new(
        code: InvitationCode,
        host: PeerHandle,
        host_color: Color,
        config: RoomConfig,
        rules: R,
    ) -> Self {
        let white = if host_color == Color::White {
            Role::Host
        } else {
            Role::Opponent
        };
        Self {
            code,
            host,
            host_color,
            config,
            state: Mutex::new(PlayState {
                opponent: None,
                mover: white,
                host_remaining: config.player_time_ticks,
                opponent_remaining: config.player_time_ticks,
                waiting_ticks: 0,
                ticks_existed: 0,
                orphan_ticks: 0,
                rules,
            }),
        }
    }

    pub fn code(&self) -> InvitationCode {
        self.code
    }

    pub fn host_color(&self) -> Color {
        self.host_color
    }

    /// The color played by `role`.
    pub fn color_of(&self, role: Role) -> Color {
        match role {
            Role::Host => self.host_color,
            Role::Opponent => self.host_color.opposite(),
        }
    }

    /// The host's connection.
    pub fn host(&self) -> &PeerHandle {
        &self.host
    }

    /// Binds the second player and starts the game.
    ///
    /// White moves first. Both players are told their color.
    ///
    /// # Errors
    /// [`RoomError::AlreadyInGame`] if an opponent is already bound; the
    /// room is left untouched.
    pub async fn join_second(&self, peer: PeerHandle) -> Result<(), RoomError> {
        let mut state = self.state.lock().await;
        if state.opponent.is_some() {
            return Err(RoomError::AlreadyInGame(self.code));
        }

        state.mover = self.role_of(Color::White);
        self.host.notify(&ServerMessage::Starting(self.host_color));
        peer.notify(&ServerMessage::Starting(self.host_color.opposite()));
        tracing::info!(
            code = %self.code,
            host = %self.host.id(),
            opponent = %peer.id(),
            host_color = %self.host_color,
            "game started"
        );
        state.opponent = Some(peer);
        Ok(())
    }

    /// Plays `san` for `role`.
    ///
    /// On success the move is relayed verbatim to the other player and the
    /// turn passes. If the move leaves a terminal position the mover gets
    /// `you_won`, the other player `you_lost`, and both are closed.
    ///
    /// # Errors
    /// Checked in this order, with no state changed on any of them:
    /// [`RoomError::NotStarted`], [`RoomError::GameOver`],
    /// [`RoomError::Closed`], [`RoomError::NotYourTurn`],
    /// [`RoomError::IllegalMove`]. A move whose relay would not fit in one
    /// server frame counts as illegal, so the engine never sees it.
    pub async fn apply_move(&self, role: Role, san: &str) -> Result<MoveOutcome, RoomError> {
        let mut state = self.state.lock().await;
        let Some(opponent) = state.opponent.clone() else {
            return Err(RoomError::NotStarted);
        };
        if state.rules.is_terminal() {
            return Err(RoomError::GameOver);
        }
        if self.host.is_closed() || opponent.is_closed() {
            return Err(RoomError::Closed);
        }
        if state.mover != role {
            return Err(RoomError::NotYourTurn);
        }
        let relay = ServerMessage::Move(san.to_string());
        if relay.to_string().len() > frame::MAX_SHORT_PAYLOAD || !state.rules.apply_move(san) {
            return Err(RoomError::IllegalMove(san.to_string()));
        }

        let (me, them) = self.seats(role, &opponent);
        them.notify(&relay);
        state.mover = role.counterpart();

        if !state.rules.is_terminal() {
            return Ok(MoveOutcome::Continue);
        }

        me.notify(&ServerMessage::Disconnect(DisconnectReason::YouWon));
        me.close();
        them.notify(&ServerMessage::Disconnect(DisconnectReason::YouLost));
        them.close();
        tracing::info!(
            code = %self.code,
            winner = %self.color_of(role),
            "game finished by checkmate"
        );
        Ok(MoveOutcome::Finished)
    }

    /// Forfeits the game for `role`.
    ///
    /// The other player is told `opponent_resigned`, the resigning player
    /// `you_resigned`, and both are closed. Both closes happen under the
    /// room lock, so neither teardown can see the other side still open.
    ///
    /// # Errors
    /// [`RoomError::NotStarted`] if nobody has joined yet.
    pub async fn resign(&self, role: Role) -> Result<(), RoomError> {
        let state = self.state.lock().await;
        let Some(opponent) = state.opponent.as_ref() else {
            return Err(RoomError::NotStarted);
        };

        let (me, them) = self.seats(role, opponent);
        them.notify(&ServerMessage::Disconnect(DisconnectReason::OpponentResigned));
        them.close();
        me.notify(&ServerMessage::Disconnect(DisconnectReason::YouResigned));
        me.close();
        tracing::info!(code = %self.code, %role, "player resigned");
        Ok(())
    }

    /// Sends `msg` to the host and, if present, the opponent.
    pub async fn broadcast(&self, msg: &ServerMessage) {
        let state = self.state.lock().await;
        self.broadcast_locked(&state, msg);
    }

    /// The peer in the other seat, if that seat is filled.
    pub async fn counterpart(&self, role: Role) -> Option<PeerHandle> {
        let state = self.state.lock().await;
        match role {
            Role::Host => state.opponent.clone(),
            Role::Opponent => Some(self.host.clone()),
        }
    }

    /// Advances the room by one tick.
    ///
    /// - Before an opponent joins, counts waiting time and expires the
    ///   room (with `host_timeout`) once the host-wait budget is used up.
    /// - With a player's connection closed, does nothing, unless the room
    ///   has been stuck that way for [`ORPHAN_GRACE_TICKS`].
    /// - Otherwise charges one tick to the mover's clock, broadcasts
    ///   `time_sync` every [`TIME_SYNC_INTERVAL_TICKS`], and expires the
    ///   room when a clock runs out.
    pub async fn tick(&self) -> RoomTick {
        let mut state = self.state.lock().await;

        let Some(opponent) = state.opponent.clone() else {
            state.waiting_ticks = state.waiting_ticks.saturating_add(1);
            if state.waiting_ticks < self.config.host_wait_ticks {
                return RoomTick::Aged;
            }
            self.host
                .notify(&ServerMessage::Disconnect(DisconnectReason::HostTimeout));
            self.host.close();
            tracing::info!(code = %self.code, "host gave up waiting for an opponent");
            return RoomTick::Expired;
        };

        if self.host.is_closed() || opponent.is_closed() {
            state.orphan_ticks += 1;
            if state.orphan_ticks < ORPHAN_GRACE_TICKS {
                return RoomTick::Skipped;
            }
            self.host.close();
            opponent.close();
            tracing::warn!(code = %self.code, "evicting room left half-closed");
            return RoomTick::Expired;
        }
        state.orphan_ticks = 0;

        match state.mover {
            Role::Host => state.host_remaining -= 1,
            Role::Opponent => state.opponent_remaining -= 1,
        }
        state.ticks_existed += 1;

        if state.ticks_existed % TIME_SYNC_INTERVAL_TICKS == 0 {
            let sync = ServerMessage::TimeSync {
                host: state.host_remaining,
                opponent: state.opponent_remaining,
            };
            self.broadcast_locked(&state, &sync);
        }

        let reason = match (state.host_remaining <= 0, state.opponent_remaining <= 0) {
            (false, false) => return RoomTick::Aged,
            (true, true) => DisconnectReason::TimedOutDraw,
            (true, false) => DisconnectReason::TimedOut(self.color_of(Role::Opponent)),
            (false, true) => DisconnectReason::TimedOut(self.color_of(Role::Host)),
        };
        self.broadcast_locked(&state, &ServerMessage::Disconnect(reason));
        self.host.close();
        tracing::info!(code = %self.code, %reason, "clock ran out");
        RoomTick::Expired
    }

    /// Both remaining clocks, host first, in ticks.
    pub async fn clocks(&self) -> (i64, i64) {
        let state = self.state.lock().await;
        (state.host_remaining, state.opponent_remaining)
    }

    /// Whose turn it is.
    pub async fn mover(&self) -> Role {
        self.state.lock().await.mover
    }

    pub async fn has_opponent(&self) -> bool {
        self.state.lock().await.opponent.is_some()
    }

    fn role_of(&self, color: Color) -> Role {
        if color == self.host_color {
            Role::Host
        } else {
            Role::Opponent
        }
    }

    /// `(role's peer, other peer)`.
    fn seats<'a>(&'a self, role: Role, opponent: &'a PeerHandle) -> (&'a PeerHandle, &'a PeerHandle) {
        match role {
            Role::Host => (&self.host, opponent),
            Role::Opponent => (opponent, &self.host),
        }
    }

    fn broadcast_locked(&self, state: &PlayState<R>, msg: &ServerMessage) {
        self.host.notify(msg);
        if let Some(opponent) = &state.opponent {
            opponent.notify(msg);
        }
    }
}
