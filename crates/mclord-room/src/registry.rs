//! The room registry: every live room, keyed by invitation code.
//!
//! All access goes through whole-operation methods that take the registry
//! lock for their full duration. Only `Arc<GameRoom>` handles ever leave
//! the locked section. Methods that also touch a room take the room's lock
//! while holding the registry lock, never the other way round.
//!
//! A room has two possible removers: the watchdog (timeouts) and the
//! teardown of either player's session. [`RoomRegistry::remove`] is
//! idempotent and identity-checked, so whichever gets there first wins and
//! the others are no-ops, even if a new room has since reused the code.

use std::collections::HashMap;
use std::sync::Arc;

use mclord_protocol::{Color, DisconnectReason, InvitationCode, ServerMessage};
use mclord_session::Role;
use mclord_transport::PeerHandle;
use tokio::sync::Mutex;

use crate::{GameRoom, MAX_CODE_ATTEMPTS, RoomConfig, RoomError, RoomTick, RulesEngine};

type RoomMap<R> = HashMap<InvitationCode, Arc<GameRoom<R>>>;

/// Code → room map behind a single lock.
pub struct RoomRegistry<R> {
    config: RoomConfig,
    rooms: Mutex<RoomMap<R>>,
}

impl<R: RulesEngine + Default> RoomRegistry<R> {
    /// Creates an empty registry. Every room it creates uses `config`.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            config,
            rooms: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> RoomConfig {
        self.config
    }

    /// Creates a room hosted by `peer` under a fresh random code.
    ///
    /// See [`host_with`](Self::host_with).
    pub async fn host(&self, peer: PeerHandle) -> Result<Arc<GameRoom<R>>, RoomError> {
        self.host_with(peer, || InvitationCode::generate(&mut rand::rng()))
            .await
    }

    /// Creates a room hosted by `peer`, drawing candidate codes from
    /// `next_code`.
    ///
    /// Up to [`MAX_CODE_ATTEMPTS`] codes are tried; the first one not
    /// already in use wins. The host's color is a coin flip. `host_ok` is
    /// queued before the lock is released, so the host always hears it
    /// before any `ok_starting`.
    ///
    /// # Errors
    /// - [`RoomError::Overloaded`] at the room cap
    /// - [`RoomError::CodesExhausted`] if every attempt collided
    pub async fn host_with<F>(
        &self,
        peer: PeerHandle,
        mut next_code: F,
    ) -> Result<Arc<GameRoom<R>>, RoomError>
    where
        F: FnMut() -> InvitationCode,
    {
        let mut rooms = self.rooms.lock().await;
        if rooms.len() >= self.config.max_rooms {
            return Err(RoomError::Overloaded {
                max_rooms: self.config.max_rooms,
            });
        }

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = next_code();
            if rooms.contains_key(&code) {
                tracing::debug!(%code, attempt, "invitation code collision");
                continue;
            }

            let host_color = if rand::random::<bool>() {
                Color::White
            } else {
                Color::Black
            };
            let room = Arc::new(GameRoom::new(
                code,
                peer.clone(),
                host_color,
                self.config,
                R::default(),
            ));
            peer.notify(&ServerMessage::HostOk(code));
            rooms.insert(code, Arc::clone(&room));
            tracing::info!(%code, %host_color, rooms = rooms.len(), "room created");
            return Ok(room);
        }

        Err(RoomError::CodesExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }

    /// Joins `peer` to the room registered under `code`.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if no such room exists
    /// - [`RoomError::AlreadyInGame`] if it already has an opponent
    pub async fn join(
        &self,
        code: InvitationCode,
        peer: PeerHandle,
    ) -> Result<Arc<GameRoom<R>>, RoomError> {
        let rooms = self.rooms.lock().await;
        let room = rooms.get(&code).cloned().ok_or(RoomError::NotFound(code))?;
        room.join_second(peer).await?;
        Ok(room)
    }

    /// Looks up a room by code.
    pub async fn get(&self, code: InvitationCode) -> Option<Arc<GameRoom<R>>> {
        self.rooms.lock().await.get(&code).cloned()
    }

    /// Removes `room` if it is still the one registered under its code.
    ///
    /// Returns `true` if this call removed it.
    pub async fn remove(&self, room: &Arc<GameRoom<R>>) -> bool {
        let mut rooms = self.rooms.lock().await;
        remove_exact(&mut rooms, room)
    }

    /// Session teardown for the player in `role`: tells the other player
    /// (if still connected) that its opponent left, closes it, and removes
    /// the room.
    ///
    /// Runs entirely under the registry lock so a concurrent join cannot
    /// slip in between the notice and the removal.
    pub async fn release(&self, room: &Arc<GameRoom<R>>, role: Role) -> bool {
        let mut rooms = self.rooms.lock().await;
        if let Some(other) = room.counterpart(role).await {
            if !other.is_closed() {
                other.notify(&ServerMessage::Disconnect(
                    DisconnectReason::OpponentDisconnected,
                ));
                other.close();
            }
        }
        remove_exact(&mut rooms, room)
    }

    /// Number of live rooms.
    pub async fn len(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.lock().await.is_empty()
    }

    /// Ticks every room, then removes the ones that expired in one pass.
    ///
    /// Returns how many rooms were removed.
    pub async fn tick_all(&self) -> usize {
        let mut rooms = self.rooms.lock().await;

        let mut expired = Vec::new();
        for (code, room) in rooms.iter() {
            if room.tick().await == RoomTick::Expired {
                expired.push(*code);
            }
        }

        for code in &expired {
            rooms.remove(code);
            tracing::info!(%code, "room removed by watchdog");
        }
        expired.len()
    }
}

fn remove_exact<R: RulesEngine>(rooms: &mut RoomMap<R>, room: &Arc<GameRoom<R>>) -> bool {
    let code = room.code();
    let is_same = rooms
        .get(&code)
        .is_some_and(|current| Arc::ptr_eq(current, room));
    if is_same {
        rooms.remove(&code);
        tracing::info!(%code, rooms = rooms.len(), "room removed");
    }
    is_same
}
