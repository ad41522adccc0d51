//! Error types for the room layer.

use mclord_protocol::{DisconnectReason, InvitationCode};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The registry already holds the maximum number of rooms.
    #[error("room limit of {max_rooms} reached")]
    Overloaded { max_rooms: usize },

    /// Every freshly minted code collided with a live room.
    #[error("no free invitation code after {attempts} attempts")]
    CodesExhausted { attempts: usize },

    /// No room is registered under this code.
    #[error("no room with code {0}")]
    NotFound(InvitationCode),

    /// The room already has an opponent.
    #[error("room {0} already has two players")]
    AlreadyInGame(InvitationCode),

    /// A move arrived from the player who is not on move.
    #[error("not this player's turn")]
    NotYourTurn,

    /// The rules engine refused the move. No state was changed.
    #[error("illegal move {0:?}")]
    IllegalMove(String),

    /// The operation needs an opponent and none has joined.
    #[error("game has not started")]
    NotStarted,

    /// The position is already terminal.
    #[error("game is over")]
    GameOver,

    /// One of the room's connections is already closed.
    #[error("a player's connection is closed")]
    Closed,
}

impl RoomError {
    /// The notice to send before ending the session that caused this
    /// error, or `None` if the session should end silently.
    pub fn disconnect_reason(&self) -> Option<DisconnectReason> {
        match self {
            Self::Overloaded { .. } => Some(DisconnectReason::Overloaded),
            Self::CodesExhausted { .. } => Some(DisconnectReason::GivingUp),
            Self::NotFound(_) => Some(DisconnectReason::InvalidCode),
            Self::AlreadyInGame(_) => Some(DisconnectReason::AlreadyInGame),
            Self::NotYourTurn | Self::IllegalMove(_) | Self::NotStarted | Self::GameOver => {
                Some(DisconnectReason::ProtocolError)
            }
            Self::Closed => None,
        }
    }
}
