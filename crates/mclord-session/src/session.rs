//! Session roles and lifecycle phases.

use std::fmt;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Which seat in a room a session occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Created the room and received the invitation code.
    Host,
    /// Joined with the code.
    Opponent,
}

impl Role {
    /// The other seat.
    pub fn counterpart(self) -> Self {
        match self {
            Self::Host => Self::Opponent,
            Self::Opponent => Self::Host,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Host => "host",
            Self::Opponent => "opponent",
        })
    }
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Where a session is in its lifecycle.
///
/// ```text
///   Handshaking ──► Dispatching ──┬──► Hosting ──┐
///        │                        ├──► Joining ──┴──► Playing ──► Closed
///        │                        └──► Stats ────────────────────► Closed
///        └──(rejected)───────────────────────────────────────────► Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Handshaking,
    Dispatching,
    Hosting,
    Joining,
    Stats,
    Playing,
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Handshaking => "handshaking",
            Self::Dispatching => "dispatching",
            Self::Hosting => "hosting",
            Self::Joining => "joining",
            Self::Stats => "stats",
            Self::Playing => "playing",
            Self::Closed => "closed",
        })
    }
}
