//! Unified error type for the McLord server.

use mclord_protocol::ProtocolError;
use mclord_room::RoomError;
use mclord_transport::TransportError;

/// A configuration value the server cannot run with.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A count or duration that must be at least 1 was 0.
    #[error("{name} must be positive")]
    NotPositive { name: &'static str },

    /// The soft player limit is above the hard one.
    #[error("soft player limit {soft} exceeds hard limit {hard}")]
    LimitsInverted { soft: usize, hard: usize },
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum McLordError {
    /// Invalid startup configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A transport-level error (bind, accept, read, handshake).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message that does not match the vocabulary.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (overloaded, unknown code, illegal move).
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_error() {
        let err: McLordError = ConfigError::LimitsInverted { soft: 3, hard: 2 }.into();
        assert!(matches!(err, McLordError::Config(_)));
        assert!(err.to_string().contains("exceeds hard limit 2"));
    }

    #[test]
    fn test_from_transport_error() {
        let err: McLordError = TransportError::Closed.into();
        assert!(matches!(err, McLordError::Transport(_)));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: McLordError = ProtocolError::Malformed("x".into()).into();
        assert!(matches!(err, McLordError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err: McLordError = RoomError::NotYourTurn.into();
        assert!(matches!(err, McLordError::Room(_)));
        assert_eq!(err.to_string(), "not this player's turn");
    }
}
