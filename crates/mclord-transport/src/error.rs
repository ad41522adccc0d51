use std::time::Duration;

use mclord_protocol::ProtocolError;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed, either by the peer or by the server.
    #[error("connection closed")]
    Closed,

    /// No complete frame arrived within the read timeout.
    #[error("no message received for {0:?}")]
    TimedOut(Duration),

    /// Reading or decoding a frame failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The upgrade request was invalid; a `400` has been queued.
    #[error("handshake rejected: {0}")]
    HandshakeRejected(#[source] ProtocolError),

    /// Accepting a connection failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// Binding the listening socket failed.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),
}

impl TransportError {
    /// Returns `true` if the peer sent something the server refuses to
    /// speak. Such sessions end with a `protocol_error` notice; every other
    /// failure ends them silently.
    pub fn is_protocol_violation(&self) -> bool {
        match self {
            Self::Protocol(err) => err.is_violation(),
            _ => false,
        }
    }
}
