//! Transport layer for McLord.
//!
//! Turns raw TCP streams into framed, message-oriented connections:
//!
//! - [`TcpTransport`] accepts sockets.
//! - [`Connection`] owns the read side of one socket. It performs the
//!   upgrade handshake and decodes inbound frames into tokens.
//! - [`PeerHandle`] is the cloneable write side. Sends only enqueue; a
//!   dedicated writer task per connection drains the queue onto the wire,
//!   so nobody ever holds a lock across socket I/O.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server / Room layers (above)  ← hold PeerHandles, send ServerMessages
//!     ↕
//! Transport Layer (this crate)  ← sockets, handshake, writer tasks
//!     ↕
//! Protocol Layer (below)  ← frame codec, handshake math, message types
//! ```

mod connection;
mod error;
mod listener;

pub use connection::{Connection, Outbox, PeerHandle};
pub use error::TransportError;
pub use listener::TcpTransport;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection. Only used for logging and equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next process-unique id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}
