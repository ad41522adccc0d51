//! Wire protocol for McLord.
//!
//! This crate defines everything that touches bytes on the wire:
//!
//! - **Handshake** ([`handshake`]): the HTTP upgrade request/response that
//!   turns a raw TCP connection into a framed one.
//! - **Frames** ([`frame`]): the minimal text-frame subset the server
//!   speaks: masked final text frames in, unmasked final text frames out.
//! - **Messages** ([`ClientCommand`], [`GameCommand`], [`ServerMessage`]):
//!   the space-separated token vocabulary carried inside frames.
//! - **Invitation codes** ([`InvitationCode`]): the 4-character room keys.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about sockets, rooms or sessions. It
//! works over any `AsyncRead`/`AsyncBufRead`, which keeps it testable with
//! plain byte slices.
//!
//! ```text
//! Transport (TCP) → Protocol (frames, tokens) → Session (matchmaking, play)
//! ```

mod code;
mod error;
pub mod frame;
pub mod handshake;
mod message;

pub use code::{InvitationCode, CODE_LEN};
pub use error::ProtocolError;
pub use message::{
    tokenize, ClientCommand, Color, DisconnectReason, GameCommand,
    ServerMessage,
};
