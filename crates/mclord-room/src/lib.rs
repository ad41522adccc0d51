//! Room lifecycle management for McLord.
//!
//! A room pairs exactly two sessions for one game of chess. It owns the
//! position (through a [`RulesEngine`]), both players' clocks, and the
//! turn order. The [`RoomRegistry`] maps invitation codes to rooms.
//!
//! # Key types
//!
//! - [`RulesEngine`]: move legality and game-over detection ([`ChessRules`])
//! - [`GameRoom`]: one match; join, move, resign, tick
//! - [`RoomRegistry`]: code → room map; host, join, evict
//! - [`RoomConfig`]: clock budget, host wait, room cap
//!
//! # Locking
//!
//! The registry has one lock; each room has its own. When both are
//! needed the registry lock is always taken first. Sending to a peer only
//! enqueues a frame, so no lock is ever held across socket I/O.

mod config;
mod error;
mod registry;
mod room;
mod rules;

pub use config::{
    MAX_CODE_ATTEMPTS, ORPHAN_GRACE_TICKS, RoomConfig, TIME_SYNC_INTERVAL_TICKS,
};
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{GameRoom, MoveOutcome, RoomTick};
pub use rules::{ChessRules, RulesEngine};
