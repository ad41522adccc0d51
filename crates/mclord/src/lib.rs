//! # McLord
//!
//! A two-player chess relay server.
//!
//! One client hosts a match and receives a 4-character invitation code; a
//! second client joins with that code; the server relays moves between
//! them, checks them against the rules of chess, runs both clocks, and ends
//! the game on checkmate, resignation, timeout or disconnect.
//!
//! ## Layers
//!
//! ```text
//! mclord (this crate)   ← accept loop, session handler, watchdog, config
//!   ├─ mclord-room      ← GameRoom, RoomRegistry, RulesEngine
//!   ├─ mclord-session   ← admission counter, roles
//!   ├─ mclord-tick      ← 20 Hz drift-correcting scheduler
//!   ├─ mclord-transport ← sockets, writer tasks, close signal
//!   └─ mclord-protocol  ← handshake, framing, message vocabulary
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mclord::{ServerBuilder, ServerConfig};
//! use mclord_room::ChessRules;
//!
//! # async fn start() -> Result<(), mclord::McLordError> {
//! let server = ServerBuilder::new(ServerConfig::default())
//!     .build::<ChessRules>()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;
mod spawn;
mod watchdog;

pub use config::ServerConfig;
pub use error::{ConfigError, McLordError};
pub use server::{Server, ServerBuilder};
pub use spawn::TaskSpawner;
pub use watchdog::{run_watchdog, spawn_watchdog};
