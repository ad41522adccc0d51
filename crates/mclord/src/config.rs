//! Server configuration: CLI flags with environment fallbacks.

use std::time::Duration;

use clap::Parser;
use mclord_room::RoomConfig;
use mclord_session::AdmissionLimits;

use crate::{ConfigError, TaskSpawner};

/// Extra read slack on top of a full player clock before a silent peer is
/// dropped.
const READ_TIMEOUT_SLACK: Duration = Duration::from_secs(300);

/// Everything the server needs to start.
#[derive(Debug, Clone, Parser)]
#[command(name = "mclord-server", version, about = "Two-player chess relay server")]
pub struct ServerConfig {
    /// Address to bind to.
    #[arg(long, env = "MCLORD_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on. 0 lets the OS choose.
    #[arg(long, env = "MCLORD_PORT", default_value_t = 5557)]
    pub port: u16,

    /// Players served normally (soft limit).
    #[arg(long, env = "MCLORD_MAX_ONLINE_PLAYERS", default_value_t = 1500)]
    pub max_online_players: usize,

    /// Players handshaken and told the server is overloaded (hard limit).
    /// Connections past this are closed before the handshake.
    #[arg(long, env = "MCLORD_MAX_ONLINE_PLAYERS_HARD", default_value_t = 2000)]
    pub max_online_players_hard: usize,

    /// Maximum number of concurrent rooms.
    #[arg(long, env = "MCLORD_MAX_ROOMS", default_value_t = 700)]
    pub max_rooms: usize,

    /// Each player's clock, in seconds.
    #[arg(long, env = "MCLORD_PLAYER_TIME_SECS", default_value_t = 1800)]
    pub player_time_secs: u64,

    /// How long a host may wait for an opponent, in seconds.
    #[arg(long, env = "MCLORD_HOST_WAIT_SECS", default_value_t = 900)]
    pub host_wait_secs: u64,

    /// Run each session on its own OS thread instead of a tokio task.
    #[arg(long, env = "MCLORD_USE_OS_THREADS")]
    pub use_os_threads: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5557,
            max_online_players: 1500,
            max_online_players_hard: 2000,
            max_rooms: 700,
            player_time_secs: 1800,
            host_wait_secs: 900,
            use_os_threads: false,
        }
    }
}

impl ServerConfig {
    /// Checks that every limit and duration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts = [
            ("max-online-players", self.max_online_players as u64),
            ("max-online-players-hard", self.max_online_players_hard as u64),
            ("max-rooms", self.max_rooms as u64),
            ("player-time-secs", self.player_time_secs),
            ("host-wait-secs", self.host_wait_secs),
        ];
        if let Some(&(name, _)) = counts.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::NotPositive { name });
        }
        if self.max_online_players > self.max_online_players_hard {
            return Err(ConfigError::LimitsInverted {
                soft: self.max_online_players,
                hard: self.max_online_players_hard,
            });
        }
        Ok(())
    }

    /// `host:port`, ready for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn room_config(&self) -> RoomConfig {
        RoomConfig::from_secs(self.player_time_secs, self.host_wait_secs, self.max_rooms)
    }

    pub fn admission_limits(&self) -> AdmissionLimits {
        AdmissionLimits {
            soft: self.max_online_players,
            hard: self.max_online_players_hard,
        }
    }

    /// How long any single read may block: a full player clock plus
    /// five minutes.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.player_time_secs).saturating_add(READ_TIMEOUT_SLACK)
    }

    pub fn spawner(&self) -> TaskSpawner {
        if self.use_os_threads {
            TaskSpawner::Threads
        } else {
            TaskSpawner::Tasks
        }
    }
}
