//! Room configuration and timing constants.

use mclord_tick::TICK_RATE_HZ;

/// Clocks are broadcast every this many ticks of play (5 s).
pub const TIME_SYNC_INTERVAL_TICKS: u64 = 100;

/// A started room whose host or opponent has gone away is evicted after
/// this many consecutive ticks if no session teardown got to it first.
pub const ORPHAN_GRACE_TICKS: u32 = 100;

/// How many fresh invitation codes hosting tries before giving up.
pub const MAX_CODE_ATTEMPTS: usize = 5;

/// Configuration shared by every room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomConfig {
    /// Each player's clock at the start of a game, in ticks.
    pub player_time_ticks: i64,
    /// How long a host may wait for an opponent, in ticks.
    pub host_wait_ticks: u32,
    /// Hosting fails with `overloaded` once this many rooms exist.
    pub max_rooms: usize,
}

impl RoomConfig {
    /// Builds a config from durations in seconds.
    pub fn from_secs(player_time_secs: u64, host_wait_secs: u64, max_rooms: usize) -> Self {
        let rate = u64::from(TICK_RATE_HZ);
        Self {
            player_time_ticks: i64::try_from(player_time_secs.saturating_mul(rate))
                .unwrap_or(i64::MAX),
            host_wait_ticks: u32::try_from(host_wait_secs.saturating_mul(rate))
                .unwrap_or(u32::MAX),
            max_rooms,
        }
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self::from_secs(1800, 900, 700)
    }
}
