//! The watchdog: ages every room 20 times a second.
//!
//! ```text
//!   TickScheduler ──wait_for_tick──► RoomRegistry::tick_all ──► record_tick_end
//!        ▲                                                          │
//!        └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Clocks, host-wait timeouts and half-closed room eviction all depend on
//! this loop, so the server does not outlive it.

use std::sync::Arc;

use mclord_room::{RoomRegistry, RulesEngine};
use mclord_tick::{TickConfig, TickScheduler};
use tokio::task::JoinHandle;

/// Runs the tick loop forever.
pub async fn run_watchdog<R>(registry: Arc<RoomRegistry<R>>, config: TickConfig)
where
    R: RulesEngine + Default,
{
    let mut scheduler = TickScheduler::new(config);
    tracing::info!(rate_hz = scheduler.tick_rate_hz(), "watchdog started");

    loop {
        let info = scheduler.wait_for_tick().await;
        let removed = registry.tick_all().await;
        if removed > 0 {
            tracing::debug!(tick = info.tick, removed, "rooms expired");
        }
        scheduler.record_tick_end();
    }
}

/// Spawns [`run_watchdog`] under a supervisor.
///
/// If the loop panics or returns, the failure is logged at `error` and
/// the process exits with status 1. Cancellation (runtime shutdown) is
/// not a failure.
pub fn spawn_watchdog<R>(registry: Arc<RoomRegistry<R>>, config: TickConfig) -> JoinHandle<()>
where
    R: RulesEngine + Default,
{
    let watchdog = tokio::spawn(run_watchdog(registry, config));
    tokio::spawn(async move {
        match watchdog.await {
            Err(e) if e.is_cancelled() => {
                tracing::debug!("watchdog cancelled");
            }
            Err(e) => {
                tracing::error!(error = %e, "watchdog panicked");
                std::process::exit(1);
            }
            Ok(()) => {
                tracing::error!("watchdog exited");
                std::process::exit(1);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use mclord_room::{ChessRules, RoomConfig};
    use mclord_transport::PeerHandle;

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_expires_waiting_host() {
        let config = RoomConfig {
            host_wait_ticks: 3,
            ..RoomConfig::default()
        };
        let registry = Arc::new(RoomRegistry::<ChessRules>::new(config));
        let (host, mut outbox) = PeerHandle::detached();
        registry.host(host.clone()).await.unwrap();

        let task = tokio::spawn(run_watchdog(Arc::clone(&registry), TickConfig::default()));
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(registry.is_empty().await);
        assert!(host.is_closed());
        let texts = outbox.drain_text();
        assert_eq!(texts.last().map(String::as_str), Some("disconnect:host_timeout"));
        task.abort();
    }
}
