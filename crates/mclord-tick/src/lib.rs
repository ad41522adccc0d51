//! Fixed-rate tick scheduler for McLord.
//!
//! Every room's clock is measured in ticks. One scheduler drives them all
//! from the server's watchdog loop at [`TICK_RATE_HZ`].
//!
//! # Drift correction
//!
//! The scheduler does not sleep a fixed period. After the caller finishes
//! processing a tick, the next call to [`TickScheduler::wait_for_tick`]
//! sleeps only the remainder of the budget, measured from when the previous
//! tick fired. A slow tick therefore shortens the following sleep instead
//! of pushing every later tick back. The sleep never drops below
//! [`TickConfig::min_sleep`], so an overrun cannot turn into a busy loop.
//!
//! # Integration
//!
//! ```ignore
//! let mut scheduler = TickScheduler::new(TickConfig::default());
//! loop {
//!     scheduler.wait_for_tick().await;
//!     registry.tick_all().await;
//!     scheduler.record_tick_end();
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// Ticks per second. Player clocks and timeouts are expressed in ticks.
pub const TICK_RATE_HZ: u32 = 20;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Full configuration for the tick scheduler.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Tick rate in Hz.
    pub tick_rate_hz: u32,
    /// Budget warning threshold (0.0 to 1.0). Default: 0.80 (80%).
    /// A tracing warning is emitted when tick processing exceeds this
    /// fraction of the tick budget.
    pub budget_warn_threshold: f64,
    /// Shortest sleep between ticks, even after an overrun.
    pub min_sleep: Duration,
    /// Enable per-tick metrics collection.
    pub metrics_enabled: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: TICK_RATE_HZ,
            budget_warn_threshold: 0.80,
            min_sleep: Duration::from_millis(1),
            metrics_enabled: true,
        }
    }
}

impl TickConfig {
    /// Maximum supported tick rate.
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    /// Create a config for a specific tick rate with sensible defaults.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::new`]. Rules:
    /// - `tick_rate_hz` clamped to `1..=`[`Self::MAX_TICK_RATE_HZ`].
    /// - `budget_warn_threshold` clamped to `0.0..=1.0`.
    pub fn validated(mut self) -> Self {
        let clamped = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
        if clamped != self.tick_rate_hz {
            warn!(
                rate = self.tick_rate_hz,
                clamped, "tick_rate_hz out of range, clamping"
            );
            self.tick_rate_hz = clamped;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }

    /// Duration of a single tick.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.tick_rate_hz.max(1)))
    }
}

// ---------------------------------------------------------------------------
// Tick info (returned to caller each tick)
// ---------------------------------------------------------------------------

/// Information about a fired tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// Time since the previous tick fired (one period for the first tick).
    pub dt: Duration,
    /// How long the scheduler actually slept before this tick.
    pub slept: Duration,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Runtime metrics for the tick scheduler.
///
/// Updated by [`TickScheduler::record_tick_end`] when `metrics_enabled` is
/// true. Timing values refer to processing time, not sleep time.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    /// Total ticks processed.
    pub total_ticks: u64,
    /// Ticks whose processing took longer than the whole budget.
    pub total_overruns: u64,
    /// Exponential moving average of tick processing time (α = 0.1).
    pub avg_tick_time: Duration,
    /// Maximum tick processing time observed.
    pub max_tick_time: Duration,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Drift-correcting fixed-rate scheduler.
pub struct TickScheduler {
    config: TickConfig,
    tick_duration: Duration,
    tick_count: u64,
    /// When the previous tick fired. `None` before the first tick.
    last_tick: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Create a new scheduler from config.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();

        debug!(
            rate_hz = config.tick_rate_hz,
            budget_ms = tick_duration.as_secs_f64() * 1000.0,
            "tick scheduler created"
        );

        Self {
            config,
            tick_duration,
            tick_count: 0,
            last_tick: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Create a scheduler for a specific tick rate with default settings.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Sleeps until the next tick is due and returns its [`TickInfo`].
    ///
    /// The first tick fires one full period after the first call. Later
    /// ticks fire one period after the previous one, less however long the
    /// caller spent in between, but never sooner than `min_sleep`.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let slept = match self.last_tick {
            None => self.tick_duration,
            Some(last) => self
                .tick_duration
                .saturating_sub(last.elapsed())
                .max(self.config.min_sleep),
        };
        time::sleep(slept).await;

        let now = Instant::now();
        let dt = self
            .last_tick
            .map_or(self.tick_duration, |last| now.duration_since(last));
        self.last_tick = Some(now);
        self.tick_count += 1;

        trace!(tick = self.tick_count, ?slept, "tick fired");

        TickInfo {
            tick: self.tick_count,
            dt,
            slept,
        }
    }

    /// Record that processing for the current tick has finished.
    ///
    /// Enables budget monitoring and metrics. If not called, budget
    /// warnings won't fire.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.last_tick else {
            return;
        };
        let elapsed = start.elapsed();
        let utilization = elapsed.as_secs_f64() / self.tick_duration.as_secs_f64();

        if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = self.tick_duration.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "tick approaching budget limit"
            );
        }

        if self.config.metrics_enabled {
            self.metrics.total_ticks += 1;
            if utilization > 1.0 {
                self.metrics.total_overruns += 1;
            }
            if elapsed > self.metrics.max_tick_time {
                self.metrics.max_tick_time = elapsed;
            }
            // Exponential moving average (α = 0.1).
            let alpha = 0.1;
            let prev = self.metrics.avg_tick_time.as_secs_f64();
            let curr = elapsed.as_secs_f64();
            self.metrics.avg_tick_time =
                Duration::from_secs_f64(prev * (1.0 - alpha) + curr * alpha);
        }
    }

    /// Current tick count.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Snapshot of current metrics.
    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    /// The configured tick rate in Hz.
    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    /// The fixed tick budget.
    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}
