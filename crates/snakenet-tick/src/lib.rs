//! Fixed-period tick scheduler for snakenet.
//!
//! The lobby runs two of these: the simulation heartbeat (`tick_rate_hz`,
//! 10 Hz by default) and the 1 Hz countdown. Both are paused whenever the
//! lobby is in a state that does not need them, and a paused scheduler
//! never fires; it is stopped, not ignored.
//!
//! # Integration
//!
//! The scheduler sits inside the lobby actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         _ = heartbeat.wait_for_tick() => {
//!             lobby.tick(now_ms);
//!             heartbeat.record_tick_end();
//!         }
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick fires late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Schedule the next tick one period from now. Missed ticks are lost.
    #[default]
    Skip,
    /// Keep the original cadence; a late tick is followed promptly by the
    /// next one.
    Drop,
}

/// Scheduler settings.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Tick rate in Hz. 0 = never fires.
    pub tick_rate_hz: u32,
    pub policy: TickPolicy,
    /// Fraction of the period a tick handler may use before a warning is
    /// logged by [`TickScheduler::record_tick_end`].
    pub budget_warn_threshold: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 0,
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
        }
    }
}

impl TickConfig {
    /// Maximum supported tick rate.
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values.
    pub fn validated(mut self) -> Self {
        if self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                max = Self::MAX_TICK_RATE_HZ,
                "tick_rate_hz exceeds maximum, clamping"
            );
            self.tick_rate_hz = Self::MAX_TICK_RATE_HZ;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }

    /// Length of one period. `None` when the rate is 0.
    pub fn tick_duration(&self) -> Option<Duration> {
        (self.tick_rate_hz > 0).then(|| Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64))
    }
}

/// What [`TickScheduler::wait_for_tick`] reports.
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Starts at 1 and never resets.
    pub tick: u64,
    /// `true` if the tick fired more than 10% of a period late.
    pub overrun: bool,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// A fixed-period timer that can be paused and re-armed.
pub struct TickScheduler {
    config: TickConfig,
    tick_duration: Option<Duration>,
    tick_count: u64,
    next_tick: Option<TokioInstant>,
    tick_start: Option<Instant>,
    paused: bool,
}

impl TickScheduler {
    /// A running scheduler whose first tick is one period from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();
        debug!(rate_hz = config.tick_rate_hz, policy = ?config.policy, "tick scheduler created");
        Self {
            next_tick: tick_duration.map(|d| TokioInstant::now() + d),
            config,
            tick_duration,
            tick_count: 0,
            tick_start: None,
            paused: false,
        }
    }

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// A scheduler that will not fire until resumed.
    pub fn paused(config: TickConfig) -> Self {
        let mut scheduler = Self::new(config);
        scheduler.paused = true;
        scheduler.next_tick = None;
        scheduler
    }

    /// Waits until the next tick is due.
    ///
    /// Pends forever while paused or when the rate is 0, so it is safe as
    /// a `tokio::select!` branch.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let (next, period) = match (self.next_tick, self.tick_duration) {
            (Some(next), Some(period)) if !self.paused => (next, period),
            _ => std::future::pending().await,
        };

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > period / 10;
        if overrun {
            warn!(
                tick = self.tick_count,
                late_ms = late_by.as_secs_f64() * 1000.0,
                policy = ?self.config.policy,
                "tick fired late"
            );
        }

        self.next_tick = Some(match self.config.policy {
            TickPolicy::Skip => now + period,
            TickPolicy::Drop => next + period,
        });

        trace!(tick = self.tick_count, overrun, "tick fired");
        TickInfo {
            tick: self.tick_count,
            overrun,
        }
    }

    /// Marks the end of the current tick's work and warns if it used too
    /// much of the period.
    pub fn record_tick_end(&mut self) {
        let (Some(start), Some(budget)) = (self.tick_start.take(), self.tick_duration) else {
            return;
        };
        let elapsed = start.elapsed();
        let utilization = elapsed.as_secs_f64() / budget.as_secs_f64();
        if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = budget.as_secs_f64() * 1000.0,
                "tick approaching budget limit"
            );
        }
    }

    /// Stops the scheduler. Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.next_tick = None;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Re-arms a paused scheduler so the next tick fires one period from
    /// now. Does nothing if already running.
    pub fn resume(&mut self) {
        if let Some(period) = self.tick_duration {
            self.resume_after(period);
        }
    }

    /// Re-arms a paused scheduler so the next tick fires after `delay`,
    /// then every period. Does nothing if already running.
    pub fn resume_after(&mut self, delay: Duration) {
        if self.paused {
            self.paused = false;
            self.next_tick = Some(TokioInstant::now() + delay);
            debug!(tick = self.tick_count, delay_ms = delay.as_millis() as u64, "tick scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn tick_duration(&self) -> Option<Duration> {
        self.tick_duration
    }
}
