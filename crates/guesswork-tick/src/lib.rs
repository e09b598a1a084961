//! Fixed-period poll scheduler for Guesswork.
//!
//! A device polls its switches and button instead of waiting on
//! interrupts: every 10 ms while a number is being entered, every 100 ms
//! while idle. [`TickScheduler`] produces those ticks and sits in the
//! node's `tokio::select!` loop next to the bus inbound channel, so a
//! message is always handled between two ticks:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(msg) = inbound.recv() => handle(msg),
//!         tick = capture.wait_for_tick() => {
//!             sample_switches(tick.at);
//!             capture.record_tick_end();
//!         }
//!     }
//! }
//! ```
//!
//! A paused scheduler pends forever. The node keeps one scheduler per
//! loop and pauses whichever one is not in use, which avoids `select!`
//! guards.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// What to do with a tick that fires late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Next tick is one period after the late one. Missed ticks are
    /// counted, never replayed.
    #[default]
    Skip,
    /// Next tick stays on the original grid, even if that moment has
    /// already passed.
    Drop,
}

/// Settings for a [`TickScheduler`].
#[derive(Debug, Clone)]
pub struct TickConfig {
    pub period: Duration,
    pub policy: TickPolicy,
    /// Share of the period (0.0 to 1.0) a tick body may take before a
    /// warning is logged.
    pub budget_warn_threshold: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(10),
            policy: TickPolicy::Skip,
            budget_warn_threshold: 0.8,
        }
    }
}

impl TickConfig {
    pub const MIN_PERIOD: Duration = Duration::from_millis(1);

    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            ..Self::default()
        }
    }

    /// Clamps the period to [`MIN_PERIOD`](Self::MIN_PERIOD) and the
    /// threshold to `0.0..=1.0`.
    pub fn validated(self) -> Self {
        let period = if self.period < Self::MIN_PERIOD {
            warn!(requested = ?self.period, "poll period too short, using minimum");
            Self::MIN_PERIOD
        } else {
            self.period
        };
        Self {
            period,
            budget_warn_threshold: self.budget_warn_threshold.clamp(0.0, 1.0),
            ..self
        }
    }
}

/// One fired tick.
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Count since the scheduler was created, starting at 1.
    pub tick: u64,
    /// Moment the tick fired. Round timing is measured from this, not
    /// from tick counts.
    pub at: Instant,
    /// Fired more than a tenth of a period after it was due.
    pub overrun: bool,
    /// Whole periods that went by unticked (Skip policy only).
    pub ticks_skipped: u64,
}

/// Fixed-period tick source that can be paused.
#[derive(Debug)]
pub struct TickScheduler {
    config: TickConfig,
    due: Instant,
    fired: u64,
    late_ticks: u64,
    busy_since: Option<std::time::Instant>,
    paused: bool,
}

impl TickScheduler {
    /// A running scheduler whose first tick is one period away.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        debug!(period = ?config.period, policy = ?config.policy, "poll scheduler ready");
        Self {
            due: Instant::now() + config.period,
            config,
            fired: 0,
            late_ticks: 0,
            busy_since: None,
            paused: false,
        }
    }

    /// A scheduler that stays silent until [`resume`](Self::resume).
    pub fn paused(config: TickConfig) -> Self {
        Self {
            paused: true,
            ..Self::new(config)
        }
    }

    pub fn with_period(period: Duration) -> Self {
        Self::new(TickConfig::with_period(period))
    }

    /// Resolves at the next tick. Pends forever while paused.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        if self.paused {
            std::future::pending::<()>().await;
        }
        time::sleep_until(self.due).await;

        let at = Instant::now();
        let period = self.config.period;
        let late_by = at.saturating_duration_since(self.due);
        let overrun = late_by > period / 10;

        self.fired += 1;
        self.busy_since = Some(std::time::Instant::now());
        if overrun {
            self.late_ticks += 1;
        }

        let (next, ticks_skipped) = match self.config.policy {
            TickPolicy::Skip if overrun => (at + period, missed_periods(late_by, period)),
            TickPolicy::Skip => (at + period, 0),
            TickPolicy::Drop => (self.due + period, 0),
        };
        self.due = next;

        if overrun {
            warn!(tick = self.fired, late = ?late_by, skipped = ticks_skipped, "poll tick late");
        } else {
            trace!(tick = self.fired, "poll tick");
        }

        TickInfo {
            tick: self.fired,
            at,
            overrun,
            ticks_skipped,
        }
    }

    /// Ends the current tick's work and warns if it ate too much of the
    /// period. Does nothing when no tick is in progress.
    pub fn record_tick_end(&mut self) {
        let Some(since) = self.busy_since.take() else {
            return;
        };
        let busy = since.elapsed();
        let share = busy.as_secs_f64() / self.config.period.as_secs_f64();
        if share >= self.config.budget_warn_threshold {
            warn!(tick = self.fired, ?busy, period = ?self.config.period, "poll tick body slow");
        }
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.fired, "poll scheduler paused");
        }
    }

    /// Next tick is one period from now. Time spent paused never turns
    /// into a burst of catch-up ticks.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.due = Instant::now() + self.config.period;
            debug!(tick = self.fired, "poll scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn tick_count(&self) -> u64 {
        self.fired
    }

    pub fn period(&self) -> Duration {
        self.config.period
    }

    /// Late ticks seen so far.
    pub fn total_overruns(&self) -> u64 {
        self.late_ticks
    }
}

fn missed_periods(late_by: Duration, period: Duration) -> u64 {
    u64::try_from(late_by.as_nanos() / period.as_nanos()).unwrap_or(u64::MAX)
}
