//! Delta-time countdowns and fixed-rate frame ticking for Muster.
//!
//! The lobby coordinator runs off an external periodic tick: the embedding
//! application calls its tick entry points once per frame with the elapsed
//! time. This crate supplies the two pieces of that arrangement:
//!
//! - [`Countdown`]: a pure interval timer fed `dt` values. No ambient
//!   clock is involved, so tests can drive it with synthetic deltas.
//! - [`FrameTicker`]: a fixed-rate frame source for callers that do not
//!   already have a simulation loop (the demo binary, integration tests).
//!
//! # Integration
//!
//! ```ignore
//! let mut frames = FrameTicker::with_rate(10);
//! loop {
//!     let dt = frames.next_frame().await;
//!     coordinator.poll_tick(dt).await;
//!     coordinator.heartbeat_tick(dt);
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::warn;

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// A repeating interval timer driven by caller-supplied delta times.
///
/// Each [`Countdown::tick`] subtracts `dt` from the time remaining. When the
/// remaining time is used up, the call reports a fire and the countdown
/// resets to its full interval. A countdown fires at most once per tick,
/// even when a single large `dt` spans several intervals: the frame loop
/// already ran late, and one fire per frame is all the consumers want.
#[derive(Debug, Clone)]
pub struct Countdown {
    interval: Duration,
    remaining: Duration,
}

impl Countdown {
    /// A countdown with no time remaining: it fires on the first tick and
    /// runs at `interval` from then on.
    pub fn ready(interval: Duration) -> Self {
        Self {
            interval,
            remaining: Duration::ZERO,
        }
    }

    /// A countdown that waits one full `interval` before its first fire.
    pub fn after(interval: Duration) -> Self {
        Self {
            interval,
            remaining: interval,
        }
    }

    /// Advances the countdown by `dt`. Returns `true` when it fires.
    pub fn tick(&mut self, dt: Duration) -> bool {
        if dt >= self.remaining {
            self.remaining = self.interval;
            true
        } else {
            self.remaining -= dt;
            false
        }
    }

    /// Puts a full interval back on the clock without firing.
    pub fn reset(&mut self) {
        self.remaining = self.interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }
}

// ---------------------------------------------------------------------------
// FrameTicker
// ---------------------------------------------------------------------------

/// Smallest frame period [`FrameTicker`] will run at.
const MIN_FRAME_PERIOD: Duration = Duration::from_millis(1);

/// A fixed-rate frame source built on [`tokio::time::interval`].
///
/// Yields a constant `dt` equal to the configured period, the fixed-timestep
/// convention: consumers see idealized frame times even when the runtime
/// delivers a frame late. Missed frames are delayed, not replayed, so a
/// stall never produces a burst of catch-up frames.
#[derive(Debug)]
pub struct FrameTicker {
    period: Duration,
    interval: time::Interval,
}

impl FrameTicker {
    /// A ticker firing every `period`. Periods under [`MIN_FRAME_PERIOD`]
    /// are clamped.
    pub fn new(period: Duration) -> Self {
        let period = if period < MIN_FRAME_PERIOD {
            warn!(
                requested_us = period.as_micros() as u64,
                "frame period below minimum, clamping"
            );
            MIN_FRAME_PERIOD
        } else {
            period
        };
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { period, interval }
    }

    /// A ticker firing `rate_hz` times per second.
    pub fn with_rate(rate_hz: u32) -> Self {
        let rate_hz = rate_hz.max(1);
        Self::new(Duration::from_secs_f64(1.0 / f64::from(rate_hz)))
    }

    /// Waits for the next frame and returns its fixed `dt`.
    ///
    /// The first call completes immediately (the interval's initial fire),
    /// which gives ready-initialized countdowns their first tick without an
    /// extra wait.
    pub async fn next_frame(&mut self) -> Duration {
        self.interval.tick().await;
        self.period
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

// ===========================================================================
// Tests
// ===========================================================================
