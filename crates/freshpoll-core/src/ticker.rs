//! Boundary-aligned tick source.
//!
//! Fires once on activation, then on every window boundary counted from the
//! top of the hour. Subsequent ticks are never spaced from the activation
//! time itself.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{Instant, Interval, interval_at};
use tracing::debug;

use crate::clock::Clock;
use crate::segment::{WindowSize, segment_and_remainder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    /// The tick delivered on activation.
    Initial,
    /// A tick that lands on a window boundary.
    Boundary,
}

/// A unit "time to re-check" signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Zero-based count of ticks delivered by this ticker.
    pub sequence: u64,
    pub kind: TickKind,
    /// Wall-clock reading when the tick was delivered.
    pub at: DateTime<Utc>,
}

pub struct AlignedTicker {
    clock: Arc<dyn Clock>,
    interval: Interval,
    /// Set when activation fell mid-window, so the immediate tick does not
    /// come from `interval`.
    initial_pending: bool,
    sequence: u64,
}

impl AlignedTicker {
    /// Activate the ticker against the current clock reading.
    pub fn new(clock: Arc<dyn Clock>, window: WindowSize) -> Self {
        let position = segment_and_remainder(clock.now(), window);
        let first_boundary = Instant::now() + Duration::from_secs(position.seconds_to_boundary);

        debug!(
            event = "core.ticker.activated",
            segment = position.segment_index,
            seconds_to_boundary = position.seconds_to_boundary,
            window_secs = window.secs(),
        );

        Self {
            clock,
            interval: interval_at(first_boundary, window.as_duration()),
            initial_pending: !position.is_aligned(),
            sequence: 0,
        }
    }

    /// Wait for the next tick.
    ///
    /// Cancel safe: dropping the returned future loses no tick.
    pub async fn tick(&mut self) -> Tick {
        if self.initial_pending {
            self.initial_pending = false;
        } else {
            self.interval.tick().await;
        }

        let kind = if self.sequence == 0 {
            TickKind::Initial
        } else {
            TickKind::Boundary
        };
        let tick = Tick {
            sequence: self.sequence,
            kind,
            at: self.clock.now(),
        };
        self.sequence += 1;
        tick
    }
}
