//! Wall-clock sources.
//!
//! The poller reads the clock twice per fetch: once when scheduling ticks and
//! again when judging freshness, so both reads go through [`Clock`].

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// The host's real-time clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall clock that advances with tokio's timer.
///
/// Pinned to `wall` at construction and moved forward by the elapsed
/// [`tokio::time::Instant`]. With the runtime clock paused this becomes a
/// virtual clock that only moves when tokio advances time, which keeps wall
/// readings and timer deadlines on the same timeline.
#[derive(Debug, Clone)]
pub struct AnchoredClock {
    wall: DateTime<Utc>,
    instant: Instant,
}

impl AnchoredClock {
    pub fn starting_at(wall: DateTime<Utc>) -> Self {
        Self {
            wall,
            instant: Instant::now(),
        }
    }

    /// Anchor at `secs` seconds plus `nanos` past the Unix epoch.
    ///
    /// Returns `None` when the timestamp is out of chrono's range.
    pub fn at_epoch(secs: i64, nanos: u32) -> Option<Self> {
        DateTime::from_timestamp(secs, nanos).map(Self::starting_at)
    }
}

impl Clock for AnchoredClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.instant.elapsed()).unwrap_or(TimeDelta::MAX);
        self.wall
            .checked_add_signed(elapsed)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
