//! Wall-clock segmentation of the hour.
//!
//! An hour is split into equal windows counted from the top of the hour.
//! All arithmetic truncates the timestamp to whole epoch seconds.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::errors::PollerError;

pub const SECONDS_PER_HOUR: u64 = 3600;

/// Width of one segment, in whole seconds. Always divides the hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowSize(u64);

impl WindowSize {
    pub const TEN_MINUTES: WindowSize = WindowSize(600);

    pub fn try_from_secs(secs: u64) -> Result<Self, PollerError> {
        if secs == 0 || secs > SECONDS_PER_HOUR || SECONDS_PER_HOUR % secs != 0 {
            return Err(PollerError::InvalidWindow { secs });
        }
        Ok(WindowSize(secs))
    }

    pub fn secs(self) -> u64 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.0)
    }

    pub fn segments_per_hour(self) -> u32 {
        (SECONDS_PER_HOUR / self.0) as u32
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        WindowSize::TEN_MINUTES
    }
}

/// Where a timestamp sits inside the hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentPosition {
    /// `0 <= segment_index < segments_per_hour`.
    pub segment_index: u32,
    /// Zero when the timestamp is exactly on a boundary.
    pub seconds_to_boundary: u64,
}

impl SegmentPosition {
    pub fn is_aligned(&self) -> bool {
        self.seconds_to_boundary == 0
    }
}

pub fn segment_and_remainder(now: DateTime<Utc>, window: WindowSize) -> SegmentPosition {
    let elapsed = now.timestamp().rem_euclid(SECONDS_PER_HOUR as i64) as u64;
    let offset = elapsed % window.0;

    SegmentPosition {
        segment_index: (elapsed / window.0) as u32,
        seconds_to_boundary: if offset == 0 { 0 } else { window.0 - offset },
    }
}

pub fn current_segment(now: DateTime<Utc>, window: WindowSize) -> u32 {
    segment_and_remainder(now, window).segment_index
}
