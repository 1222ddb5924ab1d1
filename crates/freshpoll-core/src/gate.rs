//! Freshness classification of fetched values.

use chrono::{DateTime, Utc};

use crate::errors::AttemptError;
use crate::fetch::SegmentStamped;
use crate::segment::{WindowSize, current_segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale {
        value_segment: i64,
        current_segment: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessGate {
    window: WindowSize,
}

impl FreshnessGate {
    pub fn new(window: WindowSize) -> Self {
        Self { window }
    }

    /// Compare the value's segment against the segment `now` falls in.
    ///
    /// `now` must be read when the fetch resolves, not when its tick fired.
    pub fn classify<V: SegmentStamped>(&self, value: &V, now: DateTime<Utc>) -> Freshness {
        let current_segment = current_segment(now, self.window);
        let value_segment = value.segment_index();

        if value_segment >= i64::from(current_segment) {
            Freshness::Fresh
        } else {
            Freshness::Stale {
                value_segment,
                current_segment,
            }
        }
    }

    pub fn check<V: SegmentStamped>(&self, value: V, now: DateTime<Utc>) -> Result<V, AttemptError> {
        match self.classify(&value, now) {
            Freshness::Fresh => Ok(value),
            Freshness::Stale {
                value_segment,
                current_segment,
            } => Err(AttemptError::Stale {
                value_segment,
                current_segment,
            }),
        }
    }
}
