//! freshpoll-core: wall-clock aligned freshness polling
//!
//! Exposes one live value that tracks the most recent fresh reading from an
//! upstream source publishing once per window of the hour.
//!
//! # Main Entry Points
//!
//! - [`stream`] - Attach consumers to the deduplicated value stream
//! - [`ticker`] - Boundary-aligned tick source
//! - [`retry`] - Per-tick fetch and bounded retry cycle
//! - [`segment`] - Hour segmentation arithmetic

pub mod clock;
pub mod errors;
pub mod fetch;
pub mod gate;
pub mod logging;
pub mod retry;
pub mod segment;
pub mod settings;
pub mod stream;
pub mod ticker;

pub use clock::{AnchoredClock, Clock, SystemClock};
pub use errors::{AttemptError, FetchError, PollerError};
pub use fetch::{Fetcher, SegmentStamped};
pub use gate::{Freshness, FreshnessGate};
pub use retry::{AttemptBudget, CycleOutcome, CyclePhase, NextStep, RetryCycle, RetryPolicy};
pub use segment::{SegmentPosition, WindowSize, current_segment, segment_and_remainder};
pub use settings::PollerSettings;
pub use stream::{FreshValueStream, FreshValues, PollState, Resolution};
pub use ticker::{AlignedTicker, Tick, TickKind};

// Re-export config types from freshpoll-config
pub use freshpoll_config::{ConfigError, PollerConfig};

pub use logging::init_logging;
