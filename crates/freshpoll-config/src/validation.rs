//! Configuration validation logic.

use crate::errors::ConfigError;
use crate::types::PollerConfig;

const SECONDS_PER_HOUR: u64 = 3600;

/// Validate a PollerConfig, returning an error if any values are invalid.
///
/// # Validation Rules
///
/// - Window must be between 1 and 3600 seconds and divide the hour evenly
/// - At least one fetch attempt per tick
/// - Stream buffer must hold at least one value
/// - A retry span longer than the window is allowed but logged, since the
///   next tick preempts the remaining retries
pub fn validate_config(config: &PollerConfig) -> Result<(), ConfigError> {
    let window = config.window.secs();
    if window == 0 || window > SECONDS_PER_HOUR || SECONDS_PER_HOUR % window != 0 {
        return Err(ConfigError::InvalidConfiguration {
            message: format!(
                "window.secs must divide {} evenly, got {}",
                SECONDS_PER_HOUR, window
            ),
        });
    }

    if config.retry.max_attempts() == 0 {
        return Err(ConfigError::InvalidConfiguration {
            message: "retry.max_attempts must be >= 1".to_string(),
        });
    }

    if config.stream.buffer() == 0 {
        return Err(ConfigError::InvalidConfiguration {
            message: "stream.buffer must be >= 1".to_string(),
        });
    }

    if config.retry.span_secs() >= window {
        tracing::warn!(
            event = "config.validation.retry_span_exceeds_window",
            span_secs = config.retry.span_secs(),
            window_secs = window,
            "Later retries will be preempted by the next tick"
        );
    }

    Ok(())
}
