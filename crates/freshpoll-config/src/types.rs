//! Configuration types for the freshpoll poller.
//!
//! Every field is optional in the file form so that user and project files
//! can be layered; accessors resolve unset fields to the built-in defaults.

use serde::{Deserialize, Serialize};

/// Default segment width: each hour splits into six windows.
pub const DEFAULT_WINDOW_SECS: u64 = 600;
/// Default number of fetches per tick, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;
/// Default pause between two fetches of the same tick.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 30;
/// Default capacity of the channel between the poll task and its consumer.
pub const DEFAULT_STREAM_BUFFER: usize = 16;

/// Top-level configuration, read from `config.toml`.
///
/// ```toml
/// [window]
/// secs = 600
///
/// [retry]
/// max_attempts = 20
/// delay_secs = 30
///
/// [stream]
/// buffer = 16
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub stream: StreamConfig,
}

/// `[window]` section: how the hour is segmented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Segment width in seconds. Must divide 3600.
    #[serde(default)]
    pub secs: Option<u64>,
}

impl WindowConfig {
    pub fn secs(&self) -> u64 {
        self.secs.unwrap_or(DEFAULT_WINDOW_SECS)
    }
}

/// `[retry]` section: bounded retry inside one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub max_attempts: Option<u32>,

    #[serde(default)]
    pub delay_secs: Option<u64>,
}

impl RetryConfig {
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }

    pub fn delay_secs(&self) -> u64 {
        self.delay_secs.unwrap_or(DEFAULT_RETRY_DELAY_SECS)
    }

    /// Seconds between the first and the last fetch of a fully exhausted tick.
    pub fn span_secs(&self) -> u64 {
        u64::from(self.max_attempts().saturating_sub(1)).saturating_mul(self.delay_secs())
    }
}

/// `[stream]` section: consumer-facing channel settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub buffer: Option<usize>,
}

impl StreamConfig {
    pub fn buffer(&self) -> usize {
        self.buffer.unwrap_or(DEFAULT_STREAM_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PollerConfig::default();
        assert_eq!(config.window.secs(), 600);
        assert_eq!(config.retry.max_attempts(), 20);
        assert_eq!(config.retry.delay_secs(), 30);
        assert_eq!(config.stream.buffer(), 16);
    }

    #[test]
    fn test_retry_span_defaults_fit_in_window() {
        let config = PollerConfig::default();
        assert_eq!(config.retry.span_secs(), 570);
        assert!(config.retry.span_secs() < config.window.secs());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: PollerConfig = toml::from_str(
            r#"
[retry]
delay_secs = 10
"#,
        )
        .unwrap();

        assert_eq!(config.window.secs, None);
        assert_eq!(config.window.secs(), DEFAULT_WINDOW_SECS);
        assert_eq!(config.retry.delay_secs(), 10);
        assert_eq!(config.retry.max_attempts(), DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn test_parse_empty_toml() {
        let config: PollerConfig = toml::from_str("").unwrap();
        assert_eq!(config, PollerConfig::default());
    }
}
