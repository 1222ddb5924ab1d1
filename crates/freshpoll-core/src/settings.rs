use std::time::Duration;

use freshpoll_config::PollerConfig;

use crate::errors::PollerError;
use crate::retry::RetryPolicy;
use crate::segment::WindowSize;

pub const DEFAULT_BUFFER: usize = 16;

/// Validated runtime settings for a [`FreshValueStream`](crate::stream::FreshValueStream).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSettings {
    pub window: WindowSize,
    pub retry: RetryPolicy,
    /// Values buffered between the poll task and a slow consumer.
    pub buffer: usize,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            window: WindowSize::default(),
            retry: RetryPolicy::default(),
            buffer: DEFAULT_BUFFER,
        }
    }
}

impl TryFrom<&PollerConfig> for PollerSettings {
    type Error = PollerError;

    fn try_from(config: &PollerConfig) -> Result<Self, Self::Error> {
        let buffer = config.stream.buffer();
        if buffer == 0 {
            return Err(PollerError::InvalidBuffer);
        }

        Ok(Self {
            window: WindowSize::try_from_secs(config.window.secs())?,
            retry: RetryPolicy::new(
                config.retry.max_attempts(),
                Duration::from_secs(config.retry.delay_secs()),
            )?,
            buffer,
        })
    }
}

impl PollerSettings {
    /// Load the config hierarchy and convert it.
    pub fn load() -> Result<Self, PollerError> {
        let config = PollerConfig::load_hierarchy()?;
        Self::try_from(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freshpoll_config::{RetryConfig, StreamConfig, WindowConfig};

    #[test]
    fn test_defaults_match_config_defaults() {
        let settings = PollerSettings::try_from(&PollerConfig::default()).unwrap();
        assert_eq!(settings, PollerSettings::default());
    }

    #[test]
    fn test_custom_config() {
        let config = PollerConfig {
            window: WindowConfig { secs: Some(300) },
            retry: RetryConfig {
                max_attempts: Some(4),
                delay_secs: Some(15),
            },
            stream: StreamConfig { buffer: Some(2) },
        };

        let settings = PollerSettings::try_from(&config).unwrap();
        assert_eq!(settings.window.secs(), 300);
        assert_eq!(settings.retry.max_attempts(), 4);
        assert_eq!(settings.retry.delay(), Duration::from_secs(15));
        assert_eq!(settings.buffer, 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = PollerConfig::default();
        config.window.secs = Some(7);
        assert!(matches!(
            PollerSettings::try_from(&config),
            Err(PollerError::InvalidWindow { secs: 7 })
        ));

        let mut config = PollerConfig::default();
        config.retry.max_attempts = Some(0);
        assert!(matches!(
            PollerSettings::try_from(&config),
            Err(PollerError::InvalidRetryPolicy(_))
        ));

        let mut config = PollerConfig::default();
        config.stream.buffer = Some(0);
        assert!(matches!(
            PollerSettings::try_from(&config),
            Err(PollerError::InvalidBuffer)
        ));
    }
}
