//! # freshpoll-config
//!
//! TOML configuration types, loading, and validation for freshpoll.
//!
//! Single source of truth for the window, retry, and stream settings the
//! poller core consumes. Has no dependency on the core itself.

mod loading;
mod validation;

pub mod errors;
pub mod types;

// Public API re-exports
pub use errors::ConfigError;
pub use loading::{
    ENV_RETRY_DELAY_SECS, ENV_RETRY_MAX_ATTEMPTS, ENV_WINDOW_SECS, apply_env_overrides,
    load_config_file, load_hierarchy, load_hierarchy_from, merge_configs,
};
pub use types::{PollerConfig, RetryConfig, StreamConfig, WindowConfig};
pub use validation::validate_config;

impl PollerConfig {
    /// Load configuration from the hierarchy of config files and environment.
    ///
    /// See [`loading::load_hierarchy`] for details.
    pub fn load_hierarchy() -> Result<Self, ConfigError> {
        loading::load_hierarchy()
    }

    /// Validate the configuration.
    ///
    /// See [`validation::validate_config`] for details.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate_config(self)
    }
}
