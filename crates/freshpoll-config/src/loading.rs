//! Configuration loading and merging logic.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in the following order (later sources override earlier ones):
//! 1. **Hardcoded defaults** - Built-in fallback values
//! 2. **User config** - `~/.freshpoll/config.toml`
//! 3. **Project config** - `./.freshpoll/config.toml`
//! 4. **Environment** - `FRESHPOLL_*` variables (highest priority)

use crate::errors::ConfigError;
use crate::types::{PollerConfig, RetryConfig, StreamConfig, WindowConfig};
use crate::validation::validate_config;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ENV_WINDOW_SECS: &str = "FRESHPOLL_WINDOW_SECS";
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "FRESHPOLL_RETRY_MAX_ATTEMPTS";
pub const ENV_RETRY_DELAY_SECS: &str = "FRESHPOLL_RETRY_DELAY_SECS";

const CONFIG_DIR: &str = ".freshpoll";
const CONFIG_FILE: &str = "config.toml";

/// Load configuration from the default user and project locations.
///
/// Missing config files are not errors. Parse errors, bad environment
/// overrides, and validation failures are.
pub fn load_hierarchy() -> Result<PollerConfig, ConfigError> {
    let user = dirs::home_dir().map(|home| config_path_in(&home));
    if user.is_none() {
        tracing::warn!(
            event = "config.loading.home_dir_unresolved",
            "No home directory; skipping user config"
        );
    }
    let project = config_path_in(&std::env::current_dir()?);
    load_hierarchy_from(user.as_deref(), Some(&project))
}

/// Load and merge the given config files, then apply environment overrides.
pub fn load_hierarchy_from(
    user: Option<&Path>,
    project: Option<&Path>,
) -> Result<PollerConfig, ConfigError> {
    let mut config = PollerConfig::default();

    for path in [user, project].into_iter().flatten() {
        match load_config_file(path) {
            Ok(file_config) => {
                tracing::debug!(event = "config.loading.file_loaded", path = %path.display());
                config = merge_configs(config, file_config);
            }
            Err(e) if e.is_file_not_found() => {
                tracing::debug!(event = "config.loading.file_missing", path = %path.display());
            }
            Err(e) => return Err(e),
        }
    }

    let config = apply_env_overrides(config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Load a configuration file from the given path.
pub fn load_config_file(path: &Path) -> Result<PollerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::ConfigParseError {
        message: format!("'{}': {}", path.display(), e),
    })
}

/// Merge two configurations, with override_config taking precedence.
///
/// Override values replace base values only if present.
pub fn merge_configs(base: PollerConfig, override_config: PollerConfig) -> PollerConfig {
    PollerConfig {
        window: WindowConfig {
            secs: override_config.window.secs.or(base.window.secs),
        },
        retry: RetryConfig {
            max_attempts: override_config
                .retry
                .max_attempts
                .or(base.retry.max_attempts),
            delay_secs: override_config.retry.delay_secs.or(base.retry.delay_secs),
        },
        stream: StreamConfig {
            buffer: override_config.stream.buffer.or(base.stream.buffer),
        },
    }
}

/// Apply `FRESHPOLL_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(mut config: PollerConfig) -> Result<PollerConfig, ConfigError> {
    if let Some(secs) = env_value(ENV_WINDOW_SECS)? {
        config.window.secs = Some(secs);
    }
    if let Some(attempts) = env_value(ENV_RETRY_MAX_ATTEMPTS)? {
        config.retry.max_attempts = Some(attempts);
    }
    if let Some(delay) = env_value(ENV_RETRY_DELAY_SECS)? {
        config.retry.delay_secs = Some(delay);
    }
    Ok(config)
}

fn env_value<T: FromStr>(variable: &str) -> Result<Option<T>, ConfigError> {
    let Ok(raw) = std::env::var(variable) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnvOverride {
            variable: variable.to_string(),
            value: raw,
        })
}

/// `<root>/.freshpoll/config.toml`, for both the home and project roots.
fn config_path_in(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR).join(CONFIG_FILE)
}
