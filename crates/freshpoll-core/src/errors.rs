/// Errors raised while building a poller from configuration.
///
/// None of these can surface from a running stream; they only come out of
/// construction.
#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("invalid window: {secs}s must be between 1 and 3600 and divide the hour")]
    InvalidWindow { secs: u64 },

    #[error("invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    #[error("invalid stream buffer: must hold at least one value")]
    InvalidBuffer,

    #[error("config error: {0}")]
    Config(#[from] freshpoll_config::ConfigError),
}

impl PollerError {
    pub fn error_code(&self) -> &'static str {
        match self {
            PollerError::InvalidWindow { .. } => "invalid_window",
            PollerError::InvalidRetryPolicy(_) => "invalid_retry_policy",
            PollerError::InvalidBuffer => "invalid_buffer",
            PollerError::Config(_) => "config_error",
        }
    }

    /// Whether this error is caused by user input.
    pub fn is_user_error(&self) -> bool {
        match self {
            PollerError::Config(e) => e.is_user_error(),
            _ => true,
        }
    }
}

/// Failure reported by a [`Fetcher`](crate::fetch::Fetcher).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("transport failure: {message}")]
    Transport { message: String },

    #[error("undecodable response: {message}")]
    Decode { message: String },
}

impl FetchError {
    pub fn transport(message: impl Into<String>) -> Self {
        FetchError::Transport {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        FetchError::Decode {
            message: message.into(),
        }
    }
}

/// Why a single fetch attempt did not produce a fresh value.
///
/// Both variants are retried from the same per-tick budget, and both end in
/// the cached value once that budget runs out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttemptError {
    #[error("stale result: value segment {value_segment} is behind current segment {current_segment}")]
    Stale {
        value_segment: i64,
        current_segment: u32,
    },

    #[error(transparent)]
    Transport(#[from] FetchError),
}

impl AttemptError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AttemptError::Stale { .. } => "stale_result",
            AttemptError::Transport(_) => "transport_failure",
        }
    }
}
