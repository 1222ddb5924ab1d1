#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse config file: {message}")]
    ConfigParseError { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Invalid value for {variable}: '{value}'")]
    InvalidEnvOverride { variable: String, value: String },

    #[error("IO error reading config: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Error code for programmatic handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::ConfigParseError { .. } => "CONFIG_PARSE_ERROR",
            ConfigError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            ConfigError::InvalidEnvOverride { .. } => "INVALID_ENV_OVERRIDE",
            ConfigError::IoError { .. } => "CONFIG_IO_ERROR",
        }
    }

    /// Whether the error was caused by something the user wrote.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, ConfigError::IoError { .. })
    }

    pub(crate) fn is_file_not_found(&self) -> bool {
        matches!(
            self,
            ConfigError::IoError { source } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
