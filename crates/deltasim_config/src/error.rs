//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `deltasim.toml` file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// A required field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A value is present but not usable.
    #[error("invalid value for {field}: {message}")]
    Validation {
        /// Dotted path of the offending key.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl ToString) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.to_string(),
        }
    }
}
