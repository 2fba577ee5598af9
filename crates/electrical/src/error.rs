use thiserror::Error;

/// Construction-time configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Missing required supply parameter '{0}'")]
    MissingKey(&'static str),

    #[error("Supply parameter '{key}' must be a {expected}")]
    InvalidType {
        key: &'static str,
        expected: &'static str,
    },

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },
}
