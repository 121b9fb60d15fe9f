use thiserror::Error;

use super::Format;

#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("config path not found: {0}")]
    NotFound(String),

    #[error("invalid config path: '{0}'")]
    InvalidPath(String),

    #[error("cannot set '{path}': segment '{segment}' holds a value that cannot be traversed")]
    PathBlocked { path: String, segment: String },

    #[error("failed to normalize value: {0}")]
    Normalize(String),

    #[error("failed to parse {format} data: {message}")]
    Parse { format: Format, message: String },

    #[error("failed to bind '{path}': {message}")]
    Bind { path: String, message: String },
}
