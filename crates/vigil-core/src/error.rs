use thiserror::Error;

/// Errors from loading or interpreting a scheduler configuration.
///
/// Nothing here is ever fatal to the daemon: callers log the error and keep
/// the previous in-memory state ("never die").
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for the expected schema.
    #[error("malformed config {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A duration string did not match the `<number><unit>` grammar.
    #[error("invalid duration {0:?}")]
    InvalidDuration(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
