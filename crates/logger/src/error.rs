//! Error types for the logging session

use std::io;
use std::path::PathBuf;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the session and its configuration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file sink failed
    #[error(transparent)]
    File(#[from] trail_logger_file::Error),

    /// Reading or writing the configuration file failed
    #[error("Failed to access config file {path}: {source}")]
    ConfigIo {
        /// The configuration file
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// The configuration file is not valid TOML for [`SessionConfig`](crate::SessionConfig)
    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        /// The configuration file
        path: PathBuf,
        /// The underlying error
        source: Box<toml::de::Error>,
    },

    /// The configuration could not be encoded
    #[error("Failed to encode config: {0}")]
    ConfigEncode(#[from] toml::ser::Error),
}
