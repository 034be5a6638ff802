//! Error types for file-based logging

use std::io;
use std::path::PathBuf;

/// Result type for file logger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during file logging
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error occurred
    #[error("{0}: {1}")]
    Io(&'static str, #[source] io::Error),

    /// Failed to create log directory
    #[error("Failed to create log directory at {path}: {source}")]
    CreateDirectory {
        /// The path that failed to be created
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// Failed to rotate log file
    #[error("Failed to rotate log file {path}: {source}")]
    Rotation {
        /// The file that was being moved or removed
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The queue no longer accepts lines
    #[error("Failed to send log message: channel closed")]
    ChannelClosed,

    /// The worker was started twice
    #[error("log queue worker already started")]
    AlreadyStarted,

    /// `start` was called outside of a tokio runtime
    #[error("no tokio runtime available to spawn the log worker")]
    NoRuntime,
}
