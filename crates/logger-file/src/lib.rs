//! File sink for trail logs
//!
//! This crate persists already-formatted log lines without blocking the
//! threads that produce them:
//! - [`AsyncLogQueue`] accepts lines from any thread and hands them to a
//!   single background task in arrival order
//! - [`RotatingFileWriter`] appends to the active file and rotates it into
//!   numbered backups (`name_1.log` newest) once it outgrows its limit
//! - [`FileLoggerConfig`] names the files and carries the [`RotationPolicy`]

#![warn(missing_docs, unreachable_pub)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod queue;
mod writer;

pub use config::{
    DEFAULT_EXTENSION, DEFAULT_FILE_NAME, DEFAULT_LOG_DIR, DEFAULT_MAX_BACKUP_COUNT,
    DEFAULT_MAX_FILE_SIZE, FileLoggerConfig, FileLoggerConfigBuilder, RotationPolicy,
};
pub use error::{Error, Result};
pub use queue::AsyncLogQueue;
pub use writer::RotatingFileWriter;
