//! Debug logging sessions backed by a rotating file
//!
//! A [`LogSession`] formats each message into a single labelled line, keeps
//! the most recent lines in memory for viewers and hands the ones worth
//! keeping to a background writer from `trail-logger-file`:
//!
//! ```no_run
//! use trail_logger::{LogSession, SessionConfig, Severity};
//!
//! # async fn run() -> trail_logger::Result<()> {
//! let session = LogSession::new(SessionConfig::load("debug.toml"));
//! session.start()?;
//! session.log("disk full", Severity::Error, None, None);
//! session.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! What reaches the disk is decided by [`LevelPolicy`]: errors always,
//! every level in verbose mode, and everything while a dump is active.

#![warn(missing_docs, unreachable_pub)]
#![forbid(unsafe_code)]

mod call_site;
mod config;
mod error;
mod formatter;
mod level;
mod payload;
mod session;

pub use call_site::CallSite;
pub use config::{BASE_COLOR_TEXT, ColorRule, DEFAULT_RECENT_CAPACITY, SessionConfig};
pub use error::{Error, Result};
pub use formatter::{
    CALL_SITE_SEPARATOR, LineFormat, MessageFormatter, OBJECT_HEADER, SPACER, THREAD_PREFIX,
    TIMESTAMP_FORMAT,
};
pub use level::{
    ERROR_LABEL, EXTERNAL_LABEL, INFORMATION_LABEL, LevelPolicy, Severity, WARNING_LABEL,
};
pub use payload::{
    MAP_KEY_SEPARATOR, SERIALIZATION_ERROR_MARKER, Serializable, serialize, serialize_many,
    serialize_map,
};
pub use session::LogSession;
pub use trail_logger_file::{FileLoggerConfig, RotationPolicy};
