//! Text layout of a single log line
//!
//! ```text
//! <label><timestamp><spacer><message>[<spacer>ThreadId: <id>][<nl>Object:<nl><payload>][<nl><call site>]
//! ```

use crate::{LevelPolicy, Severity};
use chrono::Local;
use std::fmt::Write;

/// Separator between the header fields of a line
pub const SPACER: &str = " , ";
/// Introduces the thread segment in verbose mode
pub const THREAD_PREFIX: &str = "ThreadId: ";
/// Introduces the payload section
pub const OBJECT_HEADER: &str = "\nObject:\n";
/// Separates the call site from what precedes it
pub const CALL_SITE_SEPARATOR: &str = "\n";
/// `chrono` format of the timestamp, local time with milliseconds
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Delimiter tokens used when rendering a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFormat {
    /// Between timestamp, message and thread segment
    pub spacer: String,
    /// Before the thread identifier
    pub thread_prefix: String,
    /// Before the payload
    pub object_header: String,
    /// Before the call site
    pub call_site_separator: String,
    /// `chrono` strftime pattern for the timestamp
    pub timestamp_format: String,
}

impl Default for LineFormat {
    fn default() -> Self {
        Self {
            spacer: SPACER.to_string(),
            thread_prefix: THREAD_PREFIX.to_string(),
            object_header: OBJECT_HEADER.to_string(),
            call_site_separator: CALL_SITE_SEPARATOR.to_string(),
            timestamp_format: TIMESTAMP_FORMAT.to_string(),
        }
    }
}

/// Renders log lines
#[derive(Debug, Clone, Default)]
pub struct MessageFormatter {
    format: LineFormat,
}

impl MessageFormatter {
    /// Create a formatter with custom delimiters
    #[must_use]
    pub const fn new(format: LineFormat) -> Self {
        Self { format }
    }

    /// The delimiters in use
    #[must_use]
    pub const fn line_format(&self) -> &LineFormat {
        &self.format
    }

    /// Render one line.
    ///
    /// Empty or absent `payload` and `call_site` are left out entirely.
    /// Apart from the timestamp and thread id the output depends only on
    /// the arguments.
    #[must_use]
    pub fn format(
        &self,
        message: &str,
        level: Severity,
        payload: Option<&str>,
        call_site: Option<&str>,
        verbose: bool,
    ) -> String {
        let timestamp = self.timestamp();
        let label = LevelPolicy::label_for(level);

        let mut line = format!("{label}{timestamp}{}{message}", self.format.spacer);

        if verbose {
            line.push_str(&self.format.spacer);
            line.push_str(&self.format.thread_prefix);
            line.push_str(&current_thread_id());
        }

        if let Some(payload) = payload.filter(|p| !p.is_empty()) {
            line.push_str(&self.format.object_header);
            line.push_str(payload);
        }

        if let Some(call_site) = call_site.filter(|c| !c.is_empty()) {
            line.push_str(&self.format.call_site_separator);
            line.push_str(call_site);
        }

        line
    }

    fn timestamp(&self) -> String {
        let now = Local::now();
        let mut out = String::new();
        // A malformed user pattern makes chrono fail at display time.
        if write!(out, "{}", now.format(&self.format.timestamp_format)).is_err() {
            out.clear();
            let _ = write!(out, "{}", now.format(TIMESTAMP_FORMAT));
        }
        out
    }
}

/// Name of the current thread, or its numeric id when unnamed
fn current_thread_id() -> String {
    let thread = std::thread::current();
    if let Some(name) = thread.name() {
        return name.to_string();
    }

    let id = format!("{:?}", thread.id());
    id.strip_prefix("ThreadId(")
        .and_then(|rest| rest.strip_suffix(')'))
        .map_or_else(|| id.clone(), str::to_string)
}
