//! The logging façade owned by the host application

use crate::payload::{serialize_many, serialize_map};
use crate::{
    CallSite, LevelPolicy, MessageFormatter, Result, Serializable, SessionConfig, Severity,
};
use parking_lot::{Mutex, RwLock};
use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, trace, warn};
use trail_logger_file::{AsyncLogQueue, FileLoggerConfig, RotatingFileWriter};

#[derive(Debug)]
struct RecentEntry {
    line: String,
    persisted: bool,
}

/// Bounded history of formatted lines.
///
/// Once full it is cleared and starts over instead of sliding.
#[derive(Debug)]
struct RecentLog {
    entries: Vec<RecentEntry>,
    capacity: usize,
}

impl RecentLog {
    fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    fn push(&mut self, line: String, persisted: bool) {
        if self.entries.len() >= self.capacity {
            debug!("recent log buffer reached {} lines, restarting", self.capacity);
            self.entries.clear();
        }
        self.entries.push(RecentEntry { line, persisted });
    }

    fn reset(&mut self) {
        self.entries.clear();
    }

    fn lines(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.line.clone()).collect()
    }

    /// Lines not yet handed to disk, marking them as handed over
    fn take_unpersisted(&mut self) -> Vec<String> {
        self.entries
            .iter_mut()
            .filter(|e| !e.persisted)
            .map(|e| {
                e.persisted = true;
                e.line.clone()
            })
            .collect()
    }
}

/// A logging session: `Stopped` until [`start`](Self::start), `Running`
/// until [`stop`](Self::stop).
///
/// While running, every [`log`](Self::log) call is formatted and kept in a
/// bounded in-memory buffer. Errors always go to disk; other levels only in
/// verbose mode or once [`create_dump`](Self::create_dump) was called. Disk
/// writes happen on a background task, so logging never waits on I/O.
///
/// Dropping a running session closes its queue; the worker still writes the
/// backlog before it exits, as long as the runtime keeps running.
#[derive(Debug)]
pub struct LogSession {
    file_config: FileLoggerConfig,
    active_path: PathBuf,
    formatter: MessageFormatter,
    active: AtomicBool,
    verbose: AtomicBool,
    dump: AtomicBool,
    // Lock order: `queue` before `recent`.
    queue: RwLock<Option<AsyncLogQueue>>,
    recent: Mutex<RecentLog>,
}

impl LogSession {
    /// Create a stopped session.
    ///
    /// A config whose file settings would make every write fail is replaced
    /// by the default file settings, keeping its rotation limits.
    pub fn new(config: SessionConfig) -> Self {
        let mut file_config = config.file_config();
        if let Err(e) = file_config.validate() {
            warn!("{e}; logging to the default file instead");
            file_config = FileLoggerConfig {
                rotation: file_config.rotation,
                ..FileLoggerConfig::default()
            };
        }

        Self {
            active_path: file_config.active_path(),
            file_config,
            formatter: MessageFormatter::default(),
            active: AtomicBool::new(false),
            verbose: AtomicBool::new(config.verbose),
            dump: AtomicBool::new(false),
            queue: RwLock::new(None),
            recent: Mutex::new(RecentLog::new(config.recent_capacity)),
        }
    }

    /// Use `formatter` instead of the default layout
    #[must_use]
    pub fn with_formatter(mut self, formatter: MessageFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Start logging with a fresh recent buffer.
    ///
    /// Starting a running session does nothing.
    ///
    /// # Errors
    ///
    /// Fails when called outside a tokio runtime; the session stays stopped.
    pub fn start(&self) -> Result<()> {
        let mut slot = self.queue.write();
        if slot.is_some() {
            return Ok(());
        }

        let queue = AsyncLogQueue::new(RotatingFileWriter::new(self.file_config.rotation));
        queue.start()?;
        *slot = Some(queue);

        self.recent.lock().reset();
        self.active.store(true, Ordering::Release);

        info!("log session started, writing to {}", self.active_path.display());
        Ok(())
    }

    /// Stop logging and wait until every accepted line is on disk.
    ///
    /// The recent buffer is kept so a later dump still has the history.
    pub async fn stop(&self) {
        self.active.store(false, Ordering::Release);

        let queue = self.queue.write().take();
        if let Some(queue) = queue {
            queue.shutdown().await;
            info!("log session stopped");
        }
    }

    /// Record `message`.
    ///
    /// Does nothing while stopped. Build `call_site` only when
    /// [`should_collect_context`](Self::should_collect_context) is true,
    /// or use [`trail_log!`](crate::trail_log) which does that.
    pub fn log(
        &self,
        message: &str,
        level: Severity,
        payload: Option<&str>,
        call_site: Option<&CallSite>,
    ) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }

        let verbose = self.is_verbose();
        let call_site = call_site.map(ToString::to_string);
        let line = self
            .formatter
            .format(message, level, payload, call_site.as_deref(), verbose);
        let persist = LevelPolicy::should_collect_context(level, verbose) || self.is_dump_active();

        let queue = self.queue.read();
        let Some(queue) = queue.as_ref() else {
            // stopped concurrently
            return;
        };

        trace!(%level, persist, "{line}");

        let mut recent = self.recent.lock();
        if persist {
            queue.enqueue(&self.active_path, line.clone());
        }
        recent.push(line, persist);
    }

    /// Record `message` with `value` rendered as its payload
    pub fn log_object<T: Serializable + ?Sized>(
        &self,
        message: &str,
        level: Severity,
        value: &T,
        call_site: Option<&CallSite>,
    ) {
        if !self.is_running() {
            return;
        }
        self.log(message, level, Some(&value.render_text()), call_site);
    }

    /// Record `message` with each of `values` on its own payload line
    pub fn log_list<I>(
        &self,
        message: &str,
        level: Severity,
        values: I,
        call_site: Option<&CallSite>,
    ) where
        I: IntoIterator,
        I::Item: Serializable,
    {
        if !self.is_running() {
            return;
        }
        self.log(message, level, Some(&serialize_many(values)), call_site);
    }

    /// Record `message` with `key : value` payload lines
    pub fn log_map<I, K, V>(
        &self,
        message: &str,
        level: Severity,
        entries: I,
        call_site: Option<&CallSite>,
    ) where
        I: IntoIterator<Item = (K, V)>,
        K: Display,
        V: Serializable,
    {
        if !self.is_running() {
            return;
        }
        self.log(message, level, Some(&serialize_map(entries)), call_site);
    }

    /// Shorthand for an [`Severity::Error`] line
    pub fn error(&self, message: &str) {
        self.log(message, Severity::Error, None, None);
    }

    /// Shorthand for a [`Severity::Warning`] line
    pub fn warning(&self, message: &str) {
        self.log(message, Severity::Warning, None, None);
    }

    /// Shorthand for an [`Severity::Information`] line
    pub fn information(&self, message: &str) {
        self.log(message, Severity::Information, None, None);
    }

    /// Shorthand for an [`Severity::External`] line
    pub fn external(&self, message: &str) {
        self.log(message, Severity::External, None, None);
    }

    /// Persist everything logged from now on, regardless of level.
    ///
    /// Buffered lines that never reached disk are written first. Works in
    /// any state: a stopped session writes them directly.
    pub async fn create_dump(&self) {
        self.dump.store(true, Ordering::Release);

        let pending = {
            let queue = self.queue.read();
            let mut recent = self.recent.lock();
            let pending = recent.take_unpersisted();

            if let Some(queue) = queue.as_ref() {
                for line in &pending {
                    queue.enqueue(&self.active_path, line.as_str());
                }
                info!("dump started, {} buffered line(s) queued", pending.len());
                return;
            }
            pending
        };

        let writer = RotatingFileWriter::new(self.file_config.rotation);
        for line in &pending {
            if let Err(e) = writer.append_line(&self.active_path, line).await {
                error!("Failed to dump log line to {}: {e}", self.active_path.display());
                return;
            }
        }
        info!("dump written, {} buffered line(s)", pending.len());
    }

    /// Go back to level-based persistence
    pub fn reset_dump(&self) {
        if self.dump.swap(false, Ordering::AcqRel) {
            info!("dump reset");
        }
    }

    /// Stop the session and remove the active log file.
    ///
    /// Failures are traced, never returned.
    pub async fn delete(&self) {
        self.stop().await;

        match tokio::fs::remove_file(&self.active_path).await {
            Ok(()) => info!("deleted log file {}", self.active_path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no log file to delete at {}", self.active_path.display());
            }
            Err(e) => error!("Could not delete log file {}: {e}", self.active_path.display()),
        }
    }

    /// Copy of the recent buffer, oldest first
    pub fn recent_messages(&self) -> Vec<String> {
        self.recent.lock().lines()
    }

    /// Whether the session is running
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Whether dump mode is on
    pub fn is_dump_active(&self) -> bool {
        self.dump.load(Ordering::Acquire)
    }

    /// Whether verbose mode is on
    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::Acquire)
    }

    /// Turn verbose mode on or off for subsequent lines
    pub fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Ordering::Release);
    }

    /// [`LevelPolicy::should_collect_context`] with this session's verbosity
    pub fn should_collect_context(&self, level: Severity) -> bool {
        LevelPolicy::should_collect_context(level, self.is_verbose())
    }

    /// The active log file
    pub fn log_file_path(&self) -> &Path {
        &self.active_path
    }

    /// File settings in effect
    pub const fn file_config(&self) -> &FileLoggerConfig {
        &self.file_config
    }
}

/// Log a formatted message, capturing the call site only when the session
/// would use it.
///
/// ```
/// use trail_logger::{LogSession, SessionConfig, Severity, trail_log};
///
/// let session = LogSession::new(SessionConfig::default());
/// // Stopped, so nothing is formatted or written.
/// trail_log!(session, Severity::Error, "failed after {} attempts", 3);
/// assert!(session.recent_messages().is_empty());
/// ```
#[macro_export]
macro_rules! trail_log {
    ($session:expr, $level:expr, $($arg:tt)+) => {{
        let session: &$crate::LogSession = &$session;
        let level: $crate::Severity = $level;
        let call_site = session
            .should_collect_context(level)
            .then(|| $crate::call_site!());
        session.log(&format!($($arg)+), level, None, call_site.as_ref());
    }};
}
