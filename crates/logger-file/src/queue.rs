//! Single-consumer queue that moves log lines off the caller's thread

use crate::{Error, Result, RotatingFileWriter};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// A formatted line and the file it belongs in
#[derive(Debug)]
struct QueuedLine {
    path: PathBuf,
    line: String,
}

/// Decouples log producers from disk I/O.
///
/// Any number of threads may call [`enqueue`](Self::enqueue); a single
/// background task started by [`start`](Self::start) writes the lines in
/// arrival order through a [`RotatingFileWriter`]. [`shutdown`](Self::shutdown)
/// drains whatever was accepted before it was called, then stops the task.
///
/// A queue is single-use: once shut down it drops every further line.
#[derive(Debug)]
pub struct AsyncLogQueue {
    writer: Arc<RotatingFileWriter>,
    sender: mpsc::UnboundedSender<QueuedLine>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<QueuedLine>>>,
    closed: AtomicBool,
    dropped: AtomicU64,
    shutdown_token: CancellationToken,
    task_tracker: TaskTracker,
}

impl AsyncLogQueue {
    /// Create a stopped queue writing through `writer`
    #[must_use]
    pub fn new(writer: RotatingFileWriter) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        Self {
            writer: Arc::new(writer),
            sender,
            receiver: Mutex::new(Some(receiver)),
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
            shutdown_token: CancellationToken::new(),
            task_tracker: TaskTracker::new(),
        }
    }

    /// Queue `line` for `path` without waiting on disk.
    ///
    /// Lines queued before [`start`](Self::start) are held until the worker
    /// runs. After [`shutdown`](Self::shutdown) the line is dropped and a
    /// warning is traced.
    pub fn enqueue(&self, path: impl Into<PathBuf>, line: impl Into<String>) {
        if self.closed.load(Ordering::Acquire) {
            self.drop_line();
            return;
        }

        let queued = QueuedLine {
            path: path.into(),
            line: line.into(),
        };

        if self.sender.send(queued).is_err() {
            self.drop_line();
        }
    }

    fn drop_line(&self) {
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        warn!("{}; dropped {dropped} line(s) so far", Error::ChannelClosed);
    }

    /// Spawn the background writer on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStarted`] if the worker was started before,
    /// [`Error::ChannelClosed`] after shutdown, and [`Error::NoRuntime`] when
    /// called outside a tokio runtime.
    pub fn start(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::ChannelClosed);
        }

        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let Some(receiver) = self.receiver.lock().take() else {
            return Err(Error::AlreadyStarted);
        };

        let writer = Arc::clone(&self.writer);
        let shutdown_token = self.shutdown_token.clone();

        self.task_tracker
            .spawn_on(Self::run(writer, receiver, shutdown_token), &runtime);
        self.task_tracker.close();

        debug!("log queue worker started");
        Ok(())
    }

    /// Whether the worker has been started and not yet shut down
    pub fn is_running(&self) -> bool {
        self.task_tracker.is_closed()
            && !self.task_tracker.is_empty()
            && !self.closed.load(Ordering::Acquire)
    }

    /// Whether [`shutdown`](Self::shutdown) has been requested
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of lines refused because the queue was closed
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop accepting lines, write everything already queued, and wait for
    /// the worker to exit.
    ///
    /// If the worker was never started the backlog is drained on the
    /// calling task instead. There is no timeout; wrap the call in
    /// `tokio::time::timeout` if one is needed.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            self.task_tracker.wait().await;
            return;
        }

        info!("log queue shutting down...");

        let unstarted = self.receiver.lock().take();
        if let Some(receiver) = unstarted {
            Self::drain_remaining(&self.writer, receiver).await;
        }

        self.shutdown_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        info!("log queue shutdown complete.");
    }

    async fn run(
        writer: Arc<RotatingFileWriter>,
        mut receiver: mpsc::UnboundedReceiver<QueuedLine>,
        shutdown_token: CancellationToken,
    ) {
        loop {
            // Cancellation is only seen here, between drain cycles.
            let first = tokio::select! {
                biased;
                () = shutdown_token.cancelled() => break,
                next = receiver.recv() => match next {
                    Some(queued) => queued,
                    None => break,
                },
            };

            Self::write(&writer, first).await;
            while let Ok(queued) = receiver.try_recv() {
                Self::write(&writer, queued).await;
            }
        }

        Self::drain_remaining(&writer, receiver).await;
        debug!("log queue worker exited");
    }

    async fn drain_remaining(
        writer: &RotatingFileWriter,
        mut receiver: mpsc::UnboundedReceiver<QueuedLine>,
    ) {
        receiver.close();
        while let Some(queued) = receiver.recv().await {
            Self::write(writer, queued).await;
        }
    }

    async fn write(writer: &RotatingFileWriter, queued: QueuedLine) {
        if let Err(e) = writer.append_line(&queued.path, &queued.line).await {
            error!(
                "Failed to write log line to {}: {}",
                queued.path.display(),
                e
            );
        }
    }
}
