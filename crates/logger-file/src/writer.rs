//! Append-only log file writer with numbered-backup rotation

use crate::config::backup_path_for;
use crate::{Error, Result, RotationPolicy};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// One permit per log path, shared by every writer in the process.
///
/// Only paths with a write in flight keep an entry: idle permits are
/// pruned whenever a new path is added.
static WRITE_PERMITS: LazyLock<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn permit_for(path: &Path) -> Arc<tokio::sync::Mutex<()>> {
    let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut permits = WRITE_PERMITS.lock();

    if let Some(permit) = permits.get(&key) {
        return Arc::clone(permit);
    }

    // A count of one means only the map holds it, so nobody is writing.
    permits.retain(|_, permit| Arc::strong_count(permit) > 1);
    let permit = Arc::new(tokio::sync::Mutex::new(()));
    permits.insert(key, Arc::clone(&permit));
    permit
}

/// Writes lines to a log file, rotating it into `name_N` backups once it
/// grows past [`RotationPolicy::max_file_size_bytes`].
///
/// The size check runs before every append, so the active file can exceed
/// the limit by at most one line. Rotation and append for a path happen
/// under a single process-wide permit for that path.
///
/// Backup names come from splitting the file name at its last dot
/// (`app.v2.log` -> `app.v2_1.log`); [`FileLoggerConfig::validate`](crate::FileLoggerConfig::validate)
/// rejects names where that split would be ambiguous.
#[derive(Debug, Clone)]
pub struct RotatingFileWriter {
    rotation: RotationPolicy,
}

impl RotatingFileWriter {
    /// Create a writer with the given rotation limits
    #[must_use]
    pub const fn new(rotation: RotationPolicy) -> Self {
        Self { rotation }
    }

    /// The rotation limits in effect
    #[must_use]
    pub const fn rotation(&self) -> RotationPolicy {
        self.rotation
    }

    /// Make sure `path` and its parent directory exist.
    ///
    /// Existing files are left untouched, so calling this repeatedly is
    /// harmless. Returns `path` unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the file cannot be created.
    pub async fn ensure_file(&self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| Error::CreateDirectory {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| Error::Io("error creating log file", e))?;

        Ok(path.to_path_buf())
    }

    /// Append `line` to `path`, rotating first if the file is over the limit.
    ///
    /// A trailing newline is added when `line` does not already end with one.
    ///
    /// # Errors
    ///
    /// Returns an error if rotation or the write fails. The caller decides
    /// whether the line is worth retrying; nothing here panics.
    pub async fn append_line(&self, path: &Path, line: &str) -> Result<()> {
        let permit = permit_for(path);
        let _guard = permit.lock().await;

        self.ensure_file(path).await?;

        let size = fs::metadata(path)
            .await
            .map_err(|e| Error::Io("error reading log file metadata", e))?
            .len();

        if size > self.rotation.max_file_size_bytes {
            debug!(
                "log file {} is {size} bytes (limit {}), rotating",
                path.display(),
                self.rotation.max_file_size_bytes
            );
            self.rotate_locked(path).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| Error::Io("error opening log file", e))?;

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        if !line.ends_with('\n') {
            buf.push('\n');
        }

        file.write_all(buf.as_bytes())
            .await
            .map_err(|e| Error::Io("error appending to log file", e))?;
        file.flush()
            .await
            .map_err(|e| Error::Io("error flushing log file", e))?;

        Ok(())
    }

    /// Rotate `path` now, regardless of its size. Returns `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rotation`] if a backup cannot be moved or removed.
    pub async fn rotate(&self, path: &Path) -> Result<PathBuf> {
        let permit = permit_for(path);
        let _guard = permit.lock().await;
        self.rotate_locked(path).await
    }

    async fn rotate_locked(&self, path: &Path) -> Result<PathBuf> {
        let max = self.rotation.max_backup_count;

        // Highest index first so a rename never lands on a live backup.
        for index in existing_backups(path).await?.into_iter().rev() {
            let from = backup_path_for(path, index);
            if index >= max {
                remove_if_exists(&from).await?;
                debug!("deleted expired log backup {}", from.display());
            } else {
                let to = backup_path_for(path, index + 1);
                fs::rename(&from, &to)
                    .await
                    .map_err(|source| Error::Rotation {
                        path: from.clone(),
                        source,
                    })?;
            }
        }

        if max == 0 {
            remove_if_exists(path).await?;
        } else {
            match fs::rename(path, backup_path_for(path, 1)).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(Error::Rotation {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }

        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .await
            .map_err(|e| Error::Io("error recreating log file", e))?;

        info!("rotated log file {}", path.display());
        Ok(path.to_path_buf())
    }
}

impl Default for RotatingFileWriter {
    fn default() -> Self {
        Self::new(RotationPolicy::default())
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::Rotation {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Indices of the `name_N` backups currently on disk, ascending.
async fn existing_backups(path: &Path) -> Result<Vec<usize>> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut entries = match fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::Io("error reading log directory", e)),
    };

    let mut indices = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::Io("error reading log directory entry", e))?
    {
        if let Some(name) = entry.file_name().to_str()
            && let Some(index) = parse_backup_index(name, &stem, extension.as_deref())
        {
            indices.push(index);
        }
    }

    indices.sort_unstable();
    Ok(indices)
}

/// `name_7.log` -> `Some(7)` for stem `name` and extension `log`.
fn parse_backup_index(file_name: &str, stem: &str, extension: Option<&str>) -> Option<usize> {
    let rest = file_name.strip_prefix(stem)?.strip_prefix('_')?;
    let digits = match extension {
        Some(ext) => rest.strip_suffix(ext)?.strip_suffix('.')?,
        None => rest,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|index| *index > 0)
}
