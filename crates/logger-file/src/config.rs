//! Configuration for the rotating file sink

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Default maximum size of the active log file (5 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Default number of numbered backups kept next to the active file
pub const DEFAULT_MAX_BACKUP_COUNT: usize = 10;

/// Default directory, relative to the working directory
pub const DEFAULT_LOG_DIR: &str = "Log";

/// Default stem of the active log file
pub const DEFAULT_FILE_NAME: &str = "DebugLog";

/// Default log file extension, dot included
pub const DEFAULT_EXTENSION: &str = ".log";

/// Size-based rotation limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Rotate once the active file is larger than this many bytes
    pub max_file_size_bytes: u64,
    /// Number of `name_N` backups retained; older ones are deleted
    pub max_backup_count: usize,
}

impl RotationPolicy {
    /// Create a policy from explicit limits
    #[must_use]
    pub const fn new(max_file_size_bytes: u64, max_backup_count: usize) -> Self {
        Self {
            max_file_size_bytes,
            max_backup_count,
        }
    }
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_BACKUP_COUNT)
    }
}

/// Where the log lives and how it rotates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLoggerConfig {
    /// Directory holding the active file and its backups
    pub log_dir: PathBuf,
    /// File stem, e.g. `test` for `test.log`
    pub file_name: String,
    /// Extension including the leading dot
    pub extension: String,
    /// Rotation limits
    pub rotation: RotationPolicy,
}

impl FileLoggerConfig {
    /// Start building a config
    #[must_use]
    pub fn builder() -> FileLoggerConfigBuilder {
        FileLoggerConfigBuilder::default()
    }

    /// Path of the active (unnumbered) log file
    #[must_use]
    pub fn active_path(&self) -> PathBuf {
        self.log_dir
            .join(format!("{}{}", self.file_name, self.extension))
    }

    /// Path of the `index`-th backup, `1` being the most recent
    #[must_use]
    pub fn backup_path(&self, index: usize) -> PathBuf {
        backup_path_for(&self.active_path(), index)
    }

    /// Check the values for things that would make every write fail
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the file name is empty or
    /// contains a path separator, when the extension is not a single dot
    /// and a name, or when the name has a dot but there is no extension.
    pub fn validate(&self) -> Result<()> {
        if self.file_name.is_empty() {
            return Err(Error::Configuration("file name must not be empty".into()));
        }
        if self.file_name.contains(['/', '\\']) {
            return Err(Error::Configuration(format!(
                "file name {:?} must not contain a path separator",
                self.file_name
            )));
        }
        if self.extension.is_empty() {
            // Backups are named by splitting the active file name at its last dot.
            if self.file_name.contains('.') {
                return Err(Error::Configuration(format!(
                    "file name {:?} must not contain '.' without an extension",
                    self.file_name
                )));
            }
            return Ok(());
        }
        let Some(suffix) = self.extension.strip_prefix('.') else {
            return Err(Error::Configuration(format!(
                "extension {:?} must start with '.'",
                self.extension
            )));
        };
        if suffix.is_empty() || suffix.contains('.') {
            return Err(Error::Configuration(format!(
                "extension {:?} must be a single '.' followed by a name",
                self.extension
            )));
        }
        Ok(())
    }
}

impl Default for FileLoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            file_name: DEFAULT_FILE_NAME.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            rotation: RotationPolicy::default(),
        }
    }
}

/// Builder for [`FileLoggerConfig`]
#[derive(Debug, Default)]
pub struct FileLoggerConfigBuilder {
    config: FileLoggerConfig,
}

impl FileLoggerConfigBuilder {
    /// Directory for the log files
    #[must_use]
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    /// File stem of the active log
    #[must_use]
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.config.file_name = name.into();
        self
    }

    /// Extension of every log file
    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.config.extension = extension.into();
        self
    }

    /// Size threshold that triggers rotation
    #[must_use]
    pub const fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.rotation.max_file_size_bytes = bytes;
        self
    }

    /// Number of backups to retain
    #[must_use]
    pub const fn max_backup_count(mut self, count: usize) -> Self {
        self.config.rotation.max_backup_count = count;
        self
    }

    /// Replace the whole rotation policy
    #[must_use]
    pub const fn rotation(mut self, rotation: RotationPolicy) -> Self {
        self.config.rotation = rotation;
        self
    }

    /// Validate and return the config
    ///
    /// # Errors
    ///
    /// See [`FileLoggerConfig::validate`].
    pub fn build(self) -> Result<FileLoggerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// `dir/name.ext` -> `dir/name_{index}.ext`
pub(crate) fn backup_path_for(active: &Path, index: usize) -> PathBuf {
    let stem = active
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match active.extension() {
        Some(ext) => format!("{stem}_{index}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{index}"),
    };
    active.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = FileLoggerConfig::default();
        assert_eq!(config.active_path(), Path::new("Log").join("DebugLog.log"));
        assert_eq!(config.backup_path(3), Path::new("Log").join("DebugLog_3.log"));
        assert_eq!(config.rotation.max_file_size_bytes, 5 * 1024 * 1024);
        assert_eq!(config.rotation.max_backup_count, 10);
    }

    #[test]
    fn test_builder() {
        let config = FileLoggerConfig::builder()
            .log_dir("/tmp/trail")
            .file_name("test")
            .max_file_size(64)
            .max_backup_count(2)
            .build()
            .unwrap();

        assert_eq!(config.active_path(), Path::new("/tmp/trail/test.log"));
        assert_eq!(config.rotation, RotationPolicy::new(64, 2));
    }

    #[test]
    fn test_invalid_names_rejected() {
        assert!(matches!(
            FileLoggerConfig::builder().file_name("").build(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            FileLoggerConfig::builder().file_name("a/b").build(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            FileLoggerConfig::builder().extension("log").build(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            FileLoggerConfig::builder().extension(".tar.gz").build(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            FileLoggerConfig::builder().extension(".").build(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_dotted_name_needs_extension() {
        assert!(matches!(
            FileLoggerConfig::builder().file_name("app.v2").extension("").build(),
            Err(Error::Configuration(_))
        ));

        let config = FileLoggerConfig::builder()
            .log_dir("logs")
            .file_name("app.v2")
            .build()
            .unwrap();
        assert_eq!(config.backup_path(1), Path::new("logs").join("app.v2_1.log"));

        let config = FileLoggerConfig::builder()
            .log_dir("logs")
            .file_name("app")
            .extension("")
            .build()
            .unwrap();
        assert_eq!(config.backup_path(2), Path::new("logs").join("app_2"));
    }

    #[test]
    fn test_backup_path_without_extension() {
        let path = backup_path_for(Path::new("/var/log/trail"), 1);
        assert_eq!(path, Path::new("/var/log/trail_1"));
    }
}
