//! Persisted session settings
//!
//! Stored as TOML. A missing or unreadable file never prevents logging:
//! [`SessionConfig::load`] falls back to defaults and traces why.

use crate::level::{ERROR_LABEL, EXTERNAL_LABEL, INFORMATION_LABEL, WARNING_LABEL};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use trail_logger_file::{
    DEFAULT_EXTENSION, DEFAULT_FILE_NAME, DEFAULT_LOG_DIR, DEFAULT_MAX_BACKUP_COUNT,
    DEFAULT_MAX_FILE_SIZE, FileLoggerConfig, RotationPolicy,
};

/// Default size of the in-memory recent-message buffer
pub const DEFAULT_RECENT_CAPACITY: usize = 1000;

/// Entry text of the rule applied to lines no other rule matches
pub const BASE_COLOR_TEXT: &str = "<Color for everything else>";

/// Color a viewer should use for lines starting with `entry_text`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRule {
    /// Color name, e.g. `Red`
    pub color: String,
    /// Line prefix this rule applies to
    pub entry_text: String,
}

impl ColorRule {
    /// Create a rule
    pub fn new(color: impl Into<String>, entry_text: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            entry_text: entry_text.into(),
        }
    }

    /// Whether this is the fallback rule
    #[must_use]
    pub fn is_base(&self) -> bool {
        self.entry_text == BASE_COLOR_TEXT
    }

    /// One rule per level label plus the fallback
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("Black", BASE_COLOR_TEXT),
            Self::new("Red", ERROR_LABEL),
            Self::new("Orange", WARNING_LABEL),
            Self::new("Blue", INFORMATION_LABEL),
            Self::new("Green", EXTERNAL_LABEL),
        ]
    }
}

/// Everything a [`LogSession`](crate::LogSession) reads at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory of the active log and its backups
    pub log_directory: PathBuf,
    /// Stem of the active log file
    pub file_name: String,
    /// Extension of the log files, dot included
    pub extension: String,
    /// Rotation threshold
    pub max_file_size_bytes: u64,
    /// Backups retained after rotation
    pub max_backup_count: usize,
    /// Add thread ids and persist every level
    pub verbose: bool,
    /// Lines kept in memory before the buffer restarts
    pub recent_capacity: usize,
    /// Viewer colors keyed by line prefix
    pub color_rules: Vec<ColorRule>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            log_directory: PathBuf::from(DEFAULT_LOG_DIR),
            file_name: DEFAULT_FILE_NAME.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
            max_backup_count: DEFAULT_MAX_BACKUP_COUNT,
            verbose: false,
            recent_capacity: DEFAULT_RECENT_CAPACITY,
            color_rules: ColorRule::defaults(),
        }
    }
}

impl SessionConfig {
    /// Read the config at `path`, or the defaults if that fails
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{e}; using default log configuration");
                Self::default()
            }
        }
    }

    /// Read the config at `path`
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigIo`] if the file cannot be read and
    /// [`Error::ConfigParse`] if it is not valid TOML.
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;

        let config = toml::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;

        debug!("loaded log configuration from {}", path.display());
        Ok(config)
    }

    /// Write the config to `path`, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigEncode`] or [`Error::ConfigIo`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = toml::to_string_pretty(self)?;

        let io_err = |source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, text).map_err(io_err)?;

        debug!("saved log configuration to {}", path.display());
        Ok(())
    }

    /// File sink settings derived from this config
    #[must_use]
    pub fn file_config(&self) -> FileLoggerConfig {
        FileLoggerConfig {
            log_dir: self.log_directory.clone(),
            file_name: self.file_name.clone(),
            extension: self.extension.clone(),
            rotation: RotationPolicy::new(self.max_file_size_bytes, self.max_backup_count),
        }
    }

    /// Rule a viewer should apply to `line`.
    ///
    /// The first non-base rule whose entry text starts the line wins,
    /// otherwise the base rule. `None` only when no base rule is configured.
    #[must_use]
    pub fn color_for(&self, line: &str) -> Option<&ColorRule> {
        self.color_rules
            .iter()
            .find(|rule| {
                !rule.is_base()
                    && !rule.entry_text.is_empty()
                    && line.starts_with(&rule.entry_text)
            })
            .or_else(|| self.color_rules.iter().find(|rule| rule.is_base()))
    }
}
