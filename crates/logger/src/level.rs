//! Severity levels and the policy that decides what gets persisted

use serde::{Deserialize, Serialize};
use std::fmt;

/// Line prefix for [`Severity::Error`]
pub const ERROR_LABEL: &str = "Error: ";
/// Line prefix for [`Severity::Warning`]
pub const WARNING_LABEL: &str = "Warning: ";
/// Line prefix for [`Severity::Information`] and anything without its own label
pub const INFORMATION_LABEL: &str = "Information: ";
/// Line prefix for [`Severity::External`]
pub const EXTERNAL_LABEL: &str = "External Source: ";

/// How serious a logged message is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Internal diagnostics
    Diagnostic,
    /// Failures; always written to disk
    Error,
    /// Something looks wrong but work continues
    Warning,
    /// Progress and state reports
    Information,
    /// Messages relayed from another component or process
    External,
}

impl Severity {
    /// Shorthand for [`LevelPolicy::label_for`]
    #[must_use]
    pub const fn label(self) -> &'static str {
        LevelPolicy::label_for(self)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Diagnostic => write!(f, "Diagnostic"),
            Self::Error => write!(f, "Error"),
            Self::Warning => write!(f, "Warning"),
            Self::Information => write!(f, "Information"),
            Self::External => write!(f, "External"),
        }
    }
}

/// Level labels and the context/persistence gate.
///
/// Both functions are pure and cheap, so callers can ask before doing any
/// expensive work such as capturing a call site.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelPolicy;

impl LevelPolicy {
    /// Prefix written at the start of a line for `level`
    #[must_use]
    pub const fn label_for(level: Severity) -> &'static str {
        match level {
            Severity::Error => ERROR_LABEL,
            Severity::Warning => WARNING_LABEL,
            Severity::External => EXTERNAL_LABEL,
            _ => INFORMATION_LABEL,
        }
    }

    /// Whether call-site context is worth collecting for `level`.
    ///
    /// The same gate decides whether a line goes to disk outside of dump
    /// mode: errors always do, everything else only in verbose mode.
    #[must_use]
    pub const fn should_collect_context(level: Severity, verbose: bool) -> bool {
        matches!(level, Severity::Error) || verbose
    }
}
