//! Where a log call came from

use std::fmt;

/// Source location attached to a log line.
///
/// Build one only when [`LevelPolicy::should_collect_context`](crate::LevelPolicy::should_collect_context)
/// says so; the [`call_site!`](crate::call_site) macro does it for free at
/// compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Function or module that logged
    pub method: String,
    /// Source file
    pub file: String,
    /// Line in `file`
    pub line: u32,
}

impl CallSite {
    /// Create a call site
    pub fn new(method: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            method: method.into(),
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Method: {} , Line Number: {}\nLocation: {}",
            self.method, self.line, self.file
        )
    }
}

/// Capture the current location as a [`CallSite`].
///
/// With no argument the method is the enclosing module path.
///
/// ```
/// let site = trail_logger::call_site!("load_config");
/// assert_eq!(site.method, "load_config");
/// assert!(site.file.ends_with(".rs"));
/// ```
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::CallSite::new(module_path!(), file!(), line!())
    };
    ($method:expr) => {
        $crate::CallSite::new($method, file!(), line!())
    };
}
