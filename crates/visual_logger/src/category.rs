//! Category filter entries

use serde::{Deserialize, Serialize};

/// How verbose a log line is. Lower is more severe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogVerbosity {
    NoLogging,
    Fatal,
    Error,
    Warning,
    Display,
    Log,
    Verbose,
    #[default]
    VeryVerbose,
}

impl LogVerbosity {
    pub const ALL: LogVerbosity = LogVerbosity::VeryVerbose;
}

/// Filter state of one log category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFilter {
    pub name: String,
    /// Most verbose level still shown
    pub verbosity: LogVerbosity,
    pub enabled: bool,
    /// Seen in the currently loaded log
    #[serde(skip)]
    pub in_use: bool,
}

impl CategoryFilter {
    pub fn new(name: impl Into<String>, verbosity: LogVerbosity) -> Self {
        Self {
            name: name.into(),
            verbosity,
            enabled: true,
            in_use: true,
        }
    }

    /// Whether a line at `verbosity` passes this filter
    pub fn accepts(&self, verbosity: LogVerbosity) -> bool {
        self.enabled && verbosity <= self.verbosity
    }
}

/// Returned for lookups of unknown categories
pub(crate) static NO_CATEGORY: CategoryFilter = CategoryFilter {
    name: String::new(),
    verbosity: LogVerbosity::NoLogging,
    enabled: false,
    in_use: false,
};
