//! Visual Logger - Category and object filter state for the visual logger
//!
//! Categories are kept in a list with a name index beside it. The index is
//! derived data: it is rebuilt whenever the list grows and only patched when
//! an entry is removed.

mod category;
mod filters;
mod settings;

pub use category::{CategoryFilter, LogVerbosity};
pub use filters::{FilterEvent, VisualLoggerFilters};
pub use settings::FilterSettings;

/// Result type alias
pub type Result<T> = std::result::Result<T, FilterError>;

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse filters: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize filters: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),
}
