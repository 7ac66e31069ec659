//! Editor error types

use blueprint_types::ClassRegistryError;

/// Result type alias
pub type Result<T> = std::result::Result<T, EditorError>;

/// Failures of editor operations.
///
/// Recoverable problems found while conforming or compiling are reported to
/// the results log instead and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("Blueprint not found: {0}")]
    BlueprintNotFound(String),

    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    #[error("Variable not found: {0}")]
    VariableNotFound(String),

    #[error("Timeline not found: {0}")]
    TimelineNotFound(String),

    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Interface not implemented: {0}")]
    InterfaceNotImplemented(String),

    #[error("Interface already implemented: {0}")]
    InterfaceAlreadyImplemented(String),

    #[error("Name already in use: {0}")]
    NameInUse(String),

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Reference could not be resolved: {0}")]
    ReferenceUnresolved(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation not allowed: {0}")]
    NotAllowed(String),

    #[error("Compile failed: {0}")]
    Compile(String),

    #[error("Class registry error: {0}")]
    ClassRegistry(#[from] ClassRegistryError),
}
