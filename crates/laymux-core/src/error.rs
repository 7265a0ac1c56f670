//! Error types for layout persistence and workflows.

use thiserror::Error;

/// Failures of the persistence medium or of the stored document itself.
///
/// Never recovered inside the crate: callers bubble these to a single
/// top-level handler.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored document {key:?} is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("stored document version {found} is newer than supported {supported}")]
    UnsupportedVersion { found: String, supported: String },

    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum LayoutError {
    /// Empty or whitespace-only name.
    #[error("{0}")]
    Validation(String),

    #[error("a layout named {0:?} already exists")]
    DuplicateName(String),

    #[error("layout {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("prompt failed: {0}")]
    Prompt(#[source] std::io::Error),
}

impl LayoutError {
    /// Errors the orchestration layer reports and moves on from.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::DuplicateName(_) | Self::NotFound(_)
        )
    }
}
