//! Error types for tag resolution

use thiserror::Error;
use tiger_formats::{ContentId, CursorError, TagHash};
use tiger_storage::StorageError;

/// Errors that can occur while resolving tags
#[derive(Debug, Error)]
pub enum TagError {
    /// Identifier is a string hash or otherwise cannot address bytes
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(ContentId),

    /// Identifier does not address a readable entry
    #[error("Tag not found: {0}")]
    NotFound(ContentId),

    /// Tag bytes do not match the expected layout
    #[error("Decode error: {0}")]
    Decode(#[from] CursorError),

    /// Entry holds, or was already resolved as, a different tag type
    #[error("{tag} is not a {expected}")]
    TypeMismatch {
        /// Requested identifier
        tag: TagHash,
        /// Requested tag type
        expected: &'static str,
    },

    /// Tag references one of its own ancestors
    #[error("Reference cycle through {0}")]
    Cycle(TagHash),

    /// Any other storage failure
    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for TagError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::InvalidIdentifier(id) => Self::InvalidIdentifier(id),
            StorageError::NotFound(id) => Self::NotFound(id),
            other => Self::Storage(other),
        }
    }
}

impl TagError {
    /// Whether an optional reference with this error should read as empty
    /// without being reported
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::InvalidIdentifier(_) | Self::NotFound(_))
    }
}

/// Result type for tag operations
pub type Result<T> = std::result::Result<T, TagError>;
