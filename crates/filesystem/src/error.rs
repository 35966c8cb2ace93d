//! Error types for filesystem operations.

use std::path::Path;

use rusty_fs_common::PathError;
use rusty_fs_resource::ResourceError;
use thiserror::Error;

use crate::entry::EntryKind;

/// Errors that can occur while resolving, creating or mutating entries.
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// The configured root directory does not exist.
    #[error("Root directory not found: {path}")]
    RootNotFound { path: String },

    /// No member of a collection has this path.
    #[error("No entry with path {path} in collection")]
    NotFound { path: String },

    /// A file or directory was requested without the create flag and nothing exists there.
    #[error("{expected} not found: {path}")]
    MissingEntry { path: String, expected: EntryKind },

    /// The path exists but holds the other kind of entry.
    #[error("Expected a {expected} at {path}, found a {actual}")]
    WrongKind {
        path: String,
        expected: EntryKind,
        actual: EntryKind,
    },

    /// A rename, move or copy would land on a path that is already taken.
    #[error("Path already taken: {path}")]
    DuplicatePath { path: String },

    /// `first()` or `last()` on an empty collection.
    #[error("Collection is empty")]
    EmptyCollection,

    /// The path cannot be created, removed or used as a target.
    #[error("Invalid target {path}: {reason}")]
    InvalidTarget { path: String, reason: String },

    /// A pattern segment could not be compiled.
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlobPattern { pattern: String, reason: String },

    /// The storage adapter failed.
    #[error("IO error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

impl FileSystemError {
    /// Wrap a storage I/O error for `path`.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.display().to_string(),
            source,
        }
    }

    /// Invalid target error for `path`.
    pub fn invalid_target(path: &Path, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error means "nothing there", in a collection or on storage.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FileSystemError::NotFound { .. } | FileSystemError::MissingEntry { .. }
        )
    }
}
