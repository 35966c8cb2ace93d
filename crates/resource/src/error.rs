//! Error types for stream resources.

use std::io;

use thiserror::Error;

/// Errors raised by handles, readers and writers.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The handle was not opened in a readable mode.
    #[error("Resource is not readable: {target}")]
    NotReadable { target: String },

    /// The handle was not opened in a writable mode.
    #[error("Resource is not writable: {target}")]
    NotWritable { target: String },

    /// An argument was rejected before touching the stream.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Operation attempted after `close()`.
    #[error("Resource is closed")]
    Closed,

    /// Opening a path failed.
    #[error("Failed to open {path}: {source}")]
    Open { path: String, source: io::Error },

    /// Reading from or writing to an open handle failed.
    #[error("I/O error on {target}: {source}")]
    Io { target: String, source: io::Error },
}

impl ResourceError {
    /// Wrap an I/O error raised on the named resource.
    ///
    /// # Arguments
    /// * `target` - Label of the handle the error occurred on
    /// * `source` - The underlying IO error
    pub fn io(target: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            target: target.into(),
            source,
        }
    }
}
