//! Configuration options for readers.

use std::time::Duration;

use rusty_fs_common::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_READ_CHUNK_SIZE};

/// Configuration options for a `Reader`.
///
/// # Example
///
/// ```ignore
/// let options = ReaderOptions::default()
///     .with_chunk_size(64 * 1024)
///     .with_blocking(false);
///
/// let reader = Reader::with_options(Handle::stdin(), options)?;
/// ```
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Bytes requested from the handle per buffer fill.
    pub chunk_size: usize,
    /// Whether reads wait for data (`true`) or return what is available.
    pub blocking: bool,
    /// Sleep between retries when a blocking read hits a source that would block.
    pub poll_interval: Duration,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_READ_CHUNK_SIZE,
            blocking: true,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl ReaderOptions {
    /// Set the number of bytes requested per fill.
    ///
    /// # Arguments
    /// * `chunk_size` - Fill size in bytes (a value of 0 is treated as 1)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the initial blocking mode.
    ///
    /// # Arguments
    /// * `blocking` - `false` to return immediately with available data
    pub fn with_blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    /// Set the poll interval used while waiting on a would-block source.
    ///
    /// # Arguments
    /// * `poll_interval` - Sleep between retries
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}
