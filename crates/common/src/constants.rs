//! Shared constants used across rusty-fs crates.

/// Number of bytes requested from a stream per fill of a reader buffer (8KB).
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

/// Line terminator appended by writers and searched for by line reads.
pub const LINE_TERMINATOR: &[u8] = b"\n";

/// Characters that turn a path segment into a wildcard segment.
pub const GLOB_METACHARACTERS: &[char] = &['*', '?', '[', ']', '{', '}'];

/// Default sleep between polls when a blocking read hits a source that would block (ms).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1;
