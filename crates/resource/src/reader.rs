//! Buffered forward-only reader with delimiter scanning.
//!
//! Bytes pulled from the handle land in an internal buffer and leave it
//! exactly once, when a read hands them to the caller. Delimiter scans
//! remember how far they have already looked so a slow stream is never
//! rescanned from the start.

use std::io::{ErrorKind, Read};
use std::path::Path;

use rusty_fs_common::LINE_TERMINATOR;

use crate::error::ResourceError;
use crate::handle::{Handle, OpenMode};
use crate::options::ReaderOptions;

/// Outcome of pulling one chunk from the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fill {
    /// This many new bytes were appended to the buffer.
    Data(usize),
    /// The stream is exhausted.
    Eof,
    /// Nothing available right now (non-blocking mode only).
    Pending,
}

/// A buffered cursor over a readable handle.
///
/// # Example
///
/// ```ignore
/// use rusty_fs_resource::Reader;
///
/// let mut reader = Reader::open("notes.txt")?;
/// let title = reader.read_line()?;
/// let header = reader.read_until(b"---")?;
/// let rest = reader.read(None)?;
/// reader.close()?;
/// ```
#[derive(Debug)]
pub struct Reader {
    /// `None` once closed.
    handle: Option<Handle>,
    /// Bytes pulled from the handle but not yet delivered.
    buffer: Vec<u8>,
    /// The handle reported end of stream.
    eof: bool,
    options: ReaderOptions,
}

impl Reader {
    /// Create a blocking reader over `handle`.
    ///
    /// # Errors
    /// Returns `ResourceError::NotReadable` if the handle or its descriptor
    /// does not allow reading.
    pub fn new(handle: Handle) -> Result<Self, ResourceError> {
        Self::with_options(handle, ReaderOptions::default())
    }

    /// Create a reader with explicit options.
    ///
    /// # Arguments
    /// * `handle` - Readable handle to take ownership of
    /// * `options` - Chunk size, initial blocking mode and poll interval
    ///
    /// # Errors
    /// Returns `ResourceError::NotReadable` if the handle or its descriptor
    /// does not allow reading, or an I/O error if non-blocking mode cannot be applied.
    pub fn with_options(mut handle: Handle, options: ReaderOptions) -> Result<Self, ResourceError> {
        if !handle.is_readable() {
            return Err(ResourceError::NotReadable {
                target: handle.label().to_string(),
            });
        }
        if !options.blocking {
            handle
                .set_nonblocking(true)
                .map_err(|e| ResourceError::io(handle.label(), e))?;
        }

        Ok(Self {
            handle: Some(handle),
            buffer: Vec::new(),
            eof: false,
            options,
        })
    }

    /// Open the file at `path` for reading.
    ///
    /// # Errors
    /// Returns `ResourceError::Open` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        Self::new(Handle::open(path, OpenMode::Read)?)
    }

    /// Reader over standard input.
    pub fn stdin() -> Result<Self, ResourceError> {
        Self::new(Handle::stdin())
    }

    /// Reader over an in-memory byte buffer.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, ResourceError> {
        Self::new(Handle::memory(bytes, OpenMode::Read))
    }

    /// Read bytes from the stream.
    ///
    /// With `Some(n)`, returns the next `n` bytes (fewer only if the stream
    /// ends first). With `None`, returns everything up to end of stream.
    /// In non-blocking mode both forms stop early with whatever is
    /// immediately available, which may be nothing.
    ///
    /// # Errors
    /// Returns `ResourceError::Closed` after `close()`, or an I/O error.
    pub fn read(&mut self, length: Option<usize>) -> Result<Vec<u8>, ResourceError> {
        self.ensure_open()?;

        match length {
            Some(wanted) => {
                while self.buffer.len() < wanted {
                    if !matches!(self.fill()?, Fill::Data(_)) {
                        break;
                    }
                }
                let available: usize = wanted.min(self.buffer.len());
                Ok(self.take(available))
            }
            None => {
                while matches!(self.fill()?, Fill::Data(_)) {}
                let available: usize = self.buffer.len();
                Ok(self.take(available))
            }
        }
    }

    /// Read one line, without its terminator.
    ///
    /// The `\n` is consumed; a `\r` right before it is dropped as well.
    /// At end of stream the remaining bytes are returned.
    ///
    /// # Errors
    /// Returns `ResourceError::Closed` after `close()`, or an I/O error.
    pub fn read_line(&mut self) -> Result<Vec<u8>, ResourceError> {
        let mut line: Vec<u8> = self.read_until(LINE_TERMINATOR)?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(line)
    }

    /// Read up to the next occurrence of `delimiter`.
    ///
    /// The delimiter is consumed but not returned. If the stream ends before
    /// the delimiter shows up, everything remaining is returned. In
    /// non-blocking mode the scan also stops when no more data is available.
    ///
    /// # Errors
    /// Returns `ResourceError::InvalidArgument` for an empty delimiter,
    /// `ResourceError::Closed` after `close()`, or an I/O error.
    pub fn read_until(&mut self, delimiter: &[u8]) -> Result<Vec<u8>, ResourceError> {
        if delimiter.is_empty() {
            return Err(ResourceError::InvalidArgument {
                reason: "delimiter must not be empty".to_string(),
            });
        }
        self.ensure_open()?;

        let mut scanned: usize = 0;
        loop {
            if let Some(offset) = find_subsequence(&self.buffer[scanned..], delimiter) {
                let found: Vec<u8> = self.take(scanned + offset);
                self.take(delimiter.len());
                return Ok(found);
            }

            // A match can only start in the last `len - 1` bytes already seen
            scanned = self.buffer.len().saturating_sub(delimiter.len() - 1);

            if !matches!(self.fill()?, Fill::Data(_)) {
                let remaining: usize = self.buffer.len();
                return Ok(self.take(remaining));
            }
        }
    }

    /// Switch between blocking and non-blocking reads.
    ///
    /// # Errors
    /// Returns `ResourceError::Closed` after `close()`, or the OS error if the
    /// descriptor mode cannot be changed.
    pub fn blocking(&mut self, blocking: bool) -> Result<(), ResourceError> {
        let handle: &mut Handle = self.handle.as_mut().ok_or(ResourceError::Closed)?;
        handle
            .set_nonblocking(!blocking)
            .map_err(|e| ResourceError::io(handle.label(), e))?;
        self.options.blocking = blocking;
        Ok(())
    }

    /// Whether reads currently wait for data.
    pub fn is_blocking(&self) -> bool {
        self.options.blocking
    }

    /// Whether every byte of the stream has been delivered.
    pub fn is_exhausted(&self) -> bool {
        self.eof && self.buffer.is_empty()
    }

    /// Release the handle. Closing twice is a no-op.
    ///
    /// # Errors
    /// Returns an I/O error if descriptor flags changed by `blocking(false)`
    /// cannot be restored; the handle is released regardless.
    pub fn close(&mut self) -> Result<(), ResourceError> {
        let Some(mut handle) = self.handle.take() else {
            return Ok(());
        };
        self.buffer.clear();
        log::debug!("Closing reader on {}", handle.label());
        handle
            .restore_flags()
            .map_err(|e| ResourceError::io(handle.label(), e))
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    fn ensure_open(&self) -> Result<(), ResourceError> {
        if self.handle.is_some() {
            Ok(())
        } else {
            Err(ResourceError::Closed)
        }
    }

    /// Remove and return the first `count` buffered bytes.
    fn take(&mut self, count: usize) -> Vec<u8> {
        self.buffer.drain(..count).collect()
    }

    /// Pull one chunk from the handle into the buffer.
    fn fill(&mut self) -> Result<Fill, ResourceError> {
        if self.eof {
            return Ok(Fill::Eof);
        }
        let handle: &mut Handle = self.handle.as_mut().ok_or(ResourceError::Closed)?;
        let start: usize = self.buffer.len();
        // Read into the tail of the buffer so its capacity is reused across calls.
        self.buffer.resize(start + self.options.chunk_size.max(1), 0);

        let outcome: Result<Fill, ResourceError> = loop {
            match handle.read(&mut self.buffer[start..]) {
                Ok(0) => {
                    self.eof = true;
                    break Ok(Fill::Eof);
                }
                Ok(n) => {
                    self.buffer.truncate(start + n);
                    return Ok(Fill::Data(n));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if !self.options.blocking {
                        break Ok(Fill::Pending);
                    }
                    std::thread::sleep(self.options.poll_interval);
                }
                Err(e) => break Err(ResourceError::io(handle.label(), e)),
            }
        };
        self.buffer.truncate(start);
        outcome
    }
}

/// Position of the first occurrence of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window: &[u8]| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    const CONTENT: &[u8] = b"Hello World !\nHow are you ?";

    fn reader() -> Reader {
        Reader::from_bytes(CONTENT.to_vec()).unwrap()
    }

    /// Source that hands out scripted chunks; `None` means "would block".
    struct Trickle {
        steps: VecDeque<Option<Vec<u8>>>,
    }

    impl Trickle {
        fn new(steps: Vec<Option<&str>>) -> Self {
            Self {
                steps: steps
                    .into_iter()
                    .map(|step: Option<&str>| step.map(|text: &str| text.as_bytes().to_vec()))
                    .collect(),
            }
        }
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                None => Ok(0),
                Some(None) => Err(io::Error::new(io::ErrorKind::WouldBlock, "no data yet")),
                Some(Some(bytes)) => {
                    let n: usize = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.steps.push_front(Some(bytes[n..].to_vec()));
                    }
                    Ok(n)
                }
            }
        }
    }

    #[test]
    fn test_reads_whole_content() {
        assert_eq!(reader().read(None).unwrap(), CONTENT);
    }

    #[test]
    fn test_reads_one_line() {
        assert_eq!(reader().read_line().unwrap(), b"Hello World !");
    }

    #[test]
    fn test_read_line_strips_carriage_return() {
        let mut reader: Reader = Reader::from_bytes(b"first\r\nsecond".to_vec()).unwrap();
        assert_eq!(reader.read_line().unwrap(), b"first");
        assert_eq!(reader.read_line().unwrap(), b"second");
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_reads_until_a_character() {
        assert_eq!(reader().read_until(b"y").unwrap(), b"Hello World !\nHow are ");
    }

    #[test]
    fn test_reads_until_a_word() {
        assert_eq!(reader().read_until(b" are").unwrap(), b"Hello World !\nHow");
    }

    #[test]
    fn test_reads_all_if_delimiter_not_found() {
        assert_eq!(reader().read_until(b"foo").unwrap(), CONTENT);
    }

    #[test]
    fn test_empty_delimiter_fails() {
        let result: Result<Vec<u8>, ResourceError> = reader().read_until(b"");
        assert!(matches!(result, Err(ResourceError::InvalidArgument { .. })));
    }

    #[test]
    fn test_reads_part_of_content() {
        let mut reader: Reader = reader();
        assert_eq!(reader.read(Some(5)).unwrap(), b"Hello");
        assert_eq!(reader.read(Some(6)).unwrap(), b" World");
        assert_eq!(reader.read(None).unwrap(), b" !\nHow are you ?");
    }

    #[test]
    fn test_read_length_past_end_returns_rest() {
        let mut reader: Reader = reader();
        assert_eq!(reader.read(Some(1000)).unwrap(), CONTENT);
        assert_eq!(reader.read(Some(1)).unwrap(), b"");
    }

    #[test]
    fn test_delimiter_split_across_chunks() {
        let options: ReaderOptions = ReaderOptions::default().with_chunk_size(3);
        let mut reader: Reader =
            Reader::with_options(Handle::memory(CONTENT.to_vec(), OpenMode::Read), options)
                .unwrap();
        assert_eq!(reader.read_until(b"you").unwrap(), b"Hello World !\nHow are ");
        assert_eq!(reader.read(None).unwrap(), b" ?");
    }

    #[test]
    fn test_consecutive_delimiter_reads_continue_from_cursor() {
        let mut reader: Reader = Reader::from_bytes(b"a,b,,c".to_vec()).unwrap();
        assert_eq!(reader.read_until(b",").unwrap(), b"a");
        assert_eq!(reader.read_until(b",").unwrap(), b"b");
        assert_eq!(reader.read_until(b",").unwrap(), b"");
        assert_eq!(reader.read_until(b",").unwrap(), b"c");
        assert_eq!(reader.read_until(b",").unwrap(), b"");
    }

    #[test]
    fn test_fails_if_not_readable() {
        let result: Result<Reader, ResourceError> =
            Reader::new(Handle::memory(Vec::new(), OpenMode::Write));
        assert!(matches!(result, Err(ResourceError::NotReadable { .. })));
    }

    #[test]
    fn test_buffer_capacity_is_reused_between_fills() {
        let lines: Vec<u8> = b"ab\n".repeat(64);
        let options: ReaderOptions = ReaderOptions::default().with_chunk_size(16);
        let mut reader: Reader =
            Reader::with_options(Handle::memory(lines, OpenMode::Read), options).unwrap();

        // Leftover bytes plus one chunk never need more than two chunks of room.
        for _ in 0..64 {
            assert_eq!(reader.read_line().unwrap(), b"ab");
            assert!(reader.buffer.capacity() <= 32);
        }
        assert!(reader.read_line().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_fails_on_write_only_descriptor() {
        let dir: tempfile::TempDir = tempfile::TempDir::new().unwrap();
        let file: std::fs::File = std::fs::File::create(dir.path().join("out.txt")).unwrap();

        let result: Result<Reader, ResourceError> =
            Reader::new(Handle::from_file(file, OpenMode::Read));
        assert!(matches!(result, Err(ResourceError::NotReadable { .. })));
    }

    #[test]
    fn test_non_blocking_returns_available_data() {
        let source: Trickle = Trickle::new(vec![Some("abc"), None, Some("def")]);
        let mut reader: Reader = Reader::new(Handle::from_reader(source)).unwrap();
        reader.blocking(false).unwrap();
        assert!(!reader.is_blocking());

        assert_eq!(reader.read(None).unwrap(), b"abc");
        assert_eq!(reader.read(None).unwrap(), b"def");
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_non_blocking_with_nothing_available_returns_empty() {
        let source: Trickle = Trickle::new(vec![None, Some("later")]);
        let options: ReaderOptions = ReaderOptions::default().with_blocking(false);
        let mut reader: Reader = Reader::with_options(Handle::from_reader(source), options).unwrap();
        assert_eq!(reader.read(None).unwrap(), b"");
        assert_eq!(reader.read_until(b"!").unwrap(), b"later");
    }

    #[test]
    fn test_blocking_waits_past_would_block() {
        let source: Trickle = Trickle::new(vec![Some("ab"), None, None, Some("cd")]);
        let mut reader: Reader = Reader::new(Handle::from_reader(source)).unwrap();
        assert_eq!(reader.read(None).unwrap(), b"abcd");
    }

    #[test]
    fn test_operations_after_close_fail() {
        let mut reader: Reader = reader();
        reader.close().unwrap();
        assert!(reader.is_closed());
        assert!(matches!(reader.read(None), Err(ResourceError::Closed)));
        assert!(matches!(reader.read_line(), Err(ResourceError::Closed)));
        assert!(matches!(reader.read_until(b"x"), Err(ResourceError::Closed)));
        assert!(matches!(reader.blocking(false), Err(ResourceError::Closed)));
        // Second close is harmless
        reader.close().unwrap();
    }

    #[test]
    fn test_find_subsequence() {
        assert_eq!(find_subsequence(b"abcabc", b"ca"), Some(2));
        assert_eq!(find_subsequence(b"ab", b"abc"), None);
        assert_eq!(find_subsequence(b"", b"a"), None);
    }
}
