//! Byte sink with line writes.

use std::io::{BufWriter, Write};
use std::path::Path;

use rusty_fs_common::LINE_TERMINATOR;

use crate::error::ResourceError;
use crate::handle::{Handle, OpenMode};

/// A writer over a writable handle.
///
/// Every `write`/`write_line` is flushed before returning, so other readers
/// of the same file see the bytes immediately.
#[derive(Debug)]
pub struct Writer {
    /// `None` once closed.
    sink: Option<BufWriter<Handle>>,
    label: String,
}

impl Writer {
    /// Create a writer over `handle`.
    ///
    /// # Errors
    /// Returns `ResourceError::NotWritable` if the handle or its descriptor
    /// does not allow writing.
    pub fn new(handle: Handle) -> Result<Self, ResourceError> {
        if !handle.is_writable() {
            return Err(ResourceError::NotWritable {
                target: handle.label().to_string(),
            });
        }
        let label: String = handle.label().to_string();
        Ok(Self {
            sink: Some(BufWriter::new(handle)),
            label,
        })
    }

    /// Open `path` for appending, creating it if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        Self::new(Handle::open(path, OpenMode::Append)?)
    }

    /// Open `path` for writing, truncating existing content.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        Self::new(Handle::open(path, OpenMode::Write)?)
    }

    /// Writer over standard output.
    pub fn stdout() -> Result<Self, ResourceError> {
        Self::new(Handle::stdout())
    }

    /// Append raw bytes.
    ///
    /// # Errors
    /// Returns `ResourceError::Closed` after `close()`, or an I/O error.
    pub fn write(&mut self, data: &[u8]) -> Result<(), ResourceError> {
        let sink: &mut BufWriter<Handle> = self.sink.as_mut().ok_or(ResourceError::Closed)?;
        sink.write_all(data)
            .and_then(|_| sink.flush())
            .map_err(|e| ResourceError::io(self.label.as_str(), e))
    }

    /// Append bytes followed by the line terminator.
    ///
    /// # Errors
    /// Returns `ResourceError::Closed` after `close()`, or an I/O error.
    pub fn write_line(&mut self, data: &[u8]) -> Result<(), ResourceError> {
        let sink: &mut BufWriter<Handle> = self.sink.as_mut().ok_or(ResourceError::Closed)?;
        sink.write_all(data)
            .and_then(|_| sink.write_all(LINE_TERMINATOR))
            .and_then(|_| sink.flush())
            .map_err(|e| ResourceError::io(self.label.as_str(), e))
    }

    /// Flush buffered bytes to the handle.
    pub fn flush(&mut self) -> Result<(), ResourceError> {
        let sink: &mut BufWriter<Handle> = self.sink.as_mut().ok_or(ResourceError::Closed)?;
        sink.flush()
            .map_err(|e| ResourceError::io(self.label.as_str(), e))
    }

    /// Flush and release the handle. Closing twice is a no-op.
    ///
    /// # Errors
    /// Returns an I/O error if the final flush fails; the handle is released regardless.
    pub fn close(&mut self) -> Result<(), ResourceError> {
        let Some(sink) = self.sink.take() else {
            return Ok(());
        };
        log::debug!("Closing writer on {}", self.label);
        sink.into_inner()
            .map(drop)
            .map_err(|e| ResourceError::io(self.label.as_str(), e.into_error()))
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.sink.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;
    use tempfile::TempDir;

    /// Sink that shares its bytes with the test.
    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_fails_if_not_writable() {
        let result: Result<Writer, ResourceError> =
            Writer::new(Handle::memory(Vec::new(), OpenMode::Read));
        assert!(matches!(result, Err(ResourceError::NotWritable { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_fails_on_read_only_descriptor() {
        let dir: TempDir = TempDir::new().unwrap();
        let path = dir.path().join("existing.txt");
        std::fs::write(&path, b"keep").unwrap();

        let handle: Handle =
            Handle::from_file(std::fs::File::open(&path).unwrap(), OpenMode::Write);
        let result: Result<Writer, ResourceError> = Writer::new(handle);
        assert!(matches!(result, Err(ResourceError::NotWritable { .. })));
    }

    #[test]
    fn test_stdout_constructor() {
        let writer: Writer = Writer::stdout().unwrap();
        assert!(!writer.is_closed());
    }

    #[test]
    fn test_writes_are_visible_immediately() {
        let dir: TempDir = TempDir::new().unwrap();
        let path = dir.path().join("temp.txt");
        std::fs::write(&path, b"").unwrap();

        let mut writer: Writer = Writer::open(&path).unwrap();
        writer.write(b"Hello").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"Hello");

        writer.write_line(b" World").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"Hello World\n");
    }

    #[test]
    fn test_create_truncates() {
        let dir: TempDir = TempDir::new().unwrap();
        let path = dir.path().join("temp.txt");
        std::fs::write(&path, b"old content").unwrap();

        let mut writer: Writer = Writer::create(&path).unwrap();
        writer.write(b"new").unwrap();
        writer.close().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_stream_sink() {
        let shared: Shared = Shared::default();
        let mut writer: Writer = Writer::new(Handle::from_writer(shared.clone())).unwrap();
        writer.write_line(b"one").unwrap();
        writer.write(b"two").unwrap();
        assert_eq!(shared.0.borrow().as_slice(), b"one\ntwo");
    }

    #[test]
    fn test_write_after_close_fails() {
        let mut writer: Writer = Writer::new(Handle::from_writer(Shared::default())).unwrap();
        writer.close().unwrap();
        assert!(writer.is_closed());
        assert!(matches!(writer.write(b"x"), Err(ResourceError::Closed)));
        assert!(matches!(writer.write_line(b"x"), Err(ResourceError::Closed)));
        writer.close().unwrap();
    }
}
