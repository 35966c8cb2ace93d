//! Open byte sources and sinks.
//!
//! A `Handle` is the raw resource a `Reader` or `Writer` is built on. It
//! remembers the mode it was opened with so readers and writers can reject
//! handles that cannot serve them, and it owns the descriptor flags it
//! changes so they are put back when the handle goes away.

use std::fmt;
use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;

use crate::error::ResourceError;

/// Mode a handle was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read only.
    Read,
    /// Write only, truncating existing content.
    Write,
    /// Write only, appending to existing content.
    Append,
    /// Read and write.
    ReadWrite,
}

impl OpenMode {
    /// Whether a handle in this mode can be read from.
    pub fn is_readable(self) -> bool {
        matches!(self, OpenMode::Read | OpenMode::ReadWrite)
    }

    /// Whether a handle in this mode can be written to.
    pub fn is_writable(self) -> bool {
        !matches!(self, OpenMode::Read)
    }

    fn open_options(self) -> fs::OpenOptions {
        let mut options: fs::OpenOptions = fs::OpenOptions::new();
        match self {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.write(true).create(true).truncate(true),
            OpenMode::Append => options.append(true).create(true),
            OpenMode::ReadWrite => options.read(true).write(true).create(true),
        };
        options
    }
}

enum Inner {
    File(fs::File),
    Stdin(io::Stdin),
    Stdout(io::Stdout),
    Memory(Cursor<Vec<u8>>),
    Source(Box<dyn Read>),
    Sink(Box<dyn Write>),
}

/// An open byte stream with a known mode.
pub struct Handle {
    inner: Inner,
    mode: OpenMode,
    label: String,
    /// Descriptor flags as they were before the first blocking-mode change.
    saved_flags: Option<i32>,
}

impl Handle {
    /// Open a file at `path`.
    ///
    /// # Arguments
    /// * `path` - File to open
    /// * `mode` - How to open it (write modes create the file if missing)
    ///
    /// # Errors
    /// Returns `ResourceError::Open` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self, ResourceError> {
        let path: &Path = path.as_ref();
        let file: fs::File = mode
            .open_options()
            .open(path)
            .map_err(|e| ResourceError::Open {
                path: path.display().to_string(),
                source: e,
            })?;
        log::debug!("Opened {} in {:?} mode", path.display(), mode);
        Ok(Self::new(Inner::File(file), mode, path.display().to_string()))
    }

    /// Wrap an already-open file.
    ///
    /// The caller states the mode the file was opened with.
    pub fn from_file(file: fs::File, mode: OpenMode) -> Self {
        Self::new(Inner::File(file), mode, "file".to_string())
    }

    /// In-memory handle over `bytes`. Append mode starts writing at the end.
    pub fn memory(bytes: impl Into<Vec<u8>>, mode: OpenMode) -> Self {
        let bytes: Vec<u8> = bytes.into();
        let len: u64 = bytes.len() as u64;
        let mut cursor: Cursor<Vec<u8>> = Cursor::new(bytes);
        if mode == OpenMode::Append {
            cursor.set_position(len);
        }
        Self::new(Inner::Memory(cursor), mode, "memory".to_string())
    }

    /// Standard input.
    pub fn stdin() -> Self {
        Self::new(Inner::Stdin(io::stdin()), OpenMode::Read, "stdin".to_string())
    }

    /// Standard output.
    pub fn stdout() -> Self {
        Self::new(Inner::Stdout(io::stdout()), OpenMode::Write, "stdout".to_string())
    }

    /// Read-only handle over an arbitrary byte source.
    ///
    /// A source that returns `ErrorKind::WouldBlock` is treated as having
    /// no data available yet.
    pub fn from_reader(source: impl Read + 'static) -> Self {
        Self::new(Inner::Source(Box::new(source)), OpenMode::Read, "stream".to_string())
    }

    /// Write-only handle over an arbitrary byte sink.
    pub fn from_writer(sink: impl Write + 'static) -> Self {
        Self::new(Inner::Sink(Box::new(sink)), OpenMode::Write, "stream".to_string())
    }

    fn new(inner: Inner, mode: OpenMode, label: String) -> Self {
        Self {
            inner,
            mode,
            label,
            saved_flags: None,
        }
    }

    /// Rename the label used in error messages.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// The mode this handle was opened with.
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Label used in errors and logs (the path for opened files).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether reads can succeed: the declared mode allows them and, for
    /// descriptor-backed handles, so does the access mode of the descriptor.
    pub fn is_readable(&self) -> bool {
        self.mode.is_readable() && self.os_access().map_or(true, |(read, _)| read)
    }

    /// Whether writes can succeed, checked the same way as `is_readable`.
    pub fn is_writable(&self) -> bool {
        self.mode.is_writable() && self.os_access().map_or(true, |(_, write)| write)
    }

    /// Read and write permission of the open descriptor, when there is one.
    fn os_access(&self) -> Option<(bool, bool)> {
        #[cfg(unix)]
        {
            let flags: i32 = sys::get_flags(self.raw_fd()?).ok()?;
            match flags & libc::O_ACCMODE {
                libc::O_RDONLY => Some((true, false)),
                libc::O_WRONLY => Some((false, true)),
                _ => Some((true, true)),
            }
        }

        #[cfg(not(unix))]
        {
            None
        }
    }

    /// Switch the underlying descriptor in or out of non-blocking mode.
    ///
    /// Only descriptor-backed handles on Unix are affected; other sources
    /// signal unavailability themselves through `WouldBlock`.
    ///
    /// # Errors
    /// Returns the OS error if the descriptor flags cannot be changed.
    pub(crate) fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        #[cfg(unix)]
        {
            let Some(fd) = self.raw_fd() else {
                return Ok(());
            };
            let current: i32 = sys::get_flags(fd)?;
            if self.saved_flags.is_none() {
                self.saved_flags = Some(current);
            }
            let wanted: i32 = if nonblocking {
                current | libc::O_NONBLOCK
            } else {
                current & !libc::O_NONBLOCK
            };
            if wanted != current {
                sys::set_flags(fd, wanted)?;
            }
            Ok(())
        }

        #[cfg(not(unix))]
        {
            let _ = nonblocking;
            Ok(())
        }
    }

    /// Put back the descriptor flags saved by `set_nonblocking`.
    pub(crate) fn restore_flags(&mut self) -> io::Result<()> {
        let Some(flags) = self.saved_flags.take() else {
            return Ok(());
        };

        #[cfg(unix)]
        {
            if let Some(fd) = self.raw_fd() {
                sys::set_flags(fd, flags)?;
            }
        }

        #[cfg(not(unix))]
        {
            let _ = flags;
        }

        Ok(())
    }

    #[cfg(unix)]
    fn raw_fd(&self) -> Option<std::os::unix::io::RawFd> {
        use std::os::unix::io::AsRawFd;

        match &self.inner {
            Inner::File(file) => Some(file.as_raw_fd()),
            Inner::Stdin(stdin) => Some(stdin.as_raw_fd()),
            Inner::Stdout(stdout) => Some(stdout.as_raw_fd()),
            _ => None,
        }
    }
}

impl Read for Handle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::File(file) => file.read(buf),
            Inner::Stdin(stdin) => stdin.read(buf),
            Inner::Memory(cursor) => cursor.read(buf),
            Inner::Source(source) => source.read(buf),
            Inner::Stdout(_) | Inner::Sink(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "handle is write-only",
            )),
        }
    }
}

impl Write for Handle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::File(file) => file.write(buf),
            Inner::Stdout(stdout) => stdout.write(buf),
            Inner::Memory(cursor) => cursor.write(buf),
            Inner::Sink(sink) => sink.write(buf),
            Inner::Stdin(_) | Inner::Source(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "handle is read-only",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            Inner::File(file) => file.flush(),
            Inner::Stdout(stdout) => stdout.flush(),
            Inner::Memory(cursor) => cursor.flush(),
            Inner::Sink(sink) => sink.flush(),
            Inner::Stdin(_) | Inner::Source(_) => Ok(()),
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Err(e) = self.restore_flags() {
            log::warn!("Failed to restore descriptor flags on {}: {}", self.label, e);
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("label", &self.label)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

#[cfg(unix)]
mod sys {
    use std::io;
    use std::os::unix::io::RawFd;

    pub(super) fn get_flags(fd: RawFd) -> io::Result<i32> {
        // SAFETY: F_GETFL only reads the status flags of a descriptor we own.
        let flags: libc::c_int = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(flags)
        }
    }

    pub(super) fn set_flags(fd: RawFd, flags: i32) -> io::Result<()> {
        // SAFETY: F_SETFL only changes the status flags of a descriptor we own.
        let result: libc::c_int = unsafe { libc::fcntl(fd, libc::F_SETFL, flags) };
        if result < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}
