//! Stream resources for rusty-fs.
//!
//! This crate provides buffered access to byte streams:
//! - `Handle` - An open byte source or sink paired with its `OpenMode`
//! - `Reader` - Forward-only buffered cursor with length, line and delimiter reads
//! - `Writer` - Sink with write/write_line that flushes every write
//! - `ReaderOptions` - Chunk size, blocking mode and poll interval
//!
//! # Architecture
//!
//! ```text
//! Reader / Writer      (buffering, delimiter scanning, closed state)
//! Handle               (file, stdio, memory or boxed stream + open mode)
//! OS descriptor flags  (O_NONBLOCK toggling on Unix)
//! ```

pub mod error;
pub mod handle;
pub mod options;
pub mod reader;
pub mod writer;

pub use error::ResourceError;
pub use handle::{Handle, OpenMode};
pub use options::ReaderOptions;
pub use reader::Reader;
pub use writer::Writer;
