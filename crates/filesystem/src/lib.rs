//! Live file system objects for rusty-fs.
//!
//! This crate resolves path patterns into entries that stay in sync with storage:
//! - `Filesystem` - Facade rooted at one directory (`what_is`, `find`, `file`, `dir`, `remove`)
//! - `Entry`, `File`, `Directory` - Handles that can be renamed, moved, copied and removed
//! - `Collection` - Ordered, path-keyed set of entries that follows renames of its members
//! - `PatternResolver` - Segment-by-segment glob expansion (`*`, `?`, `[...]`, `{a,b}`)
//! - `StorageAdapter` - Primitive storage operations, with `LocalAdapter` for the local disk

pub mod adapter;
pub mod collection;
pub mod entry;
pub mod error;
pub mod filesystem;
pub mod glob;
pub mod options;
pub mod resolver;

// Re-export main types
pub use adapter::{ChildInfo, LocalAdapter, StorageAdapter};
pub use collection::Collection;
pub use entry::{Directory, Entry, EntryKind, File};
pub use error::FileSystemError;
pub use filesystem::Filesystem;
pub use glob::{escape_glob, has_wildcards};
pub use options::FilesystemOptions;
pub use resolver::{PatternResolver, Resolved, ResolvedKind};
pub use rusty_fs_common::PathError;
pub use rusty_fs_resource::{Reader, ReaderOptions, Writer};
