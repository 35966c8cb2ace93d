//! The filesystem facade: pattern queries and entry lookups under one root.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusty_fs_common::{
    is_within_root, lexical_normalize, resolve_against, to_absolute, with_trailing_separator,
    PathError,
};

use crate::adapter::{LocalAdapter, StorageAdapter};
use crate::collection::Collection;
use crate::entry::{Directory, Entry, EntryKind, File};
use crate::error::FileSystemError;
use crate::options::FilesystemOptions;
use crate::resolver::{PatternResolver, Resolved, ResolvedKind};

/// A view of storage rooted at one directory.
///
/// Relative paths and patterns are resolved against the root; absolute
/// ones are used as given.
///
/// # Example
///
/// ```no_run
/// use rusty_fs_filesystem::{Filesystem, ResolvedKind};
///
/// let fs = Filesystem::open("/srv/music")?;
/// if fs.what_is("folder*/*.mp3")? == ResolvedKind::Collection {
///     for track in &fs.find("folder*/*.mp3")? {
///         track.rename(&track.name().to_lowercase(), false)?;
///     }
/// }
/// # Ok::<(), rusty_fs_filesystem::FileSystemError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Filesystem {
    root: Directory,
    resolver: PatternResolver,
    options: FilesystemOptions,
}

impl Filesystem {
    /// Open a filesystem on local disk.
    ///
    /// # Errors
    /// Returns `RootNotFound` if the configured root is not an existing directory.
    pub fn new(options: FilesystemOptions) -> Result<Self, FileSystemError> {
        let storage: Arc<dyn StorageAdapter> =
            Arc::new(LocalAdapter::new(options.follow_symlinks));
        Self::with_storage(options, storage)
    }

    /// Open a filesystem on local disk with default options.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, FileSystemError> {
        Self::new(FilesystemOptions::default().with_root(root))
    }

    /// Open a filesystem over any storage adapter.
    ///
    /// A relative root is made absolute once, here.
    pub fn with_storage(
        options: FilesystemOptions,
        storage: Arc<dyn StorageAdapter>,
    ) -> Result<Self, FileSystemError> {
        if options.root.as_os_str().is_empty() {
            return Err(FileSystemError::RootNotFound {
                path: String::new(),
            });
        }
        let root_path: PathBuf = lexical_normalize(&to_absolute(&options.root)?);
        if storage.kind_of(&root_path)? != Some(EntryKind::Directory) {
            return Err(FileSystemError::RootNotFound {
                path: root_path.display().to_string(),
            });
        }

        let resolver: PatternResolver =
            PatternResolver::new(storage).with_include_hidden(options.include_hidden);
        let root: Directory = Directory(resolver.entry(&root_path, EntryKind::Directory));
        log::debug!("Opened filesystem at {}", root_path.display());

        Ok(Self {
            root,
            resolver,
            options,
        })
    }

    /// Root path with a trailing separator.
    pub fn path(&self) -> String {
        with_trailing_separator(&self.root.path())
    }

    pub fn root(&self) -> &Directory {
        &self.root
    }

    pub fn root_path(&self) -> PathBuf {
        self.root.path()
    }

    pub fn options(&self) -> &FilesystemOptions {
        &self.options
    }

    /// Resolve a path or pattern into live entries.
    pub fn resolve(&self, pattern: &str) -> Result<Resolved, FileSystemError> {
        self.resolver.resolve(&self.root_path(), pattern)
    }

    /// Classify a path or pattern: file, dir, nothing or collection.
    pub fn what_is(&self, pattern: &str) -> Result<ResolvedKind, FileSystemError> {
        self.resolver.what_is(&self.root_path(), pattern)
    }

    /// Whether `pattern` resolves to exactly one file.
    pub fn is_file(&self, pattern: &str) -> Result<bool, FileSystemError> {
        Ok(self.what_is(pattern)? == ResolvedKind::File)
    }

    /// Whether `pattern` resolves to exactly one directory.
    pub fn is_dir(&self, pattern: &str) -> Result<bool, FileSystemError> {
        Ok(self.what_is(pattern)? == ResolvedKind::Directory)
    }

    /// Whether `pattern` resolves to anything at all.
    pub fn is_any(&self, pattern: &str) -> Result<bool, FileSystemError> {
        Ok(self.what_is(pattern)? != ResolvedKind::Nothing)
    }

    /// Whether every pattern resolves to exactly one file.
    pub fn are_files<I>(&self, patterns: I) -> Result<bool, FileSystemError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.all(patterns, |fs, pattern| fs.is_file(pattern))
    }

    /// Whether every pattern resolves to exactly one directory.
    pub fn are_dirs<I>(&self, patterns: I) -> Result<bool, FileSystemError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.all(patterns, |fs, pattern| fs.is_dir(pattern))
    }

    /// Whether every pattern resolves to something.
    pub fn are_any<I>(&self, patterns: I) -> Result<bool, FileSystemError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.all(patterns, |fs, pattern| fs.is_any(pattern))
    }

    fn all<I, F>(&self, patterns: I, check: F) -> Result<bool, FileSystemError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        F: Fn(&Self, &str) -> Result<bool, FileSystemError>,
    {
        for pattern in patterns {
            if !check(self, pattern.as_ref())? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Get a file, creating it (and missing parents) if asked.
    pub fn file(&self, path: &str, create: bool) -> Result<File, FileSystemError> {
        self.resolver.file(&self.root_path(), path, create)
    }

    /// Get a directory, creating it (and missing parents) if asked.
    pub fn dir(&self, path: &str, create: bool) -> Result<Directory, FileSystemError> {
        self.resolver.dir(&self.root_path(), path, create)
    }

    /// The named files, or the files directly under the root.
    ///
    /// # Errors
    /// Fails on the first path that is not an existing file.
    pub fn files(&self, paths: Option<&[&str]>) -> Result<Collection, FileSystemError> {
        match paths {
            None => Ok(self.listing()?.files()),
            Some(paths) => paths
                .iter()
                .map(|path: &&str| self.file(path, false).map(Entry::from))
                .collect(),
        }
    }

    /// The named directories, or the directories directly under the root.
    ///
    /// # Errors
    /// Fails on the first path that is not an existing directory.
    pub fn dirs(&self, paths: Option<&[&str]>) -> Result<Collection, FileSystemError> {
        match paths {
            None => Ok(self.listing()?.dirs()),
            Some(paths) => paths
                .iter()
                .map(|path: &&str| self.dir(path, false).map(Entry::from))
                .collect(),
        }
    }

    /// Fresh listing of the root.
    fn listing(&self) -> Result<Collection, FileSystemError> {
        self.root.refresh();
        self.root.children()
    }

    /// Every match of `pattern`, always as a collection.
    pub fn find(&self, pattern: &str) -> Result<Collection, FileSystemError> {
        self.resolver.find(&self.root_path(), pattern)
    }

    /// Delete whatever `pattern` resolves to.
    ///
    /// # Errors
    /// Returns `InvalidTarget` if nothing matches or a match is the root
    /// itself, and `PathOutsideRoot` if a match lies outside the root.
    /// Nothing is deleted unless every match passes these checks.
    pub fn remove(&self, pattern: &str) -> Result<(), FileSystemError> {
        let root: PathBuf = self.root_path();
        let matches: Collection = match self.resolve(pattern)? {
            Resolved::Nothing => {
                return Err(FileSystemError::invalid_target(
                    &resolve_against(&root, Path::new(pattern)),
                    "nothing to remove",
                ))
            }
            resolved => resolved.into_collection(),
        };

        for entry in matches.iter() {
            let path: PathBuf = entry.path();
            if path == root {
                return Err(FileSystemError::invalid_target(
                    &path,
                    "the filesystem root cannot be removed",
                ));
            }
            if !is_within_root(&path, &root) {
                return Err(PathError::PathOutsideRoot {
                    path: path.display().to_string(),
                    root: root.display().to_string(),
                }
                .into());
            }
        }
        matches.remove_all()?;
        self.root.refresh();
        Ok(())
    }

    /// Delete each of `patterns` in turn, stopping at the first failure.
    pub fn remove_all<I>(&self, patterns: I) -> Result<(), FileSystemError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for pattern in patterns {
            self.remove(pattern.as_ref())?;
        }
        Ok(())
    }

    /// An untyped entry for `path` under this filesystem, without touching storage.
    pub fn entry(&self, path: &str, kind: EntryKind) -> Entry {
        self.resolver
            .entry(&resolve_against(&self.root_path(), Path::new(path)), kind)
    }
}
