//! Turn path patterns into live entries.
//!
//! Resolution normalizes the pattern against a root, walks the wildcard
//! segments one directory listing at a time, and classifies the result:
//!
//! | matches | result                           |
//! |---------|----------------------------------|
//! | 0       | `Resolved::Nothing`              |
//! | 1       | `Resolved::File` / `Directory`   |
//! | 2+      | `Resolved::Collection`           |

use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use rusty_fs_common::resolve_against;

use crate::adapter::{ChildInfo, StorageAdapter};
use crate::collection::Collection;
use crate::entry::{Directory, Entry, EntryKind, File, Registry};
use crate::error::FileSystemError;
use crate::glob::{PathPattern, SegmentPattern};

/// What a pattern resolves to, without the entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedKind {
    File,
    Directory,
    Nothing,
    Collection,
}

impl ResolvedKind {
    /// Short name: `file`, `dir`, `nothing` or `collection`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolvedKind::File => "file",
            ResolvedKind::Directory => "dir",
            ResolvedKind::Nothing => "nothing",
            ResolvedKind::Collection => "collection",
        }
    }

    fn classify(matches: &[(PathBuf, EntryKind)]) -> Self {
        match matches {
            [] => ResolvedKind::Nothing,
            [(_, EntryKind::File)] => ResolvedKind::File,
            [(_, EntryKind::Directory)] => ResolvedKind::Directory,
            _ => ResolvedKind::Collection,
        }
    }
}

impl fmt::Display for ResolvedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved pattern.
#[derive(Debug, Clone)]
pub enum Resolved {
    File(File),
    Directory(Directory),
    Nothing,
    Collection(Collection),
}

impl Resolved {
    pub fn kind(&self) -> ResolvedKind {
        match self {
            Resolved::File(_) => ResolvedKind::File,
            Resolved::Directory(_) => ResolvedKind::Directory,
            Resolved::Nothing => ResolvedKind::Nothing,
            Resolved::Collection(_) => ResolvedKind::Collection,
        }
    }

    /// Every resolved entry as a collection (empty for `Nothing`).
    pub fn into_collection(self) -> Collection {
        match self {
            Resolved::File(file) => std::iter::once(Entry::from(file)).collect(),
            Resolved::Directory(dir) => std::iter::once(Entry::from(dir)).collect(),
            Resolved::Nothing => Collection::new(),
            Resolved::Collection(collection) => collection,
        }
    }
}

/// Expands path patterns against a storage adapter.
#[derive(Clone)]
pub struct PatternResolver {
    storage: Arc<dyn StorageAdapter>,
    include_hidden: bool,
    /// Shared by every entry this resolver (or a clone) creates.
    registry: Rc<Registry>,
}

impl PatternResolver {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self {
            storage,
            include_hidden: false,
            registry: Rc::default(),
        }
    }

    /// Let wildcards match names starting with `.`.
    pub fn with_include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Every existing path matching `pattern`, with its kind.
    ///
    /// Matches come out in listing order: sorted by name within each
    /// directory, parents before their descendants.
    ///
    /// # Arguments
    /// * `root` - Directory relative patterns are resolved against
    /// * `pattern` - Absolute or relative path, possibly with wildcards
    ///
    /// # Errors
    /// Returns `InvalidGlobPattern` for malformed segments, or a storage error.
    pub fn matches(
        &self,
        root: &Path,
        pattern: &str,
    ) -> Result<Vec<(PathBuf, EntryKind)>, FileSystemError> {
        let target: PathBuf = resolve_against(root, Path::new(pattern));
        let parsed: PathPattern = PathPattern::parse(&target)?;

        if parsed.is_literal() {
            return Ok(self
                .storage
                .kind_of(parsed.base())?
                .map(|kind: EntryKind| vec![(parsed.base().to_path_buf(), kind)])
                .unwrap_or_default());
        }

        if self.storage.kind_of(parsed.base())? != Some(EntryKind::Directory) {
            return Ok(Vec::new());
        }

        let mut frontier: Vec<(PathBuf, EntryKind)> =
            vec![(parsed.base().to_path_buf(), EntryKind::Directory)];
        for segment in parsed.segments() {
            let mut next: Vec<(PathBuf, EntryKind)> = Vec::new();
            for (dir, kind) in frontier {
                if kind != EntryKind::Directory {
                    continue;
                }
                self.expand(&dir, segment, &mut next)?;
            }
            frontier = next;
        }
        Ok(frontier)
    }

    /// Match one segment inside `dir`, pushing hits onto `out`.
    fn expand(
        &self,
        dir: &Path,
        segment: &SegmentPattern,
        out: &mut Vec<(PathBuf, EntryKind)>,
    ) -> Result<(), FileSystemError> {
        match segment {
            SegmentPattern::Literal(name) => {
                let candidate: PathBuf = dir.join(name);
                if let Some(kind) = self.storage.kind_of(&candidate)? {
                    out.push((candidate, kind));
                }
            }
            SegmentPattern::Wildcard { .. } => {
                for child in self.storage.list_children(dir)? {
                    let ChildInfo { name, kind } = child;
                    if segment.matches(&name, self.include_hidden) {
                        out.push((dir.join(name), kind));
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolve `pattern` into live entries.
    pub fn resolve(&self, root: &Path, pattern: &str) -> Result<Resolved, FileSystemError> {
        let mut matches: Vec<(PathBuf, EntryKind)> = self.matches(root, pattern)?;
        let resolved: Resolved = match ResolvedKind::classify(&matches) {
            ResolvedKind::Nothing => Resolved::Nothing,
            ResolvedKind::Collection => Resolved::Collection(self.collect(matches)),
            ResolvedKind::File | ResolvedKind::Directory => {
                let (path, kind) = matches.remove(0);
                match kind {
                    EntryKind::File => Resolved::File(File(self.entry(&path, kind))),
                    EntryKind::Directory => Resolved::Directory(Directory(self.entry(&path, kind))),
                }
            }
        };
        log::debug!(
            "Resolved '{}' under {} as {}",
            pattern,
            root.display(),
            resolved.kind()
        );
        Ok(resolved)
    }

    /// Classify `pattern` without building entries.
    pub fn what_is(&self, root: &Path, pattern: &str) -> Result<ResolvedKind, FileSystemError> {
        Ok(ResolvedKind::classify(&self.matches(root, pattern)?))
    }

    /// Every match of `pattern`, always as a collection.
    pub fn find(&self, root: &Path, pattern: &str) -> Result<Collection, FileSystemError> {
        Ok(self.collect(self.matches(root, pattern)?))
    }

    /// Get the single file `path` names, creating it if asked.
    ///
    /// # Errors
    /// - `MissingEntry` if nothing matches and `create` is false
    /// - `WrongKind` if the match is a directory
    /// - `InvalidTarget` if the pattern is ambiguous, or `create` is set on a
    ///   wildcard pattern that matches nothing
    pub fn file(&self, root: &Path, path: &str, create: bool) -> Result<File, FileSystemError> {
        self.single(root, path, create, EntryKind::File).map(File)
    }

    /// Get the single directory `path` names, creating it if asked.
    ///
    /// Errors mirror [`PatternResolver::file`].
    pub fn dir(&self, root: &Path, path: &str, create: bool) -> Result<Directory, FileSystemError> {
        self.single(root, path, create, EntryKind::Directory)
            .map(Directory)
    }

    fn single(
        &self,
        root: &Path,
        path: &str,
        create: bool,
        expected: EntryKind,
    ) -> Result<Entry, FileSystemError> {
        let target: PathBuf = resolve_against(root, Path::new(path));
        let matches: Vec<(PathBuf, EntryKind)> = self.matches(root, path)?;

        match matches.as_slice() {
            [] if create => {
                let parsed: PathPattern = PathPattern::parse(&target)?;
                if !parsed.is_literal() {
                    return Err(FileSystemError::invalid_target(
                        &target,
                        "cannot create a path containing wildcards",
                    ));
                }
                self.storage.create(parsed.base(), expected)?;
                Ok(self.entry(parsed.base(), expected))
            }
            [] => Err(FileSystemError::MissingEntry {
                path: target.display().to_string(),
                expected,
            }),
            [(found, kind)] if *kind == expected => Ok(self.entry(found, expected)),
            [(found, kind)] => Err(FileSystemError::WrongKind {
                path: found.display().to_string(),
                expected,
                actual: *kind,
            }),
            many => Err(FileSystemError::invalid_target(
                &target,
                format!("pattern matches {} entries", many.len()),
            )),
        }
    }

    fn collect(&self, matches: Vec<(PathBuf, EntryKind)>) -> Collection {
        matches
            .into_iter()
            .map(|(path, kind)| self.entry(&path, kind))
            .collect()
    }

    pub(crate) fn entry(&self, path: &Path, kind: EntryKind) -> Entry {
        Entry::with_resolver(path, kind, self.clone())
    }
}

impl fmt::Debug for PatternResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternResolver")
            .field("include_hidden", &self.include_hidden)
            .finish_non_exhaustive()
    }
}
