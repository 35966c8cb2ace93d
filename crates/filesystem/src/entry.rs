//! Live file and directory objects.
//!
//! An `Entry` is a cheap, clonable handle: every clone shares one path and
//! one node. Collections that hold an entry register themselves on it, so a
//! rename done through any clone re-keys every collection holding it.
//! Moving a directory also re-points every live entry below it.

use std::cell::RefCell;
use std::fmt;
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use rusty_fs_common::{file_name_of, lexical_normalize, with_trailing_separator};
use rusty_fs_resource::{OpenMode, Reader, Writer};

use crate::adapter::{ChildInfo, StorageAdapter};
use crate::collection::{Collection, Members};
use crate::error::FileSystemError;
use crate::resolver::{PatternResolver, Resolved, ResolvedKind};

/// Whether an entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Directory => write!(f, "directory"),
        }
    }
}

enum Node {
    File,
    /// Children are listed on first access and dropped when the directory moves.
    Directory { children: Option<Collection> },
}

impl Node {
    fn kind(&self) -> EntryKind {
        match self {
            Node::File => EntryKind::File,
            Node::Directory { .. } => EntryKind::Directory,
        }
    }
}

struct EntryState {
    /// Normalized absolute path.
    path: PathBuf,
    node: Node,
    /// Collections currently holding this entry.
    memberships: Vec<Weak<RefCell<Members>>>,
}

/// Every live entry created through one resolver.
///
/// Moving a directory looks up the entries below it here, including
/// handles that no collection holds.
#[derive(Default)]
pub(crate) struct Registry {
    live: RefCell<Vec<Weak<RefCell<EntryState>>>>,
}

impl Registry {
    fn track(&self, state: &Rc<RefCell<EntryState>>) {
        let mut live = self.live.borrow_mut();
        // Prune before the vector would grow.
        if live.len() == live.capacity() {
            live.retain(|held: &Weak<RefCell<EntryState>>| held.strong_count() > 0);
        }
        live.push(Rc::downgrade(state));
    }

    /// Live entries strictly below `dir`.
    fn below(&self, dir: &Path) -> Vec<Rc<RefCell<EntryState>>> {
        let mut live = self.live.borrow_mut();
        live.retain(|held: &Weak<RefCell<EntryState>>| held.strong_count() > 0);
        live.iter()
            .filter_map(Weak::upgrade)
            .filter(|state: &Rc<RefCell<EntryState>>| is_below(&state.borrow().path, dir))
            .collect()
    }
}

/// Whether `path` lies strictly below `dir`.
pub(crate) fn is_below(path: &Path, dir: &Path) -> bool {
    path != dir && path.starts_with(dir)
}

/// `path` with its `from` prefix swapped for `to`.
fn relocated(path: &Path, from: &Path, to: &Path) -> PathBuf {
    match path.strip_prefix(from) {
        Ok(rest) => to.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// A file or directory, existing or not yet created.
#[derive(Clone)]
pub struct Entry {
    state: Rc<RefCell<EntryState>>,
    resolver: PatternResolver,
}

impl Entry {
    /// Create an entry for `path` without touching storage.
    ///
    /// # Arguments
    /// * `path` - Path of the entry (normalized lexically)
    /// * `kind` - File or directory
    /// * `storage` - Adapter used for every later storage operation
    pub fn new(path: impl AsRef<Path>, kind: EntryKind, storage: Arc<dyn StorageAdapter>) -> Self {
        Self::with_resolver(path.as_ref(), kind, PatternResolver::new(storage))
    }

    pub(crate) fn with_resolver(path: &Path, kind: EntryKind, resolver: PatternResolver) -> Self {
        let node: Node = match kind {
            EntryKind::File => Node::File,
            EntryKind::Directory => Node::Directory { children: None },
        };
        let state: Rc<RefCell<EntryState>> = Rc::new(RefCell::new(EntryState {
            path: lexical_normalize(path),
            node,
            memberships: Vec::new(),
        }));
        resolver.registry().track(&state);
        Self { state, resolver }
    }

    /// Current path of the entry.
    pub fn path(&self) -> PathBuf {
        self.state.borrow().path.clone()
    }

    /// Last segment of the path.
    pub fn name(&self) -> String {
        file_name_of(&self.state.borrow().path)
    }

    pub fn kind(&self) -> EntryKind {
        self.state.borrow().node.kind()
    }

    pub fn is_file(&self) -> bool {
        self.kind() == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == EntryKind::Directory
    }

    /// Path of the containing directory, if any.
    pub fn parent_path(&self) -> Option<PathBuf> {
        self.state.borrow().path.parent().map(Path::to_path_buf)
    }

    /// Whether storage holds a node of this entry's kind at its path.
    pub fn exists(&self) -> Result<bool, FileSystemError> {
        Ok(self.storage().kind_of(&self.path())? == Some(self.kind()))
    }

    /// Whether both handles refer to the same entry object.
    pub fn same_entry(&self, other: &Entry) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// The storage adapter this entry operates on.
    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        self.resolver.storage()
    }

    /// Typed view if this entry is a file.
    pub fn as_file(&self) -> Option<File> {
        self.is_file().then(|| File(self.clone()))
    }

    /// Typed view if this entry is a directory.
    pub fn as_dir(&self) -> Option<Directory> {
        self.is_dir().then(|| Directory(self.clone()))
    }

    /// Rename the entry within its directory.
    ///
    /// # Arguments
    /// * `name` - New last path segment
    /// * `overwrite` - Replace an existing node at the new path in storage
    ///
    /// # Errors
    /// Returns `InvalidTarget` for names containing separators or dot names,
    /// and whatever `move_to` returns.
    pub fn rename(&self, name: &str, overwrite: bool) -> Result<(), FileSystemError> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', MAIN_SEPARATOR]) {
            return Err(FileSystemError::invalid_target(
                &self.path(),
                format!("'{}' is not a valid name", name),
            ));
        }
        let parent: PathBuf = self.parent_path().ok_or_else(|| {
            FileSystemError::invalid_target(&self.path(), "a filesystem root cannot be renamed")
        })?;
        self.move_to(parent.join(name), overwrite)
    }

    /// Move the entry to a new path.
    ///
    /// If the entry exists in storage it is moved there too; otherwise only
    /// the entry is re-pointed. For a directory, every live entry below it
    /// is re-pointed as well. Every collection holding a moved entry is
    /// re-keyed before this returns.
    ///
    /// # Arguments
    /// * `destination` - New path
    /// * `overwrite` - Replace an existing node at `destination` in storage
    ///
    /// # Errors
    /// Returns `DuplicatePath` if a collection holding this entry (or one
    /// below it) already has a different entry at the new path, or if storage
    /// has a node at `destination` and `overwrite` is false.
    pub fn move_to(
        &self,
        destination: impl AsRef<Path>,
        overwrite: bool,
    ) -> Result<(), FileSystemError> {
        let from: PathBuf = self.path();
        let to: PathBuf = lexical_normalize(destination.as_ref());
        if to == from {
            return Ok(());
        }
        if self.is_dir() && to.starts_with(&from) {
            return Err(FileSystemError::invalid_target(
                &to,
                "a directory cannot be moved into itself",
            ));
        }

        let collections: Vec<Rc<RefCell<Members>>> = self.memberships();
        let descendants: Vec<Entry> = if self.is_dir() {
            self.descendants(&from, &collections)
        } else {
            Vec::new()
        };

        for members in &collections {
            if members.borrow().holds_other(&to, self) {
                return Err(FileSystemError::DuplicatePath {
                    path: to.display().to_string(),
                });
            }
        }
        for descendant in &descendants {
            let target: PathBuf = relocated(&descendant.path(), &from, &to);
            for members in descendant.memberships() {
                if members.borrow().holds_other(&target, descendant) {
                    return Err(FileSystemError::DuplicatePath {
                        path: target.display().to_string(),
                    });
                }
            }
        }

        let storage: &Arc<dyn StorageAdapter> = self.storage();
        if storage.kind_of(&from)?.is_some() {
            if storage.kind_of(&to)?.is_some() {
                if !overwrite {
                    return Err(FileSystemError::DuplicatePath {
                        path: to.display().to_string(),
                    });
                }
                storage.delete(&to)?;
            }
            storage.rename(&from, &to)?;
        }

        self.repoint(to.clone());
        for members in &collections {
            members.borrow_mut().rekey(&from, &to, self);
        }
        for descendant in &descendants {
            descendant.relocate(&from, &to);
        }
        log::debug!(
            "Moved {} to {} ({} entries below it re-pointed)",
            from.display(),
            to.display(),
            descendants.len()
        );
        Ok(())
    }

    /// Copy the entry in storage and return an entry for the copy.
    ///
    /// # Errors
    /// Returns `DuplicatePath` if `destination` already exists.
    pub fn copy_to(&self, destination: impl AsRef<Path>) -> Result<Entry, FileSystemError> {
        let to: PathBuf = lexical_normalize(destination.as_ref());
        if self.storage().kind_of(&to)?.is_some() {
            return Err(FileSystemError::DuplicatePath {
                path: to.display().to_string(),
            });
        }
        self.storage().copy(&self.path(), &to)?;
        Ok(Entry::with_resolver(&to, self.kind(), self.resolver.clone()))
    }

    /// Delete the entry from storage. Removing a missing entry is a no-op.
    pub fn remove(&self) -> Result<(), FileSystemError> {
        let path: PathBuf = self.path();
        if self.storage().kind_of(&path)?.is_some() {
            self.storage().delete(&path)?;
        }
        self.forget_children();
        Ok(())
    }

    pub(crate) fn resolver(&self) -> &PatternResolver {
        &self.resolver
    }

    pub(crate) fn subscribe(&self, members: Weak<RefCell<Members>>) {
        let mut state = self.state.borrow_mut();
        state
            .memberships
            .retain(|held: &Weak<RefCell<Members>>| held.strong_count() > 0);
        state.memberships.push(members);
    }

    pub(crate) fn unsubscribe(&self, members: &Rc<RefCell<Members>>) {
        let target: Weak<RefCell<Members>> = Rc::downgrade(members);
        self.state
            .borrow_mut()
            .memberships
            .retain(|held: &Weak<RefCell<Members>>| !held.ptr_eq(&target));
    }

    /// Live collections holding this entry; dead registrations are pruned.
    fn memberships(&self) -> Vec<Rc<RefCell<Members>>> {
        let mut state = self.state.borrow_mut();
        state
            .memberships
            .retain(|held: &Weak<RefCell<Members>>| held.strong_count() > 0);
        state.memberships.iter().filter_map(Weak::upgrade).collect()
    }

    /// Live entries below `dir`: those tracked by the resolver plus members
    /// of the given collections.
    fn descendants(&self, dir: &Path, collections: &[Rc<RefCell<Members>>]) -> Vec<Entry> {
        let mut found: Vec<Entry> = self
            .resolver
            .registry()
            .below(dir)
            .into_iter()
            .map(|state: Rc<RefCell<EntryState>>| Entry {
                state,
                resolver: self.resolver.clone(),
            })
            .collect();
        for members in collections {
            for entry in members.borrow().below(dir) {
                if !found.iter().any(|held: &Entry| held.same_entry(&entry)) {
                    found.push(entry);
                }
            }
        }
        found
    }

    /// Follow a move of the directory `from` to `to`.
    fn relocate(&self, from: &Path, to: &Path) {
        let old: PathBuf = self.path();
        let new: PathBuf = relocated(&old, from, to);
        self.repoint(new.clone());
        for members in self.memberships() {
            members.borrow_mut().rekey(&old, &new, self);
        }
    }

    fn repoint(&self, path: PathBuf) {
        let mut state = self.state.borrow_mut();
        state.path = path;
        if let Node::Directory { children } = &mut state.node {
            *children = None;
        }
    }

    fn forget_children(&self) {
        if let Node::Directory { children } = &mut self.state.borrow_mut().node {
            *children = None;
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Entry")
            .field("path", &state.path)
            .field("kind", &state.node.kind())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// File
// ============================================================================

/// An entry known to be a file.
#[derive(Debug, Clone)]
pub struct File(pub(crate) Entry);

impl File {
    /// Create a file entry without touching storage.
    pub fn new(path: impl AsRef<Path>, storage: Arc<dyn StorageAdapter>) -> Self {
        File(Entry::new(path, EntryKind::File, storage))
    }

    /// Create the file (and missing parent directories) if it does not exist.
    pub fn create(&self) -> Result<(), FileSystemError> {
        self.storage().create(&self.path(), EntryKind::File)
    }

    /// Extension of the file name, without the dot.
    pub fn extension(&self) -> Option<String> {
        self.path()
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
    }

    /// Open a reader over the file content.
    pub fn reader(&self) -> Result<Reader, FileSystemError> {
        let handle = self.storage().open(&self.path(), OpenMode::Read)?;
        Ok(Reader::new(handle)?)
    }

    /// Open a writer appending to the file.
    pub fn writer(&self) -> Result<Writer, FileSystemError> {
        let handle = self.storage().open(&self.path(), OpenMode::Append)?;
        Ok(Writer::new(handle)?)
    }

    /// Whole content of the file.
    pub fn content(&self) -> Result<Vec<u8>, FileSystemError> {
        let mut reader: Reader = self.reader()?;
        let bytes: Vec<u8> = reader.read(None)?;
        reader.close()?;
        Ok(bytes)
    }

    /// Whole content of the file as UTF-8 text.
    ///
    /// # Errors
    /// Returns an `IoError` of kind `InvalidData` if the content is not UTF-8.
    pub fn content_string(&self) -> Result<String, FileSystemError> {
        String::from_utf8(self.content()?).map_err(|e| {
            FileSystemError::io(&self.path(), io::Error::new(io::ErrorKind::InvalidData, e))
        })
    }

    /// Replace the content of the file, creating it if missing.
    pub fn set_content(&self, data: &[u8]) -> Result<(), FileSystemError> {
        let handle = self.storage().open(&self.path(), OpenMode::Write)?;
        let mut writer: Writer = Writer::new(handle)?;
        writer.write(data)?;
        writer.close()?;
        Ok(())
    }

    /// Append to the content of the file, creating it if missing.
    pub fn append(&self, data: &[u8]) -> Result<(), FileSystemError> {
        let mut writer: Writer = self.writer()?;
        writer.write(data)?;
        writer.close()?;
        Ok(())
    }

    /// The untyped entry.
    pub fn entry(&self) -> &Entry {
        &self.0
    }
}

impl Deref for File {
    type Target = Entry;

    fn deref(&self) -> &Entry {
        &self.0
    }
}

impl From<File> for Entry {
    fn from(file: File) -> Self {
        file.0
    }
}

// ============================================================================
// Directory
// ============================================================================

/// An entry known to be a directory.
#[derive(Debug, Clone)]
pub struct Directory(pub(crate) Entry);

impl Directory {
    /// Create a directory entry without touching storage.
    pub fn new(path: impl AsRef<Path>, storage: Arc<dyn StorageAdapter>) -> Self {
        Directory(Entry::new(path, EntryKind::Directory, storage))
    }

    /// Create the directory (and missing parents) if it does not exist.
    pub fn create(&self) -> Result<(), FileSystemError> {
        self.storage().create(&self.path(), EntryKind::Directory)
    }

    /// Path rendered with a trailing separator.
    pub fn path_with_separator(&self) -> String {
        with_trailing_separator(&self.path())
    }

    /// Direct children of the directory.
    ///
    /// Listed from storage on first call and cached until the directory is
    /// moved, removed or `refresh()`ed. The returned collection is shared with
    /// the cache.
    pub fn children(&self) -> Result<Collection, FileSystemError> {
        if let Node::Directory {
            children: Some(cached),
        } = &self.0.state.borrow().node
        {
            return Ok(cached.clone());
        }

        let path: PathBuf = self.path();
        let listing: Vec<ChildInfo> = self.storage().list_children(&path)?;
        let children: Collection = listing
            .into_iter()
            .map(|child: ChildInfo| {
                self.0
                    .resolver()
                    .entry(&path.join(&child.name), child.kind)
            })
            .collect();

        if let Node::Directory { children: slot } = &mut self.0.state.borrow_mut().node {
            *slot = Some(children.clone());
        }
        Ok(children)
    }

    /// Drop the cached children so the next access lists storage again.
    pub fn refresh(&self) {
        self.0.forget_children();
    }

    /// Direct children that are files.
    pub fn files(&self) -> Result<Collection, FileSystemError> {
        Ok(self.children()?.files())
    }

    /// Direct children that are directories.
    pub fn dirs(&self) -> Result<Collection, FileSystemError> {
        Ok(self.children()?.dirs())
    }

    /// Get a file below this directory, creating it if asked.
    ///
    /// # Arguments
    /// * `path` - Path relative to this directory (or absolute)
    /// * `create` - Create the file and missing parents when nothing exists
    pub fn file(&self, path: &str, create: bool) -> Result<File, FileSystemError> {
        self.0.resolver().file(&self.path(), path, create)
    }

    /// Get a directory below this directory, creating it if asked.
    ///
    /// # Arguments
    /// * `path` - Path relative to this directory (or absolute)
    /// * `create` - Create the directory and missing parents when nothing exists
    pub fn dir(&self, path: &str, create: bool) -> Result<Directory, FileSystemError> {
        self.0.resolver().dir(&self.path(), path, create)
    }

    /// Every match of `pattern` below this directory, always as a collection.
    pub fn find(&self, pattern: &str) -> Result<Collection, FileSystemError> {
        self.0.resolver().find(&self.path(), pattern)
    }

    /// Resolve `pattern` below this directory.
    pub fn resolve(&self, pattern: &str) -> Result<Resolved, FileSystemError> {
        self.0.resolver().resolve(&self.path(), pattern)
    }

    /// Classify `pattern` below this directory.
    pub fn what_is(&self, pattern: &str) -> Result<ResolvedKind, FileSystemError> {
        self.0.resolver().what_is(&self.path(), pattern)
    }

    /// The untyped entry.
    pub fn entry(&self) -> &Entry {
        &self.0
    }
}

impl Deref for Directory {
    type Target = Entry;

    fn deref(&self) -> &Entry {
        &self.0
    }
}

impl From<Directory> for Entry {
    fn from(dir: Directory) -> Self {
        dir.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::LocalAdapter;
    use tempfile::TempDir;

    fn storage() -> Arc<dyn StorageAdapter> {
        Arc::new(LocalAdapter::default())
    }

    #[test]
    fn test_path_and_name_are_normalized() {
        let file: File = File::new("/music/./rock/../track.mp3", storage());
        assert_eq!(file.path(), PathBuf::from("/music/track.mp3"));
        assert_eq!(file.name(), "track.mp3");
        assert_eq!(file.extension().as_deref(), Some("mp3"));
        assert_eq!(file.parent_path(), Some(PathBuf::from("/music")));
    }

    #[test]
    fn test_clones_share_renames() {
        let dir: TempDir = TempDir::new().unwrap();
        let file: File = File::new(dir.path().join("a.txt"), storage());
        let alias: Entry = file.entry().clone();

        file.rename("b.txt", false).unwrap();
        assert_eq!(alias.name(), "b.txt");
        assert!(alias.same_entry(&file));
    }

    #[test]
    fn test_rename_moves_in_storage() {
        let dir: TempDir = TempDir::new().unwrap();
        let file: File = File::new(dir.path().join("a.txt"), storage());
        file.set_content(b"hello").unwrap();

        file.rename("b.txt", false).unwrap();
        assert!(!dir.path().join("a.txt").exists());
        assert_eq!(file.content().unwrap(), b"hello");
    }

    #[test]
    fn test_rename_onto_existing_requires_overwrite() {
        let dir: TempDir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();
        let file: File = File::new(dir.path().join("a.txt"), storage());

        assert!(matches!(
            file.rename("b.txt", false),
            Err(FileSystemError::DuplicatePath { .. })
        ));
        file.rename("b.txt", true).unwrap();
        assert_eq!(std::fs::read(dir.path().join("b.txt")).unwrap(), b"a");
    }

    #[test]
    fn test_rename_rejects_bad_names() {
        let file: File = File::new("/tmp/a.txt", storage());
        assert!(file.rename("", false).is_err());
        assert!(file.rename("..", false).is_err());
        assert!(file.rename("x/y", false).is_err());
    }

    #[test]
    fn test_directory_cannot_move_into_itself() {
        let dir: Directory = Directory::new("/data/outer", storage());
        assert!(matches!(
            dir.move_to("/data/outer/inner", false),
            Err(FileSystemError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_file_content_roundtrip() {
        let dir: TempDir = TempDir::new().unwrap();
        let file: File = File::new(dir.path().join("notes/today.txt"), storage());
        assert!(!file.exists().unwrap());

        file.create().unwrap();
        assert!(file.exists().unwrap());

        file.set_content(b"line one\n").unwrap();
        file.append(b"line two").unwrap();
        assert_eq!(file.content_string().unwrap(), "line one\nline two");

        let mut reader: Reader = file.reader().unwrap();
        assert_eq!(reader.read_line().unwrap(), b"line one");
    }

    #[test]
    fn test_children_are_cached_until_refresh() {
        let tmp: TempDir = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("one.txt"), b"").unwrap();
        let dir: Directory = Directory::new(tmp.path(), storage());

        assert_eq!(dir.children().unwrap().count(), 1);
        std::fs::write(tmp.path().join("two.txt"), b"").unwrap();
        assert_eq!(dir.children().unwrap().count(), 1);

        dir.refresh();
        assert_eq!(dir.children().unwrap().count(), 2);
    }

    #[test]
    fn test_children_recomputed_after_move() {
        let tmp: TempDir = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("box")).unwrap();
        std::fs::write(tmp.path().join("box/item.txt"), b"").unwrap();
        let dir: Directory = Directory::new(tmp.path().join("box"), storage());

        let before: Vec<PathBuf> = dir.children().unwrap().paths();
        dir.rename("crate", false).unwrap();
        let after: Vec<PathBuf> = dir.children().unwrap().paths();

        assert_eq!(before, vec![tmp.path().join("box/item.txt")]);
        assert_eq!(after, vec![tmp.path().join("crate/item.txt")]);
    }

    #[test]
    fn test_handles_below_a_moved_directory_follow_it() {
        let tmp: TempDir = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("box/inner")).unwrap();
        std::fs::write(tmp.path().join("box/inner/item.txt"), b"kept").unwrap();
        let dir: Directory = Directory::new(tmp.path().join("box"), storage());

        let item: File = dir.file("inner/item.txt", false).unwrap();
        let inner: Directory = dir.dir("inner", false).unwrap();
        dir.rename("crate", false).unwrap();

        assert_eq!(item.path(), tmp.path().join("crate/inner/item.txt"));
        assert_eq!(inner.path(), tmp.path().join("crate/inner"));
        assert_eq!(item.content_string().unwrap(), "kept");

        // Siblings sharing the name prefix stay put.
        let sibling: Directory = dir.dir("../crate-two", true).unwrap();
        dir.rename("box", false).unwrap();
        assert_eq!(sibling.path(), tmp.path().join("crate-two"));
        assert_eq!(item.path(), tmp.path().join("box/inner/item.txt"));
    }

    #[test]
    fn test_dropped_views_do_not_pile_up_memberships() {
        let tmp: TempDir = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("one.txt"), b"").unwrap();
        let dir: Directory = Directory::new(tmp.path(), storage());
        let child: Entry = dir.children().unwrap().first().unwrap();

        for _ in 0..100 {
            assert_eq!(dir.files().unwrap().count(), 1);
        }
        // The cached listing plus at most the last dropped view.
        assert!(child.state.borrow().memberships.len() <= 2);

        let kept: Collection = Collection::new();
        kept.add(child.clone());
        assert_eq!(child.memberships().len(), 2);
    }

    #[test]
    fn test_copy_to_returns_new_entry() {
        let tmp: TempDir = TempDir::new().unwrap();
        let file: File = File::new(tmp.path().join("a.txt"), storage());
        file.set_content(b"copy me").unwrap();

        let copy: Entry = file.copy_to(tmp.path().join("b.txt")).unwrap();
        assert!(!copy.same_entry(&file));
        assert_eq!(copy.as_file().unwrap().content().unwrap(), b"copy me");
        assert!(matches!(
            file.copy_to(tmp.path().join("b.txt")),
            Err(FileSystemError::DuplicatePath { .. })
        ));
    }

    #[test]
    fn test_remove_is_noop_for_missing() {
        let tmp: TempDir = TempDir::new().unwrap();
        let file: File = File::new(tmp.path().join("ghost.txt"), storage());
        file.remove().unwrap();

        file.create().unwrap();
        file.remove().unwrap();
        assert!(!file.exists().unwrap());
    }

    #[test]
    fn test_typed_views() {
        let entry: Entry = Entry::new("/x/y", EntryKind::Directory, storage());
        assert!(entry.as_dir().is_some());
        assert!(entry.as_file().is_none());
        assert_eq!(
            Directory::new("/x/y", storage()).path_with_separator(),
            format!("/x/y{}", MAIN_SEPARATOR)
        );
    }
}
