//! Ordered, path-keyed sets of entries.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rusty_fs_common::lexical_normalize;

use crate::entry::{is_below, Entry, EntryKind};
use crate::error::FileSystemError;

/// Shared state behind a `Collection`.
#[derive(Default)]
pub(crate) struct Members {
    /// Insertion order.
    order: Vec<Entry>,
    /// Current path of every member.
    index: HashMap<PathBuf, Entry>,
}

impl Members {
    /// Whether `path` is held by an entry other than `entry`.
    pub(crate) fn holds_other(&self, path: &Path, entry: &Entry) -> bool {
        self.index
            .get(path)
            .map_or(false, |held: &Entry| !held.same_entry(entry))
    }

    /// Members whose path lies strictly below `dir`.
    pub(crate) fn below(&self, dir: &Path) -> Vec<Entry> {
        self.index
            .iter()
            .filter(|(path, _)| is_below(path, dir))
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    /// Move `entry` from key `from` to key `to`.
    pub(crate) fn rekey(&mut self, from: &Path, to: &Path, entry: &Entry) {
        let owned: bool = self
            .index
            .get(from)
            .map_or(false, |held: &Entry| held.same_entry(entry));
        if owned {
            self.index.remove(from);
            self.index.insert(to.to_path_buf(), entry.clone());
        }
    }
}

/// An ordered set of entries, unique by path.
///
/// Clones share the same members. Entries are keyed by their current path:
/// renaming or moving a member through any handle re-keys every collection
/// that holds it, so `contains`/`get` always see the new path.
#[derive(Clone, Default)]
pub struct Collection {
    members: Rc<RefCell<Members>>,
}

impl Collection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry at the end.
    ///
    /// # Returns
    /// `false` (and no change) if an entry with the same path is already held.
    pub fn add(&self, entry: Entry) -> bool {
        let path: PathBuf = entry.path();
        {
            let mut members = self.members.borrow_mut();
            if members.index.contains_key(&path) {
                return false;
            }
            members.index.insert(path, entry.clone());
            members.order.push(entry.clone());
        }
        entry.subscribe(Rc::downgrade(&self.members));
        true
    }

    /// Whether an entry with this path is held.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.members
            .borrow()
            .index
            .contains_key(&lexical_normalize(path.as_ref()))
    }

    /// The entry with this path.
    ///
    /// # Errors
    /// Returns `FileSystemError::NotFound` if no member has this path.
    pub fn get(&self, path: impl AsRef<Path>) -> Result<Entry, FileSystemError> {
        let key: PathBuf = lexical_normalize(path.as_ref());
        self.members
            .borrow()
            .index
            .get(&key)
            .cloned()
            .ok_or_else(|| FileSystemError::NotFound {
                path: key.display().to_string(),
            })
    }

    /// Take the entry with this path out of the collection and delete it from storage.
    ///
    /// # Returns
    /// The removed entry, or `None` if no member had this path.
    pub fn remove(&self, path: impl AsRef<Path>) -> Result<Option<Entry>, FileSystemError> {
        let key: PathBuf = lexical_normalize(path.as_ref());
        let held: Option<Entry> = self.members.borrow().index.get(&key).cloned();
        match held {
            Some(entry) => {
                // Storage first: a failed delete leaves the member in place.
                entry.remove()?;
                self.forget(&key);
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Take the entry with this path out of the collection, leaving storage alone.
    pub fn forget(&self, path: impl AsRef<Path>) -> Option<Entry> {
        let key: PathBuf = lexical_normalize(path.as_ref());
        let entry: Entry = {
            let mut members = self.members.borrow_mut();
            let entry: Entry = members.index.remove(&key)?;
            members
                .order
                .retain(|held: &Entry| !held.same_entry(&entry));
            entry
        };
        entry.unsubscribe(&self.members);
        Some(entry)
    }

    /// Delete every member from storage and empty the collection.
    ///
    /// Stops at the first failure; members already deleted are gone from the
    /// collection, the rest stay.
    pub fn remove_all(&self) -> Result<(), FileSystemError> {
        for entry in self.entries() {
            entry.remove()?;
            self.forget(entry.path());
        }
        Ok(())
    }

    /// New collection with only the file members, order kept.
    pub fn files(&self) -> Collection {
        self.of_kind(EntryKind::File)
    }

    /// New collection with only the directory members, order kept.
    pub fn dirs(&self) -> Collection {
        self.of_kind(EntryKind::Directory)
    }

    fn of_kind(&self, kind: EntryKind) -> Collection {
        self.entries()
            .into_iter()
            .filter(|entry: &Entry| entry.kind() == kind)
            .collect()
    }

    /// First member in insertion order.
    pub fn first(&self) -> Result<Entry, FileSystemError> {
        self.members
            .borrow()
            .order
            .first()
            .cloned()
            .ok_or(FileSystemError::EmptyCollection)
    }

    /// Last member in insertion order.
    pub fn last(&self) -> Result<Entry, FileSystemError> {
        self.members
            .borrow()
            .order
            .last()
            .cloned()
            .ok_or(FileSystemError::EmptyCollection)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries().iter().map(Entry::name).collect()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries().iter().map(Entry::path).collect()
    }

    /// Snapshot of the members in insertion order.
    ///
    /// Members may be renamed, moved or removed while walking the snapshot.
    pub fn entries(&self) -> Vec<Entry> {
        self.members.borrow().order.clone()
    }

    pub fn iter(&self) -> std::vec::IntoIter<Entry> {
        self.entries().into_iter()
    }

    pub fn count(&self) -> usize {
        self.members.borrow().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

impl FromIterator<Entry> for Collection {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        let mut collection: Collection = Collection::new();
        collection.extend(iter);
        collection
    }
}

impl Extend<Entry> for Collection {
    fn extend<I: IntoIterator<Item = Entry>>(&mut self, iter: I) {
        for entry in iter {
            self.add(entry);
        }
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.paths()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{ChildInfo, LocalAdapter, StorageAdapter};
    use rusty_fs_resource::{Handle, OpenMode};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Helper holding three files and three directories in a temp dir.
    struct Fixture {
        dir: TempDir,
        collection: Collection,
    }

    fn fixture() -> Fixture {
        let dir: TempDir = TempDir::new().unwrap();
        let storage: Arc<dyn StorageAdapter> = Arc::new(LocalAdapter::default());
        let collection: Collection = Collection::new();

        for name in ["file1.txt", "file2.txt", "file3.txt"] {
            let path: PathBuf = dir.path().join(name);
            std::fs::write(&path, name).unwrap();
            collection.add(Entry::new(&path, EntryKind::File, storage.clone()));
        }
        for name in ["dir1", "dir2", "dir3"] {
            let path: PathBuf = dir.path().join(name);
            std::fs::create_dir(&path).unwrap();
            collection.add(Entry::new(&path, EntryKind::Directory, storage.clone()));
        }

        Fixture { dir, collection }
    }

    #[test]
    fn test_add_keeps_order_and_rejects_duplicates() {
        let fx: Fixture = fixture();
        assert_eq!(fx.collection.count(), 6);

        let storage: Arc<dyn StorageAdapter> = Arc::new(LocalAdapter::default());
        let again: Entry = Entry::new(fx.dir.path().join("file1.txt"), EntryKind::File, storage);
        assert!(!fx.collection.add(again));
        assert_eq!(fx.collection.count(), 6);
        assert_eq!(
            fx.collection.names(),
            vec!["file1.txt", "file2.txt", "file3.txt", "dir1", "dir2", "dir3"]
        );
    }

    #[test]
    fn test_contains_and_get() {
        let fx: Fixture = fixture();
        let path: PathBuf = fx.dir.path().join("file2.txt");

        assert!(fx.collection.contains(&path));
        assert!(!fx.collection.contains(fx.dir.path().join("file9.txt")));
        assert_eq!(fx.collection.get(&path).unwrap().name(), "file2.txt");
        assert!(matches!(
            fx.collection.get(fx.dir.path().join("file9.txt")),
            Err(FileSystemError::NotFound { .. })
        ));
    }

    #[test]
    fn test_rename_updates_keys() {
        let fx: Fixture = fixture();
        let old: PathBuf = fx.dir.path().join("file1.txt");
        let new: PathBuf = fx.dir.path().join("renamed.txt");

        let entry: Entry = fx.collection.get(&old).unwrap();
        entry.rename("renamed.txt", false).unwrap();

        assert!(!fx.collection.contains(&old));
        assert!(fx.collection.contains(&new));
        assert!(fx.collection.get(&new).unwrap().same_entry(&entry));
        assert_eq!(fx.collection.first().unwrap().name(), "renamed.txt");
    }

    #[test]
    fn test_rename_onto_member_path_fails() {
        let fx: Fixture = fixture();
        let entry: Entry = fx.collection.get(fx.dir.path().join("file1.txt")).unwrap();
        assert!(matches!(
            entry.rename("file2.txt", true),
            Err(FileSystemError::DuplicatePath { .. })
        ));
        assert_eq!(entry.name(), "file1.txt");
        assert!(fx.dir.path().join("file1.txt").exists());
    }

    #[test]
    fn test_rename_updates_every_holding_collection() {
        let fx: Fixture = fixture();
        let other: Collection = fx.collection.files();
        let entry: Entry = other.get(fx.dir.path().join("file3.txt")).unwrap();

        entry.rename("file4.txt", false).unwrap();

        let new: PathBuf = fx.dir.path().join("file4.txt");
        assert!(other.contains(&new));
        assert!(fx.collection.contains(&new));
    }

    #[test]
    fn test_files_and_dirs_partition() {
        let fx: Fixture = fixture();
        let files: Collection = fx.collection.files();
        let dirs: Collection = fx.collection.dirs();

        assert_eq!(files.count(), 3);
        assert_eq!(dirs.count(), 3);
        assert!(files.iter().all(|e: Entry| e.is_file()));
        assert!(dirs.iter().all(|e: Entry| e.is_dir()));
        assert_eq!(files.count() + dirs.count(), fx.collection.count());
    }

    #[test]
    fn test_first_and_last() {
        let fx: Fixture = fixture();
        assert_eq!(fx.collection.first().unwrap().name(), "file1.txt");
        assert_eq!(fx.collection.last().unwrap().name(), "dir3");

        let empty: Collection = Collection::new();
        assert!(matches!(empty.first(), Err(FileSystemError::EmptyCollection)));
        assert!(matches!(empty.last(), Err(FileSystemError::EmptyCollection)));
    }

    #[test]
    fn test_paths_follow_names() {
        let fx: Fixture = fixture();
        let paths: Vec<PathBuf> = fx.collection.paths();
        assert_eq!(paths.len(), 6);
        assert_eq!(paths[3], fx.dir.path().join("dir1"));
    }

    #[test]
    fn test_remove_deletes_from_storage() {
        let fx: Fixture = fixture();
        let path: PathBuf = fx.dir.path().join("dir2");

        let removed: Option<Entry> = fx.collection.remove(&path).unwrap();
        assert_eq!(removed.unwrap().name(), "dir2");
        assert!(!path.exists());
        assert_eq!(fx.collection.count(), 5);

        assert!(fx.collection.remove(&path).unwrap().is_none());
    }

    #[test]
    fn test_forget_leaves_storage_and_stops_tracking() {
        let fx: Fixture = fixture();
        let path: PathBuf = fx.dir.path().join("file1.txt");
        let entry: Entry = fx.collection.forget(&path).unwrap();
        assert!(path.exists());

        // Renaming the forgotten entry onto a member path is no longer a collision.
        entry.rename("moved.txt", false).unwrap();
        assert!(!fx.collection.contains(fx.dir.path().join("moved.txt")));
    }

    #[test]
    fn test_rename_while_iterating() {
        let fx: Fixture = fixture();
        for entry in &fx.collection.files() {
            let name: String = format!("renamed-{}", entry.name());
            entry.rename(&name, false).unwrap();
        }
        assert!(fx.collection.contains(fx.dir.path().join("renamed-file2.txt")));
        assert!(fx.dir.path().join("renamed-file3.txt").exists());
    }

    #[test]
    fn test_remove_all() {
        let fx: Fixture = fixture();
        fx.collection.dirs().remove_all().unwrap();
        assert!(!fx.dir.path().join("dir1").exists());
        assert!(fx.dir.path().join("file1.txt").exists());

        fx.collection.remove_all().unwrap();
        assert!(fx.collection.is_empty());
    }

    #[test]
    fn test_renaming_a_directory_rekeys_members_below_it() {
        let fx: Fixture = fixture();
        let child_path: PathBuf = fx.dir.path().join("dir1/file11.txt");
        std::fs::write(&child_path, b"eleven").unwrap();
        let storage: Arc<dyn StorageAdapter> = Arc::new(LocalAdapter::default());
        let child: Entry = Entry::new(&child_path, EntryKind::File, storage);
        fx.collection.add(child.clone());

        fx.collection
            .get(fx.dir.path().join("dir1"))
            .unwrap()
            .rename("dirX", false)
            .unwrap();

        let moved: PathBuf = fx.dir.path().join("dirX/file11.txt");
        assert!(fx.collection.contains(&moved));
        assert!(!fx.collection.contains(&child_path));
        assert_eq!(child.path(), moved);
        assert!(child.exists().unwrap());
        assert_eq!(child.as_file().unwrap().content().unwrap(), b"eleven");
    }

    #[test]
    fn test_directory_rename_fails_when_a_member_below_would_collide() {
        let fx: Fixture = fixture();
        let storage: Arc<dyn StorageAdapter> = Arc::new(LocalAdapter::default());
        std::fs::write(fx.dir.path().join("dir1/a.txt"), b"").unwrap();
        let below: Entry =
            Entry::new(fx.dir.path().join("dir1/a.txt"), EntryKind::File, storage.clone());
        let squatter: Entry =
            Entry::new(fx.dir.path().join("dirX/a.txt"), EntryKind::File, storage);
        fx.collection.add(below.clone());
        fx.collection.add(squatter);

        let dir1: Entry = fx.collection.get(fx.dir.path().join("dir1")).unwrap();
        assert!(matches!(
            dir1.rename("dirX", false),
            Err(FileSystemError::DuplicatePath { .. })
        ));
        assert_eq!(dir1.name(), "dir1");
        assert_eq!(below.path(), fx.dir.path().join("dir1/a.txt"));
        assert!(fx.dir.path().join("dir1/a.txt").exists());
    }

    /// Local storage whose deletes always fail.
    struct UndeletableAdapter(LocalAdapter);

    impl StorageAdapter for UndeletableAdapter {
        fn kind_of(&self, path: &Path) -> Result<Option<EntryKind>, FileSystemError> {
            self.0.kind_of(path)
        }

        fn list_children(&self, dir: &Path) -> Result<Vec<ChildInfo>, FileSystemError> {
            self.0.list_children(dir)
        }

        fn create(&self, path: &Path, kind: EntryKind) -> Result<(), FileSystemError> {
            self.0.create(path, kind)
        }

        fn delete(&self, path: &Path) -> Result<(), FileSystemError> {
            Err(FileSystemError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ))
        }

        fn rename(&self, from: &Path, to: &Path) -> Result<(), FileSystemError> {
            self.0.rename(from, to)
        }

        fn copy(&self, from: &Path, to: &Path) -> Result<(), FileSystemError> {
            self.0.copy(from, to)
        }

        fn open(&self, path: &Path, mode: OpenMode) -> Result<Handle, FileSystemError> {
            self.0.open(path, mode)
        }
    }

    #[test]
    fn test_failed_remove_keeps_the_member() {
        let dir: TempDir = TempDir::new().unwrap();
        let path: PathBuf = dir.path().join("locked.txt");
        std::fs::write(&path, b"stay").unwrap();
        let storage: Arc<dyn StorageAdapter> = Arc::new(UndeletableAdapter(LocalAdapter::default()));
        let collection: Collection = Collection::new();
        collection.add(Entry::new(&path, EntryKind::File, storage));

        assert!(matches!(
            collection.remove(&path),
            Err(FileSystemError::IoError { .. })
        ));
        assert!(collection.contains(&path));
        assert_eq!(collection.count(), 1);
        assert!(path.exists());
    }
}
