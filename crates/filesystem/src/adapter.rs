//! Storage adapter: the primitive operations entries and resolvers call into.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rusty_fs_resource::{Handle, OpenMode};
use walkdir::WalkDir;

use crate::entry::EntryKind;
use crate::error::FileSystemError;

/// A direct child of a directory, as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildInfo {
    /// Name of the child within its parent.
    pub name: String,
    /// Whether the child is a file or a directory.
    pub kind: EntryKind,
}

/// Primitive storage operations - implemented by each backend.
pub trait StorageAdapter: Send + Sync {
    /// Classify what exists at `path`.
    /// Returns None if nothing exists there.
    fn kind_of(&self, path: &Path) -> Result<Option<EntryKind>, FileSystemError>;

    /// List the direct children of a directory, sorted by name.
    fn list_children(&self, dir: &Path) -> Result<Vec<ChildInfo>, FileSystemError>;

    /// Create a file or directory, including missing parent directories.
    /// Creating something that already exists with the same kind is a no-op.
    fn create(&self, path: &Path, kind: EntryKind) -> Result<(), FileSystemError>;

    /// Delete a file, or a directory with everything below it.
    fn delete(&self, path: &Path) -> Result<(), FileSystemError>;

    /// Move a node to a new path.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FileSystemError>;

    /// Copy a node (recursively for directories) to a new path.
    fn copy(&self, from: &Path, to: &Path) -> Result<(), FileSystemError>;

    /// Open a byte stream on a file.
    fn open(&self, path: &Path, mode: OpenMode) -> Result<Handle, FileSystemError>;
}

/// Storage adapter backed by the local disk.
#[derive(Debug, Clone)]
pub struct LocalAdapter {
    follow_symlinks: bool,
}

impl Default for LocalAdapter {
    fn default() -> Self {
        Self {
            follow_symlinks: true,
        }
    }
}

impl LocalAdapter {
    /// Create an adapter.
    ///
    /// # Arguments
    /// * `follow_symlinks` - Classify symlinks by their target instead of as files
    pub fn new(follow_symlinks: bool) -> Self {
        Self { follow_symlinks }
    }

    fn metadata(&self, path: &Path) -> io::Result<fs::Metadata> {
        if self.follow_symlinks {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        }
    }

    fn create_parent(path: &Path) -> Result<(), FileSystemError> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|e| FileSystemError::io(parent, e))
            }
            _ => Ok(()),
        }
    }

    fn copy_tree(&self, from: &Path, to: &Path) -> Result<(), FileSystemError> {
        for entry in WalkDir::new(from).follow_links(self.follow_symlinks) {
            let entry: walkdir::DirEntry = entry.map_err(|e| FileSystemError::IoError {
                path: e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                source: e.into(),
            })?;

            let relative: &Path = entry
                .path()
                .strip_prefix(from)
                .map_err(|_| FileSystemError::invalid_target(entry.path(), "escaped copy source"))?;
            let target: PathBuf = to.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(|e| FileSystemError::io(&target, e))?;
            } else {
                fs::copy(entry.path(), &target).map_err(|e| FileSystemError::io(&target, e))?;
            }
        }
        Ok(())
    }
}

fn kind_from(file_type: fs::FileType) -> EntryKind {
    if file_type.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}

impl StorageAdapter for LocalAdapter {
    fn kind_of(&self, path: &Path) -> Result<Option<EntryKind>, FileSystemError> {
        match self.metadata(path) {
            Ok(metadata) => Ok(Some(kind_from(metadata.file_type()))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            // A path running through a regular file cannot exist
            Err(e) if e.kind() == io::ErrorKind::NotADirectory => Ok(None),
            Err(e) => Err(FileSystemError::io(path, e)),
        }
    }

    fn list_children(&self, dir: &Path) -> Result<Vec<ChildInfo>, FileSystemError> {
        if self.kind_of(dir)? != Some(EntryKind::Directory) {
            return Err(FileSystemError::invalid_target(dir, "not a directory"));
        }

        let mut children: Vec<ChildInfo> = Vec::new();
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name();

        for entry in walker {
            let entry: walkdir::DirEntry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            children.push(ChildInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind: kind_from(entry.file_type()),
            });
        }

        Ok(children)
    }

    fn create(&self, path: &Path, kind: EntryKind) -> Result<(), FileSystemError> {
        match self.kind_of(path)? {
            Some(existing) if existing == kind => return Ok(()),
            Some(existing) => {
                return Err(FileSystemError::invalid_target(
                    path,
                    format!("a {} already exists there", existing),
                ))
            }
            None => {}
        }

        match kind {
            EntryKind::Directory => {
                fs::create_dir_all(path).map_err(|e| FileSystemError::io(path, e))?;
            }
            EntryKind::File => {
                Self::create_parent(path)?;
                fs::OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(path)
                    .map_err(|e| FileSystemError::io(path, e))?;
            }
        }
        log::debug!("Created {} {}", kind, path.display());
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<(), FileSystemError> {
        let kind: EntryKind = self
            .kind_of(path)?
            .ok_or_else(|| FileSystemError::invalid_target(path, "nothing to delete"))?;

        let removed: io::Result<()> = match kind {
            EntryKind::Directory => fs::remove_dir_all(path),
            EntryKind::File => fs::remove_file(path),
        };
        removed.map_err(|e| FileSystemError::io(path, e))?;

        log::debug!("Deleted {} {}", kind, path.display());
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FileSystemError> {
        Self::create_parent(to)?;
        fs::rename(from, to).map_err(|e| FileSystemError::io(from, e))?;
        log::debug!("Renamed {} to {}", from.display(), to.display());
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<(), FileSystemError> {
        let kind: EntryKind = self
            .kind_of(from)?
            .ok_or_else(|| FileSystemError::invalid_target(from, "nothing to copy"))?;

        Self::create_parent(to)?;
        match kind {
            EntryKind::Directory => self.copy_tree(from, to)?,
            EntryKind::File => {
                fs::copy(from, to).map_err(|e| FileSystemError::io(to, e))?;
            }
        }
        log::debug!("Copied {} to {}", from.display(), to.display());
        Ok(())
    }

    fn open(&self, path: &Path, mode: OpenMode) -> Result<Handle, FileSystemError> {
        Ok(Handle::open(path, mode)?)
    }
}
