//! Configuration options for the filesystem facade.

use std::path::{Path, PathBuf};

/// Configuration for a `Filesystem`.
///
/// The root is held here and passed explicitly to every resolution;
/// nothing reads the process working directory after construction.
///
/// # Example
///
/// ```ignore
/// let options = FilesystemOptions::default()
///     .with_root("/srv/media")
///     .with_include_hidden(true);
///
/// let fs = Filesystem::new(options)?;
/// ```
#[derive(Debug, Clone)]
pub struct FilesystemOptions {
    /// Directory relative paths and patterns are resolved against.
    pub root: PathBuf,
    /// Whether wildcards match names starting with `.`.
    pub include_hidden: bool,
    /// Whether symlinks are classified by their target (`true`) or as files.
    pub follow_symlinks: bool,
}

impl Default for FilesystemOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            include_hidden: false,
            follow_symlinks: true,
        }
    }
}

impl FilesystemOptions {
    /// Set the root directory.
    ///
    /// # Arguments
    /// * `root` - Existing directory to resolve against
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    /// Let wildcards match dot-files.
    ///
    /// # Arguments
    /// * `include_hidden` - `true` to match hidden names with `*`
    pub fn with_include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    /// Choose how symlinks are classified.
    ///
    /// # Arguments
    /// * `follow_symlinks` - `false` to treat every symlink as a file
    pub fn with_follow_symlinks(mut self, follow_symlinks: bool) -> Self {
        self.follow_symlinks = follow_symlinks;
        self
    }
}
