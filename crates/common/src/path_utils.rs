//! Path normalization utilities shared by entries, resolvers and the facade.

use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use crate::error::PathError;

/// Convert a path to absolute without resolving symlinks.
///
/// # Arguments
/// * `path` - Path to convert (relative or absolute)
///
/// # Returns
/// Absolute path, joining with current directory if relative.
///
/// # Errors
/// Returns error if current directory cannot be determined.
pub fn to_absolute(path: &Path) -> Result<PathBuf, PathError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        std::env::current_dir()
            .map(|cwd: PathBuf| cwd.join(path))
            .map_err(|e: std::io::Error| PathError::from_io(path.display().to_string(), e))
    }
}

/// Lexical path normalization without filesystem access.
///
/// Removes `.` components and resolves `..` components lexically.
/// Does not access the filesystem or resolve symlinks. Trailing separators
/// are dropped, so `dir/` and `dir` normalize to the same path.
///
/// # Arguments
/// * `path` - Path to normalize
///
/// # Returns
/// Normalized path with `.` and `..` resolved lexically.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => { /* skip . */ }
            Component::ParentDir => {
                // Pop if we can and it's not a ParentDir or RootDir
                if !components.is_empty()
                    && !matches!(
                        components.last(),
                        Some(Component::ParentDir) | Some(Component::RootDir)
                    )
                {
                    components.pop();
                } else {
                    components.push(component);
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

/// Resolve a path against a root directory.
///
/// Absolute paths are only normalized; relative paths are joined onto
/// `root` first. No filesystem access happens here.
///
/// # Arguments
/// * `root` - Directory relative paths are resolved against
/// * `path` - Absolute or root-relative path (may contain glob characters)
///
/// # Returns
/// The normalized absolute path.
pub fn resolve_against(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        lexical_normalize(path)
    } else {
        lexical_normalize(&root.join(path))
    }
}

/// Last segment of a path as a string (empty for a filesystem root).
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Render a directory path with exactly one trailing separator.
pub fn with_trailing_separator(path: &Path) -> String {
    let mut rendered: String = path.display().to_string();
    if !rendered.ends_with(MAIN_SEPARATOR) {
        rendered.push(MAIN_SEPARATOR);
    }
    rendered
}

/// Check if a path is within a root directory.
///
/// Uses lexical comparison, does not access filesystem.
///
/// # Arguments
/// * `path` - Path to check
/// * `root` - Root directory that should contain the path
///
/// # Returns
/// `true` if path is within root (or equal to it), `false` otherwise.
pub fn is_within_root(path: &Path, root: &Path) -> bool {
    let norm_path: PathBuf = lexical_normalize(path);
    let norm_root: PathBuf = lexical_normalize(root);
    norm_path.starts_with(&norm_root)
}
