//! Glob patterns resolved one path segment at a time.
//!
//! A pattern such as `/music/folder*/*.mp3` is split into a literal base
//! (`/music`) and the remaining segments (`folder*`, `*.mp3`). Each segment
//! is matched against the names of a single directory listing, so `*`
//! never crosses a path separator. Supported segment syntax:
//! - `*` (any run of characters) and `?` (one character)
//! - Character classes like `[abc]`
//! - Brace expansion like `*.{png,jpg}`
//!
//! ## Literal Path Matching
//!
//! When a name legitimately contains glob metacharacters, escape it with
//! `escape_glob()` before embedding it in a pattern:
//!
//! ```
//! use rusty_fs_filesystem::glob::{escape_glob, SegmentPattern};
//!
//! let segment = SegmentPattern::parse(&escape_glob("output[v1]")).unwrap();
//! assert!(segment.matches("output[v1]", false));
//! assert!(!segment.matches("outputv", false));
//! ```

use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use rusty_fs_common::GLOB_METACHARACTERS;

use crate::error::FileSystemError;

/// Escape special glob characters in a string to treat it as a literal name.
///
/// This function escapes the following glob metacharacters:
/// - `*` (matches any sequence of characters)
/// - `?` (matches any single character)
/// - `[` and `]` (character class delimiters)
/// - `{` and `}` (brace expansion delimiters)
/// - `!` (negation in character classes)
///
/// # Arguments
/// * `s` - String to escape
///
/// # Returns
/// A new string with all glob metacharacters escaped with backslashes.
///
/// # Example
/// ```
/// use rusty_fs_filesystem::glob::escape_glob;
///
/// assert_eq!(escape_glob("file[1].txt"), r"file\[1\].txt");
/// assert_eq!(escape_glob("test*.log"), r"test\*.log");
/// ```
pub fn escape_glob(s: &str) -> String {
    let mut escaped: String = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '*' | '?' | '[' | ']' | '{' | '}' | '!' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Whether `s` contains an unescaped glob metacharacter.
pub fn has_wildcards(s: &str) -> bool {
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            chars.next();
        } else if GLOB_METACHARACTERS.contains(&ch) {
            return true;
        }
    }
    false
}

/// Remove the backslashes `escape_glob` added.
fn unescape_glob(s: &str) -> String {
    let mut unescaped: String = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next) => unescaped.push(next),
                None => unescaped.push(ch),
            }
        } else {
            unescaped.push(ch);
        }
    }
    unescaped
}

/// Matcher for a single path segment.
#[derive(Debug, Clone)]
pub enum SegmentPattern {
    /// Plain name compared for equality.
    Literal(String),
    /// Compiled glob for one segment.
    Wildcard {
        /// The segment as written.
        source: String,
        /// Compiled matcher.
        matcher: GlobMatcher,
    },
}

impl SegmentPattern {
    /// Compile one segment.
    ///
    /// # Errors
    /// Returns `FileSystemError::InvalidGlobPattern` if globset rejects the segment.
    pub fn parse(segment: &str) -> Result<Self, FileSystemError> {
        if !has_wildcards(segment) {
            return Ok(SegmentPattern::Literal(unescape_glob(segment)));
        }

        let matcher: GlobMatcher = GlobBuilder::new(segment)
            .literal_separator(true)
            .backslash_escape(true)
            .build()
            .map_err(|e| FileSystemError::InvalidGlobPattern {
                pattern: segment.to_string(),
                reason: e.to_string(),
            })?
            .compile_matcher();

        Ok(SegmentPattern::Wildcard {
            source: segment.to_string(),
            matcher,
        })
    }

    /// Check a directory entry name against this segment.
    ///
    /// Wildcards skip names starting with `.` unless `include_hidden` is set
    /// or the segment itself starts with `.`.
    ///
    /// # Arguments
    /// * `name` - Name of a single directory entry
    /// * `include_hidden` - Let wildcards match dot-files
    pub fn matches(&self, name: &str, include_hidden: bool) -> bool {
        match self {
            SegmentPattern::Literal(literal) => literal == name,
            SegmentPattern::Wildcard { source, matcher } => {
                if name.starts_with('.') && !include_hidden && !source.starts_with('.') {
                    return false;
                }
                matcher.is_match(name)
            }
        }
    }

    /// Whether this segment is a plain name.
    pub fn is_literal(&self) -> bool {
        matches!(self, SegmentPattern::Literal(_))
    }
}

/// A normalized path split into a literal base and the segments to expand.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// Longest leading run of segments without wildcards.
    base: PathBuf,
    /// Segments from the first wildcard on (empty for a literal path).
    segments: Vec<SegmentPattern>,
}

impl PathPattern {
    /// Split a normalized absolute path into base and segments.
    ///
    /// # Arguments
    /// * `path` - Normalized path, possibly containing wildcard segments
    ///
    /// # Errors
    /// Returns `FileSystemError::InvalidGlobPattern` if a segment cannot be compiled.
    pub fn parse(path: &Path) -> Result<Self, FileSystemError> {
        let mut base: PathBuf = PathBuf::new();
        let mut segments: Vec<SegmentPattern> = Vec::new();

        for component in path.components() {
            let text: String = component.as_os_str().to_string_lossy().into_owned();
            let wildcard: bool = matches!(component, Component::Normal(_)) && has_wildcards(&text);

            if segments.is_empty() && !wildcard {
                match component {
                    Component::Normal(_) => base.push(unescape_glob(&text)),
                    _ => base.push(component.as_os_str()),
                }
            } else {
                segments.push(SegmentPattern::parse(&text)?);
            }
        }

        Ok(Self { base, segments })
    }

    /// Whether the path has no wildcard segment at all.
    pub fn is_literal(&self) -> bool {
        self.segments.is_empty()
    }

    /// The literal directory expansion starts from.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Segments to expand below the base, in order.
    pub fn segments(&self) -> &[SegmentPattern] {
        &self.segments
    }
}
