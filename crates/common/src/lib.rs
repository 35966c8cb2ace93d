//! Shared types and utilities for rusty-fs.
//!
//! This crate provides common functionality used across all rusty-fs crates:
//! - Path normalization and root resolution utilities
//! - Shared constants (read chunk size, line terminator, glob metacharacters)
//! - Shared path error type

pub mod constants;
pub mod error;
pub mod path_utils;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::PathError;
pub use path_utils::{
    file_name_of, is_within_root, lexical_normalize, resolve_against, to_absolute,
    with_trailing_separator,
};
