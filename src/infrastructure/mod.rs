//! Infrastructure layer for filesystem and environment interactions.
//!
//! This module resolves where the drawer keeps its own files: the span log and
//! the order-helper preferences. Book files live wherever the host keeps them.

pub mod paths;

pub use paths::{expand_tilde, get_data_dir, DATA_DIR_ENV};

use crate::Config;
use std::path::PathBuf;

/// Data directory for a configuration.
///
/// Uses `config.data_dir` (with `~` expanded) when set, the platform default
/// otherwise.
///
/// # Examples
///
/// ```
/// use lorebook_drawer::{infrastructure::resolve_data_dir, Config};
/// use std::path::PathBuf;
///
/// let config = Config {
///     data_dir: Some(PathBuf::from("/tmp/drawer")),
///     ..Config::default()
/// };
/// assert_eq!(resolve_data_dir(&config), PathBuf::from("/tmp/drawer"));
/// ```
#[must_use]
pub fn resolve_data_dir(config: &Config) -> PathBuf {
    config.data_dir.as_ref().map_or_else(get_data_dir, |dir| {
        PathBuf::from(expand_tilde(&dir.to_string_lossy()))
    })
}
