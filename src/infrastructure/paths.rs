//! Filesystem locations used by the drawer.
//!
//! The data directory holds the span log and the order-helper preference file.
//! It resolves, in order, from `LOREBOOK_DRAWER_DATA_DIR`, from
//! `$XDG_DATA_HOME/lorebook-drawer`, and from `~/.local/share/lorebook-drawer`.

use std::path::PathBuf;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "LOREBOOK_DRAWER_DATA_DIR";

/// Directory name below the platform data directory.
const APP_DIR: &str = "lorebook-drawer";

/// Returns the data directory for drawer files.
///
/// Falls back to a relative `.lorebook-drawer` directory when neither the
/// override nor a home directory is available.
///
/// # Examples
///
/// ```
/// use lorebook_drawer::infrastructure::get_data_dir;
///
/// let data_dir = get_data_dir();
/// assert!(!data_dir.as_os_str().is_empty());
/// ```
#[must_use]
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").filter(|d| !d.is_empty()) {
        return PathBuf::from(xdg).join(APP_DIR);
    }
    std::env::var_os("HOME").filter(|d| !d.is_empty()).map_or_else(
        || PathBuf::from(format!(".{APP_DIR}")),
        |home| PathBuf::from(home).join(".local").join("share").join(APP_DIR),
    )
}

/// Expands a leading `~` to the home directory.
///
/// Paths without a tilde, and all paths when `HOME` is unset, are returned
/// unchanged.
///
/// # Examples
///
/// ```
/// use lorebook_drawer::infrastructure::expand_tilde;
///
/// assert_eq!(expand_tilde("/absolute/path"), "/absolute/path");
/// ```
#[must_use]
pub fn expand_tilde(path: &str) -> String {
    let Some(home) = std::env::var_os("HOME") else {
        return path.to_string();
    };
    let home = home.to_string_lossy();
    if let Some(rest) = path.strip_prefix("~/") {
        format!("{home}/{rest}")
    } else if path == "~" {
        home.into_owned()
    } else {
        path.to_string()
    }
}
