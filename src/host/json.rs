//! JSON directory host.
//!
//! Each book is a `<name>.json` file in one directory. The active-book list and
//! the extension settings object live next to them in `active.json` and
//! `settings.json`. All writes go through a temporary file and a rename so a
//! crash never leaves a half-written book behind.
//!
//! # Directory Layout
//!
//! ```text
//! worlds/
//! ├── Lore.json          {"entries": {"0": {...}, "1": {...}}}
//! ├── Bestiary.json
//! ├── active.json        ["Lore"]
//! └── settings.json      {"wordInfoDrawer": {"sortLogic": "order", ...}}
//! ```

use super::{HostNotification, WorldInfoHost};
use crate::domain::error::{DrawerError, Result};
use crate::domain::BookData;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const ACTIVE_FILE: &str = "active.json";
const SETTINGS_FILE: &str = "settings.json";

/// Host backed by a directory of JSON book files.
///
/// # Examples
///
/// ```no_run
/// use lorebook_drawer::host::{JsonDirHost, WorldInfoHost};
/// use std::path::PathBuf;
///
/// let host = JsonDirHost::open(PathBuf::from("/tmp/worlds"))?;
/// for name in host.world_names()? {
///     println!("{name}");
/// }
/// # Ok::<(), lorebook_drawer::DrawerError>(())
/// ```
#[derive(Debug)]
pub struct JsonDirHost {
    /// Directory holding the book files.
    dir: PathBuf,

    /// Active book names, mirrored in `active.json`.
    active: Vec<String>,

    /// Extension settings object, mirrored in `settings.json`.
    settings: Map<String, Value>,

    /// Notifications not yet drained.
    pending: Vec<HostNotification>,
}

impl JsonDirHost {
    /// Opens (and creates if needed) a book directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or `active.json` /
    /// `settings.json` exist but contain invalid JSON.
    pub fn open(dir: PathBuf) -> Result<Self> {
        tracing::debug!(path = ?dir, "opening world directory");
        std::fs::create_dir_all(&dir)?;

        let active = read_json::<Vec<String>>(&dir.join(ACTIVE_FILE))?.unwrap_or_default();
        let settings = read_json::<Map<String, Value>>(&dir.join(SETTINGS_FILE))?.unwrap_or_default();

        tracing::debug!(active = active.len(), "world directory opened");

        Ok(Self {
            dir,
            active,
            settings,
            pending: Vec::new(),
        })
    }

    /// Directory holding the book files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn book_path(&self, name: &str) -> Result<PathBuf> {
        let reserved = [ACTIVE_FILE, SETTINGS_FILE]
            .iter()
            .any(|f| f.strip_suffix(".json") == Some(name));
        if name.trim().is_empty() || name.starts_with('.') || name.contains(|c: char| c == '/' || c == '\\') || reserved {
            return Err(DrawerError::Host(format!("invalid book name {name:?}")));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }
}

impl WorldInfoHost for JsonDirHost {
    fn world_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = std::fs::read_dir(&self.dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(String::from))
            .filter(|stem| {
                ![ACTIVE_FILE, SETTINGS_FILE]
                    .iter()
                    .any(|f| f.strip_suffix(".json") == Some(stem.as_str()))
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn selected_world_info(&self) -> Vec<String> {
        self.active.clone()
    }

    fn load_world_info(&self, name: &str) -> Result<BookData> {
        let path = self.book_path(name)?;
        read_json::<BookData>(&path)?.ok_or_else(|| DrawerError::UnknownBook(name.to_string()))
    }

    fn save_world_info(&mut self, name: &str, data: &BookData, silent: bool) -> Result<()> {
        let path = self.book_path(name)?;
        tracing::debug!(book = %name, entries = data.entries.len(), silent, "saving book");
        write_atomic(&path, &serde_json::to_string_pretty(data)?)?;
        self.pending.push(HostNotification::WorldInfoUpdated {
            book: name.to_string(),
            data: data.clone(),
        });
        Ok(())
    }

    fn create_world_info(&mut self, name: &str) -> Result<bool> {
        let path = self.book_path(name)?;
        if path.exists() {
            tracing::debug!(book = %name, "book already exists");
            return Ok(false);
        }
        self.save_world_info(name, &BookData::default(), true)?;
        Ok(true)
    }

    fn set_book_active(&mut self, name: &str, active: bool) -> Result<()> {
        let present = self.active.iter().any(|n| n == name);
        if active && !present {
            self.active.push(name.to_string());
        } else if !active && present {
            self.active.retain(|n| n != name);
        } else {
            return Ok(());
        }
        write_atomic(&self.dir.join(ACTIVE_FILE), &serde_json::to_string_pretty(&self.active)?)?;
        self.pending.push(HostNotification::WorldInfoSettingsUpdated);
        Ok(())
    }

    fn extension_settings(&self, key: &str) -> Option<Value> {
        self.settings.get(key).cloned()
    }

    fn save_extension_settings(&mut self, key: &str, value: Value) -> Result<()> {
        self.settings.insert(key.to_string(), value);
        write_atomic(&self.dir.join(SETTINGS_FILE), &serde_json::to_string_pretty(&self.settings)?)
    }

    fn drain_notifications(&mut self) -> Vec<HostNotification> {
        std::mem::take(&mut self.pending)
    }
}

/// Reads and parses a JSON file; `Ok(None)` if it does not exist.
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)?;
    let value = serde_json::from_str(&contents)
        .map_err(|e| DrawerError::Host(format!("failed to parse {}: {e}", path.display())))?;
    Ok(Some(value))
}

/// Writes `contents` to a sibling temporary file, then renames it into place.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    tracing::trace!(tmp_path = ?tmp_path, "writing to temporary file");
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Entry, Uid};

    #[test]
    fn books_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = JsonDirHost::open(dir.path().to_path_buf()).unwrap();

        assert!(host.create_world_info("Lore").unwrap());
        assert!(!host.create_world_info("Lore").unwrap());

        let mut data = host.load_world_info("Lore").unwrap();
        let mut entry = host.create_world_info_entry("Lore", &mut data).unwrap();
        entry.comment = "Intro".to_string();
        data.entries.insert(entry.uid.clone(), entry);
        host.save_world_info("Lore", &data, true).unwrap();

        let reopened = JsonDirHost::open(dir.path().to_path_buf()).unwrap();
        assert_eq!(reopened.world_names().unwrap(), vec!["Lore"]);
        assert_eq!(reopened.load_world_info("Lore").unwrap().entries[&Uid::from(0)].comment, "Intro");
        assert!(!dir.path().join("Lore.json.tmp").exists());
    }

    #[test]
    fn saves_raise_update_notifications() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = JsonDirHost::open(dir.path().to_path_buf()).unwrap();
        let data = BookData::from_entries([Entry::new(Uid::from(1))]);

        host.save_world_info("Lore", &data, false).unwrap();
        host.set_book_active("Lore", true).unwrap();

        let notes = host.drain_notifications();
        assert_eq!(notes.len(), 2);
        assert!(matches!(&notes[0], HostNotification::WorldInfoUpdated { book, .. } if book == "Lore"));
        assert_eq!(notes[1], HostNotification::WorldInfoSettingsUpdated);
        assert!(host.drain_notifications().is_empty());
    }

    #[test]
    fn bookkeeping_files_are_not_books() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = JsonDirHost::open(dir.path().to_path_buf()).unwrap();
        host.set_book_active("Lore", true).unwrap();
        host.save_extension_settings("wordInfoDrawer", serde_json::json!({"sortLogic": "uid"}))
            .unwrap();

        assert!(host.world_names().unwrap().is_empty());
        assert!(host.load_world_info("active").is_err());

        let reopened = JsonDirHost::open(dir.path().to_path_buf()).unwrap();
        assert_eq!(reopened.selected_world_info(), vec!["Lore"]);
        assert_eq!(
            reopened.extension_settings("wordInfoDrawer"),
            Some(serde_json::json!({"sortLogic": "uid"}))
        );
    }
}
