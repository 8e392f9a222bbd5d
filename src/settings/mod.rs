//! Drawer preferences.
//!
//! Two stores are involved:
//!
//! - [`SortSettings`] lives in the host's extension settings object under the
//!   configured key (`wordInfoDrawer` by default) as
//!   `{"sortLogic": "...", "sortDirection": "..."}`. Saves are debounced by the
//!   drawer.
//! - [`OrderHelperPrefs`] lives in a [`KeyValueStore`] under fixed
//!   `stwid--order-*` keys, written immediately on every change.
//!
//! Unreadable or unknown stored values fall back to defaults; they never stop
//! the drawer from mounting.

use crate::domain::error::Result;
use crate::domain::{SortCriterion, SortDirection, SortPreset};
use crate::host::json::{read_json, write_atomic};
use crate::host::WorldInfoHost;
use crate::order_helper::OrderDirection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default key of the sort settings in the extension settings object.
pub const SETTINGS_KEY: &str = "wordInfoDrawer";

/// Store key of the order helper start value.
pub const ORDER_START_KEY: &str = "stwid--order-start";
/// Store key of the order helper step value.
pub const ORDER_STEP_KEY: &str = "stwid--order-step";
/// Store key of the order helper direction.
pub const ORDER_DIRECTION_KEY: &str = "stwid--order-direction";
/// Store key of the order helper filter script.
pub const ORDER_FILTER_KEY: &str = "stwid--order-filter";

/// Filter script used when none is stored.
pub const DEFAULT_FILTER: &str = "{{var::entry}}";

/// Sort criterion and direction of the entry lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSettings {
    /// Primary key.
    pub sort_logic: SortCriterion,
    /// Direction.
    pub sort_direction: SortDirection,
}

impl Default for SortSettings {
    fn default() -> Self {
        Self::from(SortPreset::default())
    }
}

impl From<SortPreset> for SortSettings {
    fn from(preset: SortPreset) -> Self {
        Self {
            sort_logic: preset.criterion,
            sort_direction: preset.direction,
        }
    }
}

impl SortSettings {
    /// Reads the settings from the host, falling back to defaults.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lorebook_drawer::host::{MemoryHost, WorldInfoHost};
    /// use lorebook_drawer::settings::SortSettings;
    /// use lorebook_drawer::domain::SortCriterion;
    ///
    /// let mut host = MemoryHost::new();
    /// host.save_extension_settings(
    ///     "wordInfoDrawer",
    ///     serde_json::json!({"sortLogic": "order", "sortDirection": "descending"}),
    /// )?;
    /// assert_eq!(SortSettings::load(&host, "wordInfoDrawer").sort_logic, SortCriterion::Order);
    /// # Ok::<(), lorebook_drawer::DrawerError>(())
    /// ```
    #[must_use]
    pub fn load<H: WorldInfoHost + ?Sized>(host: &H, key: &str) -> Self {
        host.extension_settings(key)
            .and_then(|value| match serde_json::from_value(value) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    tracing::debug!(key = %key, error = %e, "ignoring unreadable sort settings");
                    None
                }
            })
            .unwrap_or_default()
    }

    /// Writes the settings into the host's extension settings object.
    ///
    /// # Errors
    ///
    /// Propagates host write failures.
    pub fn save<H: WorldInfoHost + ?Sized>(&self, host: &mut H, key: &str) -> Result<()> {
        tracing::debug!(key = %key, logic = ?self.sort_logic, direction = ?self.sort_direction, "saving sort settings");
        host.save_extension_settings(key, serde_json::to_value(self)?)
    }

    /// The preset these settings select.
    #[must_use]
    pub const fn preset(self) -> SortPreset {
        SortPreset::new(self.sort_logic, self.sort_direction)
    }
}

/// String key-value storage for small preferences, like browser local storage.
pub trait KeyValueStore {
    /// Stored value.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store persisted as one JSON object file, rewritten atomically on each set.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Opens the store file, starting empty if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is not a JSON string map.
    pub fn open(path: PathBuf) -> Result<Self> {
        let values = read_json::<BTreeMap<String, String>>(&path)?.unwrap_or_default();
        tracing::debug!(path = ?path, keys = values.len(), "preference store opened");
        Ok(Self { path, values })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_atomic(&self.path, &serde_json::to_string_pretty(&self.values)?)
    }
}

/// Persistent order helper controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderHelperPrefs {
    /// Order assigned to the first row.
    pub start: u32,
    /// Increment between rows.
    pub step: u32,
    /// Which end of the table gets `start`.
    pub direction: OrderDirection,
    /// Filter script text.
    pub filter: String,
}

impl Default for OrderHelperPrefs {
    fn default() -> Self {
        Self {
            start: 100,
            step: 10,
            direction: OrderDirection::Down,
            filter: DEFAULT_FILTER.to_string(),
        }
    }
}

impl OrderHelperPrefs {
    /// Reads the preferences, using defaults for missing or invalid values.
    #[must_use]
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        let defaults = Self::default();
        Self {
            start: store
                .get(ORDER_START_KEY)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.start),
            step: store
                .get(ORDER_STEP_KEY)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.step),
            direction: store
                .get(ORDER_DIRECTION_KEY)
                .and_then(|v| OrderDirection::parse(&v))
                .unwrap_or(defaults.direction),
            filter: store.get(ORDER_FILTER_KEY).unwrap_or(defaults.filter),
        }
    }

    /// Stores the start value.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn set_start<S: KeyValueStore + ?Sized>(&mut self, store: &mut S, start: u32) -> Result<()> {
        self.start = start;
        store.set(ORDER_START_KEY, &start.to_string())
    }

    /// Stores the step value.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn set_step<S: KeyValueStore + ?Sized>(&mut self, store: &mut S, step: u32) -> Result<()> {
        self.step = step;
        store.set(ORDER_STEP_KEY, &step.to_string())
    }

    /// Stores the direction.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn set_direction<S: KeyValueStore + ?Sized>(&mut self, store: &mut S, direction: OrderDirection) -> Result<()> {
        self.direction = direction;
        store.set(ORDER_DIRECTION_KEY, direction.as_str())
    }

    /// Stores the filter script.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn set_filter<S: KeyValueStore + ?Sized>(&mut self, store: &mut S, filter: &str) -> Result<()> {
        self.filter = filter.to_string();
        store.set(ORDER_FILTER_KEY, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    #[test]
    fn unknown_sort_logic_falls_back_to_default() {
        let mut host = MemoryHost::new();
        host.save_extension_settings(SETTINGS_KEY, serde_json::json!({"sortLogic": "tokens"}))
            .unwrap();
        assert_eq!(SortSettings::load(&host, SETTINGS_KEY), SortSettings::default());
    }

    #[test]
    fn sort_settings_use_host_wire_names() {
        let mut host = MemoryHost::new();
        let settings = SortSettings {
            sort_logic: SortCriterion::Alphabetical,
            sort_direction: SortDirection::Descending,
        };
        settings.save(&mut host, SETTINGS_KEY).unwrap();

        assert_eq!(
            host.extension_settings(SETTINGS_KEY),
            Some(serde_json::json!({"sortLogic": "alphabetical", "sortDirection": "descending"}))
        );
    }

    #[test]
    fn order_prefs_default_and_persist() {
        let mut store = MemoryStore::new();
        store.set(ORDER_STEP_KEY, "not a number").unwrap();
        let mut prefs = OrderHelperPrefs::load(&store);
        assert_eq!(prefs, OrderHelperPrefs::default());

        prefs.set_direction(&mut store, OrderDirection::Up).unwrap();
        prefs.set_start(&mut store, 5).unwrap();
        let reloaded = OrderHelperPrefs::load(&store);
        assert_eq!(reloaded.direction, OrderDirection::Up);
        assert_eq!(reloaded.start, 5);
        assert_eq!(store.get(ORDER_DIRECTION_KEY).as_deref(), Some("up"));
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs").join("local.json");
        let mut store = JsonFileStore::open(path.clone()).unwrap();
        store.set(ORDER_FILTER_KEY, "true").unwrap();

        let reopened = JsonFileStore::open(path).unwrap();
        assert_eq!(reopened.get(ORDER_FILTER_KEY).as_deref(), Some("true"));
    }
}
