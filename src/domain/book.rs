//! Book snapshot model.
//!
//! [`BookData`] is the full snapshot the host loads and saves: a mapping of
//! entry uid → [`Entry`] plus any other top-level fields the host keeps in the
//! book file.

use crate::domain::entry::{Entry, Uid};
use crate::domain::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Full snapshot of one book as exchanged with the host.
///
/// # File Format
///
/// ```json
/// {
///   "entries": {
///     "0": { "uid": 0, "key": ["dragon"], "comment": "Dragons", "order": 100 },
///     "1": { "uid": 1, "key": ["castle"], "comment": "", "order": 90 }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookData {
    /// Entries keyed by uid.
    #[serde(default)]
    pub entries: BTreeMap<Uid, Entry>,

    /// Other top-level host fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BookData {
    /// Builds a snapshot from a list of entries, keyed by their own uid.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.uid.clone(), e)).collect(),
            extra: Map::new(),
        }
    }

    /// Smallest numeric uid not used by any entry.
    #[must_use]
    pub fn free_uid(&self) -> Uid {
        let mut candidate = 0_u64;
        while self.entries.contains_key(&Uid::Number(candidate)) {
            candidate += 1;
        }
        Uid::Number(candidate)
    }

    /// Allocates a fresh entry with default fields and stores it.
    ///
    /// Returns a copy of the stored entry.
    pub fn allocate_entry(&mut self) -> Entry {
        let entry = Entry::new(self.free_uid());
        self.entries.insert(entry.uid.clone(), entry.clone());
        entry
    }

    /// Pretty-printed export document (`{"entries": {...}}`).
    ///
    /// # Errors
    ///
    /// Returns a serialization error if a preserved field is not representable.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&serde_json::json!({ "entries": self.entries }))?)
    }
}
