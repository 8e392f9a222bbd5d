//! In-memory host.
//!
//! [`MemoryHost`] keeps every book in a map and records each save in a
//! journal. It backs embedders that hold world info in memory and is the host
//! used by the test suite, where "exactly one save per book" is asserted
//! against the journal.

use super::{HostNotification, WorldInfoHost};
use crate::domain::error::{DrawerError, Result};
use crate::domain::BookData;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One recorded save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRecord {
    /// Book that was saved.
    pub book: String,
    /// Number of entries in the saved snapshot.
    pub entries: usize,
    /// Whether the save was silent.
    pub silent: bool,
}

/// Host keeping books in memory.
#[derive(Debug, Default)]
pub struct MemoryHost {
    books: BTreeMap<String, BookData>,
    active: Vec<String>,
    settings: Map<String, Value>,
    saves: Vec<SaveRecord>,
    pending: Vec<HostNotification>,
    reject_saves: bool,
}

impl MemoryHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a host holding the given books.
    #[must_use]
    pub fn with_books(books: impl IntoIterator<Item = (String, BookData)>) -> Self {
        Self {
            books: books.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Replaces a book without raising a notification.
    ///
    /// Models a change made behind the drawer's back, before the host gets
    /// around to signalling it.
    pub fn put_book(&mut self, name: &str, data: BookData) {
        self.books.insert(name.to_string(), data);
    }

    /// Drops a book without raising a notification.
    pub fn remove_book(&mut self, name: &str) -> Option<BookData> {
        self.active.retain(|n| n != name);
        self.books.remove(name)
    }

    /// Every save since creation, oldest first.
    #[must_use]
    pub fn saves(&self) -> &[SaveRecord] {
        &self.saves
    }

    /// Number of saves recorded for `book`.
    #[must_use]
    pub fn save_count(&self, book: &str) -> usize {
        self.saves.iter().filter(|s| s.book == book).count()
    }

    /// Forgets the save journal.
    pub fn clear_saves(&mut self) {
        self.saves.clear();
    }

    /// Makes subsequent saves fail until switched off again.
    pub fn set_reject_saves(&mut self, reject: bool) {
        self.reject_saves = reject;
    }
}

impl WorldInfoHost for MemoryHost {
    fn world_names(&self) -> Result<Vec<String>> {
        Ok(self.books.keys().cloned().collect())
    }

    fn selected_world_info(&self) -> Vec<String> {
        self.active.clone()
    }

    fn load_world_info(&self, name: &str) -> Result<BookData> {
        self.books
            .get(name)
            .cloned()
            .ok_or_else(|| DrawerError::UnknownBook(name.to_string()))
    }

    fn save_world_info(&mut self, name: &str, data: &BookData, silent: bool) -> Result<()> {
        if self.reject_saves {
            return Err(DrawerError::Host(format!("save of {name} rejected")));
        }
        self.books.insert(name.to_string(), data.clone());
        self.saves.push(SaveRecord {
            book: name.to_string(),
            entries: data.entries.len(),
            silent,
        });
        self.pending.push(HostNotification::WorldInfoUpdated {
            book: name.to_string(),
            data: data.clone(),
        });
        Ok(())
    }

    fn create_world_info(&mut self, name: &str) -> Result<bool> {
        if self.books.contains_key(name) {
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
        self.pending.push(HostNotification::WorldInfoSettingsUpdated);
        Ok(())
    }

    fn extension_settings(&self, key: &str) -> Option<Value> {
        self.settings.get(key).cloned()
    }

    fn save_extension_settings(&mut self, key: &str, value: Value) -> Result<()> {
        self.settings.insert(key.to_string(), value);
        Ok(())
    }

    fn drain_notifications(&mut self) -> Vec<HostNotification> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Entry, Uid};

    #[test]
    fn journal_counts_saves_per_book() {
        let mut host = MemoryHost::new();
        host.save_world_info("A", &BookData::default(), true).unwrap();
        host.save_world_info("B", &BookData::default(), false).unwrap();
        host.save_world_info("A", &BookData::default(), true).unwrap();

        assert_eq!(host.save_count("A"), 2);
        assert_eq!(host.save_count("B"), 1);
        assert_eq!(host.drain_notifications().len(), 3);
    }

    #[test]
    fn rejected_saves_leave_books_untouched() {
        let mut host = MemoryHost::with_books([("A".to_string(), BookData::default())]);
        host.set_reject_saves(true);
        let data = BookData::from_entries([Entry::new(Uid::from(0))]);

        assert!(matches!(host.save_world_info("A", &data, true), Err(DrawerError::Host(_))));
        assert!(host.load_world_info("A").unwrap().entries.is_empty());
        assert!(host.saves().is_empty());
    }

    #[test]
    fn free_world_name_skips_taken_names() {
        let mut host = MemoryHost::new();
        host.create_world_info("New World (1)").unwrap();
        assert_eq!(host.free_world_name().unwrap(), "New World (2)");
    }
}
