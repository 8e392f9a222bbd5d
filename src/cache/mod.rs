//! Entry/book cache.
//!
//! The [`Cache`] mirrors the host's books and entries together with the view
//! handles that display them. It is the single answer to "what is currently
//! rendered": the reconciler diffs host snapshots against it, handlers read
//! the current entry from it, and saves serialize it back.
//!
//! # Lifecycle
//!
//! Created empty when the drawer mounts, filled by the initial list load,
//! cleared by an explicit refresh and dropped with the drawer.
//!
//! # Invariants
//!
//! - After a completed reconciliation pass the cached book names equal the
//!   host's book names.
//! - Every cached entry has exactly one set of [`EntryHandles`].
//! - Handles of unchanged books and entries survive reconciliation.

use crate::domain::error::{DrawerError, Result};
use crate::domain::{BookData, Entry, Uid};
use crate::view::NodeId;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// View handles of one entry row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHandles {
    /// Row root; clicking it opens the editor.
    pub root: NodeId,
    /// Multi-select checkbox.
    pub selector: NodeId,
    /// Title label.
    pub comment: NodeId,
    /// Keyword label.
    pub key: NodeId,
    /// Enabled toggle.
    pub enabled: NodeId,
    /// Strategy selector.
    pub strategy: NodeId,
}

/// View handles of one book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookHandles {
    /// Book root, child of the book list.
    pub root: NodeId,
    /// Title label; clicking it collapses or expands the book.
    pub title: NodeId,
    /// Active checkbox.
    pub active: NodeId,
    /// Container the entry rows live in.
    pub entries: NodeId,
}

/// One cached book.
#[derive(Debug, Clone)]
pub struct BookCache {
    /// Entry values, deep copies of the host snapshot.
    pub entries: BTreeMap<Uid, Entry>,
    /// Book-level handles.
    pub handles: BookHandles,
    /// Entry row handles, one per cached entry.
    pub rows: BTreeMap<Uid, EntryHandles>,
    /// Whether the entry list is collapsed.
    pub collapsed: bool,
    /// Top-level host fields other than the entries, written back on save.
    pub extra: Map<String, Value>,
}

impl BookCache {
    /// Creates a cached book with no rows yet.
    #[must_use]
    pub fn new(handles: BookHandles) -> Self {
        Self {
            entries: BTreeMap::new(),
            handles,
            rows: BTreeMap::new(),
            collapsed: true,
            extra: Map::new(),
        }
    }

    /// Snapshot in host form, for saving.
    #[must_use]
    pub fn to_data(&self) -> BookData {
        BookData {
            entries: self.entries.clone(),
            extra: self.extra.clone(),
        }
    }

    /// Row handles of an entry.
    #[must_use]
    pub fn row(&self, uid: &Uid) -> Option<&EntryHandles> {
        self.rows.get(uid)
    }
}

/// Books currently mirrored by the drawer.
#[derive(Debug, Clone, Default)]
pub struct Cache {
    books: BTreeMap<String, BookCache>,
}

impl Cache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a book is cached.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.books.contains_key(name)
    }

    /// Cached book names in byte order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.books.keys().cloned().collect()
    }

    /// Cached book names in display order (case-insensitive).
    #[must_use]
    pub fn display_names(&self) -> Vec<String> {
        let mut names = self.names();
        names.sort_by_key(|n| n.to_lowercase());
        names
    }

    /// Number of cached books.
    #[must_use]
    pub fn len(&self) -> usize {
        self.books.len()
    }

    /// Whether no book is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Cached book by name.
    #[must_use]
    pub fn book(&self, name: &str) -> Option<&BookCache> {
        self.books.get(name)
    }

    /// Cached book by name, or [`DrawerError::UnknownBook`].
    ///
    /// # Errors
    ///
    /// Fails if the book is not cached.
    pub fn require(&self, name: &str) -> Result<&BookCache> {
        self.books
            .get(name)
            .ok_or_else(|| DrawerError::UnknownBook(name.to_string()))
    }

    /// Mutable cached book, or [`DrawerError::UnknownBook`].
    ///
    /// # Errors
    ///
    /// Fails if the book is not cached.
    pub fn require_mut(&mut self, name: &str) -> Result<&mut BookCache> {
        self.books
            .get_mut(name)
            .ok_or_else(|| DrawerError::UnknownBook(name.to_string()))
    }

    /// Cached entry value.
    #[must_use]
    pub fn entry(&self, book: &str, uid: &Uid) -> Option<&Entry> {
        self.books.get(book).and_then(|b| b.entries.get(uid))
    }

    /// Mutable cached entry, or [`DrawerError::UnknownEntry`].
    ///
    /// # Errors
    ///
    /// Fails if the book or entry is not cached.
    pub fn entry_mut(&mut self, book: &str, uid: &Uid) -> Result<&mut Entry> {
        self.require_mut(book)?
            .entries
            .get_mut(uid)
            .ok_or_else(|| DrawerError::UnknownEntry {
                book: book.to_string(),
                uid: uid.to_string(),
            })
    }

    /// Row handles of an entry, or [`DrawerError::UnknownEntry`].
    ///
    /// # Errors
    ///
    /// Fails if the book or entry row is not cached.
    pub fn row(&self, book: &str, uid: &Uid) -> Result<EntryHandles> {
        self.require(book)?
            .rows
            .get(uid)
            .copied()
            .ok_or_else(|| DrawerError::UnknownEntry {
                book: book.to_string(),
                uid: uid.to_string(),
            })
    }

    /// Stores a book, replacing any previous one with the same name.
    pub fn insert(&mut self, name: &str, book: BookCache) {
        self.books.insert(name.to_string(), book);
    }

    /// Removes a book.
    pub fn remove(&mut self, name: &str) -> Option<BookCache> {
        self.books.remove(name)
    }

    /// Drops every cached book.
    pub fn clear(&mut self) {
        self.books.clear();
    }

    /// Iterates over cached books in byte order of their names.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BookCache)> {
        self.books.iter()
    }

    /// Finds the first cached book whose name sorts after `name` in display
    /// order; new books are inserted before it.
    #[must_use]
    pub fn next_book_after(&self, name: &str) -> Option<&BookCache> {
        let key = name.to_lowercase();
        self.display_names()
            .into_iter()
            .find(|n| n.to_lowercase() > key)
            .and_then(|n| self.books.get(&n))
    }

    /// Locates the entry that owns a row root.
    #[must_use]
    pub fn locate_row(&self, node: NodeId) -> Option<(String, Uid)> {
        self.books.iter().find_map(|(name, book)| {
            book.rows
                .iter()
                .find(|(_, handles)| handles.root == node)
                .map(|(uid, _)| (name.clone(), uid.clone()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{View, ViewTree};

    fn handles(tree: &mut ViewTree) -> BookHandles {
        BookHandles {
            root: tree.create("div"),
            title: tree.create("div"),
            active: tree.create("input"),
            entries: tree.create("div"),
        }
    }

    #[test]
    fn next_book_after_uses_case_insensitive_order() {
        let mut tree = ViewTree::new();
        let mut cache = Cache::new();
        for name in ["alpha", "Charlie", "delta"] {
            cache.insert(name, BookCache::new(handles(&mut tree)));
        }

        let next = cache.next_book_after("Bravo").map(|b| b.handles.root);
        assert_eq!(next, cache.book("Charlie").map(|b| b.handles.root));
        assert!(cache.next_book_after("zulu").is_none());
        assert_eq!(cache.display_names(), vec!["alpha", "Charlie", "delta"]);
    }

    #[test]
    fn missing_lookups_name_the_culprit() {
        let cache = Cache::new();
        assert!(matches!(cache.require("Lore"), Err(DrawerError::UnknownBook(n)) if n == "Lore"));

        let mut tree = ViewTree::new();
        let mut cache = Cache::new();
        cache.insert("Lore", BookCache::new(handles(&mut tree)));
        assert!(matches!(
            cache.row("Lore", &Uid::from(7)),
            Err(DrawerError::UnknownEntry { uid, .. }) if uid == "7"
        ));
    }

    #[test]
    fn to_data_keeps_book_level_fields() {
        let mut tree = ViewTree::new();
        let mut book = BookCache::new(handles(&mut tree));
        book.extra.insert("name".to_string(), Value::from("Lore"));

        let data = book.to_data();
        assert_eq!(data.extra.get("name"), Some(&Value::from("Lore")));
        assert!(data.entries.is_empty());
    }
}
