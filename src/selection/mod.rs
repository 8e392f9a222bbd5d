//! Multi-select of entries within one book, with drag move/copy and delete.
//!
//! # State Machine
//!
//! ```text
//!        selector click              last entry deselected / drop / delete
//!  Idle ────────────────▶ Selecting ─────────────────────────────────────▶ Idle
//!                          │    ▲
//!                          └────┘ click / shift-click in the source book
//! ```
//!
//! Only entries of the source book can join a selection; clicks on selectors
//! of other books are ignored. Selected rows are the only draggable rows.

use crate::cache::Cache;
use crate::domain::error::Result;
use crate::domain::{BookData, Entry, Uid};
use crate::host::WorldInfoHost;
use crate::render::class;
use crate::view::{NodeId, View, ViewPatch};

/// Title of the help toast shown while selecting.
pub const HELP_TITLE: &str = "WorldInfo Drawer";

/// Lines of the help toast shown while selecting.
pub const HELP_LINES: [&str; 5] = [
    "Hold [SHIFT] while clicking to select a range of entries",
    "Drag the selected entries onto another book to move them to that book",
    "Hold [CTRL] while dragging entries to copy them to the targeted book",
    "Hold [CTRL] while dragging entries onto the same book to duplicate them",
    "Press [DEL] to delete the selected entries",
];

/// An active selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Book the entries belong to.
    pub source: String,
    /// Value copies of the selected entries, in selection order.
    pub entries: Vec<Entry>,
    /// Entry clicked last, anchor of shift ranges.
    pub last: Option<Uid>,
}

impl Selection {
    /// Whether `uid` is selected.
    #[must_use]
    pub fn contains(&self, uid: &Uid) -> bool {
        self.entries.iter().any(|e| &e.uid == uid)
    }
}

/// Result of a selector click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Click on another book while selecting.
    Ignored,
    /// First entry selected; the help toast should be shown.
    Started,
    /// Entries added, either one or a shift range.
    Added(usize),
    /// Entry deselected; the selection continues.
    Removed,
    /// Last entry deselected; the selection ended.
    Ended,
}

/// Entries moved or copied by a drop.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    /// Source snapshot after deletion, when the source differs from the
    /// destination.
    pub source: Option<(String, BookData)>,
    /// Destination snapshot with the new entries.
    pub destination: (String, BookData),
}

/// Selection state of the drawer.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    current: Option<Selection>,
}

impl SelectionController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The active selection.
    #[must_use]
    pub const fn current(&self) -> Option<&Selection> {
        self.current.as_ref()
    }

    /// Whether a selection is active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Handles a click on an entry's selector.
    ///
    /// A plain click toggles the entry. A shift click with an anchor selects
    /// the contiguous rows between the anchor and the clicked row, in either
    /// direction, and moves the anchor.
    ///
    /// # Errors
    ///
    /// Fails if the book or entry is not cached or a row node is stale.
    pub fn click<V: View>(&mut self, view: &mut V, cache: &Cache, book: &str, uid: &Uid, shift: bool) -> Result<ClickOutcome> {
        if let Some(selection) = &self.current {
            if selection.source != book {
                tracing::debug!(book = %book, source = %selection.source, "selector click outside source book");
                return Ok(ClickOutcome::Ignored);
            }
        }

        let anchor = self.current.as_ref().and_then(|s| s.last.clone());
        match (anchor, shift) {
            (Some(anchor), true) => self.extend(view, cache, book, &anchor, uid),
            _ => self.toggle(view, cache, book, uid),
        }
    }

    fn toggle<V: View>(&mut self, view: &mut V, cache: &Cache, book: &str, uid: &Uid) -> Result<ClickOutcome> {
        let row = cache.row(book, uid)?;
        let started = self.current.is_none();
        let selection = self.current.get_or_insert_with(|| Selection {
            source: book.to_string(),
            entries: Vec::new(),
            last: None,
        });

        if selection.contains(uid) {
            selection.entries.retain(|e| &e.uid != uid);
            if selection.last.as_ref() == Some(uid) {
                selection.last = None;
            }
            mark(view, row.root, row.selector, false)?;
            if selection.entries.is_empty() {
                self.current = None;
                tracing::debug!(book = %book, "selection emptied");
                return Ok(ClickOutcome::Ended);
            }
            return Ok(ClickOutcome::Removed);
        }

        let entry = cache.entry(book, uid).cloned();
        if let Some(entry) = entry {
            selection.entries.push(entry);
        }
        selection.last = Some(uid.clone());
        mark(view, row.root, row.selector, true)?;

        tracing::debug!(book = %book, uid = %uid, selected = selection.entries.len(), "entry selected");
        Ok(if started { ClickOutcome::Started } else { ClickOutcome::Added(1) })
    }

    fn extend<V: View>(&mut self, view: &mut V, cache: &Cache, book: &str, anchor: &Uid, uid: &Uid) -> Result<ClickOutcome> {
        let cached = cache.require(book)?;
        let rows = view.children(cached.handles.entries)?;
        let position = |target: &Uid| {
            cached
                .rows
                .get(target)
                .and_then(|handles| rows.iter().position(|n| *n == handles.root))
        };
        let (Some(start), Some(end)) = (position(anchor), position(uid)) else {
            return self.toggle(view, cache, book, uid);
        };

        let Some(selection) = self.current.as_mut() else {
            return Ok(ClickOutcome::Ignored);
        };
        let mut added = 0;
        for node in &rows[start.min(end)..=start.max(end)] {
            let Some((row_uid, handles)) = cached.rows.iter().find(|(_, h)| h.root == *node) else {
                continue;
            };
            if selection.contains(row_uid) {
                continue;
            }
            if let Some(entry) = cached.entries.get(row_uid) {
                selection.entries.push(entry.clone());
                mark(view, handles.root, handles.selector, true)?;
                added += 1;
            }
        }
        selection.last = Some(uid.clone());

        tracing::debug!(book = %book, added, selected = selection.entries.len(), "range selected");
        Ok(ClickOutcome::Added(added))
    }

    /// Ends the selection, unmarking rows and drop targets.
    ///
    /// Returns whether a selection was active (and its toast must be hidden).
    ///
    /// # Errors
    ///
    /// Fails if a cached node is stale.
    pub fn end<V: View>(&mut self, view: &mut V, cache: &Cache, books: NodeId) -> Result<bool> {
        let Some(selection) = self.current.take() else {
            return Ok(false);
        };

        view.update(books, ViewPatch::remove_class(class::DRAGGING))?;
        if let Some(book) = cache.book(&selection.source) {
            for entry in &selection.entries {
                if let Some(row) = book.rows.get(&entry.uid) {
                    mark(view, row.root, row.selector, false)?;
                }
            }
        }
        for (_, book) in cache.iter() {
            view.update(book.handles.root, ViewPatch::remove_class(class::TARGET))?;
        }

        tracing::debug!(book = %selection.source, selected = selection.entries.len(), "selection ended");
        Ok(true)
    }

    /// Starts dragging `uid`; refused unless the entry is selected.
    ///
    /// # Errors
    ///
    /// Fails if the list node is stale.
    pub fn drag_start<V: View>(&self, view: &mut V, books: NodeId, uid: &Uid) -> Result<bool> {
        let allowed = self.current.as_ref().is_some_and(|s| s.contains(uid));
        if allowed {
            view.update(books, ViewPatch::add_class(class::DRAGGING))?;
        }
        Ok(allowed)
    }

    /// Marks or unmarks a book as the hovered drop target.
    ///
    /// # Errors
    ///
    /// Fails if the book is not cached.
    pub fn drag_hover<V: View>(&self, view: &mut V, cache: &Cache, book: &str, over: bool) -> Result<()> {
        if self.current.is_none() {
            return Ok(());
        }
        let root = cache.require(book)?.handles.root;
        view.update(root, ViewPatch::class(class::TARGET, over))
    }
}

/// Applies the selected-state marks to a row and its selector.
fn mark<V: View>(view: &mut V, root: NodeId, selector: NodeId, on: bool) -> Result<()> {
    view.update(root, ViewPatch::class(class::SELECTED, on))?;
    view.update(root, ViewPatch::SetDraggable(on))?;
    view.update(selector, ViewPatch::class(class::CHECKED, on))?;
    view.update(selector, ViewPatch::class(class::UNCHECKED, !on))
}

/// Moves or copies entries into `destination`.
///
/// Each entry is recreated in the destination with a fresh uid and all other
/// fields copied. Unless copying, the originals are deleted from the source.
/// The destination is saved once; a move also saves the source once. Dropping
/// onto the source book without copying does nothing.
///
/// # Errors
///
/// Propagates host load, allocation, delete and save failures. Books saved
/// before a failure stay saved.
pub fn transfer<H>(host: &mut H, source: &str, entries: &[Entry], destination: &str, copy: bool) -> Result<Option<Transfer>>
where
    H: WorldInfoHost + ?Sized,
{
    if source == destination && !copy {
        return Ok(None);
    }

    let mut src = host.load_world_info(source)?;
    let mut dst = host.load_world_info(destination)?;

    for entry in entries {
        let created = host.create_world_info_entry(destination, &mut dst)?;
        let copied = Entry {
            uid: created.uid.clone(),
            ..entry.clone()
        };
        dst.entries.insert(created.uid, copied);
        if !copy {
            host.delete_world_info_entry(&mut src, &entry.uid, true)?;
        }
    }

    host.save_world_info(destination, &dst, true)?;
    let source = if copy || source == destination {
        None
    } else {
        host.save_world_info(source, &src, true)?;
        Some((source.to_string(), src))
    };

    tracing::debug!(destination = %destination, entries = entries.len(), copy, "entries transferred");
    Ok(Some(Transfer {
        source,
        destination: (destination.to_string(), dst),
    }))
}

/// Deletes entries from `source` and saves it once.
///
/// # Errors
///
/// Propagates host load, delete and save failures.
pub fn delete<H>(host: &mut H, source: &str, entries: &[Entry]) -> Result<BookData>
where
    H: WorldInfoHost + ?Sized,
{
    let mut data = host.load_world_info(source)?;
    let mut deleted = 0;
    for entry in entries {
        if host.delete_world_info_entry(&mut data, &entry.uid, true)? {
            deleted += 1;
        }
    }
    host.save_world_info(source, &data, true)?;
    tracing::debug!(book = %source, deleted, "entries deleted");
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BookCache;
    use crate::host::MemoryHost;
    use crate::render;
    use crate::view::ViewTree;

    fn setup(books: &[(&str, &[u64])]) -> (ViewTree, Cache, NodeId) {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let list = render::element(&mut tree, root, "div", &[]).unwrap();
        let mut cache = Cache::new();
        for (name, uids) in books {
            let handles = render::render_book(&mut tree, list, name, false, None).unwrap();
            let mut book = BookCache::new(handles);
            for uid in *uids {
                let entry = Entry::new(Uid::from(*uid));
                let row = render::render_entry(&mut tree, handles.entries, name, &entry, None).unwrap();
                book.rows.insert(entry.uid.clone(), row);
                book.entries.insert(entry.uid.clone(), entry);
            }
            cache.insert(name, book);
        }
        (tree, cache, list)
    }

    fn selected(controller: &SelectionController) -> Vec<Uid> {
        controller
            .current()
            .map(|s| s.entries.iter().map(|e| e.uid.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn toggling_the_last_entry_ends_the_selection() {
        let (mut tree, cache, _) = setup(&[("Lore", &[1, 2])]);
        let mut sel = SelectionController::new();
        let one = Uid::from(1);

        assert_eq!(sel.click(&mut tree, &cache, "Lore", &one, false).unwrap(), ClickOutcome::Started);
        let row = cache.row("Lore", &one).unwrap();
        assert!(tree.has_class(row.root, class::SELECTED));
        assert!(tree.is_draggable(row.root));

        assert_eq!(sel.click(&mut tree, &cache, "Lore", &one, false).unwrap(), ClickOutcome::Ended);
        assert!(!sel.is_active());
        assert!(tree.has_class(row.selector, class::UNCHECKED));
    }

    #[test]
    fn shift_range_works_backwards() {
        let (mut tree, cache, _) = setup(&[("Lore", &[1, 2, 3, 4, 5])]);
        let mut sel = SelectionController::new();

        sel.click(&mut tree, &cache, "Lore", &Uid::from(4), false).unwrap();
        let outcome = sel.click(&mut tree, &cache, "Lore", &Uid::from(2), true).unwrap();

        assert_eq!(outcome, ClickOutcome::Added(2));
        assert_eq!(selected(&sel), vec![Uid::from(4), Uid::from(2), Uid::from(3)]);
        assert_eq!(sel.current().unwrap().last, Some(Uid::from(2)));
    }

    #[test]
    fn other_books_are_ignored_and_end_clears_marks() {
        let (mut tree, cache, list) = setup(&[("Lore", &[1]), ("Misc", &[1])]);
        let mut sel = SelectionController::new();
        sel.click(&mut tree, &cache, "Lore", &Uid::from(1), false).unwrap();

        assert_eq!(sel.click(&mut tree, &cache, "Misc", &Uid::from(1), false).unwrap(), ClickOutcome::Ignored);
        assert!(sel.drag_start(&mut tree, list, &Uid::from(1)).unwrap());
        sel.drag_hover(&mut tree, &cache, "Misc", true).unwrap();

        assert!(sel.end(&mut tree, &cache, list).unwrap());
        assert!(!tree.has_class(list, class::DRAGGING));
        assert!(!tree.has_class(cache.book("Misc").unwrap().handles.root, class::TARGET));
        assert!(!tree.is_draggable(cache.row("Lore", &Uid::from(1)).unwrap().root));
    }

    #[test]
    fn move_deletes_from_source_and_saves_each_book_once() {
        let src = BookData::from_entries([Entry::new(Uid::from(0)), Entry::new(Uid::from(1))]);
        let dst = BookData::from_entries([Entry::new(Uid::from(0))]);
        let mut host = MemoryHost::with_books([("A".to_string(), src.clone()), ("B".to_string(), dst)]);
        let moving: Vec<Entry> = src.entries.values().cloned().collect();

        let done = transfer(&mut host, "A", &moving, "B", false).unwrap().unwrap();

        assert!(done.source.as_ref().unwrap().1.entries.is_empty());
        assert_eq!(done.destination.1.entries.len(), 3);
        assert_eq!(host.save_count("A"), 1);
        assert_eq!(host.save_count("B"), 1);
        assert!(transfer(&mut host, "B", &moving, "B", false).unwrap().is_none());
    }

    #[test]
    fn copy_onto_source_duplicates() {
        let src = BookData::from_entries([Entry::new(Uid::from(0))]);
        let mut host = MemoryHost::with_books([("A".to_string(), src.clone())]);
        let copying: Vec<Entry> = src.entries.values().cloned().collect();

        let done = transfer(&mut host, "A", &copying, "A", true).unwrap().unwrap();

        assert!(done.source.is_none());
        assert_eq!(host.load_world_info("A").unwrap().entries.len(), 2);
        assert_eq!(delete(&mut host, "A", &copying).unwrap().entries.len(), 1);
    }
}
