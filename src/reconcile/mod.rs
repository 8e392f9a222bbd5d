//! Incremental reconciliation of the cache and view against host state.
//!
//! A pass compares the host's book list with the cache and, when a changed
//! book is named, that book's entries with the incoming snapshot. Only the
//! difference touches the view:
//!
//! 1. Books gone from the host are removed (closing the editor if it showed
//!    one of their entries).
//! 2. New books are rendered at their case-insensitive alphabetical position.
//! 3. For the changed book, removed entries are torn down, added entries are
//!    rendered one by one at their sorted position, and entries present on
//!    both sides are diffed field by field.
//! 4. Changed fields patch the existing label, toggle or selector, and request
//!    an editor refresh when the open form does not already show the value.
//! 5. The book is resorted only if something changed and the rendered order
//!    actually differs from the sorted order.
//!
//! Running a pass twice with the same host state performs no view mutation on
//! the second run, and unchanged entries keep their nodes.
//!
//! # Debouncing
//!
//! Host notifications are collapsed by a [`Debouncer`] before they reach
//! [`run_pass`]; drawer-internal operations call it directly.

pub mod debounce;

pub use debounce::{Debouncer, FollowUp, PassSignals};

use crate::cache::{BookCache, Cache};
use crate::domain::error::{DrawerError, Result};
use crate::domain::{sort_needed, BookData, EntryField, SortPreset, Uid};
use crate::editor::{EditorHost, EditorSlot};
use crate::host::WorldInfoHost;
use crate::render::{self, class};
use crate::view::{NodeId, View, ViewPatch};
use std::collections::BTreeSet;

/// What a pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Books removed from the cache and view.
    pub removed_books: Vec<String>,
    /// Books rendered during the pass.
    pub added_books: Vec<String>,
    /// Entries removed from the changed book.
    pub removed_entries: Vec<Uid>,
    /// Entries added to the changed book.
    pub added_entries: Vec<Uid>,
    /// Entries of the changed book with at least one differing field.
    pub changed_entries: Vec<Uid>,
    /// Whether the changed book's rows were re-appended in sorted order.
    pub reordered: bool,
    /// Whether the open editor must be rebuilt from the cache.
    pub refresh_editor: bool,
    /// Whether the open editor was closed because its entry disappeared.
    pub closed_editor: bool,
}

impl PassReport {
    /// Whether the pass left cache and view untouched.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.removed_books.is_empty()
            && self.added_books.is_empty()
            && self.removed_entries.is_empty()
            && self.added_entries.is_empty()
            && self.changed_entries.is_empty()
            && !self.reordered
            && !self.closed_editor
    }
}

/// Where and how the book list is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListTarget {
    /// Book list container.
    pub books: NodeId,
    /// Sort preset for entry rows.
    pub preset: SortPreset,
}

/// Runs one reconciliation pass.
///
/// # Parameters
///
/// * `host` - Source of the book list and of snapshots for new books
/// * `view` - Rendering backend
/// * `cache` - Drawer cache, updated in place
/// * `editor` - Panel slot, closed when its entry disappears
/// * `target` - Book list container and sort preset
/// * `changed` - Book named by the triggering notification, with its snapshot
///
/// # Returns
///
/// A [`PassReport`]; callers rebuild the editor when `refresh_editor` is set.
///
/// # Errors
///
/// Propagates host read failures and stale view handles. The pass stops at the
/// first failure; whatever was applied until then stays applied.
pub fn run_pass<H, V>(
    host: &H,
    view: &mut V,
    cache: &mut Cache,
    editor: &mut EditorHost,
    target: ListTarget,
    changed: Option<(&str, &BookData)>,
) -> Result<PassReport>
where
    H: WorldInfoHost + ?Sized,
    V: View,
{
    let _span = tracing::debug_span!("reconcile", changed = ?changed.map(|(name, _)| name)).entered();
    let mut report = PassReport::default();
    let names = host.world_names()?;

    for name in cache.names() {
        if names.contains(&name) {
            continue;
        }
        if editor.close_if_showing(view, &name, None)? {
            report.closed_editor = true;
        }
        if let Some(book) = cache.remove(&name) {
            view.remove(book.handles.root)?;
        }
        tracing::debug!(book = %name, "book removed");
        report.removed_books.push(name);
    }

    let active = host.selected_world_info();
    for name in &names {
        if cache.contains(name) {
            continue;
        }
        let data = match changed {
            Some((changed_name, data)) if changed_name == name => data.clone(),
            _ => host.load_world_info(name)?,
        };
        add_book(view, cache, target, name, &data, active.contains(name))?;
        report.added_books.push(name.clone());
    }

    if let Some((name, data)) = changed {
        if cache.contains(name) && !report.added_books.iter().any(|n| n == name) {
            diff_book(view, cache, editor, target.preset, name, data, &mut report)?;
        }
    }

    tracing::debug!(
        removed_books = report.removed_books.len(),
        added_books = report.added_books.len(),
        removed_entries = report.removed_entries.len(),
        added_entries = report.added_entries.len(),
        changed_entries = report.changed_entries.len(),
        reordered = report.reordered,
        refresh_editor = report.refresh_editor,
        "pass finished"
    );
    Ok(report)
}

/// Renders every host book in display order into an empty list.
///
/// # Errors
///
/// Propagates host read failures and stale view handles.
pub fn load_list<H, V>(host: &H, view: &mut V, cache: &mut Cache, target: ListTarget) -> Result<usize>
where
    H: WorldInfoHost + ?Sized,
    V: View,
{
    let mut names = host.world_names()?;
    names.sort_by_key(|n| n.to_lowercase());
    let active = host.selected_world_info();

    for name in &names {
        if cache.contains(name) {
            continue;
        }
        let data = host.load_world_info(name)?;
        add_book(view, cache, target, name, &data, active.contains(name))?;
    }

    tracing::debug!(books = names.len(), "book list loaded");
    Ok(names.len())
}

/// Renders a book with all its entries and stores it in the cache.
///
/// The book is inserted before the first cached book that sorts after it
/// case-insensitively, or appended.
///
/// # Errors
///
/// Fails if the list container is stale.
pub fn add_book<V: View>(
    view: &mut V,
    cache: &mut Cache,
    target: ListTarget,
    name: &str,
    data: &BookData,
    active: bool,
) -> Result<()> {
    let before = cache.next_book_after(name).map(|b| b.handles.root);
    let handles = render::render_book(view, target.books, name, active, before)?;
    let mut book = BookCache::new(handles);
    book.extra = data.extra.clone();

    for entry in target.preset.sort(data.entries.values()) {
        let row = render::render_entry(view, handles.entries, name, entry, None)?;
        book.rows.insert(entry.uid.clone(), row);
        book.entries.insert(entry.uid.clone(), entry.clone());
    }

    tracing::debug!(book = %name, entries = book.entries.len(), active, "book added");
    cache.insert(name, book);
    Ok(())
}

/// Re-appends a book's rows in sorted order if the rendered order differs.
///
/// Returns whether any row moved.
///
/// # Errors
///
/// Fails if the book is not cached or its container is stale.
pub fn resort_book<V: View>(view: &mut V, cache: &Cache, name: &str, preset: SortPreset) -> Result<bool> {
    let book = cache.require(name)?;
    let sorted: Vec<NodeId> = preset
        .sort(book.entries.values())
        .into_iter()
        .filter_map(|e| book.rows.get(&e.uid).map(|row| row.root))
        .collect();
    let current = view.children(book.handles.entries)?;

    if !sort_needed(&current, &sorted) {
        return Ok(false);
    }
    for node in sorted {
        view.append(book.handles.entries, node)?;
    }
    tracing::debug!(book = %name, "rows reordered");
    Ok(true)
}

/// Whether an open editor for the entry shows something other than `value`.
fn visible_differs(open: Option<&EditorSlot>, field: &EntryField, value: &str) -> bool {
    open.is_some_and(|slot| slot.form.as_ref().and_then(|form| form.value(field)) != Some(value))
}

fn diff_book<V: View>(
    view: &mut V,
    cache: &mut Cache,
    editor: &mut EditorHost,
    preset: SortPreset,
    name: &str,
    data: &BookData,
    report: &mut PassReport,
) -> Result<()> {
    let incoming = &data.entries;
    cache.require_mut(name)?.extra = data.extra.clone();

    let removed: Vec<Uid> = cache
        .require(name)?
        .entries
        .keys()
        .filter(|uid| !incoming.contains_key(*uid))
        .cloned()
        .collect();
    for uid in removed {
        let book = cache.require_mut(name)?;
        book.entries.remove(&uid);
        if let Some(row) = book.rows.remove(&uid) {
            view.remove(row.root)?;
        }
        if editor.close_if_showing(view, name, Some(&uid))? {
            report.closed_editor = true;
        }
        tracing::debug!(book = %name, uid = %uid, "entry removed");
        report.removed_entries.push(uid);
    }

    for (uid, entry) in incoming {
        let book = cache.require(name)?;
        if book.entries.contains_key(uid) {
            continue;
        }
        let sorted = preset.sort(book.entries.values().chain(std::iter::once(entry)));
        let before = sorted
            .iter()
            .position(|e| std::ptr::eq(*e, entry))
            .and_then(|i| sorted.get(i + 1))
            .and_then(|next| book.rows.get(&next.uid))
            .map(|row| row.root);
        let container = book.handles.entries;

        let row = render::render_entry(view, container, name, entry, before)?;
        let book = cache.require_mut(name)?;
        book.rows.insert(uid.clone(), row);
        book.entries.insert(uid.clone(), entry.clone());
        tracing::debug!(book = %name, uid = %uid, "entry added");
        report.added_entries.push(uid.clone());
    }

    for (uid, new) in incoming {
        let old = cache
            .entry(name, uid)
            .cloned()
            .ok_or_else(|| DrawerError::UnknownEntry {
                book: name.to_string(),
                uid: uid.to_string(),
            })?;
        if &old == new {
            continue;
        }

        let row = cache.row(name, uid)?;
        let old_fields = old.to_fields()?;
        let new_fields = new.to_fields()?;
        let keys: BTreeSet<&String> = old_fields.keys().chain(new_fields.keys()).collect();
        let open = editor.editor().filter(|slot| slot.shows(name, uid));
        let mut refresh = false;

        for key in keys {
            if old_fields.get(key) == new_fields.get(key) {
                continue;
            }
            let field = EntryField::from_name(key);
            match &field {
                EntryField::Comment => {
                    view.update(row.comment, ViewPatch::SetText(new.comment.clone()))?;
                    refresh |= visible_differs(open, &field, &new.comment);
                }
                EntryField::Key => {
                    view.update(row.key, ViewPatch::SetText(new.keywords()))?;
                    refresh |= visible_differs(open, &field, &new.keywords());
                }
                EntryField::Content => {
                    refresh |= visible_differs(open, &field, &new.content);
                }
                EntryField::Disable => {
                    render::set_toggle(view, row.enabled, !new.disable)?;
                    refresh |= open.is_some();
                }
                EntryField::Constant | EntryField::Vectorized => {
                    view.update(row.strategy, ViewPatch::SetValue(new.strategy().as_str().to_string()))?;
                    refresh |= open.is_some();
                }
                EntryField::Other(_) => {
                    refresh |= visible_differs(open, &field, &new.display_value(&field)?);
                }
            }
        }

        cache.require_mut(name)?.entries.insert(uid.clone(), new.clone());
        tracing::debug!(book = %name, uid = %uid, refresh, "entry changed");
        report.refresh_editor |= refresh;
        report.changed_entries.push(uid.clone());
    }

    if !report.added_entries.is_empty() || !report.changed_entries.is_empty() {
        report.reordered = resort_book(view, cache, name, preset)?;
    }
    Ok(())
}

/// Sets every cached book's active checkbox from the host's active list.
///
/// # Errors
///
/// Fails if a checkbox node is stale.
pub fn sync_active<V: View>(view: &mut V, cache: &Cache, active: &[String]) -> Result<usize> {
    let mut updated = 0;
    for (name, book) in cache.iter() {
        let want = active.contains(name).to_string();
        if view.value(book.handles.active).as_deref() != Some(want.as_str()) {
            view.update(book.handles.active, ViewPatch::SetValue(want))?;
            updated += 1;
        }
    }
    tracing::debug!(updated, "active flags synced");
    Ok(updated)
}

/// Expands or collapses a book's entry list.
///
/// # Errors
///
/// Fails if the book is not cached.
pub fn set_collapsed<V: View>(view: &mut V, cache: &mut Cache, name: &str, collapsed: bool) -> Result<()> {
    let book = cache.require_mut(name)?;
    book.collapsed = collapsed;
    view.update(book.handles.entries, ViewPatch::class(class::COLLAPSED, collapsed))
}
