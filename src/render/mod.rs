//! Renderer: builds view subtrees for the drawer, books and entry rows.
//!
//! Rendering is pure construction through the [`View`] trait. The renderer
//! never decides *when* to run; the reconciler and the list loader call it only
//! for books and entries that are not cached yet.
//!
//! Interactive nodes carry a `data-action` attribute and sit below nodes that
//! carry `data-book` / `data-uid`. A backend resolves a click with
//! [`interaction_at`] and forwards the resulting event, so handlers look the
//! entry up in the cache at event time instead of capturing a snapshot.

use crate::cache::{BookHandles, EntryHandles};
use crate::domain::error::Result;
use crate::domain::{Entry, Uid};
use crate::view::{NodeId, View, ViewPatch};

/// Class names applied to view nodes.
pub mod class {
    /// Drawer body.
    pub const BODY: &str = "stwid--body";
    /// Drawer body while the list is loading.
    pub const LOADING: &str = "stwid--isLoading";
    /// Book list container.
    pub const BOOKS: &str = "stwid--books";
    /// Book root.
    pub const BOOK: &str = "stwid--book";
    /// Entry list of a book.
    pub const ENTRY_LIST: &str = "stwid--entryList";
    /// Collapsed entry list.
    pub const COLLAPSED: &str = "stwid--isCollapsed";
    /// Entry row.
    pub const ENTRY: &str = "stwid--entry";
    /// Open entry, or an active panel toggle.
    pub const ACTIVE: &str = "stwid--active";
    /// Selected entry row.
    pub const SELECTED: &str = "stwid--isSelected";
    /// Book hovered as a drop target.
    pub const TARGET: &str = "stwid--isTarget";
    /// Book list while entries are dragged.
    pub const DRAGGING: &str = "stwid--isDragging";
    /// Book or entry hidden by the search box.
    pub const FILTER_QUERY: &str = "stwid--filter-query";
    /// Book hidden by the active-only filter.
    pub const FILTER_ACTIVE: &str = "stwid--filter-active";
    /// Order-helper row excluded by the filter script.
    pub const FILTERED: &str = "stwid--isFiltered";
    /// Editor expanded to focus mode.
    pub const FOCUS: &str = "stwid--focus";
    /// Enabled toggle, on.
    pub const TOGGLE_ON: &str = "fa-toggle-on";
    /// Enabled toggle, off.
    pub const TOGGLE_OFF: &str = "fa-toggle-off";
    /// Unchecked selector.
    pub const UNCHECKED: &str = "fa-square";
    /// Checked selector.
    pub const CHECKED: &str = "fa-square-check";
}

/// Attribute names used to route interactions.
pub mod attr {
    /// Owning book name.
    pub const BOOK: &str = "data-book";
    /// Entry uid.
    pub const UID: &str = "data-uid";
    /// Control performed on click.
    pub const ACTION: &str = "data-action";
    /// Form field name of an input.
    pub const FIELD: &str = "data-field";
}

/// Click target kinds, stored in the `data-action` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// Entry row: open the editor.
    OpenEntry,
    /// Entry selector checkbox.
    SelectEntry,
    /// Entry enabled toggle.
    ToggleEntry,
    /// Book title: collapse or expand.
    CollapseBook,
    /// Book active checkbox.
    BookActive,
    /// Book "new entry" button.
    NewEntry,
    /// Book menu: order helper scoped to the book.
    BookOrderHelper,
    /// Book menu: fill empty titles from keywords.
    FillTitles,
    /// Book menu: export as JSON.
    ExportBook,
    /// Drawer: create a book.
    AddBook,
    /// Drawer: reload everything.
    Refresh,
    /// Drawer: global activation settings panel.
    ToggleActivation,
    /// Drawer: order helper panel.
    ToggleOrderHelper,
    /// Editor: focus mode.
    EditorFocus,
    /// Order helper: apply computed orders.
    ApplyOrder,
    /// Order helper: show or hide the filter script.
    ToggleFilter,
}

impl Control {
    const ALL: [Self; 16] = [
        Self::OpenEntry,
        Self::SelectEntry,
        Self::ToggleEntry,
        Self::CollapseBook,
        Self::BookActive,
        Self::NewEntry,
        Self::BookOrderHelper,
        Self::FillTitles,
        Self::ExportBook,
        Self::AddBook,
        Self::Refresh,
        Self::ToggleActivation,
        Self::ToggleOrderHelper,
        Self::EditorFocus,
        Self::ApplyOrder,
        Self::ToggleFilter,
    ];

    /// Attribute value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenEntry => "open-entry",
            Self::SelectEntry => "select-entry",
            Self::ToggleEntry => "toggle-entry",
            Self::CollapseBook => "collapse-book",
            Self::BookActive => "book-active",
            Self::NewEntry => "new-entry",
            Self::BookOrderHelper => "book-order-helper",
            Self::FillTitles => "fill-titles",
            Self::ExportBook => "export-book",
            Self::AddBook => "add-book",
            Self::Refresh => "refresh",
            Self::ToggleActivation => "toggle-activation",
            Self::ToggleOrderHelper => "toggle-order-helper",
            Self::EditorFocus => "editor-focus",
            Self::ApplyOrder => "apply-order",
            Self::ToggleFilter => "toggle-filter",
        }
    }

    /// Parses an attribute value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value)
    }
}

/// A resolved click: what was hit and which book/entry it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    /// Control that was hit.
    pub control: Control,
    /// Nearest enclosing book, if any.
    pub book: Option<String>,
    /// Nearest enclosing entry, if any.
    pub uid: Option<Uid>,
}

/// Resolves a click on `node` by walking up to the nearest control.
///
/// # Example
///
/// ```rust
/// use lorebook_drawer::domain::{Entry, Uid};
/// use lorebook_drawer::render::{self, Control};
/// use lorebook_drawer::view::{View, ViewTree};
///
/// let mut tree = ViewTree::new();
/// let list = tree.root();
/// let row = render::render_entry(&mut tree, list, "Lore", &Entry::new(Uid::from(4)), None)?;
///
/// let hit = render::interaction_at(&tree, row.enabled).expect("toggle is a control");
/// assert_eq!(hit.control, Control::ToggleEntry);
/// assert_eq!(hit.uid, Some(Uid::from(4)));
/// # Ok::<(), lorebook_drawer::DrawerError>(())
/// ```
#[must_use]
pub fn interaction_at<V: View>(view: &V, node: NodeId) -> Option<Interaction> {
    let mut current = Some(node);
    let mut control = None;
    while let (None, Some(id)) = (control, current) {
        control = view.attr(id, attr::ACTION).as_deref().and_then(Control::parse);
        current = view.parent(id);
    }
    let (book, uid) = owner_at(view, node);
    control.map(|control| Interaction { control, book, uid })
}

/// Nearest enclosing book and entry of `node`, for inputs that are not
/// controls.
#[must_use]
pub fn owner_at<V: View>(view: &V, node: NodeId) -> (Option<String>, Option<Uid>) {
    let mut book = None;
    let mut uid = None;
    let mut current = Some(node);
    while let Some(id) = current {
        if uid.is_none() {
            uid = view.attr(id, attr::UID).map(|u| Uid::from(u.as_str()));
        }
        if book.is_none() {
            book = view.attr(id, attr::BOOK);
        }
        current = view.parent(id);
    }
    (book, uid)
}

/// Creates a node with classes and appends it to `parent`.
///
/// # Errors
///
/// Fails if `parent` is stale.
pub fn element<V: View>(view: &mut V, parent: NodeId, tag: &str, classes: &[&str]) -> Result<NodeId> {
    let node = view.create(tag);
    for class in classes {
        view.update(node, ViewPatch::add_class(class))?;
    }
    view.append(parent, node)?;
    Ok(node)
}

/// Creates a control node that routes clicks as `control`.
///
/// # Errors
///
/// Fails if `parent` is stale.
pub fn control<V: View>(view: &mut V, parent: NodeId, tag: &str, control: Control, label: &str) -> Result<NodeId> {
    let node = element(view, parent, tag, &[])?;
    view.update(node, ViewPatch::attr(attr::ACTION, control.as_str()))?;
    if !label.is_empty() {
        view.update(node, ViewPatch::SetText(label.to_string()))?;
    }
    Ok(node)
}

/// Handles of the drawer's fixed chrome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawerLayout {
    /// Drawer body; carries the loading class.
    pub body: NodeId,
    /// Create-book button.
    pub add_book: NodeId,
    /// Refresh button.
    pub refresh: NodeId,
    /// Global activation settings toggle.
    pub activation_toggle: NodeId,
    /// Order helper toggle.
    pub order_toggle: NodeId,
    /// Sort preset selector.
    pub sort_select: NodeId,
    /// Book search box.
    pub search: NodeId,
    /// "Search entries too" checkbox.
    pub search_entries: NodeId,
    /// "Active books only" checkbox.
    pub filter_active: NodeId,
    /// Book list.
    pub books: NodeId,
    /// Panel slot shared by the editor, order helper and settings.
    pub editor: NodeId,
}

/// Builds the drawer chrome under the view root.
///
/// # Errors
///
/// Fails if the view root is stale.
pub fn render_layout<V: View>(view: &mut V, sort_label: &str) -> Result<DrawerLayout> {
    let root = view.root();
    let body = element(view, root, "div", &[class::BODY, class::LOADING])?;
    let list = element(view, body, "div", &["stwid--list"])?;
    let controls = element(view, list, "div", &["stwid--controls"])?;

    let add_book = control(view, controls, "button", Control::AddBook, "New Book")?;
    let refresh = control(view, controls, "button", Control::Refresh, "Refresh")?;
    let activation_toggle = control(view, controls, "button", Control::ToggleActivation, "Activation")?;
    let order_toggle = control(view, controls, "button", Control::ToggleOrderHelper, "Order Helper")?;
    let sort_select = element(view, controls, "select", &["stwid--sort"])?;
    view.update(sort_select, ViewPatch::SetValue(sort_label.to_string()))?;

    let filter = element(view, list, "div", &["stwid--filter"])?;
    let search = element(view, filter, "input", &["stwid--search"])?;
    view.update(search, ViewPatch::SetValue(String::new()))?;
    let search_entries = element(view, filter, "input", &["stwid--searchEntries"])?;
    view.update(search_entries, ViewPatch::SetValue("false".to_string()))?;
    let filter_active = element(view, filter, "input", &["stwid--filterActive"])?;
    view.update(filter_active, ViewPatch::SetValue("false".to_string()))?;

    let books = element(view, list, "div", &[class::BOOKS])?;
    let editor = element(view, body, "div", &["stwid--editor"])?;

    Ok(DrawerLayout {
        body,
        add_book,
        refresh,
        activation_toggle,
        order_toggle,
        sort_select,
        search,
        search_entries,
        filter_active,
        books,
        editor,
    })
}

/// Builds a book subtree and inserts it into `list` before `before`.
///
/// The entry list starts collapsed and empty; rows are added by
/// [`render_entry`].
///
/// # Errors
///
/// Fails if `list` or `before` is stale.
pub fn render_book<V: View>(
    view: &mut V,
    list: NodeId,
    name: &str,
    active: bool,
    before: Option<NodeId>,
) -> Result<BookHandles> {
    let root = view.create("div");
    view.update(root, ViewPatch::add_class(class::BOOK))?;
    view.update(root, ViewPatch::attr(attr::BOOK, name))?;

    let head = element(view, root, "div", &["stwid--head"])?;
    let title = control(view, head, "div", Control::CollapseBook, name)?;
    let active_box = control(view, head, "input", Control::BookActive, "")?;
    view.update(active_box, ViewPatch::SetValue(active.to_string()))?;
    control(view, head, "button", Control::NewEntry, "+")?;

    let menu = element(view, head, "div", &["stwid--menu"])?;
    control(view, menu, "div", Control::BookOrderHelper, "Order Helper")?;
    control(view, menu, "div", Control::FillTitles, "Fill Empty Titles")?;
    control(view, menu, "div", Control::ExportBook, "Export Book")?;

    let entries = element(view, root, "div", &[class::ENTRY_LIST, class::COLLAPSED])?;

    view.insert_before(list, root, before)?;
    tracing::trace!(book = %name, "rendered book");

    Ok(BookHandles {
        root,
        title,
        active: active_box,
        entries,
    })
}

/// Builds an entry row and inserts it into `container` before `before`.
///
/// # Errors
///
/// Fails if `container` or `before` is stale.
pub fn render_entry<V: View>(
    view: &mut V,
    container: NodeId,
    book: &str,
    entry: &Entry,
    before: Option<NodeId>,
) -> Result<EntryHandles> {
    let root = view.create("div");
    view.update(root, ViewPatch::add_class(class::ENTRY))?;
    view.update(root, ViewPatch::attr(attr::BOOK, book))?;
    view.update(root, ViewPatch::attr(attr::UID, entry.uid.to_string()))?;
    view.update(root, ViewPatch::attr(attr::ACTION, Control::OpenEntry.as_str()))?;

    let selector = control(view, root, "div", Control::SelectEntry, "")?;
    view.update(selector, ViewPatch::add_class(class::UNCHECKED))?;

    let body = element(view, root, "div", &["stwid--body"])?;
    let comment = element(view, body, "div", &["stwid--comment"])?;
    view.update(comment, ViewPatch::SetText(entry.comment.clone()))?;
    let key = element(view, body, "div", &["stwid--key"])?;
    view.update(key, ViewPatch::SetText(entry.keywords()))?;

    let status = element(view, root, "div", &["stwid--status"])?;
    let enabled = control(view, status, "div", Control::ToggleEntry, "")?;
    view.update(enabled, ViewPatch::add_class(toggle_class(!entry.disable)))?;
    let strategy = element(view, status, "select", &["stwid--strategy"])?;
    view.update(strategy, ViewPatch::attr(attr::FIELD, "strategy"))?;
    view.update(strategy, ViewPatch::SetValue(entry.strategy().as_str().to_string()))?;

    view.insert_before(container, root, before)?;

    Ok(EntryHandles {
        root,
        selector,
        comment,
        key,
        enabled,
        strategy,
    })
}

/// Toggle class for an enabled state.
#[must_use]
pub const fn toggle_class(enabled: bool) -> &'static str {
    if enabled {
        class::TOGGLE_ON
    } else {
        class::TOGGLE_OFF
    }
}

/// Switches an enabled toggle node between on and off.
///
/// # Errors
///
/// Fails if `toggle` is stale.
pub fn set_toggle<V: View>(view: &mut V, toggle: NodeId, enabled: bool) -> Result<()> {
    view.update(toggle, ViewPatch::remove_class(toggle_class(!enabled)))?;
    view.update(toggle, ViewPatch::add_class(toggle_class(enabled)))
}
