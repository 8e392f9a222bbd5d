//! Editor host: the panel slot shared by the entry editor, the order helper and
//! the global activation settings.
//!
//! Exactly one panel occupies the slot at a time. Every transition goes through
//! [`EditorHost::set_active_panel`], which tears the previous panel down before
//! the next one is installed:
//!
//! ```text
//!   None ◀──▶ Editor ◀──▶ OrderHelper ◀──▶ GlobalSettings
//!     ▲                                         │
//!     └───────── toggling the active panel ─────┘
//! ```
//!
//! # Editor Builds
//!
//! Building the entry form is a host operation that may take a while. Opening
//! an entry issues a fresh token and leaves the slot pending; the built form is
//! mounted only if its token is still the newest one and the editor is still
//! the active panel.

use crate::domain::error::Result;
use crate::domain::{Entry, EntryField, Uid};
use crate::order_helper::{FilterCounters, OrderHelper};
use crate::render::{self, attr, class, Control};
use crate::view::{NodeId, View, ViewPatch};
use std::collections::BTreeMap;

/// Heading shown while the global activation settings occupy the slot.
pub const ACTIVATION_HEADING: &str = "Global World Info/Lorebook activation settings";

/// Visible values of an entry edit form, keyed by field name.
///
/// The values track what the user currently sees, including edits typed into
/// the form, so the reconciler can tell whether an incoming change is already
/// on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorForm {
    fields: BTreeMap<String, String>,
}

impl EditorForm {
    /// Form showing every wire field of `entry`.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures from [`Entry::to_fields`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use lorebook_drawer::domain::{Entry, EntryField, Uid};
    /// use lorebook_drawer::editor::EditorForm;
    ///
    /// let mut entry = Entry::new(Uid::from(1));
    /// entry.key = vec!["a".into(), "b".into()];
    /// let form = EditorForm::from_entry(&entry)?;
    /// assert_eq!(form.value(&EntryField::Key), Some("a, b"));
    /// # Ok::<(), lorebook_drawer::DrawerError>(())
    /// ```
    pub fn from_entry(entry: &Entry) -> Result<Self> {
        let mut fields = BTreeMap::new();
        for name in entry.to_fields()?.keys() {
            if name == "uid" {
                continue;
            }
            let field = EntryField::from_name(name);
            fields.insert(name.clone(), entry.display_value(&field)?);
        }
        Ok(Self { fields })
    }

    /// Visible value of a field, `None` if the form has no such input.
    #[must_use]
    pub fn value(&self, field: &EntryField) -> Option<&str> {
        self.fields.get(field.name()).map(String::as_str)
    }

    /// Records the visible value of a field.
    pub fn set(&mut self, field: &EntryField, value: impl Into<String>) {
        self.fields.insert(field.name().to_string(), value.into());
    }

    /// All fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The entry editor occupying the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSlot {
    /// Book of the open entry.
    pub book: String,
    /// Uid of the open entry.
    pub uid: Uid,
    /// Token of the build this slot waits for or shows.
    pub token: u64,
    /// Mounted form, `None` while the build is pending.
    pub form: Option<EditorForm>,
    /// Input nodes by field name.
    pub inputs: BTreeMap<String, NodeId>,
    /// Whether focus mode is on.
    pub focused: bool,
}

impl EditorSlot {
    /// Whether the slot shows `(book, uid)`.
    #[must_use]
    pub fn shows(&self, book: &str, uid: &Uid) -> bool {
        self.book == book && &self.uid == uid
    }
}

/// Content of the panel slot.
#[derive(Debug, Default)]
pub enum ActivePanel {
    /// Nothing shown.
    #[default]
    None,
    /// Entry editor.
    Editor(EditorSlot),
    /// Order helper table.
    OrderHelper(Box<OrderHelper>),
    /// Host's global activation settings.
    GlobalSettings,
}

impl ActivePanel {
    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Editor(_) => "editor",
            Self::OrderHelper(_) => "order-helper",
            Self::GlobalSettings => "global-settings",
        }
    }
}

/// Owner of the panel slot and its toggles.
#[derive(Debug)]
pub struct EditorHost {
    panel: ActivePanel,
    next_token: u64,
    filter_counters: FilterCounters,
    root: NodeId,
    activation_toggle: NodeId,
    order_toggle: NodeId,
    active_entry: Option<NodeId>,
}

impl EditorHost {
    /// Creates an empty slot rendering into `root`.
    #[must_use]
    pub const fn new(root: NodeId, activation_toggle: NodeId, order_toggle: NodeId) -> Self {
        Self {
            panel: ActivePanel::None,
            next_token: 0,
            filter_counters: FilterCounters {
                token: 0,
                generation: 0,
            },
            root,
            activation_toggle,
            order_toggle,
            active_entry: None,
        }
    }

    /// Node the panels render into.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Current panel.
    #[must_use]
    pub const fn panel(&self) -> &ActivePanel {
        &self.panel
    }

    /// Current panel, mutably.
    pub fn panel_mut(&mut self) -> &mut ActivePanel {
        &mut self.panel
    }

    /// The editor slot, if the editor is the active panel.
    #[must_use]
    pub const fn editor(&self) -> Option<&EditorSlot> {
        match &self.panel {
            ActivePanel::Editor(slot) => Some(slot),
            _ => None,
        }
    }

    /// The order helper, if it is the active panel.
    #[must_use]
    pub fn order_helper(&self) -> Option<&OrderHelper> {
        match &self.panel {
            ActivePanel::OrderHelper(helper) => Some(helper),
            _ => None,
        }
    }

    /// The order helper, mutably.
    pub fn order_helper_mut(&mut self) -> Option<&mut OrderHelper> {
        match &mut self.panel {
            ActivePanel::OrderHelper(helper) => Some(helper),
            _ => None,
        }
    }

    /// `(book, uid)` of the open editor, pending or mounted.
    #[must_use]
    pub fn current_editor(&self) -> Option<(&str, &Uid)> {
        self.editor().map(|slot| (slot.book.as_str(), &slot.uid))
    }

    /// Replaces the active panel.
    ///
    /// The previous panel is torn down first: the slot is emptied, focus mode
    /// ends, both toggles lose their active mark and the open entry row is
    /// unmarked. The toggle belonging to `next` is then marked active, and the
    /// activation heading is rendered for [`ActivePanel::GlobalSettings`].
    ///
    /// # Errors
    ///
    /// Fails if the slot or a toggle node is stale.
    pub fn set_active_panel<V: View>(&mut self, view: &mut V, next: ActivePanel) -> Result<()> {
        tracing::debug!(from = self.panel.kind(), to = next.kind(), "switching panel");

        view.clear(self.root)?;
        view.update(self.root, ViewPatch::remove_class(class::FOCUS))?;
        view.update(self.activation_toggle, ViewPatch::remove_class(class::ACTIVE))?;
        view.update(self.order_toggle, ViewPatch::remove_class(class::ACTIVE))?;
        self.unmark_entry(view)?;
        if let ActivePanel::OrderHelper(helper) = &self.panel {
            self.filter_counters = helper.counters();
        }

        match &next {
            ActivePanel::GlobalSettings => {
                view.update(self.activation_toggle, ViewPatch::add_class(class::ACTIVE))?;
                let heading = render::element(view, self.root, "h3", &["stwid--activationHeading"])?;
                view.update(heading, ViewPatch::SetText(ACTIVATION_HEADING.to_string()))?;
            }
            ActivePanel::OrderHelper(_) => {
                view.update(self.order_toggle, ViewPatch::add_class(class::ACTIVE))?;
            }
            ActivePanel::None | ActivePanel::Editor(_) => {}
        }

        self.panel = next;
        Ok(())
    }

    /// Empties the slot if the editor is showing.
    ///
    /// # Errors
    ///
    /// Fails if the slot node is stale.
    pub fn clear_editor<V: View>(&mut self, view: &mut V) -> Result<()> {
        if matches!(self.panel, ActivePanel::Editor(_)) {
            self.set_active_panel(view, ActivePanel::None)?;
        }
        Ok(())
    }

    /// Closes the order helper if it is showing.
    ///
    /// # Errors
    ///
    /// Fails if the slot node is stale.
    pub fn close_order_helper<V: View>(&mut self, view: &mut V) -> Result<()> {
        if matches!(self.panel, ActivePanel::OrderHelper(_)) {
            self.set_active_panel(view, ActivePanel::None)?;
        }
        Ok(())
    }

    /// Installs the order helper built by `build` into the emptied slot.
    ///
    /// `build` receives the filter counters left by the last closed helper.
    ///
    /// # Errors
    ///
    /// Propagates failures of `build` and stale slot or toggle nodes.
    pub fn open_order_helper<V, F>(&mut self, view: &mut V, build: F) -> Result<()>
    where
        V: View,
        F: FnOnce(&mut V, NodeId, FilterCounters) -> Result<OrderHelper>,
    {
        self.set_active_panel(view, ActivePanel::None)?;
        let helper = build(view, self.root, self.filter_counters)?;
        view.update(self.order_toggle, ViewPatch::add_class(class::ACTIVE))?;
        tracing::debug!(rows = helper.rows().len(), "order helper installed");
        self.panel = ActivePanel::OrderHelper(Box::new(helper));
        Ok(())
    }

    /// Toggles the global activation settings; returns whether they are now
    /// shown.
    ///
    /// # Errors
    ///
    /// Fails if the slot node is stale.
    pub fn toggle_activation<V: View>(&mut self, view: &mut V) -> Result<bool> {
        let show = !matches!(self.panel, ActivePanel::GlobalSettings);
        let next = if show { ActivePanel::GlobalSettings } else { ActivePanel::None };
        self.set_active_panel(view, next)?;
        Ok(show)
    }

    /// Opens the editor for an entry and returns the build token.
    ///
    /// The row at `row` is marked active. The slot stays pending until
    /// [`EditorHost::mount_editor`] receives a form with this token. Focus mode
    /// carries over when the same entry is reopened.
    ///
    /// # Errors
    ///
    /// Fails if the slot or the row node is stale.
    pub fn begin_editor<V: View>(&mut self, view: &mut V, book: &str, uid: &Uid, row: NodeId) -> Result<u64> {
        self.next_token += 1;
        let token = self.next_token;
        let focused = self.editor().is_some_and(|slot| slot.shows(book, uid) && slot.focused);

        self.set_active_panel(
            view,
            ActivePanel::Editor(EditorSlot {
                book: book.to_string(),
                uid: uid.clone(),
                token,
                form: None,
                inputs: BTreeMap::new(),
                focused,
            }),
        )?;
        view.update(row, ViewPatch::add_class(class::ACTIVE))?;
        self.active_entry = Some(row);

        tracing::debug!(book = %book, uid = %uid, token, "editor build requested");
        Ok(token)
    }

    /// Mounts a built form; returns `false` when the build is stale.
    ///
    /// # Errors
    ///
    /// Fails if the slot node is stale.
    pub fn mount_editor<V: View>(&mut self, view: &mut V, token: u64, form: EditorForm) -> Result<bool> {
        let root = self.root;
        let ActivePanel::Editor(slot) = &mut self.panel else {
            tracing::debug!(token, "editor build arrived after the editor closed");
            return Ok(false);
        };
        if slot.token != token {
            tracing::debug!(token, current = slot.token, "discarding stale editor build");
            return Ok(false);
        }

        view.clear(root)?;
        let focus = render::control(view, root, "div", Control::EditorFocus, "Focus")?;
        view.update(focus, ViewPatch::class(class::ACTIVE, slot.focused))?;
        view.update(root, ViewPatch::class(class::FOCUS, slot.focused))?;

        let mut inputs = BTreeMap::new();
        for (name, value) in form.fields() {
            let input = render::element(view, root, "textarea", &["stwid--field"])?;
            view.update(input, ViewPatch::attr(attr::FIELD, name))?;
            view.update(input, ViewPatch::SetValue(value.to_string()))?;
            inputs.insert(name.to_string(), input);
        }

        tracing::debug!(book = %slot.book, uid = %slot.uid, fields = inputs.len(), "editor mounted");
        slot.inputs = inputs;
        slot.form = Some(form);
        Ok(true)
    }

    /// Records a value typed into the open form.
    ///
    /// Returns the `(book, uid)` the value belongs to, or `None` when no form
    /// is mounted.
    pub fn record_input(&mut self, field: &EntryField, value: &str) -> Option<(String, Uid)> {
        let ActivePanel::Editor(slot) = &mut self.panel else {
            return None;
        };
        let form = slot.form.as_mut()?;
        form.set(field, value);
        Some((slot.book.clone(), slot.uid.clone()))
    }

    /// Flips focus mode of the open editor.
    ///
    /// # Errors
    ///
    /// Fails if the slot node is stale.
    pub fn toggle_focus<V: View>(&mut self, view: &mut V) -> Result<()> {
        let root = self.root;
        if let ActivePanel::Editor(slot) = &mut self.panel {
            slot.focused = !slot.focused;
            view.update(root, ViewPatch::class(class::FOCUS, slot.focused))?;
        }
        Ok(())
    }

    /// Removes the active mark from the open entry row.
    ///
    /// # Errors
    ///
    /// Fails only if the backend rejects a live node.
    pub fn unmark_entry<V: View>(&mut self, view: &mut V) -> Result<()> {
        if let Some(row) = self.active_entry.take() {
            if view.contains(row) {
                view.update(row, ViewPatch::remove_class(class::ACTIVE))?;
            }
        }
        Ok(())
    }

    /// Forgets the open editor after its book or entry disappeared.
    ///
    /// # Errors
    ///
    /// Fails if the slot node is stale.
    pub fn close_if_showing<V: View>(&mut self, view: &mut V, book: &str, uid: Option<&Uid>) -> Result<bool> {
        let showing = self
            .editor()
            .is_some_and(|slot| slot.book == book && uid.map_or(true, |u| &slot.uid == u));
        if showing {
            self.set_active_panel(view, ActivePanel::None)?;
        }
        Ok(showing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ViewTree;

    fn host(tree: &mut ViewTree) -> (EditorHost, NodeId) {
        let root = tree.root();
        let slot = render::element(tree, root, "div", &[]).unwrap();
        let activation = render::element(tree, root, "div", &[]).unwrap();
        let order = render::element(tree, root, "div", &[]).unwrap();
        let row = render::element(tree, root, "div", &[]).unwrap();
        (EditorHost::new(slot, activation, order), row)
    }

    #[test]
    fn stale_builds_are_discarded() {
        let mut tree = ViewTree::new();
        let (mut editor, row) = host(&mut tree);
        let uid = Uid::from(1);

        let first = editor.begin_editor(&mut tree, "Lore", &uid, row).unwrap();
        let second = editor.begin_editor(&mut tree, "Lore", &Uid::from(2), row).unwrap();
        let form = EditorForm::from_entry(&Entry::new(uid)).unwrap();

        assert!(!editor.mount_editor(&mut tree, first, form.clone()).unwrap());
        assert!(editor.editor().unwrap().form.is_none());
        assert!(editor.mount_editor(&mut tree, second, form).unwrap());
        assert_eq!(editor.current_editor().map(|(_, u)| u.clone()), Some(Uid::from(2)));
    }

    #[test]
    fn panels_are_mutually_exclusive() {
        let mut tree = ViewTree::new();
        let (mut editor, row) = host(&mut tree);
        editor.begin_editor(&mut tree, "Lore", &Uid::from(1), row).unwrap();
        assert!(tree.has_class(row, class::ACTIVE));

        assert!(editor.toggle_activation(&mut tree).unwrap());
        assert!(editor.current_editor().is_none());
        assert!(!tree.has_class(row, class::ACTIVE));
        assert!(tree.has_class(editor.activation_toggle, class::ACTIVE));

        assert!(!editor.toggle_activation(&mut tree).unwrap());
        assert!(matches!(editor.panel(), ActivePanel::None));
        assert!(tree.children(editor.root()).unwrap().is_empty());
    }

    #[test]
    fn typed_values_update_the_visible_form() {
        let mut tree = ViewTree::new();
        let (mut editor, row) = host(&mut tree);
        let token = editor.begin_editor(&mut tree, "Lore", &Uid::from(1), row).unwrap();
        assert_eq!(editor.record_input(&EntryField::Comment, "x"), None);

        let form = EditorForm::from_entry(&Entry::new(Uid::from(1))).unwrap();
        editor.mount_editor(&mut tree, token, form).unwrap();
        let owner = editor.record_input(&EntryField::Comment, "Typed");

        assert_eq!(owner, Some(("Lore".to_string(), Uid::from(1))));
        let slot = editor.editor().unwrap();
        assert_eq!(slot.form.as_ref().unwrap().value(&EntryField::Comment), Some("Typed"));
        assert!(slot.inputs.contains_key("content"));
    }
}
