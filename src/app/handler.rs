//! Event handling and state transition logic.
//!
//! [`handle_event`] is the single entry point through which the drawer changes.
//! It pattern-matches the event, mutates the [`Drawer`] and returns the
//! [`Action`]s the runtime has to perform.
//!
//! # Event Types
//!
//! - **Interaction**: `Click`, `ValueChanged`, `DragStart`, `DragOver`,
//!   `Drop`, `DragEnd`, `DeleteKey`, `MoveOrderRow`, resolved against the view
//!   so handlers act on the current cache entry
//! - **Host**: `Host` notifications after saves and setting changes
//! - **Lifecycle**: `DrawerShown`, `JumpToEntry`
//! - **Responses**: `TimerElapsed`, `EditorBuilt`, `FilterCompiled`,
//!   `FilterEvaluated`, answering earlier actions
//!
//! # Example
//!
//! ```rust
//! use lorebook_drawer::app::{handle_event, Drawer, Event};
//! use lorebook_drawer::host::{HostNotification, MemoryHost, WorldInfoHost};
//! use lorebook_drawer::settings::MemoryStore;
//! use lorebook_drawer::view::ViewTree;
//! use lorebook_drawer::Config;
//!
//! let mut drawer = Drawer::mount(MemoryHost::new(), ViewTree::new(), Box::new(MemoryStore::new()), Config::default())?;
//! let actions = handle_event(&mut drawer, &Event::Host(HostNotification::BookListChanged))?;
//! assert_eq!(actions.len(), 1); // debounce timer
//! # Ok::<(), lorebook_drawer::DrawerError>(())
//! ```

use crate::app::{Action, Drawer, TimerId, TimerKind, Toast};
use crate::domain::error::{DrawerError, Result};
use crate::domain::{EntryField, SortPreset, Uid};
use crate::editor::{ActivePanel, EditorForm};
use crate::host::{HostNotification, WorldInfoHost};
use crate::order_helper::{OrderDirection, OrderScope, RowField};
use crate::reconcile::{self, FollowUp};
use crate::render::{self, attr, class, Control, Interaction};
use crate::selection::{self, ClickOutcome, HELP_LINES, HELP_TITLE};
use crate::view::{NodeId, View, ViewPatch};

/// Events triggered by user interaction, the host or earlier actions.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A node was clicked.
    Click {
        /// Node that received the click.
        node: NodeId,
        /// Whether shift was held.
        shift: bool,
    },

    /// An input, checkbox or selector got a new value.
    ValueChanged {
        /// Input node.
        node: NodeId,
        /// New value.
        value: String,
    },

    /// Dragging started on an entry row.
    DragStart {
        /// Node the drag started on.
        node: NodeId,
    },

    /// The drag entered or left a book.
    DragOver {
        /// Hovered book.
        book: String,
        /// `true` on enter, `false` on leave.
        over: bool,
    },

    /// Dragged entries were dropped onto a book.
    Drop {
        /// Destination book.
        book: String,
        /// Whether the copy modifier was held.
        copy: bool,
    },

    /// The drag ended, dropped or not.
    DragEnd,

    /// The delete key was pressed in the drawer.
    DeleteKey,

    /// An order helper row was dragged from one visual position to another.
    MoveOrderRow {
        /// Position the row was taken from.
        from: usize,
        /// Position it was dropped at.
        to: usize,
    },

    /// A host notification.
    Host(HostNotification),

    /// The drawer became visible again.
    DrawerShown,

    /// Reveal an entry and open it in the editor.
    JumpToEntry {
        /// Book of the entry.
        book: String,
        /// Entry to reveal.
        uid: Uid,
    },

    /// A scheduled timer fired.
    TimerElapsed(TimerId),

    /// An editor form finished building.
    EditorBuilt {
        /// Build token from [`Action::BuildEditor`].
        token: u64,
        /// The built form.
        form: EditorForm,
    },

    /// A filter script compiled, or failed to.
    FilterCompiled {
        /// Run token from [`Action::CompileFilter`].
        token: u64,
        /// Whether compilation succeeded.
        ok: bool,
    },

    /// One filter evaluation finished.
    FilterEvaluated {
        /// Run token.
        token: u64,
        /// Evaluated row.
        row: usize,
        /// Whether the row is kept, or the evaluation error.
        outcome: std::result::Result<bool, String>,
    },
}

/// Processes an event, mutates the drawer and returns actions to execute.
///
/// # Parameters
///
/// * `drawer` - Mounted drawer
/// * `event` - Event to process
///
/// # Returns
///
/// Actions to execute in order. Empty when the event needs no side effects.
///
/// # Errors
///
/// Returns host I/O failures and stale view handles from the operation the
/// event triggered. Changes applied before the failure stay applied; the next
/// host notification repairs the rest.
///
/// # Tracing
///
/// Each call creates a debug-level span with the event.
#[allow(clippy::too_many_lines)]
pub fn handle_event<H, V>(drawer: &mut Drawer<H, V>, event: &Event) -> Result<Vec<Action>>
where
    H: WorldInfoHost,
    V: View,
{
    let _span = tracing::debug_span!("handle_event", event_type = ?event).entered();

    match event {
        Event::Click { node, shift } => {
            let Some(hit) = render::interaction_at(&drawer.view, *node) else {
                return Ok(vec![]);
            };
            handle_click(drawer, *node, hit, *shift)
        }
        Event::ValueChanged { node, value } => handle_value(drawer, *node, value),
        Event::DragStart { node } => {
            let (_, uid) = render::owner_at(&drawer.view, *node);
            if let Some(uid) = uid {
                let started = drawer.selection.drag_start(&mut drawer.view, drawer.layout.books, &uid)?;
                tracing::debug!(uid = %uid, started, "drag start");
            }
            Ok(vec![])
        }
        Event::DragOver { book, over } => {
            drawer.selection.drag_hover(&mut drawer.view, &drawer.cache, book, *over)?;
            Ok(vec![])
        }
        Event::Drop { book, copy } => handle_drop(drawer, book, *copy),
        Event::DragEnd => {
            drawer.view.update(drawer.layout.books, ViewPatch::remove_class(class::DRAGGING))?;
            for (_, cached) in drawer.cache.iter() {
                drawer.view.update(cached.handles.root, ViewPatch::remove_class(class::TARGET))?;
            }
            Ok(vec![])
        }
        Event::DeleteKey => {
            let Some(current) = drawer.selection.current().cloned() else {
                return Ok(vec![]);
            };
            let data = selection::delete(&mut drawer.host, &current.source, &current.entries)?;
            let mut actions = vec![Action::HideToast(Toast::SelectionHelp)];
            drawer.selection.end(&mut drawer.view, &drawer.cache, drawer.layout.books)?;
            actions.extend(drawer.run_pass(Some((current.source.as_str(), &data)))?);
            Ok(actions)
        }
        Event::MoveOrderRow { from, to } => {
            if let Some(helper) = drawer.editor.order_helper() {
                helper.move_row(&mut drawer.view, *from, *to)?;
            }
            Ok(vec![])
        }
        Event::Host(notification) => handle_notification(drawer, notification),
        Event::DrawerShown => {
            let current = drawer.editor.current_editor().map(|(b, u)| (b.to_string(), u.clone()));
            match current {
                Some((book, uid)) => Ok(vec![drawer.open_editor(&book, &uid)?]),
                None => Ok(vec![]),
            }
        }
        Event::JumpToEntry { book, uid } => jump_to_entry(drawer, book, uid),
        Event::TimerElapsed(id) => handle_timer(drawer, *id),
        Event::EditorBuilt { token, form } => {
            drawer.editor.mount_editor(&mut drawer.view, *token, form.clone())?;
            Ok(vec![])
        }
        Event::FilterCompiled { token, ok } => {
            let Some(helper) = drawer.editor.order_helper_mut() else {
                return Ok(vec![]);
            };
            let step = helper.filter_compiled(&mut drawer.view, &drawer.cache, *token, *ok)?;
            Ok(step.map(Action::EvaluateFilter).into_iter().collect())
        }
        Event::FilterEvaluated { token, row, outcome } => {
            let Some(helper) = drawer.editor.order_helper_mut() else {
                return Ok(vec![]);
            };
            let step = helper.filter_evaluated(&mut drawer.view, *token, *row, outcome)?;
            Ok(step.map(Action::EvaluateFilter).into_iter().collect())
        }
    }
}

fn require_entry_target(hit: &Interaction) -> Result<(String, Uid)> {
    match (&hit.book, &hit.uid) {
        (Some(book), Some(uid)) => Ok((book.clone(), uid.clone())),
        _ => Err(DrawerError::MissingNode(format!("{} outside an entry", hit.control.as_str()))),
    }
}

fn require_book_target(hit: &Interaction) -> Result<String> {
    hit.book
        .clone()
        .ok_or_else(|| DrawerError::MissingNode(format!("{} outside a book", hit.control.as_str())))
}

#[allow(clippy::too_many_lines)]
fn handle_click<H, V>(drawer: &mut Drawer<H, V>, node: NodeId, hit: Interaction, shift: bool) -> Result<Vec<Action>>
where
    H: WorldInfoHost,
    V: View,
{
    tracing::debug!(control = hit.control.as_str(), book = ?hit.book, uid = ?hit.uid, "click");

    match hit.control {
        Control::OpenEntry => {
            let (book, uid) = require_entry_target(&hit)?;
            let mut actions = Vec::new();
            if drawer.selection.end(&mut drawer.view, &drawer.cache, drawer.layout.books)? {
                actions.push(Action::HideToast(Toast::SelectionHelp));
            }
            actions.push(drawer.open_editor(&book, &uid)?);
            Ok(actions)
        }
        Control::SelectEntry => {
            let (book, uid) = require_entry_target(&hit)?;
            let outcome = drawer.selection.click(&mut drawer.view, &drawer.cache, &book, &uid, shift)?;
            Ok(match outcome {
                ClickOutcome::Started => vec![Action::ShowToast {
                    toast: Toast::SelectionHelp,
                    title: HELP_TITLE.to_string(),
                    lines: HELP_LINES.iter().map(|l| (*l).to_string()).collect(),
                }],
                ClickOutcome::Ended => vec![Action::HideToast(Toast::SelectionHelp)],
                ClickOutcome::Ignored | ClickOutcome::Added(_) | ClickOutcome::Removed => vec![],
            })
        }
        Control::ToggleEntry => {
            let (book, uid) = require_entry_target(&hit)?;
            let entry = drawer.cache.entry_mut(&book, &uid)?;
            entry.disable = !entry.disable;
            let enabled = !entry.disable;
            let snapshot = entry.clone();
            let row = drawer.cache.row(&book, &uid)?;
            render::set_toggle(&mut drawer.view, row.enabled, enabled)?;
            if let Some(helper) = drawer.editor.order_helper() {
                helper.sync_entry(&mut drawer.view, &book, &snapshot)?;
            }
            drawer.save_book(&book)?;
            Ok(vec![])
        }
        Control::CollapseBook => {
            let book = require_book_target(&hit)?;
            let collapsed = !drawer.cache.require(&book)?.collapsed;
            reconcile::set_collapsed(&mut drawer.view, &mut drawer.cache, &book, collapsed)?;
            Ok(vec![])
        }
        Control::BookActive => {
            let book = require_book_target(&hit)?;
            let active = drawer.view.value(node).as_deref() != Some("true");
            set_book_active(drawer, &book, active)?;
            Ok(vec![])
        }
        Control::NewEntry => {
            let book = require_book_target(&hit)?;
            new_entry(drawer, &book)
        }
        Control::BookOrderHelper => {
            let book = require_book_target(&hit)?;
            drawer.open_order_helper(OrderScope::Book(book))?;
            Ok(vec![])
        }
        Control::FillTitles => {
            let book = require_book_target(&hit)?;
            fill_titles(drawer, &book)
        }
        Control::ExportBook => {
            let book = require_book_target(&hit)?;
            let json = drawer.cache.require(&book)?.to_data().export_json()?;
            Ok(vec![Action::Download {
                file_name: format!("{book}.json"),
                json,
            }])
        }
        Control::AddBook => {
            let name = drawer.host.free_world_name()?;
            if drawer.host.create_world_info(&name)? {
                tracing::debug!(book = %name, "book created, revealing after the next pass");
                drawer.signals.after_next_pass(FollowUp::RevealBook(name));
            }
            Ok(vec![])
        }
        Control::Refresh => {
            let hide = drawer.selection.is_active();
            drawer.refresh()?;
            Ok(if hide { vec![Action::HideToast(Toast::SelectionHelp)] } else { vec![] })
        }
        Control::ToggleActivation => {
            drawer.editor.toggle_activation(&mut drawer.view)?;
            Ok(vec![])
        }
        Control::ToggleOrderHelper => {
            if drawer.editor.order_helper().is_some() {
                drawer.editor.close_order_helper(&mut drawer.view)?;
            } else {
                drawer.open_order_helper(OrderScope::ActiveBooks)?;
            }
            Ok(vec![])
        }
        Control::EditorFocus => {
            drawer.editor.toggle_focus(&mut drawer.view)?;
            Ok(vec![])
        }
        Control::ApplyOrder => {
            let Some(helper) = drawer.editor.order_helper() else {
                return Ok(vec![]);
            };
            let touched = helper.apply_order(&mut drawer.view, &mut drawer.cache)?;
            let preset = drawer.sort.preset();
            for book in &touched {
                drawer.save_book(book)?;
                reconcile::resort_book(&mut drawer.view, &drawer.cache, book, preset)?;
            }
            Ok(vec![])
        }
        Control::ToggleFilter => {
            if let Some(helper) = drawer.editor.order_helper_mut() {
                helper.toggle_filter(&mut drawer.view, &drawer.cache)?;
            }
            Ok(vec![])
        }
    }
}

#[allow(clippy::too_many_lines)]
fn handle_value<H, V>(drawer: &mut Drawer<H, V>, node: NodeId, value: &str) -> Result<Vec<Action>>
where
    H: WorldInfoHost,
    V: View,
{
    drawer.view.update(node, ViewPatch::SetValue(value.to_string()))?;
    let layout = drawer.layout;

    if node == layout.sort_select {
        let preset = SortPreset::ALL
            .into_iter()
            .find(|p| p.label() == value)
            .or_else(|| SortPreset::parse(value));
        return match preset {
            Some(preset) => Ok(vec![drawer.set_preset(preset)?]),
            None => {
                tracing::debug!(value = %value, "ignoring unknown sort preset");
                Ok(vec![])
            }
        };
    }
    if node == layout.search || node == layout.search_entries || node == layout.filter_active {
        if node == layout.search {
            drawer.search.query = value.to_string();
        } else if node == layout.search_entries {
            drawer.search.entries = value == "true";
        } else {
            drawer.search.active_only = value == "true";
        }
        drawer.apply_search()?;
        return Ok(vec![]);
    }

    if let Some(actions) = handle_order_control(drawer, node, value)? {
        return Ok(actions);
    }
    if let Some(field) = editor_field(drawer, node) {
        return editor_input(drawer, &field, value);
    }

    if render::interaction_at(&drawer.view, node).is_some_and(|hit| hit.control == Control::BookActive) {
        let (book, _) = render::owner_at(&drawer.view, node);
        if let Some(book) = book {
            set_book_active(drawer, &book, value == "true")?;
        }
        return Ok(vec![]);
    }

    let Some(field) = drawer.view.attr(node, attr::FIELD).as_deref().and_then(RowField::parse) else {
        tracing::debug!(node = node.index(), "value change on an unrouted node");
        return Ok(vec![]);
    };
    let (Some(book), Some(uid)) = render::owner_at(&drawer.view, node) else {
        return Ok(vec![]);
    };
    let entry = drawer.cache.entry_mut(&book, &uid)?;
    field.write(entry, value)?;
    let snapshot = entry.clone();

    if field == RowField::Strategy {
        let row = drawer.cache.row(&book, &uid)?;
        drawer
            .view
            .update(row.strategy, ViewPatch::SetValue(snapshot.strategy().as_str().to_string()))?;
    }
    if let Some(helper) = drawer.editor.order_helper() {
        helper.sync_entry(&mut drawer.view, &book, &snapshot)?;
    }
    reconcile::resort_book(&mut drawer.view, &drawer.cache, &book, drawer.sort.preset())?;
    drawer.save_book(&book)?;
    Ok(vec![])
}

/// Start, step, direction and filter inputs of the order helper.
fn handle_order_control<H, V>(drawer: &mut Drawer<H, V>, node: NodeId, value: &str) -> Result<Option<Vec<Action>>>
where
    H: WorldInfoHost,
    V: View,
{
    let filter_delay = drawer.config.filter_debounce_ms;
    let Some(helper) = drawer.editor.order_helper_mut() else {
        return Ok(None);
    };
    let controls = *helper.controls();
    let store = drawer.store.as_mut();

    if node == controls.filter_input {
        helper.prefs_mut().set_filter(store, value)?;
        let generation = helper.edit_filter(&mut drawer.view, value)?;
        return Ok(Some(vec![Action::ScheduleTimer {
            id: TimerId::new(TimerKind::Filter, generation),
            delay_ms: filter_delay,
        }]));
    }
    if node == controls.start || node == controls.step {
        match value.trim().parse::<u32>() {
            Ok(n) if node == controls.start => helper.prefs_mut().set_start(store, n)?,
            Ok(n) => helper.prefs_mut().set_step(store, n)?,
            Err(_) => tracing::debug!(value = %value, "ignoring non-numeric order helper value"),
        }
        return Ok(Some(vec![]));
    }
    if node == controls.direction {
        if let Some(direction) = OrderDirection::parse(value) {
            helper.prefs_mut().set_direction(store, direction)?;
            helper.show_direction(&mut drawer.view)?;
        }
        return Ok(Some(vec![]));
    }
    Ok(None)
}

fn editor_field<H, V>(drawer: &Drawer<H, V>, node: NodeId) -> Option<EntryField> {
    drawer
        .editor
        .editor()?
        .inputs
        .iter()
        .find(|(_, input)| **input == node)
        .map(|(name, _)| EntryField::from_name(name))
}

/// A value typed into the editor form.
///
/// The form writes through to the host like the host's own form would; the
/// drawer learns about the change from the resulting notification, which
/// patches the list labels and finds the editor already showing the value.
fn editor_input<H, V>(drawer: &mut Drawer<H, V>, field: &EntryField, value: &str) -> Result<Vec<Action>>
where
    H: WorldInfoHost,
    V: View,
{
    let Some((book, uid)) = drawer.editor.record_input(field, value) else {
        return Ok(vec![]);
    };
    let mut data = drawer.host.load_world_info(&book)?;
    let entry = data.entries.get_mut(&uid).ok_or_else(|| DrawerError::UnknownEntry {
        book: book.clone(),
        uid: uid.to_string(),
    })?;
    entry.set_field(field, value)?;
    drawer.host.save_world_info(&book, &data, true)?;
    tracing::debug!(book = %book, uid = %uid, field = field.name(), "editor input saved");
    Ok(vec![])
}

fn set_book_active<H, V>(drawer: &mut Drawer<H, V>, book: &str, active: bool) -> Result<()>
where
    H: WorldInfoHost,
    V: View,
{
    let node = drawer.cache.require(book)?.handles.active;
    drawer.view.update(node, ViewPatch::SetValue(active.to_string()))?;
    drawer.host.set_book_active(book, active)
}

fn new_entry<H, V>(drawer: &mut Drawer<H, V>, book: &str) -> Result<Vec<Action>>
where
    H: WorldInfoHost,
    V: View,
{
    let mut data = drawer.cache.require(book)?.to_data();
    let entry = drawer.host.create_world_info_entry(book, &mut data)?;

    let container = drawer.cache.require(book)?.handles.entries;
    let row = render::render_entry(&mut drawer.view, container, book, &entry, None)?;
    let cached = drawer.cache.require_mut(book)?;
    cached.rows.insert(entry.uid.clone(), row);
    cached.entries.insert(entry.uid.clone(), entry.clone());
    reconcile::resort_book(&mut drawer.view, &drawer.cache, book, drawer.sort.preset())?;
    reconcile::set_collapsed(&mut drawer.view, &mut drawer.cache, book, false)?;

    let open = drawer.open_editor(book, &entry.uid)?;
    drawer.save_book(book)?;
    tracing::debug!(book = %book, uid = %entry.uid, "entry created");
    Ok(vec![open, Action::ScrollIntoView(row.root)])
}

fn fill_titles<H, V>(drawer: &mut Drawer<H, V>, book: &str) -> Result<Vec<Action>>
where
    H: WorldInfoHost,
    V: View,
{
    let mut data = drawer.host.load_world_info(book)?;
    let mut filled = 0;
    for entry in data.entries.values_mut() {
        if entry.comment.is_empty() && !entry.key.is_empty() {
            entry.comment = entry.keywords();
            filled += 1;
        }
    }
    tracing::debug!(book = %book, filled, "empty titles filled");
    if filled == 0 {
        return Ok(vec![]);
    }
    drawer.host.save_world_info(book, &data, true)?;
    drawer.run_pass(Some((book, &data)))
}

fn handle_drop<H, V>(drawer: &mut Drawer<H, V>, book: &str, copy: bool) -> Result<Vec<Action>>
where
    H: WorldInfoHost,
    V: View,
{
    let Some(current) = drawer.selection.current().cloned() else {
        return Ok(vec![]);
    };
    let transfer = selection::transfer(&mut drawer.host, &current.source, &current.entries, book, copy)?;
    let mut actions = vec![Action::HideToast(Toast::SelectionHelp)];
    drawer.selection.end(&mut drawer.view, &drawer.cache, drawer.layout.books)?;
    let Some(transfer) = transfer else {
        tracing::debug!(book = %book, "drop onto the source book without copy");
        return Ok(actions);
    };

    let (name, data) = &transfer.destination;
    actions.extend(drawer.run_pass(Some((name.as_str(), data)))?);
    if let Some((name, data)) = &transfer.source {
        actions.extend(drawer.run_pass(Some((name.as_str(), data)))?);
    }
    Ok(actions)
}

fn handle_notification<H, V>(drawer: &mut Drawer<H, V>, notification: &HostNotification) -> Result<Vec<Action>>
where
    H: WorldInfoHost,
    V: View,
{
    match notification {
        HostNotification::WorldInfoUpdated { book, data } => {
            Ok(vec![drawer.schedule_pass(Some((book.clone(), data.clone())))])
        }
        HostNotification::BookListChanged => Ok(vec![drawer.schedule_pass(None)]),
        HostNotification::WorldInfoSettingsUpdated => {
            let active = drawer.host.selected_world_info();
            reconcile::sync_active(&mut drawer.view, &drawer.cache, &active)?;
            if drawer.search.active_only {
                drawer.apply_search()?;
            }
            Ok(vec![])
        }
    }
}

fn handle_timer<H, V>(drawer: &mut Drawer<H, V>, id: TimerId) -> Result<Vec<Action>>
where
    H: WorldInfoHost,
    V: View,
{
    match id.kind {
        TimerKind::Reconcile => match drawer.reconcile.fire(id.generation) {
            Some(pending) => drawer.run_pass(pending.as_ref().map(|(name, data)| (name.as_str(), data))),
            None => Ok(vec![]),
        },
        TimerKind::Filter => {
            let Some(helper) = drawer.editor.order_helper_mut() else {
                return Ok(vec![]);
            };
            let Some(script) = helper.filter_due(id.generation) else {
                return Ok(vec![]);
            };
            let token = helper.begin_filter(&script);
            Ok(vec![Action::CompileFilter { token, script }])
        }
        TimerKind::SettingsSave => {
            if drawer.settings_save.fire(id.generation).is_some() {
                let key = drawer.config.settings_key.clone();
                drawer.sort.save(&mut drawer.host, &key)?;
            }
            Ok(vec![])
        }
    }
}

/// Closes the activation and order panels, expands the book, scrolls to the
/// entry and opens it unless the editor already shows it.
fn jump_to_entry<H, V>(drawer: &mut Drawer<H, V>, book: &str, uid: &Uid) -> Result<Vec<Action>>
where
    H: WorldInfoHost,
    V: View,
{
    let row = drawer.cache.row(book, uid)?;
    if matches!(drawer.editor.panel(), ActivePanel::GlobalSettings | ActivePanel::OrderHelper(_)) {
        drawer.editor.set_active_panel(&mut drawer.view, ActivePanel::None)?;
    }
    reconcile::set_collapsed(&mut drawer.view, &mut drawer.cache, book, false)?;

    let mut actions = vec![Action::ScrollIntoView(row.root)];
    let showing = drawer.editor.editor().is_some_and(|slot| slot.shows(book, uid));
    if !showing {
        actions.push(drawer.open_editor(book, uid)?);
    }
    Ok(actions)
}
