//! Order helper: a cross-book table that turns row positions into `order`
//! values.
//!
//! The table lists the entries of every active book (or of one book when
//! opened from a book menu), pre-sorted by prompt position. Rows can be dragged
//! into a new order; applying walks the rows as they are currently shown,
//! skips rows excluded by the filter script and assigns `start + i * step`.
//!
//! # Filter
//!
//! The filter script runs once per row with the row's entry (plus a `book`
//! field) as JSON input. Edits are debounced; each run is guarded by a token
//! from [`filter::FilterState`], so a run overtaken by a newer edit stops
//! without touching the classification. The highlight overlay is recomputed on
//! every keystroke.
//!
//! # Example
//!
//! ```rust
//! use lorebook_drawer::order_helper::OrderDirection;
//!
//! assert_eq!(OrderDirection::parse("up"), Some(OrderDirection::Up));
//! assert_eq!(OrderDirection::Down.as_str(), "down");
//! ```

pub mod filter;
pub mod highlight;

use crate::cache::Cache;
use crate::domain::error::{DrawerError, Result};
use crate::domain::{Entry, Position, SortCriterion, SortDirection, Strategy, Uid};
use crate::reconcile::Debouncer;
use crate::render::{self, attr, class, Control};
use crate::settings::OrderHelperPrefs;
use crate::view::{NodeId, View, ViewPatch};
use filter::{FilterState, FilterStep};
use serde_json::Value;

/// Column headers of the table.
pub const COLUMNS: [&str; 8] = ["", "", "Entry", "Strat", "Position", "Depth", "Order", "Trigg %"];

/// Which end of the table receives the start value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Bottom row gets `start`.
    Up,
    /// Top row gets `start`.
    #[default]
    Down,
}

impl OrderDirection {
    /// Stored value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    /// Parses a stored value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }

    const fn apply_icon(self) -> &'static str {
        match self {
            Self::Up => "fa-arrow-up-9-1",
            Self::Down => "fa-arrow-down-1-9",
        }
    }
}

/// Entries the table lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderScope {
    /// Every entry of every active book.
    ActiveBooks,
    /// Every entry of one book.
    Book(String),
}

/// Inline row controls that write straight into the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    /// Strategy selector.
    Strategy,
    /// Position selector.
    Position,
    /// Depth input.
    Depth,
    /// Order input.
    Order,
    /// Trigger probability input.
    Probability,
}

impl RowField {
    /// Value of the `data-field` attribute.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strategy => "strategy",
            Self::Position => "position",
            Self::Depth => "depth",
            Self::Order => "order",
            Self::Probability => "selective_probability",
        }
    }

    /// Parses a `data-field` attribute value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        [Self::Strategy, Self::Position, Self::Depth, Self::Order, Self::Probability]
            .into_iter()
            .find(|f| f.as_str() == value)
    }

    /// Writes a control value into `entry`.
    ///
    /// Numeric fields accept an empty value as "unset".
    ///
    /// # Errors
    ///
    /// Returns [`DrawerError::Host`] when the value does not parse.
    pub fn write(self, entry: &mut Entry, value: &str) -> Result<()> {
        let invalid = || DrawerError::Host(format!("invalid {} value {value:?}", self.as_str()));
        let number = || -> Result<Option<u32>> {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                trimmed.parse().map(Some).map_err(|_| invalid())
            }
        };
        match self {
            Self::Strategy => entry.set_strategy(Strategy::parse(value).ok_or_else(invalid)?),
            Self::Position => {
                entry.position = Position::from(value.trim().parse::<u8>().map_err(|_| invalid())?);
            }
            Self::Depth => entry.depth = number()?,
            Self::Order => entry.order = number()?,
            Self::Probability => entry.selective_probability = number()?.map(|p| p.min(100)),
        }
        Ok(())
    }

    /// Current control value for `entry`.
    #[must_use]
    pub fn read(self, entry: &Entry) -> String {
        let optional = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_default();
        match self {
            Self::Strategy => entry.strategy().as_str().to_string(),
            Self::Position => entry.position.value().to_string(),
            Self::Depth => optional(entry.depth),
            Self::Order => optional(entry.order),
            Self::Probability => optional(entry.selective_probability),
        }
    }
}

/// View handles of one table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRowHandles {
    /// Row root carrying `data-book` / `data-uid`.
    pub root: NodeId,
    /// Enabled toggle.
    pub enabled: NodeId,
    /// Strategy selector.
    pub strategy: NodeId,
    /// Position selector.
    pub position: NodeId,
    /// Depth input.
    pub depth: NodeId,
    /// Order input.
    pub order: NodeId,
    /// Trigger probability input.
    pub probability: NodeId,
}

impl OrderRowHandles {
    /// Node of an inline control.
    #[must_use]
    pub const fn field(&self, field: RowField) -> NodeId {
        match field {
            RowField::Strategy => self.strategy,
            RowField::Position => self.position,
            RowField::Depth => self.depth,
            RowField::Order => self.order,
            RowField::Probability => self.probability,
        }
    }
}

/// Filter counters carried from one helper instance to the next.
///
/// Run tokens and debounce generations keep counting up across reopened
/// helpers, so results and timers of a closed helper are never taken for
/// those of the open one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterCounters {
    /// Newest filter run token handed out.
    pub token: u64,
    /// Newest debounce generation handed out.
    pub generation: u64,
}

/// One table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRow {
    /// Owning book.
    pub book: String,
    /// Entry uid.
    pub uid: Uid,
    /// Row handles.
    pub handles: OrderRowHandles,
}

/// View handles of the table controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderControls {
    /// Start input.
    pub start: NodeId,
    /// Step input.
    pub step: NodeId,
    /// Direction selector.
    pub direction: NodeId,
    /// Apply button.
    pub apply: NodeId,
    /// Filter panel toggle.
    pub filter_toggle: NodeId,
    /// Filter panel.
    pub filter_panel: NodeId,
    /// Filter script input.
    pub filter_input: NodeId,
    /// Highlight overlay behind the script input.
    pub highlight: NodeId,
    /// Entry JSON preview.
    pub preview: NodeId,
    /// Table body holding the rows.
    pub rows: NodeId,
}

/// The open order helper.
#[derive(Debug)]
pub struct OrderHelper {
    scope: OrderScope,
    rows: Vec<OrderRow>,
    controls: OrderControls,
    prefs: OrderHelperPrefs,
    filter: FilterState,
    filter_open: bool,
    filter_debounce: Debouncer<String>,
}

impl OrderHelper {
    /// Renders the helper into `root` and returns it.
    ///
    /// # Parameters
    ///
    /// * `view` - Rendering backend
    /// * `root` - Panel slot to render into
    /// * `scope` - Which entries to list
    /// * `cache` - Source of the entries
    /// * `active` - Names of the globally active books
    /// * `counters` - Filter counters left by the previous helper
    /// * `prefs` - Stored start/step/direction/filter values
    ///
    /// # Errors
    ///
    /// Fails if `root` is stale.
    pub fn open<V: View>(
        view: &mut V,
        root: NodeId,
        scope: OrderScope,
        cache: &Cache,
        active: &[String],
        prefs: OrderHelperPrefs,
        counters: FilterCounters,
    ) -> Result<Self> {
        let mut listed: Vec<(&str, &Entry)> = Vec::new();
        for (name, book) in cache.iter() {
            let included = match &scope {
                OrderScope::ActiveBooks => active.contains(name),
                OrderScope::Book(only) => only == name,
            };
            if included {
                listed.extend(book.entries.values().map(|e| (name.as_str(), e)));
            }
        }
        let sorted = crate::domain::sort_entries(listed.iter().map(|(_, e)| *e), SortCriterion::Prompt, SortDirection::Ascending);

        let body = render::element(view, root, "div", &["stwid--orderHelper"])?;
        let controls = render_controls(view, body, &scope, &prefs)?;

        let mut rows = Vec::with_capacity(sorted.len());
        for entry in sorted {
            let Some((book, _)) = listed.iter().find(|(_, e)| std::ptr::eq(*e, entry)) else {
                continue;
            };
            let handles = render_row(view, controls.rows, book, entry)?;
            rows.push(OrderRow {
                book: (*book).to_string(),
                uid: entry.uid.clone(),
                handles,
            });
        }

        tracing::debug!(scope = ?scope, rows = rows.len(), "order helper opened");
        Ok(Self {
            scope,
            rows,
            controls,
            prefs,
            filter: FilterState::resume_after(counters.token),
            filter_open: false,
            filter_debounce: Debouncer::resume_after(counters.generation),
        })
    }

    /// Listed entries.
    #[must_use]
    pub const fn scope(&self) -> &OrderScope {
        &self.scope
    }

    /// Filter counters to hand to the next helper.
    #[must_use]
    pub const fn counters(&self) -> FilterCounters {
        FilterCounters {
            token: self.filter.latest(),
            generation: self.filter_debounce.generation(),
        }
    }

    /// Rows in the order they were rendered.
    #[must_use]
    pub fn rows(&self) -> &[OrderRow] {
        &self.rows
    }

    /// Control handles.
    #[must_use]
    pub const fn controls(&self) -> &OrderControls {
        &self.controls
    }

    /// Current preferences.
    #[must_use]
    pub const fn prefs(&self) -> &OrderHelperPrefs {
        &self.prefs
    }

    /// Preferences, mutably; callers persist changes.
    pub fn prefs_mut(&mut self) -> &mut OrderHelperPrefs {
        &mut self.prefs
    }

    /// Whether the filter panel is shown.
    #[must_use]
    pub const fn filter_open(&self) -> bool {
        self.filter_open
    }

    /// Filter run bookkeeping.
    #[must_use]
    pub const fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Index of the row showing `(book, uid)`.
    #[must_use]
    pub fn row_index(&self, book: &str, uid: &Uid) -> Option<usize> {
        self.rows.iter().position(|r| r.book == book && &r.uid == uid)
    }

    /// Whether a row is excluded by the filter.
    #[must_use]
    pub fn is_filtered<V: View>(&self, view: &V, row: usize) -> bool {
        self.rows
            .get(row)
            .is_some_and(|r| view.has_class(r.handles.root, class::FILTERED))
    }

    /// Row indices in the order the rows are currently shown.
    ///
    /// # Errors
    ///
    /// Fails if the table body is stale.
    pub fn visual_order<V: View>(&self, view: &V) -> Result<Vec<usize>> {
        Ok(view
            .children(self.controls.rows)?
            .into_iter()
            .filter_map(|node| self.rows.iter().position(|r| r.handles.root == node))
            .collect())
    }

    /// Moves the row shown at position `from` to position `to`.
    ///
    /// # Errors
    ///
    /// Fails if `from` is out of range or the table body is stale.
    pub fn move_row<V: View>(&self, view: &mut V, from: usize, to: usize) -> Result<()> {
        let mut shown = view.children(self.controls.rows)?;
        if from >= shown.len() {
            return Err(DrawerError::MissingNode(format!("order row #{from}")));
        }
        let node = shown.remove(from);
        let to = to.min(shown.len());
        let anchor = shown.get(to).copied();
        view.insert_before(self.controls.rows, node, anchor)
    }

    /// Assigns orders from the current visual row order.
    ///
    /// Rows are walked top to bottom, or bottom to top for
    /// [`OrderDirection::Up`]. Filtered rows are skipped and do not consume a
    /// step. Each assigned value is written into the cached entry and the
    /// row's order input.
    ///
    /// # Returns
    ///
    /// The touched books in first-touch order; callers save each once.
    ///
    /// # Errors
    ///
    /// Fails if the table body or a row input is stale.
    pub fn apply_order<V: View>(&self, view: &mut V, cache: &mut Cache) -> Result<Vec<String>> {
        let mut order = self.visual_order(view)?;
        if self.prefs.direction == OrderDirection::Up {
            order.reverse();
        }

        let mut value = self.prefs.start;
        let mut touched: Vec<String> = Vec::new();
        for index in order {
            if self.is_filtered(view, index) {
                continue;
            }
            let row = &self.rows[index];
            let Ok(entry) = cache.entry_mut(&row.book, &row.uid) else {
                tracing::debug!(book = %row.book, uid = %row.uid, "skipping row of a vanished entry");
                continue;
            };
            entry.order = Some(value);
            view.update(row.handles.order, ViewPatch::SetValue(value.to_string()))?;
            if !touched.contains(&row.book) {
                touched.push(row.book.clone());
            }
            value = value.saturating_add(self.prefs.step);
        }

        tracing::debug!(books = touched.len(), start = self.prefs.start, step = self.prefs.step, "orders applied");
        Ok(touched)
    }

    /// Shows the direction on the controls.
    ///
    /// # Errors
    ///
    /// Fails if a control node is stale.
    pub fn show_direction<V: View>(&self, view: &mut V) -> Result<()> {
        let direction = self.prefs.direction;
        let other = match direction {
            OrderDirection::Up => OrderDirection::Down,
            OrderDirection::Down => OrderDirection::Up,
        };
        view.update(self.controls.direction, ViewPatch::SetValue(direction.as_str().to_string()))?;
        view.update(self.controls.apply, ViewPatch::remove_class(other.apply_icon()))?;
        view.update(self.controls.apply, ViewPatch::add_class(direction.apply_icon()))
    }

    /// Updates a row's controls from the entry's current values.
    ///
    /// Does nothing when the entry has no row.
    ///
    /// # Errors
    ///
    /// Fails if a row node is stale.
    pub fn sync_entry<V: View>(&self, view: &mut V, book: &str, entry: &Entry) -> Result<()> {
        let Some(index) = self.row_index(book, &entry.uid) else {
            return Ok(());
        };
        let handles = self.rows[index].handles;
        render::set_toggle(view, handles.enabled, !entry.disable)?;
        for field in [RowField::Strategy, RowField::Position, RowField::Depth, RowField::Order, RowField::Probability] {
            view.update(handles.field(field), ViewPatch::SetValue(field.read(entry)))?;
        }
        Ok(())
    }

    /// Shows or hides the filter panel; returns whether it is now shown.
    ///
    /// Opening it previews the first row's filter input.
    ///
    /// # Errors
    ///
    /// Fails if a panel node is stale or the preview cannot be serialized.
    pub fn toggle_filter<V: View>(&mut self, view: &mut V, cache: &Cache) -> Result<bool> {
        self.filter_open = !self.filter_open;
        view.update(self.controls.filter_panel, ViewPatch::class(class::ACTIVE, self.filter_open))?;
        if self.filter_open {
            if let Some(first) = self.rows.first() {
                if let Some(entry) = cache.entry(&first.book, &first.uid) {
                    let preview = filter_input_value(&first.book, entry)?;
                    view.update(self.controls.preview, ViewPatch::SetText(serde_json::to_string_pretty(&preview)?))?;
                }
            }
        }
        Ok(self.filter_open)
    }

    /// Records an edit of the filter script.
    ///
    /// The overlay is refreshed immediately. Returns the debounce generation
    /// the caller must schedule a timer for.
    ///
    /// # Errors
    ///
    /// Fails if the overlay node is stale.
    pub fn edit_filter<V: View>(&mut self, view: &mut V, text: &str) -> Result<u64> {
        self.prefs.filter = text.to_string();
        view.update(self.controls.highlight, ViewPatch::SetSpans(highlight::highlight(text)))?;
        Ok(self.filter_debounce.push(text.to_string()))
    }

    /// Releases the debounced script if `generation` is the newest edit and
    /// the panel is shown.
    pub fn filter_due(&mut self, generation: u64) -> Option<String> {
        let script = self.filter_debounce.fire(generation)?;
        self.filter_open.then_some(script)
    }

    /// Starts a filter run; returns its token.
    pub fn begin_filter(&mut self, script: &str) -> u64 {
        self.filter.begin(script)
    }

    /// Handles the compile result of a run.
    ///
    /// On success every row is marked filtered and the first evaluation is
    /// returned. A failed compile ends the run and leaves the classification
    /// untouched. Stale tokens are ignored.
    ///
    /// # Errors
    ///
    /// Fails if a row node is stale or an input cannot be serialized.
    pub fn filter_compiled<V: View>(&mut self, view: &mut V, cache: &Cache, token: u64, ok: bool) -> Result<Option<FilterStep>> {
        if !self.filter.is_current(token) {
            tracing::debug!(token, "ignoring compile result of a stale filter run");
            return Ok(None);
        }
        if !ok {
            self.filter.abort(token);
            return Ok(None);
        }

        let mut inputs = Vec::with_capacity(self.rows.len());
        for (index, row) in self.rows.iter().enumerate() {
            view.update(row.handles.root, ViewPatch::add_class(class::FILTERED))?;
            if let Some(entry) = cache.entry(&row.book, &row.uid) {
                inputs.push((index, filter_input_value(&row.book, entry)?.to_string()));
            }
        }
        Ok(self.filter.compiled(token, inputs))
    }

    /// Handles one evaluation result and returns the next step.
    ///
    /// Results of stale runs are discarded; an evaluation error ends the run
    /// and leaves the remaining rows as they are.
    ///
    /// # Errors
    ///
    /// Fails if the row node is stale.
    pub fn filter_evaluated<V: View>(
        &mut self,
        view: &mut V,
        token: u64,
        row: usize,
        outcome: &std::result::Result<bool, String>,
    ) -> Result<Option<FilterStep>> {
        if !self.filter.is_current(token) {
            tracing::debug!(token, row, "discarding result of a stale filter run");
            return Ok(None);
        }
        match outcome {
            Ok(keep) => {
                if let Some(r) = self.rows.get(row) {
                    view.update(r.handles.root, ViewPatch::class(class::FILTERED, !keep))?;
                }
                Ok(self.filter.advance(token))
            }
            Err(e) => {
                tracing::debug!(token, row, error = %e, "filter evaluation failed");
                self.filter.abort(token);
                Ok(None)
            }
        }
    }
}

/// Filter input of an entry: its wire fields plus the owning book.
///
/// # Errors
///
/// Propagates serialization failures.
pub fn filter_input_value(book: &str, entry: &Entry) -> Result<Value> {
    let mut fields = entry.to_fields()?;
    fields.insert("book".to_string(), Value::String(book.to_string()));
    Ok(Value::Object(fields))
}

fn render_controls<V: View>(view: &mut V, body: NodeId, scope: &OrderScope, prefs: &OrderHelperPrefs) -> Result<OrderControls> {
    let actions = render::element(view, body, "div", &["stwid--actions"])?;
    let filter_toggle = render::control(view, actions, "div", Control::ToggleFilter, "")?;
    view.update(filter_toggle, ViewPatch::add_class("fa-filter"))?;

    let mut input = |view: &mut V, field: &str, value: String| -> Result<NodeId> {
        let node = render::element(view, actions, "input", &["stwid--input"])?;
        view.update(node, ViewPatch::attr(attr::FIELD, field))?;
        view.update(node, ViewPatch::SetValue(value))?;
        Ok(node)
    };
    let start = input(view, crate::settings::ORDER_START_KEY, prefs.start.to_string())?;
    let step = input(view, crate::settings::ORDER_STEP_KEY, prefs.step.to_string())?;
    let direction = input(view, crate::settings::ORDER_DIRECTION_KEY, prefs.direction.as_str().to_string())?;

    let apply = render::control(view, actions, "div", Control::ApplyOrder, "")?;
    view.update(apply, ViewPatch::add_class(prefs.direction.apply_icon()))?;

    let filter_panel = render::element(view, body, "div", &["stwid--filter"])?;
    let hint = render::element(view, filter_panel, "div", &["stwid--hint"])?;
    let mut hint_text = String::from(
        "Script will be called for each entry in all active books. Every entry for which the script \
         returns true will be kept. Other entries will be filtered out. Use {{var::entry}} to access \
         the entry and its properties.",
    );
    if let OrderScope::Book(book) = scope {
        hint_text.push_str(&format!(" Book context: {book} (entries are scoped to this book)."));
    }
    view.update(hint, ViewPatch::SetText(hint_text))?;
    let highlight = render::element(view, filter_panel, "pre", &["stwid--syntax"])?;
    view.update(highlight, ViewPatch::SetSpans(highlight::highlight(&prefs.filter)))?;
    let filter_input = render::element(view, filter_panel, "textarea", &["stwid--input"])?;
    view.update(filter_input, ViewPatch::attr(attr::FIELD, crate::settings::ORDER_FILTER_KEY))?;
    view.update(filter_input, ViewPatch::SetValue(prefs.filter.clone()))?;
    let preview = render::element(view, filter_panel, "div", &["stwid--preview"])?;

    let table = render::element(view, body, "table", &["stwid--orderTable"])?;
    let head = render::element(view, table, "tr", &[])?;
    for column in COLUMNS {
        let th = render::element(view, head, "th", &[])?;
        view.update(th, ViewPatch::SetText(column.to_string()))?;
    }
    let rows = render::element(view, table, "tbody", &[])?;

    Ok(OrderControls {
        start,
        step,
        direction,
        apply,
        filter_toggle,
        filter_panel,
        filter_input,
        highlight,
        preview,
        rows,
    })
}

fn render_row<V: View>(view: &mut V, rows: NodeId, book: &str, entry: &Entry) -> Result<OrderRowHandles> {
    let root = render::element(view, rows, "tr", &[])?;
    view.update(root, ViewPatch::attr(attr::BOOK, book))?;
    view.update(root, ViewPatch::attr(attr::UID, entry.uid.to_string()))?;

    let handle = render::element(view, root, "td", &["stwid--sortableHandle"])?;
    view.update(handle, ViewPatch::SetText("☰".to_string()))?;

    let enabled = render::control(view, root, "td", Control::ToggleEntry, "")?;
    view.update(enabled, ViewPatch::add_class(render::toggle_class(!entry.disable)))?;

    let cell = render::element(view, root, "td", &["stwid--entry"])?;
    for (class_name, text) in [("stwid--book", book.to_string()), ("stwid--comment", entry.comment.clone()), ("stwid--key", entry.keywords())] {
        let label = render::element(view, cell, "div", &[class_name])?;
        view.update(label, ViewPatch::SetText(text))?;
    }

    let mut field = |view: &mut V, field: RowField| -> Result<NodeId> {
        let node = render::element(view, root, "td", &["stwid--input"])?;
        view.update(node, ViewPatch::attr(attr::FIELD, field.as_str()))?;
        view.update(node, ViewPatch::SetValue(field.read(entry)))?;
        Ok(node)
    };

    Ok(OrderRowHandles {
        root,
        enabled,
        strategy: field(view, RowField::Strategy)?,
        position: field(view, RowField::Position)?,
        depth: field(view, RowField::Depth)?,
        order: field(view, RowField::Order)?,
        probability: field(view, RowField::Probability)?,
    })
}
