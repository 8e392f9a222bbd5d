//! Drawer state and the operations event handlers compose.
//!
//! [`Drawer`] owns everything the drawer knows: the host it talks to, the view
//! it renders into, the entry cache, the panel slot, the selection and the
//! debouncers. It is created by [`Drawer::mount`] and dropped at unmount; there
//! is no global state.
//!
//! # State Components
//!
//! - **Cache**: book name → entries and view handles, kept in sync by passes
//! - **Editor host**: the panel slot (editor, order helper, activation settings)
//! - **Selection**: the multi-select of one book
//! - **Debouncers**: reconcile passes, sort settings saves
//! - **Search**: book list query and the active-only filter

use crate::app::{Action, TimerId, TimerKind};
use crate::cache::Cache;
use crate::domain::error::{DrawerError, Result};
use crate::domain::{BookData, SortPreset, Uid};
use crate::editor::{ActivePanel, EditorHost};
use crate::host::WorldInfoHost;
use crate::order_helper::{OrderHelper, OrderScope};
use crate::reconcile::{self, Debouncer, FollowUp, ListTarget, PassReport, PassSignals};
use crate::render::{self, class, DrawerLayout};
use crate::selection::SelectionController;
use crate::settings::{KeyValueStore, OrderHelperPrefs, SortSettings};
use crate::view::{View, ViewPatch};
use crate::Config;

/// Book list search state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    /// Query typed into the search box.
    pub query: String,
    /// Whether entry titles are searched as well.
    pub entries: bool,
    /// Whether only globally active books are shown.
    pub active_only: bool,
}

/// Arguments of a pending reconciliation pass.
pub type PendingPass = Option<(String, BookData)>;

/// The mounted drawer.
pub struct Drawer<H, V> {
    /// Host owning the books.
    pub host: H,
    /// Rendering backend.
    pub view: V,
    /// Order helper preference store.
    pub store: Box<dyn KeyValueStore>,
    /// Runtime configuration.
    pub config: Config,
    /// Fixed chrome handles.
    pub layout: DrawerLayout,
    /// Entry cache.
    pub cache: Cache,
    /// Panel slot.
    pub editor: EditorHost,
    /// Multi-select state.
    pub selection: SelectionController,
    /// Current sort settings.
    pub sort: SortSettings,
    /// Book list search.
    pub search: SearchState,
    /// Debounced reconciliation passes.
    pub reconcile: Debouncer<PendingPass>,
    /// Debounced sort settings saves.
    pub settings_save: Debouncer<()>,
    /// Pass counters and follow-ups.
    pub signals: PassSignals,
}

impl<H, V> Drawer<H, V>
where
    H: WorldInfoHost,
    V: View,
{
    /// Renders the chrome, loads every book and returns the mounted drawer.
    ///
    /// # Parameters
    ///
    /// * `host` - Host owning the books and settings
    /// * `view` - Empty rendering backend
    /// * `store` - Store of the order helper preferences
    /// * `config` - Runtime configuration
    ///
    /// # Errors
    ///
    /// Propagates host read failures and view errors of the initial load.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lorebook_drawer::app::Drawer;
    /// use lorebook_drawer::host::{MemoryHost, WorldInfoHost};
    /// use lorebook_drawer::settings::MemoryStore;
    /// use lorebook_drawer::view::ViewTree;
    /// use lorebook_drawer::Config;
    ///
    /// let mut host = MemoryHost::new();
    /// host.create_world_info("Lore")?;
    /// let drawer = Drawer::mount(host, ViewTree::new(), Box::new(MemoryStore::new()), Config::default())?;
    /// assert!(drawer.cache.contains("Lore"));
    /// # Ok::<(), lorebook_drawer::DrawerError>(())
    /// ```
    pub fn mount(host: H, mut view: V, store: Box<dyn KeyValueStore>, config: Config) -> Result<Self> {
        let sort = SortSettings::load(&host, &config.settings_key);
        let layout = render::render_layout(&mut view, sort.preset().label())?;
        let editor = EditorHost::new(layout.editor, layout.activation_toggle, layout.order_toggle);

        let mut drawer = Self {
            host,
            view,
            store,
            config,
            layout,
            cache: Cache::new(),
            editor,
            selection: SelectionController::new(),
            sort,
            search: SearchState::default(),
            reconcile: Debouncer::new(),
            settings_save: Debouncer::new(),
            signals: PassSignals::default(),
        };
        drawer.load()?;
        tracing::debug!(books = drawer.cache.len(), preset = drawer.sort.preset().label(), "drawer mounted");
        Ok(drawer)
    }

    /// Where and how books are rendered.
    #[must_use]
    pub fn target(&self) -> ListTarget {
        ListTarget {
            books: self.layout.books,
            preset: self.sort.preset(),
        }
    }

    /// Loads every host book into the list, toggling the loading mark.
    ///
    /// # Errors
    ///
    /// Propagates host read failures and view errors.
    pub fn load(&mut self) -> Result<usize> {
        self.view.update(self.layout.body, ViewPatch::add_class(class::LOADING))?;
        let target = self.target();
        let loaded = reconcile::load_list(&self.host, &mut self.view, &mut self.cache, target)?;
        self.view.update(self.layout.body, ViewPatch::remove_class(class::LOADING))?;
        Ok(loaded)
    }

    /// Closes every panel, drops the cache and view, reloads and re-applies the
    /// search.
    ///
    /// # Errors
    ///
    /// Propagates host read failures and view errors.
    pub fn refresh(&mut self) -> Result<()> {
        let _span = tracing::debug_span!("refresh").entered();
        self.selection.end(&mut self.view, &self.cache, self.layout.books)?;
        self.editor.set_active_panel(&mut self.view, ActivePanel::None)?;
        self.reconcile.cancel();
        self.cache.clear();
        self.view.clear(self.layout.books)?;
        self.load()?;
        self.apply_search()
    }

    /// Schedules a debounced pass; the latest arguments win.
    pub fn schedule_pass(&mut self, changed: PendingPass) -> Action {
        let generation = self.reconcile.push(changed);
        Action::ScheduleTimer {
            id: TimerId::new(TimerKind::Reconcile, generation),
            delay_ms: self.config.reconcile_debounce_ms,
        }
    }

    /// Runs one reconciliation pass right away and performs its follow-ups.
    ///
    /// Besides the pass itself this rebuilds the editor when the pass asks for
    /// it, mirrors changed entries into the order helper, re-applies the search
    /// and reveals books registered with [`PassSignals::after_next_pass`].
    ///
    /// # Errors
    ///
    /// Propagates pass failures. Follow-ups stay registered for the next pass
    /// when this one fails.
    pub fn run_pass(&mut self, changed: Option<(&str, &BookData)>) -> Result<Vec<Action>> {
        self.signals.start();
        let target = self.target();
        let outcome = reconcile::run_pass(&self.host, &mut self.view, &mut self.cache, &mut self.editor, target, changed);
        let follow_ups = self.signals.finish();
        let report = match outcome {
            Ok(report) => report,
            Err(e) => {
                for follow_up in follow_ups {
                    self.signals.after_next_pass(follow_up);
                }
                return Err(e);
            }
        };

        let mut actions = self.after_pass(changed.map(|(name, _)| name), &report)?;
        for follow_up in follow_ups {
            match follow_up {
                FollowUp::RevealBook(name) => actions.extend(self.reveal_book(&name)?),
            }
        }
        Ok(actions)
    }

    fn after_pass(&mut self, changed: Option<&str>, report: &PassReport) -> Result<Vec<Action>> {
        let mut actions = Vec::new();
        if report.refresh_editor {
            if let Some((book, uid)) = self.editor.current_editor().map(|(b, u)| (b.to_string(), u.clone())) {
                actions.push(self.open_editor(&book, &uid)?);
            }
        }
        if let (Some(book), Some(helper)) = (changed, self.editor.order_helper()) {
            for uid in &report.changed_entries {
                if let Some(entry) = self.cache.entry(book, uid) {
                    helper.sync_entry(&mut self.view, book, entry)?;
                }
            }
        }
        if !report.is_noop() && (!self.search.query.is_empty() || self.search.active_only) {
            self.apply_search()?;
        }
        Ok(actions)
    }

    /// Expands a book and scrolls it into view. Unknown books are skipped.
    ///
    /// # Errors
    ///
    /// Fails if the book's nodes are stale.
    pub fn reveal_book(&mut self, name: &str) -> Result<Option<Action>> {
        if !self.cache.contains(name) {
            tracing::debug!(book = %name, "book to reveal is not listed");
            return Ok(None);
        }
        reconcile::set_collapsed(&mut self.view, &mut self.cache, name, false)?;
        let root = self.cache.require(name)?.handles.root;
        Ok(Some(Action::ScrollIntoView(root)))
    }

    /// Opens the editor for an entry, always rebuilding from the cache.
    ///
    /// # Errors
    ///
    /// Fails with [`DrawerError::UnknownEntry`] when the entry is not cached.
    pub fn open_editor(&mut self, book: &str, uid: &Uid) -> Result<Action> {
        let row = self.cache.row(book, uid)?.root;
        let token = self.editor.begin_editor(&mut self.view, book, uid, row)?;
        Ok(Action::BuildEditor {
            token,
            book: book.to_string(),
            uid: uid.clone(),
        })
    }

    /// Opens the order helper for `scope`, replacing any other panel.
    ///
    /// # Errors
    ///
    /// Propagates view errors.
    pub fn open_order_helper(&mut self, scope: OrderScope) -> Result<()> {
        let prefs = OrderHelperPrefs::load(self.store.as_ref());
        let active = self.host.selected_world_info();
        let cache = &self.cache;
        self.editor
            .open_order_helper(&mut self.view, |view, root, counters| {
                OrderHelper::open(view, root, scope, cache, &active, prefs, counters)
            })
    }

    /// Saves a cached book through the host.
    ///
    /// # Errors
    ///
    /// Propagates host write failures.
    pub fn save_book(&mut self, name: &str) -> Result<()> {
        let data = self.cache.require(name)?.to_data();
        self.host.save_world_info(name, &data, true)
    }

    /// Switches the sort preset and re-sorts every book.
    ///
    /// # Errors
    ///
    /// Propagates view errors.
    pub fn set_preset(&mut self, preset: SortPreset) -> Result<Action> {
        self.sort = SortSettings::from(preset);
        self.view
            .update(self.layout.sort_select, ViewPatch::SetValue(preset.label().to_string()))?;
        let mut moved = 0;
        for name in self.cache.names() {
            if reconcile::resort_book(&mut self.view, &self.cache, &name, preset)? {
                moved += 1;
            }
        }
        tracing::debug!(preset = preset.label(), moved, "sort preset changed");
        let generation = self.settings_save.push(());
        Ok(Action::ScheduleTimer {
            id: TimerId::new(TimerKind::SettingsSave, generation),
            delay_ms: self.config.settings_debounce_ms,
        })
    }

    /// Applies the search query and the active-only filter to the list.
    ///
    /// A book matches when its name contains the query; with entry search on
    /// it also matches when an entry title does, and non-matching entries of
    /// a shown book are hidden.
    ///
    /// # Errors
    ///
    /// Fails if a cached node is stale.
    pub fn apply_search(&mut self) -> Result<()> {
        let query = self.search.query.to_lowercase();
        let active = self.host.selected_world_info();
        let mut shown = 0;

        for (name, book) in self.cache.iter() {
            let book_match = name.to_lowercase().contains(&query);
            let entry_match = |comment: &str| book_match || comment.to_lowercase().contains(&query);
            let visible = query.is_empty()
                || book_match
                || (self.search.entries && book.entries.values().any(|e| entry_match(&e.comment)));

            self.view.update(book.handles.root, ViewPatch::class(class::FILTER_QUERY, !visible))?;
            for (uid, row) in &book.rows {
                let hide = !query.is_empty()
                    && self.search.entries
                    && !book.entries.get(uid).is_some_and(|e| entry_match(&e.comment));
                self.view.update(row.root, ViewPatch::class(class::FILTER_QUERY, hide))?;
            }

            let inactive = self.search.active_only && !active.contains(name);
            self.view.update(book.handles.root, ViewPatch::class(class::FILTER_ACTIVE, inactive))?;
            if visible && !inactive {
                shown += 1;
            }
        }

        tracing::debug!(query = %query, entries = self.search.entries, active_only = self.search.active_only, shown, "search applied");
        Ok(())
    }

    /// Entry lookup that reports a missing entry as an error.
    ///
    /// # Errors
    ///
    /// Returns [`DrawerError::UnknownEntry`] when the entry is not cached.
    pub fn require_entry(&self, book: &str, uid: &Uid) -> Result<&crate::domain::Entry> {
        self.cache.entry(book, uid).ok_or_else(|| DrawerError::UnknownEntry {
            book: book.to_string(),
            uid: uid.to_string(),
        })
    }
}
