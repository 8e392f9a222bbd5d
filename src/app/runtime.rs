//! Headless runtime executing drawer actions on a virtual clock.
//!
//! The runtime plays the embedder's part: it feeds events to
//! [`handle_event`], performs the returned actions and turns their outcomes
//! back into events. Host notifications raised by a handler are drained after
//! every event, the way a browser host fires its update events after a save.
//!
//! Timers run on a virtual clock that only moves through
//! [`Runtime::advance`] or [`Runtime::settle`], which makes debounce behaviour
//! deterministic.
//!
//! ```text
//! dispatch(event) ──▶ handle_event ──▶ actions ──▶ execute
//!        ▲                                            │
//!        └──── EditorBuilt / FilterCompiled / ... ◀───┘
//!        └──── Host(notification) ◀── drain_notifications
//! ```

use crate::app::{handle_event, Action, Drawer, Event, TimerId, Toast};
use crate::domain::error::{DrawerError, Result};
use crate::host::{FormFactory, ScriptEngine, WorldInfoHost};
use crate::settings::KeyValueStore;
use crate::view::{NodeId, View};
use crate::Config;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingTimer {
    due_ms: u64,
    seq: u64,
    id: TimerId,
}

/// A drawer plus the collaborators that answer its actions.
pub struct Runtime<H, V, F, E> {
    /// The driven drawer.
    pub drawer: Drawer<H, V>,
    forms: F,
    scripts: E,
    now_ms: u64,
    seq: u64,
    timers: Vec<PendingTimer>,
    queue: VecDeque<Event>,
    deferred: Vec<Action>,
    /// Hold form builds and filter steps until [`Runtime::complete_deferred`].
    pub defer_work: bool,
    /// Toasts currently shown.
    pub toasts: Vec<Toast>,
    /// Downloads offered so far, as `(file_name, json)`.
    pub downloads: Vec<(String, String)>,
    /// Nodes scrolled into view, oldest first.
    pub scrolled: Vec<NodeId>,
    /// Handler failures, oldest first.
    pub errors: Vec<String>,
}

impl<H, V, F, E> Runtime<H, V, F, E>
where
    H: WorldInfoHost,
    V: View,
    F: FormFactory,
    E: ScriptEngine,
{
    /// Mounts a drawer and wraps it.
    ///
    /// # Errors
    ///
    /// Propagates failures of [`Drawer::mount`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use lorebook_drawer::app::Runtime;
    /// use lorebook_drawer::host::{MacroEngine, MemoryHost, PlainFormFactory};
    /// use lorebook_drawer::settings::MemoryStore;
    /// use lorebook_drawer::view::ViewTree;
    /// use lorebook_drawer::Config;
    ///
    /// let runtime = Runtime::mount(
    ///     MemoryHost::new(),
    ///     ViewTree::new(),
    ///     Box::new(MemoryStore::new()),
    ///     Config::default(),
    ///     PlainFormFactory,
    ///     MacroEngine,
    /// )?;
    /// assert_eq!(runtime.now_ms(), 0);
    /// # Ok::<(), lorebook_drawer::DrawerError>(())
    /// ```
    pub fn mount(host: H, view: V, store: Box<dyn KeyValueStore>, config: Config, forms: F, scripts: E) -> Result<Self> {
        let drawer = Drawer::mount(host, view, store, config)?;
        Ok(Self::new(drawer, forms, scripts))
    }

    /// Wraps an already mounted drawer.
    #[must_use]
    pub fn new(drawer: Drawer<H, V>, forms: F, scripts: E) -> Self {
        Self {
            drawer,
            forms,
            scripts,
            now_ms: 0,
            seq: 0,
            timers: Vec::new(),
            queue: VecDeque::new(),
            deferred: Vec::new(),
            defer_work: false,
            toasts: Vec::new(),
            downloads: Vec::new(),
            scrolled: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Current virtual time.
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Number of timers not yet fired.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// The script engine answering filter runs.
    #[must_use]
    pub const fn scripts(&self) -> &E {
        &self.scripts
    }

    /// Actions held back while [`Runtime::defer_work`] is set.
    #[must_use]
    pub fn deferred(&self) -> &[Action] {
        &self.deferred
    }

    /// Processes `event` and everything it cascades into.
    ///
    /// Handler failures are logged and recorded in [`Runtime::errors`]; the
    /// cascade continues with the remaining events.
    ///
    /// # Errors
    ///
    /// Returns the first handler failure of the cascade.
    pub fn dispatch(&mut self, event: Event) -> Result<()> {
        self.queue.push_back(event);
        let mut first_error = None;

        while let Some(event) = self.queue.pop_front() {
            match handle_event(&mut self.drawer, &event) {
                Ok(actions) => {
                    for action in actions {
                        self.execute(action);
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, event = ?event, "event handler failed");
                    self.errors.push(e.to_string());
                    first_error.get_or_insert(e);
                }
            }
            for notification in self.drawer.host.drain_notifications() {
                self.queue.push_back(Event::Host(notification));
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Moves the clock forward by `ms`, firing due timers in order.
    ///
    /// # Errors
    ///
    /// Returns the first handler failure among the fired timers.
    pub fn advance(&mut self, ms: u64) -> Result<()> {
        let target = self.now_ms.saturating_add(ms);
        let mut result = Ok(());
        while let Some(index) = self.next_due(target) {
            let timer = self.timers.remove(index);
            self.now_ms = timer.due_ms;
            tracing::trace!(kind = ?timer.id.kind, generation = timer.id.generation, now_ms = self.now_ms, "timer fired");
            let fired = self.dispatch(Event::TimerElapsed(timer.id));
            if result.is_ok() {
                result = fired;
            }
        }
        self.now_ms = target;
        result
    }

    /// Fires timers until none are left.
    ///
    /// # Errors
    ///
    /// Returns the first handler failure among the fired timers.
    pub fn settle(&mut self) -> Result<()> {
        let mut result = Ok(());
        while let Some(last) = self.timers.iter().map(|t| t.due_ms).max() {
            let fired = self.advance(last.saturating_sub(self.now_ms));
            if result.is_ok() {
                result = fired;
            }
        }
        result
    }

    /// Performs the deferred action at `index` and dispatches its outcome.
    ///
    /// # Errors
    ///
    /// Fails with [`DrawerError::Host`] for an invalid index, otherwise returns
    /// the first handler failure of the cascade.
    pub fn complete_deferred(&mut self, index: usize) -> Result<()> {
        if index >= self.deferred.len() {
            return Err(DrawerError::Host(format!("no deferred action #{index}")));
        }
        let action = self.deferred.remove(index);
        match self.perform(action) {
            Some(event) => self.dispatch(event),
            None => Ok(()),
        }
    }

    fn next_due(&self, target: u64) -> Option<usize> {
        self.timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= target)
            .min_by_key(|(_, t)| (t.due_ms, t.seq))
            .map(|(i, _)| i)
    }

    fn execute(&mut self, action: Action) {
        let deferrable = matches!(
            action,
            Action::BuildEditor { .. } | Action::CompileFilter { .. } | Action::EvaluateFilter(_)
        );
        if deferrable && self.defer_work {
            self.deferred.push(action);
            return;
        }
        if let Some(event) = self.perform(action) {
            self.queue.push_back(event);
        }
    }

    /// Performs an action; returns the event answering it, if any.
    fn perform(&mut self, action: Action) -> Option<Event> {
        match action {
            Action::ScheduleTimer { id, delay_ms } => {
                self.seq += 1;
                self.timers.push(PendingTimer {
                    due_ms: self.now_ms.saturating_add(delay_ms),
                    seq: self.seq,
                    id,
                });
                None
            }
            Action::BuildEditor { token, book, uid } => {
                let built = self.drawer.cache.require(&book).and_then(|cached| {
                    let data = cached.to_data();
                    let entry = self.drawer.require_entry(&book, &uid)?;
                    self.forms.build_form(&book, &data, entry)
                });
                match built {
                    Ok(form) => Some(Event::EditorBuilt { token, form }),
                    Err(e) => {
                        tracing::debug!(book = %book, uid = %uid, error = %e, "editor build failed");
                        self.errors.push(e.to_string());
                        None
                    }
                }
            }
            Action::CompileFilter { token, script } => {
                let ok = match self.scripts.compile(&script) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::debug!(token, error = %e, "filter script does not compile");
                        false
                    }
                };
                Some(Event::FilterCompiled { token, ok })
            }
            Action::EvaluateFilter(step) => {
                let outcome = self
                    .scripts
                    .evaluate(&step.script, &step.input)
                    .map_err(|e| e.to_string());
                Some(Event::FilterEvaluated {
                    token: step.token,
                    row: step.row,
                    outcome,
                })
            }
            Action::ShowToast { toast, title, lines } => {
                tracing::debug!(toast = ?toast, title = %title, lines = lines.len(), "toast shown");
                if !self.toasts.contains(&toast) {
                    self.toasts.push(toast);
                }
                None
            }
            Action::HideToast(toast) => {
                self.toasts.retain(|t| *t != toast);
                None
            }
            Action::Download { file_name, json } => {
                tracing::debug!(file_name = %file_name, bytes = json.len(), "download offered");
                self.downloads.push((file_name, json));
                None
            }
            Action::ScrollIntoView(node) => {
                self.scrolled.push(node);
                None
            }
        }
    }
}
