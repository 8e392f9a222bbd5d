//! Actions representing side effects to be executed by the runtime.
//!
//! The event handler never waits. Every suspension point of the drawer (a
//! debounce delay, building the entry form, compiling or evaluating the filter
//! script) is returned as an [`Action`]; the runtime performs it and feeds the
//! outcome back as an [`crate::app::Event`]. User-facing effects that belong to
//! the embedder (toasts, downloads, scrolling) travel the same way.
//!
//! # Example
//!
//! ```rust
//! use lorebook_drawer::app::{Action, TimerId, TimerKind};
//!
//! let action = Action::ScheduleTimer {
//!     id: TimerId::new(TimerKind::Reconcile, 1),
//!     delay_ms: 300,
//! };
//! assert!(matches!(action, Action::ScheduleTimer { .. }));
//! ```

use crate::domain::Uid;
use crate::order_helper::filter::FilterStep;
use crate::view::NodeId;
use serde::{Deserialize, Serialize};

/// Debounced work a timer releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Reconciliation pass after host notifications.
    Reconcile,
    /// Order helper filter run after script edits.
    Filter,
    /// Sort settings save after a preset change.
    SettingsSave,
}

/// A scheduled timer: its kind and the debounce generation it releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId {
    /// What the timer releases.
    pub kind: TimerKind,
    /// Debounce generation at scheduling time.
    pub generation: u64,
}

impl TimerId {
    /// Creates a timer id.
    #[must_use]
    pub const fn new(kind: TimerKind, generation: u64) -> Self {
        Self { kind, generation }
    }
}

/// Toasts the drawer raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Toast {
    /// Multi-select help, shown while a selection is active.
    SelectionHelp,
}

/// Commands representing side effects to be executed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Deliver [`crate::app::Event::TimerElapsed`] with `id` after `delay_ms`.
    ScheduleTimer {
        /// Timer to deliver.
        id: TimerId,
        /// Delay in milliseconds.
        delay_ms: u64,
    },

    /// Build the entry form and answer with
    /// [`crate::app::Event::EditorBuilt`].
    BuildEditor {
        /// Build token, echoed back.
        token: u64,
        /// Book of the entry.
        book: String,
        /// Entry to build the form for.
        uid: Uid,
    },

    /// Compile a filter script and answer with
    /// [`crate::app::Event::FilterCompiled`].
    CompileFilter {
        /// Run token, echoed back.
        token: u64,
        /// Script text.
        script: String,
    },

    /// Evaluate the filter for one row and answer with
    /// [`crate::app::Event::FilterEvaluated`].
    EvaluateFilter(FilterStep),

    /// Show a toast until the matching [`Action::HideToast`].
    ShowToast {
        /// Which toast.
        toast: Toast,
        /// Toast title.
        title: String,
        /// Toast lines.
        lines: Vec<String>,
    },

    /// Remove a toast.
    HideToast(Toast),

    /// Offer a file download.
    Download {
        /// Suggested file name.
        file_name: String,
        /// File content.
        json: String,
    },

    /// Scroll a node into view.
    ScrollIntoView(NodeId),
}
