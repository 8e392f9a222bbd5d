//! Trailing debounce with generation counters, plus pass completion signals.
//!
//! A [`Debouncer`] never owns a timer. Each [`Debouncer::push`] stores the
//! latest arguments and returns a new generation; the caller schedules a timer
//! carrying that generation. When a timer fires, [`Debouncer::fire`] hands out
//! the pending arguments only if no newer push happened in between, so a burst
//! of notifications collapses into one run with the arguments of the last one.

/// Trailing-edge debouncer keyed by generation.
///
/// # Example
///
/// ```rust
/// use lorebook_drawer::reconcile::Debouncer;
///
/// let mut debounce = Debouncer::new();
/// let first = debounce.push("a");
/// let second = debounce.push("b");
///
/// assert_eq!(debounce.fire(first), None);
/// assert_eq!(debounce.fire(second), Some("b"));
/// assert_eq!(debounce.fire(second), None);
/// ```
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    generation: u64,
    pending: Option<T>,
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            pending: None,
        }
    }
}

impl<T> Debouncer<T> {
    /// Creates an idle debouncer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an idle debouncer whose next push follows `generation`, so
    /// timers scheduled by an earlier instance never match.
    #[must_use]
    pub const fn resume_after(generation: u64) -> Self {
        Self {
            generation,
            pending: None,
        }
    }

    /// Stores `args` as the pending run and returns the generation a timer
    /// must carry to release it.
    pub fn push(&mut self, args: T) -> u64 {
        self.generation += 1;
        self.pending = Some(args);
        self.generation
    }

    /// Releases the pending arguments if `generation` is the newest one.
    pub fn fire(&mut self, generation: u64) -> Option<T> {
        if generation == self.generation {
            self.pending.take()
        } else {
            None
        }
    }

    /// Drops the pending run; outstanding timers become no-ops.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.pending = None;
    }

    /// Whether a run is waiting for its timer.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Newest generation handed out.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// Work deferred until the next reconciliation pass finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// Expand a book and scroll it into view.
    RevealBook(String),
}

/// Pass counters and the follow-ups waiting for the next finished pass.
#[derive(Debug, Clone, Default)]
pub struct PassSignals {
    started: u64,
    finished: u64,
    waiters: Vec<FollowUp>,
}

impl PassSignals {
    /// Registers work for when the next pass finishes.
    pub fn after_next_pass(&mut self, follow_up: FollowUp) {
        self.waiters.push(follow_up);
    }

    /// Records the start of a pass.
    pub fn start(&mut self) {
        self.started += 1;
    }

    /// Records the end of a pass and returns the follow-ups it releases.
    pub fn finish(&mut self) -> Vec<FollowUp> {
        self.finished += 1;
        std::mem::take(&mut self.waiters)
    }

    /// Passes started so far.
    #[must_use]
    pub const fn started(&self) -> u64 {
        self.started
    }

    /// Passes finished so far.
    #[must_use]
    pub const fn finished(&self) -> u64 {
        self.finished
    }

    /// Follow-ups still waiting.
    #[must_use]
    pub fn waiting(&self) -> &[FollowUp] {
        &self.waiters
    }
}
