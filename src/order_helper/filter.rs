//! Token-guarded filter runs.
//!
//! A run starts with a compile request and then evaluates one row at a time.
//! Every run gets a fresh token; only the newest token may make progress, so a
//! run overtaken by a newer edit stops at its next step and never touches the
//! row classification again.
//!
//! ```text
//! begin ──▶ CompileFilter ──▶ compiled(ok) ──▶ EvaluateFilter ─┐
//!                                 │                ▲            │
//!                                 │ (err: done)    └─ evaluated ┘ (until queue empty)
//! ```

use std::collections::VecDeque;

/// One evaluation to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterStep {
    /// Run token.
    pub token: u64,
    /// Row index in the order helper table.
    pub row: usize,
    /// Entry JSON bound as the script input.
    pub input: String,
    /// Script text.
    pub script: String,
}

#[derive(Debug, Clone)]
struct FilterRun {
    token: u64,
    script: String,
    queue: VecDeque<(usize, String)>,
}

/// Filter run bookkeeping of one order helper.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    latest: u64,
    run: Option<FilterRun>,
}

impl FilterState {
    /// Idle state whose next run gets a token above `latest`.
    #[must_use]
    pub const fn resume_after(latest: u64) -> Self {
        Self { latest, run: None }
    }

    /// Starts a run for `script` and returns its token.
    ///
    /// Any run in progress becomes stale.
    pub fn begin(&mut self, script: &str) -> u64 {
        self.latest += 1;
        self.run = Some(FilterRun {
            token: self.latest,
            script: script.to_string(),
            queue: VecDeque::new(),
        });
        tracing::debug!(token = self.latest, "filter run started");
        self.latest
    }

    /// Whether `token` belongs to the run in progress.
    #[must_use]
    pub fn is_current(&self, token: u64) -> bool {
        self.run.as_ref().is_some_and(|run| run.token == token)
    }

    /// Newest token handed out.
    #[must_use]
    pub const fn latest(&self) -> u64 {
        self.latest
    }

    /// Queues the row inputs after a successful compile and returns the first
    /// step. Returns `None` for a stale token or an empty table.
    pub fn compiled(&mut self, token: u64, inputs: Vec<(usize, String)>) -> Option<FilterStep> {
        let run = self.run.as_mut().filter(|run| run.token == token)?;
        run.queue = inputs.into();
        self.advance(token)
    }

    /// Returns the next step of the run, finishing it when the queue is empty.
    pub fn advance(&mut self, token: u64) -> Option<FilterStep> {
        let run = self.run.as_mut().filter(|run| run.token == token)?;
        if let Some((row, input)) = run.queue.pop_front() {
            return Some(FilterStep {
                token,
                row,
                input,
                script: run.script.clone(),
            });
        }
        tracing::debug!(token, "filter run finished");
        self.run = None;
        None
    }

    /// Ends the run if `token` is current.
    pub fn abort(&mut self, token: u64) {
        if self.is_current(token) {
            tracing::debug!(token, "filter run aborted");
            self.run = None;
        }
    }
}
