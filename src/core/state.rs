//! # Reporter lifecycle state.
//!
//! ```text
//! Created ──► Running ──► Terminating ──► Terminated
//!    │                                        ▲
//!    └────────────────────────────────────────┘  (terminated before first cycle)
//! ```
//!
//! Transitions only move forward. The worker owns the sender half of a
//! `tokio::sync::watch` channel; handles observe the current state.

use std::fmt;

use tokio::sync::watch;

/// Lifecycle state of one reporter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReporterState {
    /// Spawned; the worker has not run its first cycle yet.
    Created,
    /// Servicing its mailbox, timer and termination signal.
    Running,
    /// Termination observed; releasing the timer and leaving the loop.
    Terminating,
    /// The loop has exited. Terminal.
    Terminated,
}

impl ReporterState {
    /// Returns a short stable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReporterState::Created => "created",
            ReporterState::Running => "running",
            ReporterState::Terminating => "terminating",
            ReporterState::Terminated => "terminated",
        }
    }

    /// True if `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: ReporterState) -> bool {
        next > self
    }
}

impl fmt::Display for ReporterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Worker-side owner of the lifecycle state.
pub(crate) struct StateCell {
    tx: watch::Sender<ReporterState>,
}

impl StateCell {
    /// Creates a cell in `Created` and a receiver for the handle.
    pub(crate) fn new() -> (Self, watch::Receiver<ReporterState>) {
        let (tx, rx) = watch::channel(ReporterState::Created);
        (Self { tx }, rx)
    }

    /// Moves to `next`; backwards or repeated transitions are ignored.
    pub(crate) fn advance(&self, next: ReporterState) -> bool {
        self.tx.send_if_modified(|cur| {
            if cur.can_advance_to(next) {
                *cur = next;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn get(&self) -> ReporterState {
        *self.tx.borrow()
    }
}
