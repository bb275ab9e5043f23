//! # Per-reporter cycle statistics.
//!
//! [`ReportStats`] is a built-in stateful subscriber that counts cycle
//! outcomes per reporter. It is the cheapest way for operators (or tests) to
//! see whether a reporter is writing, stuck on conflicts or starved by a
//! failing populator.
//!
//! ## Architecture
//! ```text
//! Reporter ──► Bus ──► subscriber_listener() ──► ReportStats::on_event()
//!                                                      │
//!                                                      ▼
//!                                     HashMap<String, ReporterStats>
//! ```
//!
//! ## Rules
//! - Only cycle events (`StatusWritten`, `StatusUnchanged`, `PopulateFailed`,
//!   `WriteConflict`, `WriteExhausted`) change counters.
//! - `ReporterRemoved` drops the entry; a re-created reporter starts from zero.
//! - Events with `seq <= last_seq` for a reporter are ignored (stale).
//! - Reads are eventually consistent with the bus.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::events::{Event, EventKind};
use crate::resource::ResourceVersion;
use crate::subscribers::Subscribe;

/// Counters for one reporter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReporterStats {
    /// Successful writes.
    pub written: u64,
    /// Cycles that ended without a write because nothing changed.
    pub unchanged: u64,
    /// Cycles aborted by a populator failure.
    pub populate_failures: u64,
    /// Writes rejected as stale.
    pub conflicts: u64,
    /// Cycles that ran out of write attempts.
    pub exhausted: u64,
    /// Version of the last successful write.
    pub last_version: Option<ResourceVersion>,
    last_seq: u64,
}

/// Thread-safe per-reporter counters fed by the event bus.
#[derive(Default)]
pub struct ReportStats {
    state: RwLock<HashMap<String, ReporterStats>>,
}

impl ReportStats {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event; returns `true` if a counter changed.
    pub async fn update(&self, ev: &Event) -> bool {
        let Some(name) = ev.reporter.as_deref() else {
            return false;
        };

        let mut state = self.state.write().await;
        if ev.kind == EventKind::ReporterRemoved {
            return state.remove(name).is_some();
        }

        let entry = state.entry(name.to_string()).or_default();
        if ev.seq <= entry.last_seq && entry.last_seq != 0 {
            return false;
        }
        entry.last_seq = ev.seq;

        match ev.kind {
            EventKind::StatusWritten => {
                entry.written += 1;
                entry.last_version = ev.version;
            }
            EventKind::StatusUnchanged => entry.unchanged += 1,
            EventKind::PopulateFailed => entry.populate_failures += 1,
            EventKind::WriteConflict => entry.conflicts += 1,
            EventKind::WriteExhausted => entry.exhausted += 1,
            _ => return false,
        }
        true
    }

    /// Returns the counters of `name`, if it has been seen.
    pub async fn get(&self, name: &str) -> Option<ReporterStats> {
        self.state.read().await.get(name).cloned()
    }

    /// Returns all counters, sorted by reporter name.
    pub async fn snapshot(&self) -> Vec<(String, ReporterStats)> {
        let state = self.state.read().await;
        let mut all: Vec<_> = state
            .iter()
            .map(|(name, stats)| (name.clone(), stats.clone()))
            .collect();
        all.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

#[async_trait]
impl Subscribe for ReportStats {
    async fn on_event(&self, event: &Event) {
        self.update(event).await;
    }

    fn name(&self) -> &'static str {
        "report-stats"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_cycle_outcomes() {
        let stats = ReportStats::new();
        let v = Some(ResourceVersion::new(3));

        assert!(
            stats
                .update(&Event::new(EventKind::StatusWritten).with_reporter("s1").with_version(v))
                .await
        );
        stats
            .update(&Event::new(EventKind::StatusUnchanged).with_reporter("s1"))
            .await;
        stats
            .update(&Event::new(EventKind::WriteConflict).with_reporter("s1"))
            .await;
        assert!(
            !stats
                .update(&Event::new(EventKind::SnapshotAccepted).with_reporter("s1"))
                .await
        );

        let s1 = stats.get("s1").await.unwrap();
        assert_eq!(s1.written, 1);
        assert_eq!(s1.unchanged, 1);
        assert_eq!(s1.conflicts, 1);
        assert_eq!(s1.last_version, v);
    }

    #[tokio::test]
    async fn stale_events_are_ignored() {
        let stats = ReportStats::new();
        let older = Event::new(EventKind::StatusWritten).with_reporter("s1");
        let newer = Event::new(EventKind::StatusUnchanged).with_reporter("s1");

        assert!(stats.update(&newer).await);
        assert!(!stats.update(&older).await);
        assert_eq!(stats.get("s1").await.unwrap().written, 0);
    }

    #[tokio::test]
    async fn removal_resets_counters() {
        let stats = ReportStats::new();
        stats
            .update(&Event::new(EventKind::StatusWritten).with_reporter("s1"))
            .await;
        stats
            .update(&Event::new(EventKind::ReporterRemoved).with_reporter("s1"))
            .await;

        assert!(stats.get("s1").await.is_none());
        assert!(stats.snapshot().await.is_empty());
    }
}
