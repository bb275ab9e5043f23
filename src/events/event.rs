//! # Runtime events emitted by the supervisor and reporters.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Registry events**: reporters admitted and released by the supervisor
//! - **Cycle events**: outcome of one report cycle (written, unchanged, failed)
//! - **Shutdown events**: signal-driven shutdown progress
//! - **Subscriber events**: delivery problems inside the fan-out
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! reporter (resource) name, reasons, attempt numbers and version tokens.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use nodestatus::{Event, EventKind, IpFamily, StatusClass};
//!
//! let ev = Event::new(EventKind::PopulateFailed)
//!     .with_reporter("s1")
//!     .with_source(IpFamily::V4, StatusClass::Agent)
//!     .with_reason("control socket closed");
//!
//! assert_eq!(ev.kind, EventKind::PopulateFailed);
//! assert_eq!(ev.reporter.as_deref(), Some("s1"));
//! assert_eq!(ev.class, Some(StatusClass::Agent));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::resource::{IpFamily, ResourceVersion, StatusClass};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reporter`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reporter`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown requested (OS signal observed or feed ended).
    ShutdownRequested,

    /// All reporters terminated within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some reporters did not confirm termination in time.
    GraceExceeded,

    // === Registry events ===
    /// A reporter was spawned and registered.
    ///
    /// Sets:
    /// - `reporter`: resource name
    /// - `version`: version of the initial snapshot
    ReporterAdded,

    /// A reporter confirmed termination and was removed from the registry.
    ///
    /// Sets:
    /// - `reporter`: resource name
    ReporterRemoved,

    /// A reporter accepted a new snapshot from its mailbox.
    ///
    /// Sets:
    /// - `reporter`: resource name
    /// - `version`: version of the accepted snapshot
    SnapshotAccepted,

    /// A reporter received a notification for a different resource and ignored it.
    ///
    /// Sets:
    /// - `reporter`: owning resource name
    /// - `reason`: name carried by the foreign notification
    ForeignNotification,

    // === Cycle events ===
    /// Populated status equals the last known status; nothing was written.
    ///
    /// Sets:
    /// - `reporter`: resource name
    StatusUnchanged,

    /// Status was persisted.
    ///
    /// Sets:
    /// - `reporter`: resource name
    /// - `attempt`: attempt that succeeded (1-based)
    /// - `version`: new version token
    StatusWritten,

    /// A populator failed; the cycle was aborted without writing.
    ///
    /// Sets:
    /// - `reporter`: resource name
    /// - `family`, `class`: offending source
    /// - `reason`: populator error
    PopulateFailed,

    /// The write was rejected as stale; the cycle ended without retry.
    ///
    /// Sets:
    /// - `reporter`: resource name
    /// - `version`: version the write was based on
    WriteConflict,

    /// A write attempt failed and will be retried.
    ///
    /// Sets:
    /// - `reporter`: resource name
    /// - `attempt`: failed attempt (1-based)
    /// - `delay_ms`: delay before the next attempt
    /// - `reason`: store error
    WriteRetry,

    /// All write attempts failed; the cycle was dropped.
    ///
    /// Sets:
    /// - `reporter`: resource name
    /// - `attempt`: number of attempts made
    /// - `reason`: last store error
    WriteExhausted,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Reporter (resource) name, if applicable.
    pub reporter: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Write attempt (starting from 1).
    pub attempt: Option<u32>,
    /// Delay before the next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Version token involved in the event.
    pub version: Option<ResourceVersion>,
    /// Address family of the populator involved.
    pub family: Option<IpFamily>,
    /// Status class of the populator involved.
    pub class: Option<StatusClass>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            reporter: None,
            reason: None,
            attempt: None,
            delay_ms: None,
            version: None,
            family: None,
            class: None,
        }
    }

    /// Attaches a reporter name.
    #[inline]
    pub fn with_reporter(mut self, name: impl Into<Arc<str>>) -> Self {
        self.reporter = Some(name.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a version token (no-op for `None`).
    #[inline]
    pub fn with_version(mut self, version: Option<ResourceVersion>) -> Self {
        self.version = version;
        self
    }

    /// Attaches the populator key.
    #[inline]
    pub fn with_source(mut self, family: IpFamily, class: StatusClass) -> Self {
        self.family = Some(family);
        self.class = Some(class);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reporter(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reporter(subscriber)
            .with_reason(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::StatusWritten);
        let b = Event::new(EventKind::StatusWritten);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn delay_is_clamped_to_u32_millis() {
        let ev = Event::new(EventKind::WriteRetry).with_delay(Duration::from_secs(u64::MAX / 4));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }
}
