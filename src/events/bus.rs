//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from many sources (reporters, supervisor).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                     Subscriber (one):
//!   Reporter s1 ──┐
//!   Reporter s2 ──┼──────► Bus ───────► subscriber_listener ────► SubscriberSet
//!   Reporter sN ──┤  (broadcast chan)     (in Supervisor)
//!   Supervisor  ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; a reporter cycle is never
//!   slowed down by observers.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn publish_without_receivers_is_dropped() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::ReporterAdded).with_reporter("s1"));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::ReporterRemoved).with_reporter("s1"));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ReporterRemoved);
        assert!(rx.try_recv().is_err());
    }
}
