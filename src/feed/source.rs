//! # Feed source trait.
//!
//! [`SyncFeed`] is pull-based: the supervisor's control task owns
//! the feed and awaits the next notification, so notifications are handled one
//! at a time, in delivery order.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::event::SyncEvent;

/// Source of [`SyncEvent`]s.
///
/// Returning `None` means the feed ended; the supervisor's control task then
/// exits (live reporters keep running until `stop`).
#[async_trait]
pub trait SyncFeed: Send + 'static {
    /// Waits for the next notification.
    async fn next(&mut self) -> Option<SyncEvent>;
}

#[async_trait]
impl SyncFeed for mpsc::Receiver<SyncEvent> {
    async fn next(&mut self) -> Option<SyncEvent> {
        self.recv().await
    }
}

#[async_trait]
impl SyncFeed for mpsc::UnboundedReceiver<SyncEvent> {
    async fn next(&mut self) -> Option<SyncEvent> {
        self.recv().await
    }
}
