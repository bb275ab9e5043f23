//! # Sync feed: ordered add/update/delete notifications.
//!
//! The supervisor consumes a [`SyncFeed`] in its single control task. Any
//! source works as long as it eventually delivers every change visible in the
//! datastore (at-least-once; duplicates are harmless).
//!
//! ## Contents
//! - [`SyncEvent`], [`SyncOp`] the notification payload
//! - [`SyncFeed`] the pull-based source trait, implemented for tokio mpsc receivers

mod event;
mod source;

pub use event::{SyncEvent, SyncOp};
pub use source::SyncFeed;
