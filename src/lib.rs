//! # nodestatus
//!
//! **nodestatus** keeps cluster-visible, per-node status records in sync with
//! locally observed daemon state (routing daemon health, BGP sessions, learned
//! routes).
//!
//! A [`Supervisor`] watches a [`SyncFeed`] of status requests, runs one
//! reporter per request addressed to the local node, and each reporter polls
//! pluggable populators on its own schedule and writes the result back through
//! a [`StatusClient`] with optimistic concurrency.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!           SyncFeed (add / update / delete, ordered)
//!                 │
//!                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor (control task)                                        │
//! │  - filters by spec.node == local node                             │
//! │  - Registry (name → reporter, serialized)                         │
//! │  - Bus (broadcast events) + SubscriberSet (fans out to users)     │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!  ┌────────────┐     ┌────────────┐     ┌────────────┐
//!  │ Reporter s1│     │ Reporter s2│     │ Reporter sN│   one task each
//!  │ mailbox    │     │ mailbox    │     │ mailbox    │
//!  │ timer      │     │ timer      │     │ timer      │
//!  └─────┬──────┘     └─────┬──────┘     └─────┬──────┘
//!        │ populate         │                  │
//!        ▼                  ▼                  ▼
//!  PopulatorRegistry  (IpFamily × StatusClass → Populate)   read-only
//!        │
//!        ▼ update(expected version), RetryPolicy
//!  StatusClient  ──► Conflict: drop cycle, wait for the feed
//!                └─► other error: retry, then drop cycle
//! ```
//!
//! ### Reporter lifecycle
//! ```text
//! Created ──► Running ──► Terminating ──► Terminated
//!
//! Running: select! { termination | mailbox (spec update) | timer tick }
//!          every trigger runs one report cycle; cycles never overlap
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                            |
//! |-------------------|---------------------------------------------------------------|-----------------------------------------------|
//! | **Supervision**   | One reporter per local resource, synchronous termination.     | [`Supervisor`], [`SupervisorBuilder`]         |
//! | **Populators**    | Pluggable status sources keyed by family and class.           | [`Populate`], [`PopulatorFn`], [`PopulatorRegistry`] |
//! | **Datastore**     | CRUD with optimistic concurrency; in-memory implementation.   | [`StatusClient`], [`MemoryStore`]             |
//! | **Sync feed**     | Ordered add/update/delete notifications.                      | [`SyncFeed`], [`SyncEvent`]                   |
//! | **Policies**      | Bounded write retries with backoff and jitter.                | [`RetryPolicy`], [`BackoffPolicy`]            |
//! | **Subscriber API**| Hook into reporter events (metrics, alerts, statistics).      | [`Subscribe`], [`ReportStats`]                |
//! | **Errors**        | Typed errors for runtime, datastore and populators.           | [`RuntimeError`], [`StoreError`], [`PopulateError`] |
//! | **Configuration** | Centralized runtime settings.                                 | [`Config`]                                    |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use nodestatus::{
//!     BgpDaemonState, IpFamily, MemoryStore, PopulatorFn, PopulatorRegistry, ReportStats,
//!     StatusClass, Subscribe, Supervisor,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!
//!     let agent = PopulatorFn::arc("agent", |status| {
//!         status.status.agent.get_mut(IpFamily::V4).state = BgpDaemonState::Ready;
//!         Ok(())
//!     });
//!     let populators = PopulatorRegistry::builder()
//!         .register(IpFamily::V4, StatusClass::Agent, agent)
//!         .build();
//!
//!     let stats = Arc::new(ReportStats::new());
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![stats.clone()];
//!
//!     let sup = Supervisor::builder("node-a", store.clone(), populators)
//!         .with_subscribers(subs)
//!         .build();
//!
//!     // Runs until SIGINT/SIGTERM, then stops every reporter within the grace period.
//!     sup.run(store.watch()).await?;
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod feed;
mod policies;
mod populators;
mod resource;
mod store;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{Config, ReporterState, Supervisor, SupervisorBuilder};
pub use error::{PopulateError, RuntimeError, StoreError};
pub use events::{Event, EventKind};
pub use feed::{SyncEvent, SyncFeed, SyncOp};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy, WriteOutcome};
pub use populators::{Populate, PopulatorFn, PopulatorRef, PopulatorRegistry, PopulatorRegistryBuilder};
pub use resource::{
    BgpDaemonState, BgpDaemonStatus, BgpPeer, BgpPeerKind, BgpSessionState, BgpSummary, IpFamily,
    NodeStatus, NodeStatusSpec, PerFamily, ResourceVersion, Route, RouteKind, StatusClass,
    StatusReport,
};
pub use store::{MemoryStore, StatusClient, StatusClientRef};
pub use subscribers::{ReportStats, ReporterStats, Subscribe, SubscriberSet};
