//! # Reporter registry: name → live reporter.
//!
//! The registry is the only owner of [`ReporterHandle`]s. Admission and
//! removal run under one `tokio::sync::Mutex`, so at most one reporter exists
//! per name. Forwarding an update happens outside the lock: a full mailbox
//! stalls only the caller, not readers of the registry.
//!
//! ## Operations
//! ```text
//! upsert(res)
//!   ├─► absent         → Reporter::spawn(res) → insert → ReporterAdded
//!   ├─► present, alive → mailbox.request_update(res)    (lock released, waits if full)
//!   └─► present, dead  → release old (ReporterRemoved) → spawn fresh → ReporterAdded
//!
//! remove(name)
//!   └─► present → terminate (cancel + join) → free slot → ReporterRemoved
//!
//! remove_all()
//!   └─► cancel every reporter first, then release them one by one
//! ```
//!
//! ## Rules
//! - At most one reporter per name.
//! - A slot is freed only after its worker confirmed exit.
//! - `len()` reads a counter kept in step with the map and never waits.
//! - Each reporter runs on a child of the runtime token.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::core::reporter::{Reporter, ReporterContext, ReporterHandle};
use crate::core::state::ReporterState;
use crate::events::{Event, EventKind};
use crate::resource::NodeStatus;

type Slots = HashMap<String, ReporterHandle>;

/// Serialized map of live reporters.
pub(crate) struct Registry {
    reporters: Mutex<Slots>,
    live: AtomicUsize,
    ctx: ReporterContext,
    runtime_token: CancellationToken,
    span: Span,
}

impl Registry {
    pub(crate) fn new(ctx: ReporterContext, runtime_token: CancellationToken, span: Span) -> Arc<Self> {
        Arc::new(Self {
            reporters: Mutex::new(HashMap::new()),
            live: AtomicUsize::new(0),
            ctx,
            runtime_token,
            span,
        })
    }

    /// Admits `resource` or forwards it to its existing reporter.
    pub(crate) async fn upsert(&self, resource: NodeStatus) {
        let mut reporters = self.reporters.lock().await;
        let forward = reporters.get(&resource.name).map(ReporterHandle::mailbox);
        let Some(mailbox) = forward else {
            self.admit(&mut reporters, resource);
            return;
        };
        drop(reporters);

        let Err(resource) = mailbox.request_update(resource).await else {
            return;
        };

        let mut reporters = self.reporters.lock().await;
        let still_registered = reporters
            .get(&resource.name)
            .is_some_and(|handle| handle.mailbox().same_worker(&mailbox));
        if !still_registered {
            tracing::debug!(object = %resource.name, "reporter released while forwarding, update dropped");
            return;
        }
        tracing::warn!(object = %resource.name, "reporter exited unexpectedly, respawning");
        self.release(&mut reporters, &resource.name).await;
        self.admit(&mut reporters, resource);
    }

    /// Terminates and forgets the reporter for `name`.
    ///
    /// Returns `false` if there was none.
    pub(crate) async fn remove(&self, name: &str) -> bool {
        let mut reporters = self.reporters.lock().await;
        self.release(&mut reporters, name).await
    }

    /// Terminates every reporter.
    ///
    /// Slots are freed one by one as workers confirm exit, so if this future
    /// is dropped midway [`Registry::names`] lists exactly the stragglers.
    pub(crate) async fn remove_all(&self) {
        let mut reporters = self.reporters.lock().await;
        for handle in reporters.values() {
            handle.cancel();
        }

        let mut names: Vec<String> = reporters.keys().cloned().collect();
        names.sort_unstable();
        for name in names {
            self.release(&mut reporters, &name).await;
        }
    }

    /// Number of live reporters, including any whose termination is in flight.
    pub(crate) fn len(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Returns sorted names of live reporters.
    ///
    /// Waits while a termination is in flight.
    pub(crate) async fn names(&self) -> Vec<String> {
        let reporters = self.reporters.lock().await;
        let mut names: Vec<String> = reporters.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub(crate) async fn state(&self, name: &str) -> Option<ReporterState> {
        self.reporters.lock().await.get(name).map(ReporterHandle::state)
    }

    /// Spawns a reporter for `resource` into a free slot. Caller holds the lock.
    fn admit(&self, reporters: &mut Slots, resource: NodeStatus) {
        if self.runtime_token.is_cancelled() {
            return;
        }
        let name = resource.name.clone();
        let version = resource.resource_version;
        let handle = Reporter::spawn(resource, &self.ctx, self.runtime_token.child_token(), &self.span);
        reporters.insert(name.clone(), handle);
        self.live.fetch_add(1, Ordering::AcqRel);

        tracing::info!(object = %name, "node status reporter created");
        self.ctx.bus.publish(
            Event::new(EventKind::ReporterAdded)
                .with_reporter(name)
                .with_version(version),
        );
    }

    /// Terminates the reporter in `name`'s slot, then frees the slot and emits
    /// `ReporterRemoved` (reason `reporter_panicked` if the worker died).
    async fn release(&self, reporters: &mut Slots, name: &str) -> bool {
        let Some(handle) = reporters.get_mut(name) else {
            return false;
        };
        let mut ev = Event::new(EventKind::ReporterRemoved).with_reporter(handle.name());

        match handle.terminate().await {
            Ok(()) => tracing::debug!(object = %name, "node status reporter terminated"),
            Err(err) => {
                tracing::error!(object = %name, error = %err, "node status reporter panicked");
                ev = ev.with_reason("reporter_panicked");
            }
        }
        reporters.remove(name);
        self.live.fetch_sub(1, Ordering::AcqRel);
        self.ctx.bus.publish(ev);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::StoreError;
    use crate::events::Bus;
    use crate::policies::RetryPolicy;
    use crate::populators::{PopulatorFn, PopulatorRegistry};
    use crate::resource::{BgpDaemonState, IpFamily, NodeStatusSpec, StatusClass};
    use crate::store::{MemoryStore, StatusClient, StatusClientRef};

    fn registry(store: Arc<MemoryStore>) -> Arc<Registry> {
        let ctx = ReporterContext {
            client: store,
            populators: Arc::new(PopulatorRegistry::default()),
            bus: Bus::new(64),
            retry: RetryPolicy::default(),
            mailbox_capacity: 2,
        };
        Registry::new(ctx, CancellationToken::new(), Span::none())
    }

    /// Datastore whose updates never complete.
    struct HangingStore(Arc<MemoryStore>);

    #[async_trait]
    impl StatusClient for HangingStore {
        async fn get(&self, name: &str) -> Result<NodeStatus, StoreError> {
            self.0.get(name).await
        }

        async fn create(&self, resource: NodeStatus) -> Result<NodeStatus, StoreError> {
            self.0.create(resource).await
        }

        async fn update(&self, _resource: NodeStatus) -> Result<NodeStatus, StoreError> {
            std::future::pending().await
        }

        async fn delete(&self, name: &str) -> Result<NodeStatus, StoreError> {
            self.0.delete(name).await
        }
    }

    /// Registry whose reporters always have something to write and a
    /// one-slot mailbox.
    fn busy_registry(store: Arc<MemoryStore>) -> Arc<Registry> {
        let ready = PopulatorFn::arc("ready", |status: &mut NodeStatus| {
            status.status.agent.get_mut(IpFamily::V4).state = BgpDaemonState::Ready;
            Ok(())
        });
        let client: StatusClientRef = Arc::new(HangingStore(store));
        let ctx = ReporterContext {
            client,
            populators: Arc::new(
                PopulatorRegistry::builder()
                    .register(IpFamily::V4, StatusClass::Agent, ready)
                    .build(),
            ),
            bus: Bus::new(64),
            retry: RetryPolicy::default(),
            mailbox_capacity: 1,
        };
        Registry::new(ctx, CancellationToken::new(), Span::none())
    }

    async fn resource(store: &MemoryStore, name: &str) -> NodeStatus {
        store
            .create(NodeStatus::new(name, NodeStatusSpec::new("node-a")))
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn one_reporter_per_name() {
        let store = Arc::new(MemoryStore::new());
        let reg = registry(store.clone());
        let s1 = resource(&store, "s1").await;

        reg.upsert(s1.clone()).await;
        reg.upsert(s1.clone()).await;
        reg.upsert(s1).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.state("s1").await, Some(ReporterState::Running));

        assert!(reg.remove("s1").await);
        assert!(!reg.remove("s1").await);
        assert_eq!(reg.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn remove_all_frees_every_slot() {
        let store = Arc::new(MemoryStore::new());
        let reg = registry(store.clone());
        let mut events = reg.ctx.bus.subscribe();
        for name in ["s1", "s2", "s3"] {
            reg.upsert(resource(&store, name).await).await;
        }
        assert_eq!(reg.names().await, vec!["s1", "s2", "s3"]);

        tokio::time::timeout(Duration::from_secs(1), reg.remove_all())
            .await
            .unwrap();
        assert!(reg.names().await.is_empty());

        let mut removed = 0;
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::ReporterRemoved {
                removed += 1;
            }
        }
        assert_eq!(removed, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_runtime_admits_nothing() {
        let store = Arc::new(MemoryStore::new());
        let reg = registry(store.clone());
        reg.runtime_token.cancel();

        reg.upsert(resource(&store, "s1").await).await;
        assert_eq!(reg.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn readers_are_not_blocked_by_a_busy_reporter() {
        let store = Arc::new(MemoryStore::new());
        let reg = busy_registry(store.clone());
        let spec = NodeStatusSpec::new("node-a").with_class(StatusClass::Agent);
        let s1 = store.create(NodeStatus::new("s1", spec)).await.unwrap();

        // the initial cycle is now stuck in retried writes
        reg.upsert(s1.clone()).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        // fills the mailbox, then a forward that has to wait for room
        reg.upsert(s1.clone()).await;
        let forward = tokio::spawn({
            let reg = Arc::clone(&reg);
            async move { reg.upsert(s1).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!forward.is_finished());

        let quick = Duration::from_millis(10);
        assert_eq!(reg.len(), 1);
        assert_eq!(tokio::time::timeout(quick, reg.names()).await.unwrap(), vec!["s1"]);
        assert_eq!(
            tokio::time::timeout(quick, reg.state("s1")).await.unwrap(),
            Some(ReporterState::Running)
        );

        // termination waits for the cycle; the count holds until it is confirmed
        let remove = tokio::spawn({
            let reg = Arc::clone(&reg);
            async move { reg.remove("s1").await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!remove.is_finished());
        assert_eq!(reg.len(), 1);

        assert!(remove.await.unwrap());
        assert_eq!(reg.len(), 0);
        forward.await.unwrap();
        assert!(reg.names().await.is_empty());
    }
}
