//! # Supervisor: one reporter per local status resource.
//!
//! The [`Supervisor`] consumes a [`SyncFeed`] in a single control task and keeps
//! the reporter registry in step with it. It owns the event bus, the
//! [`SubscriberSet`] fan-out and the runtime cancellation token.
//!
//! ## High-level architecture
//! ```text
//! start(feed):
//!   control task (instrumented with the supervisor span)
//!     loop select! (biased) {
//!       ├─► runtime_token.cancelled()  → exit
//!       └─► feed.next()
//!             ├─► None                             → exit (feed_done)
//!             ├─► Delete(res)                      → registry.remove(name)
//!             ├─► Add/Update(res), spec.node == me → registry.upsert(res)
//!             └─► Add/Update(res), spec.node != me → registry.remove(name)
//!     }
//!
//! Event flow:
//!   Reporter / Registry ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet::emit
//!
//! stop():
//!   runtime_token.cancel()  → propagates to every reporter's child token
//!   join control task
//!   registry.remove_all()   → each reporter confirmed exited
//!   listener: deliver remaining events, SubscriberSet::shutdown()
//!
//! run(feed):
//!   start(feed)
//!   wait for OS signal or feed end ──► ShutdownRequested
//!   timeout(grace, stop())
//!     ├─ Ok  → AllStoppedWithin
//!     └─ Err → GraceExceeded, RuntimeError::GraceExceeded { stuck }
//! ```
//!
//! ## Rules
//! - Notifications are handled one at a time, in feed order.
//! - The control task never fails: every error is absorbed by the reporters.
//! - `stop()` is idempotent; after it returns no reporter is running.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use nodestatus::{
//!     IpFamily, MemoryStore, NodeStatus, NodeStatusSpec, PopulatorFn, PopulatorRegistry,
//!     StatusClass, StatusClient, Supervisor,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let populators = PopulatorRegistry::builder()
//!         .register(
//!             IpFamily::V4,
//!             StatusClass::Agent,
//!             PopulatorFn::arc("router-id", |status| {
//!                 status.status.agent.get_mut(IpFamily::V4).router_id = "172.17.0.1".into();
//!                 Ok(())
//!             }),
//!         )
//!         .build();
//!
//!     let sup = Supervisor::builder("node-a", store.clone(), populators).build();
//!     sup.start(store.watch())?;
//!
//!     let spec = NodeStatusSpec::new("node-a").with_class(StatusClass::Agent);
//!     store.create(NodeStatus::new("s1", spec)).await?;
//!
//!     while store.update_count() == 0 {
//!         tokio::time::sleep(std::time::Duration::from_millis(10)).await;
//!     }
//!     assert_eq!(sup.reporter_count(), 1);
//!
//!     sup.stop().await;
//!     assert_eq!(sup.reporter_count(), 0);
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

use crate::core::builder::SupervisorBuilder;
use crate::core::config::Config;
use crate::core::registry::Registry;
use crate::core::shutdown;
use crate::core::state::ReporterState;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::feed::{SyncEvent, SyncFeed, SyncOp};
use crate::populators::PopulatorRegistry;
use crate::store::StatusClientRef;
use crate::subscribers::SubscriberSet;

/// Coordinates reporters, event delivery (via [`SubscriberSet`]) and shutdown.
pub struct Supervisor {
    node: String,
    cfg: Config,
    bus: Bus,
    registry: Arc<Registry>,
    runtime_token: CancellationToken,
    feed_done: CancellationToken,
    listener_token: CancellationToken,
    started: AtomicBool,
    control: Mutex<Option<JoinHandle<()>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    span: Span,
}

impl Supervisor {
    /// Starts building a supervisor for the agent running on `node`.
    pub fn builder(
        node: impl Into<String>,
        client: StatusClientRef,
        populators: PopulatorRegistry,
    ) -> SupervisorBuilder {
        SupervisorBuilder::new(node, client, populators)
    }

    /// Wires the runtime; spawns the subscriber listener immediately so no
    /// event published after construction is missed.
    pub(crate) fn new_internal(
        node: String,
        cfg: Config,
        bus: Bus,
        subs: SubscriberSet,
        registry: Arc<Registry>,
        runtime_token: CancellationToken,
        span: Span,
    ) -> Self {
        let listener_token = CancellationToken::new();
        let listener = Self::subscriber_listener(bus.subscribe(), subs, listener_token.clone());

        Self {
            node,
            cfg,
            bus,
            registry,
            runtime_token,
            feed_done: CancellationToken::new(),
            listener_token,
            started: AtomicBool::new(false),
            control: Mutex::new(None),
            listener: Mutex::new(Some(listener)),
            span,
        }
    }

    /// Name of the node whose resources this supervisor admits.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Begins consuming `feed` in a background control task.
    ///
    /// Returns [`RuntimeError::AlreadyStarted`] on every call after the first.
    /// Must be called from within a tokio runtime.
    pub fn start<F: SyncFeed>(&self, feed: F) -> Result<(), RuntimeError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(RuntimeError::AlreadyStarted);
        }

        let control = tokio::spawn(
            Self::control_loop(
                feed,
                self.node.clone(),
                Arc::clone(&self.registry),
                self.runtime_token.clone(),
                self.feed_done.clone(),
            )
            .instrument(self.span.clone()),
        );
        *self.control.lock().unwrap_or_else(PoisonError::into_inner) = Some(control);
        Ok(())
    }

    /// Terminates every reporter and waits for them to exit.
    ///
    /// After `stop` returns no reporter is running and every event published
    /// so far has been handed to the subscribers. Calling it again is a no-op.
    pub async fn stop(&self) {
        self.stop_reporters().await;
        self.close_listener().await;
    }

    /// Starts, waits for a termination signal (or the end of `feed`), then
    /// stops within [`Config::grace`].
    ///
    /// Returns [`RuntimeError::GraceExceeded`] with the names of the reporters
    /// that did not confirm termination in time.
    pub async fn run<F: SyncFeed>(&self, feed: F) -> Result<(), RuntimeError> {
        self.start(feed)?;

        tokio::select! {
            res = shutdown::wait_for_shutdown_signal() => match res {
                Ok(()) => tracing::info!(parent: &self.span, "shutdown signal received"),
                Err(err) => {
                    tracing::warn!(parent: &self.span, error = %err, "cannot listen for shutdown signals");
                    self.feed_done.cancelled().await;
                    tracing::info!(parent: &self.span, "sync feed ended");
                }
            },
            _ = self.feed_done.cancelled() => {
                tracing::info!(parent: &self.span, "sync feed ended");
            }
        }
        self.bus.publish(Event::new(EventKind::ShutdownRequested));

        self.stop_with_grace().await
    }

    /// Number of live reporters.
    ///
    /// Never waits: a reporter whose termination is still in flight is counted
    /// until it has confirmed exit.
    pub fn reporter_count(&self) -> usize {
        self.registry.len()
    }

    /// Sorted names of live reporters.
    ///
    /// Waits while a reporter termination is in flight.
    pub async fn reporters(&self) -> Vec<String> {
        self.registry.names().await
    }

    /// Lifecycle state of the reporter for `name`, if one is registered.
    pub async fn reporter_state(&self, name: &str) -> Option<ReporterState> {
        self.registry.state(name).await
    }

    /// Creates a raw receiver on the event bus.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    async fn stop_with_grace(&self) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        match tokio::time::timeout(grace, self.stop_reporters()).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                self.close_listener().await;
                Ok(())
            }
            Err(_elapsed) => {
                let stuck = self.registry.names().await;
                tracing::error!(parent: &self.span, ?grace, ?stuck, "reporters did not stop within grace");
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")),
                );
                self.close_listener().await;
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Cancels the runtime, joins the control task and every reporter.
    async fn stop_reporters(&self) {
        self.runtime_token.cancel();
        let control = self.control.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(control) = control {
            if let Err(err) = control.await {
                tracing::error!(parent: &self.span, error = %err, "control task panicked");
            }
        }
        self.registry.remove_all().await;
    }

    async fn close_listener(&self) {
        let listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(listener) = listener {
            self.listener_token.cancel();
            let _ = listener.await;
        }
    }

    /// Feeds notifications to the registry until cancelled or the feed ends.
    async fn control_loop<F: SyncFeed>(
        mut feed: F,
        node: String,
        registry: Arc<Registry>,
        token: CancellationToken,
        feed_done: CancellationToken,
    ) {
        let _done = feed_done.drop_guard();
        tracing::debug!(%node, "sync feed consumer started");

        loop {
            let ev = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                ev = feed.next() => ev,
            };
            match ev {
                Some(ev) => Self::handle_event(&node, &registry, ev).await,
                None => {
                    tracing::debug!("sync feed closed");
                    break;
                }
            }
        }
    }

    async fn handle_event(node: &str, registry: &Registry, ev: SyncEvent) {
        match ev.op {
            SyncOp::Delete => {
                registry.remove(ev.name()).await;
            }
            SyncOp::Add | SyncOp::Update if ev.resource.is_for_node(node) => {
                registry.upsert(ev.resource).await;
            }
            SyncOp::Add | SyncOp::Update => {
                if registry.remove(ev.name()).await {
                    tracing::info!(object = %ev.name(), owner = %ev.resource.spec.node, "resource moved to another node");
                } else {
                    tracing::trace!(object = %ev.name(), "resource belongs to another node");
                }
            }
        }
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    ///
    /// On cancellation, drains what is already queued before shutting the set down.
    fn subscriber_listener(
        mut rx: broadcast::Receiver<Event>,
        set: SubscriberSet,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "subscriber listener lagged behind the bus");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = token.cancelled() => break,
                }
            }
            while let Ok(ev) = rx.try_recv() {
                set.emit(&ev);
            }
            set.shutdown().await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::populators::PopulatorRegistry;
    use crate::resource::{NodeStatus, NodeStatusSpec};
    use crate::store::{MemoryStore, StatusClient};

    fn supervisor(store: Arc<MemoryStore>) -> Arc<Supervisor> {
        Supervisor::builder("node-a", store, PopulatorRegistry::default()).build()
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let sup = supervisor(store.clone());

        sup.start(store.watch()).unwrap();
        let err = sup.start(store.watch()).unwrap_err();
        assert_eq!(err.as_label(), "runtime_already_started");
        sup.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn resource_moving_away_is_released() {
        let store = Arc::new(MemoryStore::new());
        let sup = supervisor(store.clone());
        sup.start(store.watch()).unwrap();

        let created = store
            .create(NodeStatus::new("s1", NodeStatusSpec::new("node-a")))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sup.reporters().await, vec!["s1"]);

        let mut moved = created;
        moved.spec.node = "node-b".into();
        store.update(moved).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sup.reporter_count(), 0);

        sup.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let sup = supervisor(store.clone());
        sup.start(store.watch()).unwrap();
        sup.stop().await;
        sup.stop().await;
        assert_eq!(sup.reporter_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_returns_when_feed_ends() {
        let store = Arc::new(MemoryStore::new());
        let sup = supervisor(store.clone());
        let (tx, rx) = tokio::sync::mpsc::channel(4);

        let created = store
            .create(NodeStatus::new("s1", NodeStatusSpec::new("node-a")))
            .await
            .unwrap();
        tx.send(SyncEvent::added(created)).await.unwrap();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(5), sup.run(rx))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sup.reporter_count(), 0);
    }
}
