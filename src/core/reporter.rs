//! # Reporter: per-resource status worker.
//!
//! Owns the reporting lifecycle of exactly one [`NodeStatus`]: when to report
//! (initial cycle, timer ticks, accepted updates), what to report (populators
//! from the [`PopulatorRegistry`]) and how to persist it (bounded retries via
//! [`RetryPolicy`]).
//!
//! ## Loop
//! ```text
//! spawn(initial) ──► Running ──► report_status()
//!
//! loop select! (biased) {
//!   ├─► token.cancelled()   → break
//!   ├─► mailbox.recv()
//!   │     ├─► None                      → break
//!   │     ├─► other name                → ForeignNotification (ignored)
//!   │     └─► same name                 → adopt, re-arm timer, report_status()
//!   └─► schedule.tick()     → report_status()
//! }
//! Terminating ──► schedule.stop() ──► Terminated
//! ```
//!
//! ## Report cycle
//! ```text
//! working = snapshot.clone()
//! for family in [V4, V6]:
//!   for class in spec.classes:
//!     registry.get(family, class)
//!       ├─► None   → warn, skip class
//!       └─► Some(p) → p.populate(&mut working)?   (first error aborts the cycle)
//! working.status == snapshot.status → StatusUnchanged, no write
//! retry.run(update(working + last_updated))
//!   ├─► Written  → snapshot = stored copy (new version)
//!   ├─► Conflict → WriteConflict, wait for the sync feed
//!   └─► Failed   → WriteExhausted, wait for the next trigger
//! ```
//!
//! ## Rules
//! - One cycle at a time: every trigger is serviced by the same loop.
//! - A cycle in flight is never interrupted; termination is observed after it.
//! - Errors never leave the worker; they are logged and published on the bus.

use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

use crate::core::schedule::Schedule;
use crate::core::state::{ReporterState, StateCell};
use crate::error::StoreError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{RetryPolicy, WriteOutcome};
use crate::populators::PopulatorRegistry;
use crate::resource::{IpFamily, NodeStatus};
use crate::store::StatusClientRef;

/// Collaborators shared by every reporter of one supervisor.
#[derive(Clone)]
pub(crate) struct ReporterContext {
    pub(crate) client: StatusClientRef,
    pub(crate) populators: Arc<PopulatorRegistry>,
    pub(crate) bus: Bus,
    pub(crate) retry: RetryPolicy,
    pub(crate) mailbox_capacity: usize,
}

/// Sending side of a reporter's mailbox. Cheap to clone.
#[derive(Clone)]
pub(crate) struct Mailbox(mpsc::Sender<NodeStatus>);

impl Mailbox {
    /// Queues `resource` for the worker, waiting while the mailbox is full.
    ///
    /// Gives the resource back if the worker is gone.
    pub(crate) async fn request_update(&self, resource: NodeStatus) -> Result<(), NodeStatus> {
        self.0.send(resource).await.map_err(|e| e.0)
    }

    /// True if both ends feed the same worker.
    pub(crate) fn same_worker(&self, other: &Mailbox) -> bool {
        self.0.same_channel(&other.0)
    }
}

/// Supervisor-side handle to a running reporter.
pub(crate) struct ReporterHandle {
    name: Arc<str>,
    mailbox: Mailbox,
    cancel: CancellationToken,
    join: JoinHandle<()>,
    state: watch::Receiver<ReporterState>,
}

impl ReporterHandle {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn state(&self) -> ReporterState {
        *self.state.borrow()
    }

    pub(crate) fn mailbox(&self) -> Mailbox {
        self.mailbox.clone()
    }

    /// Signals termination without waiting.
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Signals termination and waits until the worker has exited.
    ///
    /// Must not be awaited again once it has returned.
    pub(crate) async fn terminate(&mut self) -> Result<(), JoinError> {
        self.cancel.cancel();
        (&mut self.join).await
    }
}

/// Worker state. Lives inside the spawned task only.
pub(crate) struct Reporter {
    name: Arc<str>,
    snapshot: NodeStatus,
    schedule: Schedule,
    ctx: ReporterContext,
}

impl Reporter {
    /// Spawns a worker for `initial` and returns its handle.
    ///
    /// The first report cycle starts as soon as the task is polled.
    pub(crate) fn spawn(
        initial: NodeStatus,
        ctx: &ReporterContext,
        token: CancellationToken,
        parent: &Span,
    ) -> ReporterHandle {
        let name: Arc<str> = Arc::from(initial.name.as_str());
        let (tx, rx) = mpsc::channel(ctx.mailbox_capacity.max(1));
        let (cell, state) = StateCell::new();
        let span = tracing::info_span!(parent: parent, "reporter", object = %name);

        let mut schedule = Schedule::disabled();
        schedule.set_period(initial.spec.update_period());

        let worker = Reporter {
            name: Arc::clone(&name),
            snapshot: initial,
            schedule,
            ctx: ctx.clone(),
        };
        let join = tokio::spawn(worker.run(rx, token.clone(), cell).instrument(span));

        ReporterHandle {
            name,
            mailbox: Mailbox(tx),
            cancel: token,
            join,
            state,
        }
    }

    async fn run(
        mut self,
        mut mailbox: mpsc::Receiver<NodeStatus>,
        token: CancellationToken,
        state: StateCell,
    ) {
        if !token.is_cancelled() {
            state.advance(ReporterState::Running);
            tracing::debug!(period = ?self.schedule.period(), "reporter started");
            self.report_status().await;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    msg = mailbox.recv() => match msg {
                        Some(latest) => {
                            if self.accept(latest) {
                                self.report_status().await;
                            }
                        }
                        None => break,
                    },
                    _ = self.schedule.tick() => self.report_status().await,
                }
            }
        }

        state.advance(ReporterState::Terminating);
        self.schedule.stop();
        mailbox.close();
        state.advance(ReporterState::Terminated);
        tracing::debug!(state = %state.get(), "reporter loop exited");
    }

    /// Adopts a notification from the mailbox. Returns `true` if a cycle is due.
    ///
    /// Every notification for this resource is adopted, redeliveries and the
    /// echo of our own write included; the cycle it triggers writes only if
    /// the populated status differs.
    fn accept(&mut self, latest: NodeStatus) -> bool {
        if latest.name.as_str() != &*self.name {
            tracing::error!(
                received = %latest.name,
                "notification for a different resource, ignoring"
            );
            self.publish(
                Event::new(EventKind::ForeignNotification).with_reason(latest.name.as_str()),
            );
            return false;
        }
        let spec_changed = !self.snapshot.has_same_spec(&latest);
        let period = latest.spec.update_period();
        self.publish(Event::new(EventKind::SnapshotAccepted).with_version(latest.resource_version));
        self.snapshot = latest;

        if self.schedule.set_period(period) {
            match period {
                Some(p) => tracing::info!(period = ?p, "status update interval changed"),
                None => tracing::debug!("periodic status update disabled"),
            }
        } else {
            self.schedule.restart();
        }
        if spec_changed {
            tracing::debug!(classes = ?self.snapshot.spec.classes, "spec changed");
        }
        true
    }

    /// Runs one report cycle: populate everything, then write if changed.
    async fn report_status(&mut self) {
        let mut working = self.snapshot.clone();

        for family in IpFamily::ALL {
            for &class in &self.snapshot.spec.classes {
                let Some(populator) = self.ctx.populators.get(family, class) else {
                    tracing::warn!(%family, %class, "no populator registered for requested class");
                    continue;
                };
                if let Err(err) = populator.populate(&mut working).await {
                    tracing::error!(
                        %family,
                        %class,
                        populator = populator.name(),
                        error = %err,
                        "failed to populate status"
                    );
                    self.publish(
                        Event::new(EventKind::PopulateFailed)
                            .with_source(family, class)
                            .with_reason(err.to_string()),
                    );
                    return;
                }
            }
        }

        if working.status == self.snapshot.status {
            tracing::debug!("status unchanged since last write");
            self.publish(Event::new(EventKind::StatusUnchanged));
            return;
        }

        let outcome = self.persist(&working).await;
        match outcome {
            WriteOutcome::Written { value, attempt } => {
                tracing::info!(version = ?value.resource_version, attempt, "latest status updated");
                self.publish(
                    Event::new(EventKind::StatusWritten)
                        .with_attempt(attempt)
                        .with_version(value.resource_version),
                );
                self.snapshot = value;
            }
            WriteOutcome::Conflict { attempt } => {
                tracing::warn!(
                    version = ?self.snapshot.resource_version,
                    attempt,
                    "status update conflict, waiting for the sync feed to catch up"
                );
                self.publish(
                    Event::new(EventKind::WriteConflict)
                        .with_attempt(attempt)
                        .with_version(self.snapshot.resource_version),
                );
            }
            WriteOutcome::Failed { attempts, error } => {
                tracing::error!(attempts, error = %error, "failed to update status");
                self.publish(
                    Event::new(EventKind::WriteExhausted)
                        .with_attempt(attempts)
                        .with_reason(error.to_string()),
                );
            }
        }
    }

    /// Writes `working` based on the snapshot's version, stamping each attempt.
    async fn persist(&self, working: &NodeStatus) -> WriteOutcome<NodeStatus> {
        let client = &self.ctx.client;
        self.ctx
            .retry
            .run(
                |_attempt| {
                    let mut candidate = working.clone();
                    candidate.status.last_updated = Some(SystemTime::now());
                    async move { client.update(candidate).await }
                },
                |attempt, err: &StoreError, delay| {
                    tracing::warn!(attempt, error = %err, ?delay, "failed to update status, will retry");
                    self.publish(
                        Event::new(EventKind::WriteRetry)
                            .with_attempt(attempt)
                            .with_delay(delay)
                            .with_reason(err.to_string()),
                    );
                },
            )
            .await
    }

    fn publish(&self, ev: Event) {
        self.ctx.bus.publish(ev.with_reporter(Arc::clone(&self.name)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use crate::error::PopulateError;
    use crate::populators::PopulatorFn;
    use crate::resource::{BgpDaemonState, NodeStatusSpec, StatusClass};
    use crate::store::{MemoryStore, StatusClient};

    struct Fixture {
        store: Arc<MemoryStore>,
        ctx: ReporterContext,
        router_id: Arc<std::sync::Mutex<String>>,
        calls: Arc<AtomicU32>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let router_id = Arc::new(std::sync::Mutex::new("10.0.0.1".to_string()));
        let calls = Arc::new(AtomicU32::new(0));

        let (rid, seen) = (Arc::clone(&router_id), Arc::clone(&calls));
        let agent = PopulatorFn::arc("agent", move |status: &mut NodeStatus| {
            seen.fetch_add(1, Ordering::SeqCst);
            let id = rid.lock().unwrap().clone();
            if id.is_empty() {
                return Err(PopulateError::unavailable("daemon down"));
            }
            let v4 = status.status.agent.get_mut(IpFamily::V4);
            v4.state = BgpDaemonState::Ready;
            v4.router_id = id;
            Ok(())
        });
        let populators = PopulatorRegistry::builder()
            .register(IpFamily::V4, StatusClass::Agent, agent)
            .build();

        let ctx = ReporterContext {
            client: store.clone(),
            populators: Arc::new(populators),
            bus: Bus::new(64),
            retry: RetryPolicy::default(),
            mailbox_capacity: 10,
        };
        Fixture {
            store,
            ctx,
            router_id,
            calls,
        }
    }

    async fn create(store: &MemoryStore, name: &str, period: u32) -> NodeStatus {
        let spec = NodeStatusSpec::new("node-a")
            .with_class(StatusClass::Agent)
            .with_update_period(period);
        store.create(NodeStatus::new(name, spec)).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn initial_cycle_writes_once() {
        let fx = fixture();
        let initial = create(&fx.store, "s1", 0).await;
        let mut handle = Reporter::spawn(initial, &fx.ctx, CancellationToken::new(), &Span::none());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fx.store.update_count(), 1);
        let stored = fx.store.get("s1").await.unwrap();
        assert_eq!(stored.status.agent.v4.router_id, "10.0.0.1");
        assert!(stored.status.last_updated.is_some());

        assert_eq!(handle.state(), ReporterState::Running);
        handle.terminate().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn foreign_notification_is_ignored() {
        let fx = fixture();
        let mut events = fx.ctx.bus.subscribe();
        let initial = create(&fx.store, "s1", 0).await;
        let other = create(&fx.store, "s2", 0).await;
        let mut handle = Reporter::spawn(initial, &fx.ctx, CancellationToken::new(), &Span::none());

        handle.mailbox().request_update(other).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let mut kinds = Vec::new();
        while let Ok(ev) = events.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::ForeignNotification));
        assert_eq!(fx.store.update_count(), 1);
        handle.terminate().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn redelivered_snapshot_reports_fresh_data() {
        let fx = fixture();
        let initial = create(&fx.store, "s1", 0).await;
        let mut handle = Reporter::spawn(initial, &fx.ctx, CancellationToken::new(), &Span::none());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fx.store.update_count(), 1);

        // same object again: the cycle runs but has nothing new to write
        let current = fx.store.get("s1").await.unwrap();
        handle.mailbox().request_update(current.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fx.store.update_count(), 1);

        *fx.router_id.lock().unwrap() = "10.0.0.2".into();
        handle.mailbox().request_update(current).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fx.store.update_count(), 2);
        let stored = fx.store.get("s1").await.unwrap();
        assert_eq!(stored.status.agent.v4.router_id, "10.0.0.2");

        handle.terminate().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn populate_failure_writes_nothing() {
        let fx = fixture();
        *fx.router_id.lock().unwrap() = String::new();
        let initial = create(&fx.store, "s1", 1).await;
        let version = initial.resource_version;
        let mut handle = Reporter::spawn(initial, &fx.ctx, CancellationToken::new(), &Span::none());

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert!(fx.calls.load(Ordering::SeqCst) >= 10);
        assert_eq!(fx.store.get("s1").await.unwrap().resource_version, version);
        handle.terminate().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn terminate_releases_timer() {
        let fx = fixture();
        let initial = create(&fx.store, "s1", 1).await;
        let mut handle = Reporter::spawn(initial, &fx.ctx, CancellationToken::new(), &Span::none());
        let mut state = handle.state.clone();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        handle.terminate().await.unwrap();
        assert_eq!(*state.borrow_and_update(), ReporterState::Terminated);

        let calls = fx.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fx.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_never_reports() {
        let fx = fixture();
        let initial = create(&fx.store, "s1", 0).await;
        let token = CancellationToken::new();
        token.cancel();
        let mut handle = Reporter::spawn(initial, &fx.ctx, token, &Span::none());

        handle.terminate().await.unwrap();
        assert_eq!(fx.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fx.store.update_count(), 0);
    }
}
