//! # Example: local_agent
//!
//! A single-node agent against the in-memory datastore.
//!
//! Demonstrates how to:
//! - Register populators per address family and status class.
//! - Build a [`Supervisor`] with a [`ReportStats`] subscriber and a custom one.
//! - Drive it from the store's watch feed while an "operator" task creates,
//!   updates and deletes status requests.
//!
//! ## Flow
//! ```text
//! operator ──► MemoryStore.create / update / delete
//!                   │ watch()
//!                   ▼
//!             Supervisor::run()
//!                   ├─► Reporter "ns-periodic" (every 2s, reload counter changes)
//!                   ├─► Reporter "ns-once"     (interval 0, one write)
//!                   └─► "ns-remote" ignored    (other node)
//! Ctrl-C ──► stop every reporter within grace ──► print stored versions
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example local_agent
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;

use nodestatus::{
    BgpDaemonState, BgpPeer, BgpPeerKind, BgpSessionState, BgpSummary, Config, Event, EventKind,
    IpFamily, MemoryStore, NodeStatus, NodeStatusSpec, PopulatorFn, PopulatorRegistry,
    ReportStats, StatusClass, StatusClient, Subscribe, Supervisor,
};

const NODE: &str = "node-a";

/// Prints cycles that ended without a write for a bad reason.
struct Alarm;

#[async_trait]
impl Subscribe for Alarm {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::WriteConflict | EventKind::WriteExhausted | EventKind::PopulateFailed => {
                println!(
                    "[alarm] {:?} on {} ({})",
                    ev.kind,
                    ev.reporter.as_deref().unwrap_or("-"),
                    ev.reason.as_deref().unwrap_or("-"),
                );
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "alarm"
    }
}

fn populators(reloads: Arc<AtomicU64>) -> PopulatorRegistry {
    let mut builder = PopulatorRegistry::builder();
    for family in IpFamily::ALL {
        let reloads = Arc::clone(&reloads);
        let agent = PopulatorFn::arc("bird-agent", move |status: &mut NodeStatus| {
            let n = reloads.fetch_add(1, Ordering::Relaxed) / 4;
            let agent = status.status.agent.get_mut(family);
            agent.state = BgpDaemonState::Ready;
            agent.version = "v0.3.3+birdv1.6.8".into();
            agent.router_id = match family {
                IpFamily::V4 => "172.17.0.1".into(),
                IpFamily::V6 => "2001:20::8".into(),
            };
            agent.last_reconfiguration_time = format!("reload #{n}");
            Ok(())
        });
        let bgp = PopulatorFn::arc("bird-bgp", move |status: &mut NodeStatus| {
            *status.status.bgp.get_mut(family) = BgpSummary::from_peers(vec![BgpPeer {
                peer_ip: match family {
                    IpFamily::V4 => "172.17.0.2".into(),
                    IpFamily::V6 => "2001:20::9".into(),
                },
                kind: BgpPeerKind::NodeMesh,
                state: BgpSessionState::Established,
                since: "2021-09-19".into(),
            }]);
            Ok(())
        });
        builder = builder
            .register(family, StatusClass::Agent, agent)
            .register(family, StatusClass::Bgp, bgp);
    }
    builder.build()
}

async fn operator(
    store: Arc<MemoryStore>,
    stats: Arc<ReportStats>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let periodic = NodeStatusSpec::new(NODE)
        .with_class(StatusClass::Agent)
        .with_class(StatusClass::Bgp)
        .with_update_period(2);
    store.create(NodeStatus::new("ns-periodic", periodic)).await?;

    let once = NodeStatusSpec::new(NODE).with_class(StatusClass::Bgp);
    store.create(NodeStatus::new("ns-once", once)).await?;

    let remote = NodeStatusSpec::new("node-b").with_class(StatusClass::Agent);
    store.create(NodeStatus::new("ns-remote", remote)).await?;

    tokio::time::sleep(Duration::from_secs(5)).await;
    println!("[operator] asking ns-once for agent data too");
    let mut current = store.get("ns-once").await?;
    current.spec.classes.insert(StatusClass::Agent);
    store.update(current).await?;

    tokio::time::sleep(Duration::from_secs(5)).await;
    println!("[operator] deleting ns-periodic");
    store.delete("ns-periodic").await?;

    tokio::time::sleep(Duration::from_millis(200)).await;
    for (name, s) in stats.snapshot().await {
        println!(
            "[stats] {name}: written={} unchanged={} conflicts={} populate_failures={}",
            s.written, s.unchanged, s.conflicts, s.populate_failures
        );
    }
    println!("[operator] done, press Ctrl-C to stop");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let store = Arc::new(MemoryStore::new());
    let stats = Arc::new(ReportStats::new());
    let subs: Vec<Arc<dyn Subscribe>> = vec![stats.clone(), Arc::new(Alarm)];

    let cfg = Config {
        grace: Duration::from_secs(5),
        ..Config::default()
    };
    let sup = Supervisor::builder(NODE, store.clone(), populators(Arc::new(AtomicU64::new(0))))
        .with_config(cfg)
        .with_subscribers(subs)
        .build();

    let op = tokio::spawn(operator(store.clone(), stats));
    sup.run(store.watch()).await?;
    op.abort();

    for resource in store.list() {
        println!(
            "[store] {} version={:?} updated={:?}",
            resource.name, resource.resource_version, resource.status.last_updated
        );
    }
    Ok(())
}
