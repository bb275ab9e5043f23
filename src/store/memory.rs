//! # In-memory datastore with a watch feed.
//!
//! [`MemoryStore`] keeps resources in a map guarded by a synchronous mutex and
//! stamps every successful write with the next value of a store-wide revision
//! counter, so versions are unique and strictly increasing.
//!
//! ## Watch semantics
//! ```text
//! watch() ──► replay: Add(r) for every stored r (name order)
//!         └─► then:   Add / Update / Delete for every successful write
//! ```
//! Notifications are sent while the lock is held, so every watcher observes
//! writes in commit order.
//!
//! ## Fault injection
//! [`MemoryStore::fail_next_updates`] makes the next `n` updates fail with
//! [`StoreError::Backend`] before any version check, to exercise retry paths.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::StoreError;
use crate::feed::SyncEvent;
use crate::resource::{NodeStatus, ResourceVersion};
use crate::store::StatusClient;

#[derive(Default)]
struct Inner {
    items: BTreeMap<String, NodeStatus>,
    revision: u64,
    watchers: Vec<mpsc::UnboundedSender<SyncEvent>>,
    failing_updates: u32,
    updates: u64,
}

impl Inner {
    fn next_version(&mut self) -> ResourceVersion {
        self.revision += 1;
        ResourceVersion::new(self.revision)
    }

    /// Sends `event` to every live watcher, forgetting closed ones.
    fn notify(&mut self, event: SyncEvent) {
        self.watchers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// In-process [`StatusClient`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribes to changes, replaying the current contents as `Add` first.
    pub fn watch(&self) -> mpsc::UnboundedReceiver<SyncEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        for item in inner.items.values() {
            let _ = tx.send(SyncEvent::added(item.clone()));
        }
        inner.watchers.push(tx);
        rx
    }

    /// Makes the next `n` calls to `update` fail with a backend error.
    pub fn fail_next_updates(&self, n: u32) {
        self.lock().failing_updates = n;
    }

    /// Number of successful updates since the store was created.
    pub fn update_count(&self) -> u64 {
        self.lock().updates
    }

    /// Returns the stored resources in name order.
    pub fn list(&self) -> Vec<NodeStatus> {
        self.lock().items.values().cloned().collect()
    }
}

#[async_trait]
impl StatusClient for MemoryStore {
    async fn get(&self, name: &str) -> Result<NodeStatus, StoreError> {
        self.lock()
            .items
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { name: name.into() })
    }

    async fn create(&self, mut resource: NodeStatus) -> Result<NodeStatus, StoreError> {
        if resource.name.is_empty() {
            return Err(StoreError::Invalid {
                reason: "resource name must not be empty".into(),
            });
        }
        if resource.resource_version.is_some() {
            return Err(StoreError::Invalid {
                reason: format!("create of '{}' must not carry a version", resource.name),
            });
        }

        let mut inner = self.lock();
        if inner.items.contains_key(&resource.name) {
            return Err(StoreError::AlreadyExists {
                name: resource.name,
            });
        }

        resource.resource_version = Some(inner.next_version());
        inner.items.insert(resource.name.clone(), resource.clone());
        inner.notify(SyncEvent::added(resource.clone()));
        Ok(resource)
    }

    async fn update(&self, mut resource: NodeStatus) -> Result<NodeStatus, StoreError> {
        let mut inner = self.lock();
        if inner.failing_updates > 0 {
            inner.failing_updates -= 1;
            return Err(StoreError::Backend {
                error: "injected update failure".into(),
            });
        }

        let Some(expected) = resource.resource_version else {
            return Err(StoreError::Invalid {
                reason: format!("update of '{}' requires a version", resource.name),
            });
        };
        let Some(stored) = inner.items.get(&resource.name) else {
            return Err(StoreError::NotFound {
                name: resource.name,
            });
        };
        let actual = stored.resource_version;
        if actual != Some(expected) {
            return Err(StoreError::Conflict {
                name: resource.name,
                expected: expected.to_string(),
                actual: actual.map(|v| v.to_string()).unwrap_or_default(),
            });
        }

        resource.resource_version = Some(inner.next_version());
        inner.items.insert(resource.name.clone(), resource.clone());
        inner.updates += 1;
        inner.notify(SyncEvent::updated(resource.clone()));
        Ok(resource)
    }

    async fn delete(&self, name: &str) -> Result<NodeStatus, StoreError> {
        let mut inner = self.lock();
        let removed = inner
            .items
            .remove(name)
            .ok_or_else(|| StoreError::NotFound { name: name.into() })?;
        inner.notify(SyncEvent::deleted(removed.clone()));
        Ok(removed)
    }
}
