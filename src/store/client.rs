//! # Datastore client contract.
//!
//! ## Rules
//! - `update` carries the caller's expected version in `resource.resource_version`.
//! - A stale version yields [`StoreError::Conflict`] and applies nothing.
//! - Every successful write returns the stored copy with its new version.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::resource::NodeStatus;

/// CRUD over versioned [`NodeStatus`] resources.
#[async_trait]
pub trait StatusClient: Send + Sync + 'static {
    /// Reads the stored copy of `name`.
    async fn get(&self, name: &str) -> Result<NodeStatus, StoreError>;

    /// Stores a new resource. `resource.resource_version` must be `None`.
    async fn create(&self, resource: NodeStatus) -> Result<NodeStatus, StoreError>;

    /// Replaces a stored resource if its version still equals
    /// `resource.resource_version`.
    async fn update(&self, resource: NodeStatus) -> Result<NodeStatus, StoreError>;

    /// Removes `name`, returning its last stored copy.
    async fn delete(&self, name: &str) -> Result<NodeStatus, StoreError>;
}

/// Shared handle to a datastore client.
pub type StatusClientRef = Arc<dyn StatusClient>;
