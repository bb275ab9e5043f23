use crate::resource::NodeStatus;

/// Kind of change a [`SyncEvent`] describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOp {
    /// The resource appeared (created, or listed during the initial sync).
    Add,
    /// The resource changed (spec, status or both).
    Update,
    /// The resource was deleted; the payload is its last known state.
    Delete,
}

/// One notification from the sync feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncEvent {
    /// Kind of change.
    pub op: SyncOp,
    /// Resource state after the change (before it, for deletes).
    pub resource: NodeStatus,
}

impl SyncEvent {
    /// Creates an `Add` notification.
    pub fn added(resource: NodeStatus) -> Self {
        Self {
            op: SyncOp::Add,
            resource,
        }
    }

    /// Creates an `Update` notification.
    pub fn updated(resource: NodeStatus) -> Self {
        Self {
            op: SyncOp::Update,
            resource,
        }
    }

    /// Creates a `Delete` notification.
    pub fn deleted(resource: NodeStatus) -> Self {
        Self {
            op: SyncOp::Delete,
            resource,
        }
    }

    /// Name of the resource this notification is about.
    #[inline]
    pub fn name(&self) -> &str {
        &self.resource.name
    }
}
