//! # Populator abstraction.
//!
//! A populator reads one kind of local state (routing daemon health, BGP
//! sessions, learned routes) for one address family and writes it into the
//! status half of a [`NodeStatus`]. The common handle type is [`PopulatorRef`],
//! an `Arc<dyn Populate>` shared by every reporter.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PopulateError;
use crate::resource::NodeStatus;

/// # Producer of one status class for one address family.
///
/// ## Contract
/// - Called repeatedly, from many reporters, possibly concurrently.
/// - Must only write the part of `status.status` it is responsible for.
/// - Must not keep references into `status` beyond the call.
/// - An `Err` aborts the whole report cycle; whatever was written into the
///   working copy is discarded.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use nodestatus::{BgpDaemonState, IpFamily, NodeStatus, Populate, PopulateError};
///
/// struct AlwaysReady(IpFamily);
///
/// #[async_trait]
/// impl Populate for AlwaysReady {
///     fn name(&self) -> &str { "always-ready" }
///
///     async fn populate(&self, status: &mut NodeStatus) -> Result<(), PopulateError> {
///         status.status.agent.get_mut(self.0).state = BgpDaemonState::Ready;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Populate: Send + Sync + 'static {
    /// Returns a stable, human-readable populator name (for logs).
    fn name(&self) -> &str;

    /// Writes freshly observed data into `status`.
    async fn populate(&self, status: &mut NodeStatus) -> Result<(), PopulateError>;
}

/// Shared handle to a populator.
pub type PopulatorRef = Arc<dyn Populate>;
