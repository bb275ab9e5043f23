//! # Node status resource model.
//!
//! This module provides the data types exchanged with the datastore:
//! - [`NodeStatus`] the versioned, per-node record (spec + status)
//! - [`NodeStatusSpec`] what the requester wants reported and how often
//! - [`StatusReport`] what the reporter last observed
//! - [`ResourceVersion`] the opaque optimistic-concurrency token
//! - [`IpFamily`] / [`StatusClass`] the registry keys for populators

mod node_status;
mod report;

pub use node_status::{IpFamily, NodeStatus, NodeStatusSpec, ResourceVersion, StatusClass};
pub use report::{
    BgpDaemonState, BgpDaemonStatus, BgpPeer, BgpPeerKind, BgpSessionState, BgpSummary,
    PerFamily, Route, RouteKind, StatusReport,
};
