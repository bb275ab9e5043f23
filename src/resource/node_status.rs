//! # The `NodeStatus` record and its spec.
//!
//! A [`NodeStatus`] is created by an operator (or controller) to ask the agent on
//! `spec.node` to report the requested [`StatusClass`]es. The agent owns the
//! `status` half; everybody else owns the `spec` half.
//!
//! ## Versioning
//! ```text
//! create(res{version: None})  ─► stored{version: 1}
//! update(res{version: 1})     ─► stored{version: 2}
//! update(res{version: 1})     ─► Err(Conflict), stored unchanged
//! ```
//! The version only changes on a successful write; a stale write is rejected
//! without applying any field.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use super::report::StatusReport;

/// Opaque version token supplied by the datastore.
///
/// Tokens issued by one store are totally ordered: a later successful write
/// always carries a greater token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceVersion(u64);

impl ResourceVersion {
    /// Wraps a raw revision number.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw revision number.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Address family a populator reports for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IpFamily {
    /// IPv4.
    V4,
    /// IPv6.
    V6,
}

impl IpFamily {
    /// Families in the order a report cycle visits them.
    pub const ALL: [IpFamily; 2] = [IpFamily::V4, IpFamily::V6];

    /// Returns a short stable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            IpFamily::V4 => "ipv4",
            IpFamily::V6 => "ipv6",
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Class of status data a requester can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusClass {
    /// Health of the routing daemon itself (state, version, router id, boot times).
    Agent,
    /// BGP session summary and peer list.
    Bgp,
    /// Routes learned by the routing daemon.
    Routes,
}

impl StatusClass {
    /// Returns a short stable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusClass::Agent => "agent",
            StatusClass::Bgp => "bgp",
            StatusClass::Routes => "routes",
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requester-owned half of a [`NodeStatus`].
///
/// ## Field semantics
/// - `node`: name of the node whose agent must report
/// - `classes`: requested status classes (a set: duplicates collapse)
/// - `update_period_seconds`: `0` = report once (and again only on spec updates),
///   `n > 0` = re-check every `n` seconds
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeStatusSpec {
    /// Node that owns the reporting.
    pub node: String,
    /// Requested classes.
    pub classes: BTreeSet<StatusClass>,
    /// Re-check period in seconds (`0` = on demand only).
    pub update_period_seconds: u32,
}

impl NodeStatusSpec {
    /// Creates a spec for `node` with no classes and a zero period.
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            classes: BTreeSet::new(),
            update_period_seconds: 0,
        }
    }

    /// Adds a requested class.
    #[must_use]
    pub fn with_class(mut self, class: StatusClass) -> Self {
        self.classes.insert(class);
        self
    }

    /// Sets the re-check period in seconds.
    #[must_use]
    pub fn with_update_period(mut self, seconds: u32) -> Self {
        self.update_period_seconds = seconds;
        self
    }

    /// Returns the re-check period as an `Option`.
    ///
    /// - `None` → periodic reporting disabled
    /// - `Some(d)` → report every `d`
    #[inline]
    pub fn update_period(&self) -> Option<Duration> {
        match self.update_period_seconds {
            0 => None,
            n => Some(Duration::from_secs(u64::from(n))),
        }
    }
}

/// Versioned per-node status record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeStatus {
    /// Unique resource name.
    pub name: String,
    /// Version token of the stored copy (`None` until created).
    pub resource_version: Option<ResourceVersion>,
    /// What to report.
    pub spec: NodeStatusSpec,
    /// What was reported.
    pub status: StatusReport,
}

impl NodeStatus {
    /// Creates an unversioned resource with an empty status.
    pub fn new(name: impl Into<String>, spec: NodeStatusSpec) -> Self {
        Self {
            name: name.into(),
            resource_version: None,
            spec,
            status: StatusReport::default(),
        }
    }

    /// True if `other` requests exactly the same thing as `self`.
    pub fn has_same_spec(&self, other: &NodeStatus) -> bool {
        self.spec == other.spec
    }

    /// True if this resource must be reported by the agent running on `node`.
    #[inline]
    pub fn is_for_node(&self, node: &str) -> bool {
        self.spec.node == node
    }
}
