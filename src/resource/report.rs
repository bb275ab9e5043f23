//! # Status payloads written by populators.
//!
//! Every class keeps one value per address family in a [`PerFamily`], so a
//! populator registered for `(V6, Bgp)` only ever touches `report.bgp.v6`.

use std::time::SystemTime;

use super::node_status::IpFamily;

/// One value per address family.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PerFamily<T> {
    /// IPv4 value.
    pub v4: T,
    /// IPv6 value.
    pub v6: T,
}

impl<T> PerFamily<T> {
    /// Returns the value for `family`.
    pub fn get(&self, family: IpFamily) -> &T {
        match family {
            IpFamily::V4 => &self.v4,
            IpFamily::V6 => &self.v6,
        }
    }

    /// Returns the value for `family` mutably.
    pub fn get_mut(&mut self, family: IpFamily) -> &mut T {
        match family {
            IpFamily::V4 => &mut self.v4,
            IpFamily::V6 => &mut self.v6,
        }
    }
}

/// Agent-owned half of a [`NodeStatus`](crate::NodeStatus).
///
/// `last_updated` is stamped by the reporter right before each write attempt;
/// populators never set it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusReport {
    /// Wall-clock time of the last successful write (as submitted).
    pub last_updated: Option<SystemTime>,
    /// Routing daemon health ([`StatusClass::Agent`](crate::StatusClass::Agent)).
    pub agent: PerFamily<BgpDaemonStatus>,
    /// BGP session summary ([`StatusClass::Bgp`](crate::StatusClass::Bgp)).
    pub bgp: PerFamily<BgpSummary>,
    /// Learned routes ([`StatusClass::Routes`](crate::StatusClass::Routes)).
    pub routes: PerFamily<Vec<Route>>,
}

/// Coarse routing daemon state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BgpDaemonState {
    /// Not yet observed, or the daemon is not answering.
    #[default]
    NotReady,
    /// The daemon is up and answering.
    Ready,
}

/// Routing daemon health for one family.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BgpDaemonStatus {
    /// Coarse state.
    pub state: BgpDaemonState,
    /// Daemon version string.
    pub version: String,
    /// Router id in use.
    pub router_id: String,
    /// Time the daemon last started (as reported by the daemon).
    pub last_boot_time: String,
    /// Time the daemon last reloaded its configuration.
    pub last_reconfiguration_time: String,
}

/// How a BGP peer was configured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BgpPeerKind {
    /// Full-mesh peer derived from another node.
    NodeMesh,
    /// Peer configured for this node only.
    NodePeer,
    /// Peer configured for every node.
    GlobalPeer,
}

/// BGP session state as reported by the daemon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BgpSessionState {
    Idle,
    Connect,
    Active,
    OpenSent,
    OpenConfirm,
    Established,
    Close,
}

/// One BGP peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BgpPeer {
    /// Peer address.
    pub peer_ip: String,
    /// How the peer was configured.
    pub kind: BgpPeerKind,
    /// Session state.
    pub state: BgpSessionState,
    /// Time of the last state change (as reported by the daemon).
    pub since: String,
}

/// BGP session summary for one family.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BgpSummary {
    /// Number of sessions in `Established`.
    pub established: u32,
    /// Number of sessions in any other state.
    pub not_established: u32,
    /// All peers, sorted by the populator.
    pub peers: Vec<BgpPeer>,
}

impl BgpSummary {
    /// Builds a summary from a peer list, deriving the counters.
    pub fn from_peers(peers: Vec<BgpPeer>) -> Self {
        let established = peers
            .iter()
            .filter(|p| p.state == BgpSessionState::Established)
            .count() as u32;
        let not_established = peers.len() as u32 - established;
        Self {
            established,
            not_established,
            peers,
        }
    }
}

/// Whether a route is installed in the kernel or only known to the daemon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteKind {
    /// Installed in the forwarding table.
    Fib,
    /// Known to the daemon (routing information base) only.
    Rib,
}

/// One learned route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    /// Destination prefix.
    pub destination: String,
    /// Next hop.
    pub gateway: String,
    /// Outgoing interface.
    pub interface: String,
    /// FIB or RIB.
    pub kind: RouteKind,
    /// Peer the route was learned from, if any.
    pub learned_from: Option<String>,
}
