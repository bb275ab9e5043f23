//! # Global runtime configuration.
//!
//! Provides [`Config`], the centralized settings for the supervisor and every
//! reporter it spawns.
//!
//! ## Sentinel values
//! - `retry.timeout = 0s` → write attempts are not time-bounded
//! - `mailbox_capacity = 0` / `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::policies::RetryPolicy;

/// Global configuration for the node status runtime.
///
/// ## Field semantics
/// - `mailbox_capacity`: per-reporter update queue size; a full mailbox makes
///   the supervisor's control task wait (backpressure), it never drops updates
/// - `retry`: write attempt budget, per-attempt timeout and delay
/// - `bus_capacity`: event bus ring buffer size
/// - `grace`: how long [`Supervisor::run`](crate::Supervisor::run) waits for
///   reporters to stop after a shutdown signal
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of each reporter's update mailbox.
    pub mailbox_capacity: usize,

    /// Retry budget for status writes.
    pub retry: RetryPolicy,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Maximum time to wait for reporters to stop after a shutdown signal.
    pub grace: Duration,
}

impl Config {
    /// Returns the mailbox capacity clamped to a minimum of 1.
    #[inline]
    pub fn mailbox_capacity_clamped(&self) -> usize {
        self.mailbox_capacity.max(1)
    }

    /// Returns the bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `mailbox_capacity = 10`
    /// - `retry = RetryPolicy::default()` (3 attempts, 1s apart, 3s each)
    /// - `bus_capacity = 1024`
    /// - `grace = 30s`
    fn default() -> Self {
        Self {
            mailbox_capacity: 10,
            retry: RetryPolicy::default(),
            bus_capacity: 1024,
            grace: Duration::from_secs(30),
        }
    }
}
