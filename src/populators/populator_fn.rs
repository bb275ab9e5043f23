//! # Function-backed populator (`PopulatorFn`)
//!
//! [`PopulatorFn`] wraps a closure `F: Fn(&mut NodeStatus) -> Result<(), PopulateError>`.
//! Handy for static data, tests and adapters over synchronous readers.
//!
//! ## Concurrency semantics
//! - The closure is `Fn`, not `FnMut`: there is no hidden mutation between calls.
//! - If state must be shared, capture an `Arc<...>` explicitly.
//!
//! ## Example
//! ```rust
//! use nodestatus::{IpFamily, PopulatorFn, PopulatorRef};
//!
//! let p: PopulatorRef = PopulatorFn::arc("static-router-id", |status| {
//!     status.status.agent.get_mut(IpFamily::V4).router_id = "172.17.0.1".into();
//!     Ok(())
//! });
//!
//! assert_eq!(p.name(), "static-router-id");
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PopulateError;
use crate::populators::populate::Populate;
use crate::resource::NodeStatus;

/// Function-backed populator implementation.
#[derive(Debug)]
pub struct PopulatorFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> PopulatorFn<F>
where
    F: Fn(&mut NodeStatus) -> Result<(), PopulateError> + Send + Sync + 'static,
{
    /// Creates a new function-backed populator.
    ///
    /// Prefer [`PopulatorFn::arc`] when you immediately need a [`PopulatorRef`](crate::PopulatorRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Creates the populator and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F> Populate for PopulatorFn<F>
where
    F: Fn(&mut NodeStatus) -> Result<(), PopulateError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn populate(&self, status: &mut NodeStatus) -> Result<(), PopulateError> {
        (self.f)(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{IpFamily, NodeStatusSpec};

    #[tokio::test]
    async fn closure_writes_into_status() {
        let p = PopulatorFn::new("boot-time", |status: &mut NodeStatus| {
            status.status.agent.get_mut(IpFamily::V6).last_boot_time = "2021-09-19 20:48:51".into();
            Ok(())
        });

        let mut res = NodeStatus::new("s1", NodeStatusSpec::new("node-a"));
        p.populate(&mut res).await.unwrap();

        assert_eq!(res.status.agent.v6.last_boot_time, "2021-09-19 20:48:51");
        assert!(res.status.agent.v4.last_boot_time.is_empty());
    }

    #[tokio::test]
    async fn closure_error_is_returned() {
        let p = PopulatorFn::new("broken", |_: &mut NodeStatus| {
            Err(PopulateError::unavailable("control socket closed"))
        });

        let mut res = NodeStatus::new("s1", NodeStatusSpec::new("node-a"));
        let err = p.populate(&mut res).await.unwrap_err();
        assert_eq!(err.as_label(), "populate_unavailable");
    }
}
