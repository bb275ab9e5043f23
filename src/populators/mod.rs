//! # Pluggable status sources.
//!
//! This module provides the populator-related types:
//! - [`Populate`] - trait for producing one status class for one address family
//! - [`PopulatorFn`] - closure-backed implementation
//! - [`PopulatorRef`] - shared reference to a populator (`Arc<dyn Populate>`)
//! - [`PopulatorRegistry`] - immutable `(IpFamily, StatusClass) → PopulatorRef` table

mod populate;
mod populator_fn;
mod registry;

pub use populate::{Populate, PopulatorRef};
pub use populator_fn::PopulatorFn;
pub use registry::{PopulatorRegistry, PopulatorRegistryBuilder};
