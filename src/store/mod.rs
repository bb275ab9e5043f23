//! # Datastore access.
//!
//! - [`StatusClient`] the CRUD + optimistic concurrency contract reporters write through
//! - [`MemoryStore`] an in-process implementation with a watch feed, used by
//!   tests, demos and single-node setups

mod client;
mod memory;

pub use client::{StatusClient, StatusClientRef};
pub use memory::MemoryStore;
