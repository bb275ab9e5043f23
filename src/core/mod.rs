//! Runtime core: supervision and per-resource reporting.
//!
//! The public API from this module is [`Supervisor`] (with its
//! [`SupervisorBuilder`] and [`Config`]) and the [`ReporterState`] it reports.
//!
//! Internal modules:
//! - [`supervisor`]: consumes the sync feed, owns the bus and shutdown;
//! - [`registry`]: serialized name → reporter map;
//! - [`reporter`]: one worker per resource (schedule, populate, persist);
//! - [`schedule`]: the reporter's optional repeating timer;
//! - [`state`]: reporter lifecycle state machine;
//! - [`shutdown`]: OS signal handling.

mod builder;
mod config;
mod registry;
mod reporter;
mod schedule;
mod shutdown;
mod state;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::Config;
pub use state::ReporterState;
pub use supervisor::Supervisor;
