//! # Event subscribers for the node status runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`ReportStats`] subscriber.
//!
//! ## Architecture
//! ```text
//! Reporter ── publish(Event) ──► Bus ──► Supervisor listener ──► SubscriberSet::emit(&Event)
//!                                                                ┌─────────┼─────────┐
//!                                                                ▼         ▼         ▼
//!                                                           ReportStats  Metrics   Custom
//! ```
//!
//! ## Subscriber types
//! - **Passive subscribers** observe and react to events (metrics, alerts)
//! - **Stateful subscribers** maintain state derived from events ([`ReportStats`])

mod set;
mod stats;
mod subscribe;

pub use set::SubscriberSet;
pub use stats::{ReportStats, ReporterStats};
pub use subscribe::Subscribe;
