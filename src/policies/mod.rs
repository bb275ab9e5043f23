//! Write retry policies.
//!
//! This module groups the knobs that control **how often** a failed status
//! write is retried and **how long** to wait between attempts.
//!
//! ## Contents
//! - [`RetryPolicy`] attempt budget, per-attempt timeout and the retry combinator
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid synchronized retries
//! - [`WriteOutcome`]  classification of a retried write
//!
//! ## Defaults
//! - `RetryPolicy::default()` → 3 attempts, 3s per attempt.
//! - `BackoffPolicy::default()` → constant 1s, no jitter.

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::{RetryPolicy, WriteOutcome};
