//! # Bounded write retry.
//!
//! [`RetryPolicy::run`] drives one logical datastore write through at most
//! `attempts` physical attempts, each bounded by `timeout`, and classifies the
//! result into a [`WriteOutcome`]:
//!
//! ```text
//! attempt n ──► Ok(v)                     ─► Written { value, attempt: n }
//!           ├─► Err(Conflict)             ─► Conflict { attempt: n }        (never retried)
//!           └─► any other Err(e) / timeout:
//!                 ├─ n < attempts ─► on_retry(n, e, delay); sleep(delay); attempt n+1
//!                 └─ n = attempts ─► Failed { attempts: n, error }
//! ```
//!
//! There is no cancellation: once started, `run` always reaches one of the
//! three outcomes.

use std::future::Future;
use std::time::Duration;

use tokio::time;

use crate::error::StoreError;
use crate::policies::backoff::BackoffPolicy;

/// Retry budget for one logical write.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Maximum number of attempts (minimum 1).
    pub attempts: u32,
    /// Delay between attempts.
    pub backoff: BackoffPolicy,
    /// Per-attempt deadline (`0s` = none).
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    /// 3 attempts, constant 1s delay, 3s per attempt.
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: BackoffPolicy::default(),
            timeout: Duration::from_secs(3),
        }
    }
}

/// Result of a retried write.
#[derive(Debug)]
pub enum WriteOutcome<T> {
    /// The write went through.
    Written {
        /// Value returned by the successful attempt.
        value: T,
        /// 1-based attempt that succeeded.
        attempt: u32,
    },
    /// The write was rejected as stale.
    Conflict {
        /// 1-based attempt that conflicted.
        attempt: u32,
    },
    /// The budget ran out.
    Failed {
        /// Attempts made.
        attempts: u32,
        /// Last error observed.
        error: StoreError,
    },
}

impl RetryPolicy {
    /// Returns the per-attempt deadline as an `Option`.
    #[inline]
    pub fn attempt_timeout(&self) -> Option<Duration> {
        (self.timeout > Duration::ZERO).then_some(self.timeout)
    }

    /// Runs `op` until it succeeds, conflicts, or the budget is spent.
    ///
    /// `op` receives the 1-based attempt number. `on_retry` is called before
    /// each pause with the failed attempt, its error and the chosen delay.
    pub async fn run<T, F, Fut, R>(&self, mut op: F, mut on_retry: R) -> WriteOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
        R: FnMut(u32, &StoreError, Duration),
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let res = match self.attempt_timeout() {
                Some(dur) => match time::timeout(dur, op(attempt)).await {
                    Ok(r) => r,
                    Err(_elapsed) => Err(StoreError::Timeout { timeout: dur }),
                },
                None => op(attempt).await,
            };

            let error = match res {
                Ok(value) => return WriteOutcome::Written { value, attempt },
                Err(e) if e.is_conflict() => return WriteOutcome::Conflict { attempt },
                Err(e) => e,
            };

            if attempt >= attempts {
                return WriteOutcome::Failed {
                    attempts: attempt,
                    error,
                };
            }

            let delay = self.backoff.next(attempt - 1);
            on_retry(attempt, &error, delay);
            time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn backend(msg: &str) -> StoreError {
        StoreError::Backend { error: msg.into() }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let mut retries = Vec::new();

        let out = RetryPolicy::default()
            .run(
                |attempt| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt < 3 { Err(backend("eof")) } else { Ok(attempt) }
                    }
                },
                |attempt, _, delay| retries.push((attempt, delay)),
            )
            .await;

        assert!(matches!(out, WriteOutcome::Written { value: 3, attempt: 3 }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            retries,
            vec![(1, Duration::from_secs(1)), (2, Duration::from_secs(1))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn conflict_is_never_retried() {
        let calls = AtomicU32::new(0);
        let out: WriteOutcome<()> = RetryPolicy::default()
            .run(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async {
                        Err(StoreError::Conflict {
                            name: "s1".into(),
                            expected: "1".into(),
                            actual: "2".into(),
                        })
                    }
                },
                |_, _, _| {},
            )
            .await;

        assert!(matches!(out, WriteOutcome::Conflict { attempt: 1 }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_is_bounded() {
        let calls = AtomicU32::new(0);
        let out: WriteOutcome<()> = RetryPolicy::default()
            .run(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(backend("connection refused")) }
                },
                |_, _, _| {},
            )
            .await;

        match out {
            WriteOutcome::Failed { attempts, error } => {
                assert_eq!(attempts, 3);
                assert_eq!(error.as_label(), "store_backend");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempts_time_out() {
        let policy = RetryPolicy {
            attempts: 2,
            ..RetryPolicy::default()
        };
        let out: WriteOutcome<()> = policy
            .run(
                |_| async {
                    time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                },
                |_, _, _| {},
            )
            .await;

        match out {
            WriteOutcome::Failed { attempts, error } => {
                assert_eq!(attempts, 2);
                assert_eq!(error.as_label(), "store_timeout");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn every_non_conflict_error_uses_the_budget() {
        for error in [
            StoreError::Invalid {
                reason: "missing version".into(),
            },
            StoreError::AlreadyExists { name: "s1".into() },
            StoreError::NotFound { name: "s1".into() },
        ] {
            let label = error.as_label();
            let calls = AtomicU32::new(0);
            let mut retries = 0;
            let out: WriteOutcome<()> = RetryPolicy::default()
                .run(
                    |_| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let error = error.clone();
                        async move { Err(error) }
                    },
                    |_, _, _| retries += 1,
                )
                .await;

            match out {
                WriteOutcome::Failed { attempts, error } => {
                    assert_eq!(attempts, 3, "{label}");
                    assert_eq!(error.as_label(), label);
                }
                other => panic!("unexpected outcome for {label}: {other:?}"),
            }
            assert_eq!(calls.load(Ordering::SeqCst), 3, "{label}");
            assert_eq!(retries, 2, "{label}");
        }
    }
}
