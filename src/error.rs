//! Error types used by the node status runtime, the datastore and populators.
//!
//! This module defines three error enums:
//!
//! - [`RuntimeError`] errors raised by the supervisor itself.
//! - [`StoreError`] errors returned by a [`StatusClient`](crate::StatusClient).
//! - [`PopulateError`] errors returned by a [`Populate`](crate::Populate) implementation.
//!
//! All types provide `as_label` for logs/metrics. [`StoreError`] additionally
//! separates the benign [`StoreError::Conflict`] outcome from failures worth retrying.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the supervisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// `start` (or `run`) was called on a supervisor that is already consuming a feed.
    #[error("supervisor already started")]
    AlreadyStarted,

    /// Shutdown grace period was exceeded; some reporters did not confirm termination.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of reporters that were still registered when the grace expired.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use nodestatus::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::AlreadyStarted.as_label(), "runtime_already_started");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyStarted => "runtime_already_started",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Errors produced by the datastore client.
///
/// `Conflict` is the distinguished optimistic-concurrency outcome: the caller's
/// version token is stale and nothing was applied.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The expected version did not match the stored version.
    #[error("update conflict on '{name}': expected version {expected}, stored {actual}")]
    Conflict {
        /// Resource name.
        name: String,
        /// Version supplied by the caller.
        expected: String,
        /// Version currently stored.
        actual: String,
    },

    /// No resource with that name exists.
    #[error("resource '{name}' not found")]
    NotFound {
        /// Resource name.
        name: String,
    },

    /// A create was attempted for a name that is already taken.
    #[error("resource '{name}' already exists")]
    AlreadyExists {
        /// Resource name.
        name: String,
    },

    /// The request itself was malformed (empty name, missing version, ...).
    #[error("invalid request: {reason}")]
    Invalid {
        /// Human-readable description.
        reason: String,
    },

    /// The per-attempt deadline elapsed before the datastore answered.
    #[error("request timed out after {timeout:?}")]
    Timeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// Any other backend failure (transport, server error, ...).
    #[error("datastore error: {error}")]
    Backend {
        /// The underlying error message.
        error: String,
    },
}

impl StoreError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use nodestatus::StoreError;
    ///
    /// let err = StoreError::NotFound { name: "s1".into() };
    /// assert_eq!(err.as_label(), "store_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::Conflict { .. } => "store_conflict",
            StoreError::NotFound { .. } => "store_not_found",
            StoreError::AlreadyExists { .. } => "store_already_exists",
            StoreError::Invalid { .. } => "store_invalid",
            StoreError::Timeout { .. } => "store_timeout",
            StoreError::Backend { .. } => "store_backend",
        }
    }

    /// True for the stale-version outcome.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// Indicates whether a write that failed with this error is worth retrying.
    ///
    /// Everything but a conflict is: the next sync notification resynchronizes
    /// a stale writer instead.
    ///
    /// # Example
    /// ```
    /// use nodestatus::StoreError;
    ///
    /// assert!(StoreError::Backend { error: "eof".into() }.is_retryable());
    /// assert!(StoreError::Invalid { reason: "empty name".into() }.is_retryable());
    /// assert!(!StoreError::Conflict {
    ///     name: "s1".into(),
    ///     expected: "1".into(),
    ///     actual: "2".into(),
    /// }
    /// .is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        !self.is_conflict()
    }
}

/// # Errors produced by a populator.
///
/// Populators do not know which cycle they run in; the reporter attaches the
/// address family and status class when it logs the failure.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PopulateError {
    /// The local data source could not be reached (socket closed, daemon down).
    #[error("data source unavailable: {error}")]
    Unavailable {
        /// The underlying error message.
        error: String,
    },

    /// The data source answered with something that could not be interpreted.
    #[error("malformed data: {error}")]
    Malformed {
        /// The underlying error message.
        error: String,
    },
}

impl PopulateError {
    /// Shorthand for [`PopulateError::Unavailable`].
    pub fn unavailable(error: impl Into<String>) -> Self {
        PopulateError::Unavailable {
            error: error.into(),
        }
    }

    /// Shorthand for [`PopulateError::Malformed`].
    pub fn malformed(error: impl Into<String>) -> Self {
        PopulateError::Malformed {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PopulateError::Unavailable { .. } => "populate_unavailable",
            PopulateError::Malformed { .. } => "populate_malformed",
        }
    }
}
