//! # Error Taxonomy
//!
//! Failure classes for one update cycle. A transient fetch failure is
//! retried on the next cadence tick; a malformed catalog is a fatal
//! misconfiguration for that feed's worker. Probe timeouts are not errors,
//! they are a liveness signal handled by the presence monitor.

use thiserror::Error;

/// Failure classes for retrieving and decoding a catalog index.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure. The cycle aborts silently and the next
    /// scheduled run retries naturally.
    #[error("transient fetch failure: {0}")]
    Transient(String),

    /// The feed answered but the payload is unusable (bad status, bad
    /// archive, bad JSON). Silent skipping would hide a broken feed
    /// forever, so the owning worker stops loudly.
    #[error("malformed catalog: {0}")]
    Malformed(String),
}

/// Top-level failure classes for one feed cycle.
#[derive(Debug, Error)]
pub enum HeraldError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<rusqlite::Error> for HeraldError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Persistence(value.to_string())
    }
}

pub type HeraldResult<T> = Result<T, HeraldError>;
