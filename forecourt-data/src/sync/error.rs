//! Error types produced by the sync orchestrator.

use std::{io, path::PathBuf};

use camino::Utf8PathBuf;
use forecourt_core::StoreError;
use thiserror::Error;

use crate::feed::{AuthError, FeedError, FetchError};

/// Fatal failures that abort a sync run before the catalog is touched.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    /// Credentials were missing or rejected.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// A feed page could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The current catalog could not be read.
    #[error("failed to load the catalog: {source}")]
    LoadCatalog {
        /// Underlying store failure.
        #[source]
        source: StoreError,
    },
    /// The run was cancelled before any change was applied.
    #[error("sync cancelled before any change was applied")]
    Cancelled,
}

impl From<FeedError> for SyncError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Auth(err) => Self::Auth(err),
            FeedError::Fetch(err) => Self::Fetch(err),
        }
    }
}

/// Errors raised by the sync run log.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncLogError {
    /// The log database could not be opened or prepared.
    #[error("failed to initialise sync log at {path:?}: {source}")]
    Initialise {
        /// Underlying SQLite error.
        source: rusqlite::Error,
        /// Location of the log database.
        path: PathBuf,
    },
    /// Writing a run entry failed.
    #[error("failed to record sync run: {source}")]
    Record {
        /// Underlying SQLite error.
        source: rusqlite::Error,
    },
    /// A count did not fit into an SQLite integer.
    #[error("sync run value `{what}` is out of range")]
    ValueOutOfRange {
        /// Name of the offending value.
        what: &'static str,
    },
}

/// Errors raised while taking the cross-process run lock.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunLockError {
    /// Another run holds the lock.
    #[error("another sync run holds {path}; remove it if no run is active")]
    Held {
        /// Lock file path.
        path: Utf8PathBuf,
    },
    /// The lock file could not be created or inspected.
    #[error("failed to create lock file {path}: {source}")]
    Io {
        /// Lock file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}
