//! Orchestration of a full feed-to-catalog sync run.
//!
//! A run fetches every feed page, normalises each record, reconciles the
//! result against the catalog and applies the plan. Only authentication,
//! fetch and catalog read failures abort a run; per-record problems are
//! collected in the [`SyncReport`].
#![forbid(unsafe_code)]

mod error;
mod lock;
mod ops;
mod report;
mod run_log;

pub use error::{RunLockError, SyncError, SyncLogError};
pub use lock::RunLock;
pub use ops::{SyncOptions, run_sync};
pub use report::{
    ApplyFailure, ApplyOperation, DEFAULT_SUMMARY_ERRORS, SyncReport, ValidationFailure,
};
pub use run_log::SyncLog;
