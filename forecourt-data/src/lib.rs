//! Feed access, normalisation and sync orchestration for Forecourt.
//!
//! Responsibilities:
//! - Fetch the provider export page by page with authentication and retries.
//! - Coerce provider records into the catalog schema.
//! - Drive a full sync run against a [`ListingStore`](forecourt_core::ListingStore).
//!
//! Boundaries:
//! - Catalog rules (schema, reconciliation, store contract) live in
//!   `forecourt-core`.
//! - Credentials are supplied by the caller and never logged.
//!
//! Invariants:
//! - A run never mutates the catalog before the whole feed has been fetched.
//! - No global mutable state.
#![forbid(unsafe_code)]

pub mod feed;
pub mod normalize;
pub mod sync;

pub use feed::{
    AuthError, FeedCredentials, FeedError, FeedSource, FeedUrl, FetchError, FetchOptions,
    HttpFeedSource, PagingConfig, RetryPolicy, fetch_all,
};
pub use normalize::{Normalized, Normalizer, normalize};
pub use sync::{RunLock, SyncError, SyncLog, SyncOptions, SyncReport, run_sync};
