//! Facade crate for the Forecourt listing pipeline.
//!
//! This crate re-exports the core domain types and exposes the feed pipeline
//! and the SQLite catalog behind feature flags.

#![forbid(unsafe_code)]

pub use forecourt_core::{
    ExternalId, FieldDef, FieldKind, FieldValue, ListingSchema, ListingStore, ListingUpdate,
    NormalizedListing, NormalizedSet, RawListing, SchemaError, StoreError, StoreKey,
    StoredListing, SyncPlan, ValidationError, reconcile,
};

#[cfg(feature = "store-sqlite")]
pub use forecourt_core::{CatalogSchemaError, SqliteListingStore};

#[cfg(feature = "pipeline")]
pub use forecourt_data::{
    FeedCredentials, FeedError, FeedSource, FeedUrl, FetchOptions, HttpFeedSource, Normalizer,
    RunLock, SyncError, SyncLog, SyncOptions, SyncReport, run_sync,
};
