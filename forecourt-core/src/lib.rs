//! Core domain types for the Forecourt listing catalog.
//!
//! The crate defines the catalog schema, the listing records that flow
//! through an import, the reconciliation that turns a feed snapshot into
//! write operations, and the store contract those operations run against.
//! Constructors and validators return `Result` so malformed data is caught
//! before it reaches the catalog.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod listing;
mod reconcile;
mod schema;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use listing::{
    DuplicateExternalId, ExternalId, FieldValue, NUMBER_EPSILON, NormalizedListing, NormalizedSet,
    RawListing, StoreKey, StoredListing,
};
pub use reconcile::{ListingUpdate, SyncPlan, reconcile};
pub use schema::{FieldDef, FieldKind, ListingSchema, SchemaError, ValidationError};
pub use store::{ListingStore, StoreError};

#[cfg(feature = "store-sqlite")]
pub use store::{CatalogSchemaError, SqliteListingStore};
