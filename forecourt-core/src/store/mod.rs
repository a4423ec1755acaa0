//! Persistence contract for the listing catalog.
//!
//! The [`ListingStore`] trait is the only surface the sync pipeline needs from
//! a record store. Every write is validated against the store's
//! [`ListingSchema`](crate::ListingSchema); violations surface as
//! [`StoreError::Schema`].

use std::error::Error as StdError;

use thiserror::Error;

use crate::{ExternalId, NormalizedListing, StoreKey, StoredListing, ValidationError};

#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::{CATALOG_SCHEMA_VERSION, CatalogSchemaError, SqliteListingStore, initialise_catalog};

/// Errors raised by [`ListingStore`] operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The listing does not conform to the catalog schema.
    #[error("listing violates the catalog schema: {0}")]
    Schema(#[from] ValidationError),
    /// Another listing already uses the external identifier.
    #[error("a listing with external id {external_id} already exists")]
    DuplicateExternalId {
        /// Conflicting identifier.
        external_id: ExternalId,
    },
    /// No listing exists under the key.
    #[error("no listing stored under key {key}")]
    NotFound {
        /// Key that was looked up.
        key: StoreKey,
    },
    /// A persisted row could not be decoded into a listing.
    #[error("stored listing {key} is corrupt: {message}")]
    CorruptRecord {
        /// Key of the unreadable row.
        key: StoreKey,
        /// Description of the problem.
        message: String,
    },
    /// The backing storage failed.
    #[error("catalog {operation} failed: {source}")]
    Backend {
        /// Operation being attempted.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

/// Read/write access to the persisted listing catalog.
///
/// # Examples
///
/// ```rust
/// use chrono::Utc;
/// use forecourt_core::{
///     ExternalId, ListingStore, NormalizedListing, StoreError, StoreKey, StoredListing,
/// };
///
/// #[derive(Default)]
/// struct VecStore {
///     rows: Vec<StoredListing>,
/// }
///
/// impl ListingStore for VecStore {
///     fn find_by_external_id(&self, id: &ExternalId) -> Result<Option<StoredListing>, StoreError> {
///         Ok(self.rows.iter().find(|row| row.external_id() == id).cloned())
///     }
///
///     fn list_all(&self) -> Result<Vec<StoredListing>, StoreError> {
///         Ok(self.rows.clone())
///     }
///
///     fn create(&mut self, listing: NormalizedListing) -> Result<StoredListing, StoreError> {
///         let key = StoreKey::new(i64::try_from(self.rows.len()).unwrap_or(i64::MAX));
///         let row = StoredListing { key, listing, last_synced: Utc::now() };
///         self.rows.push(row.clone());
///         Ok(row)
///     }
///
///     fn update(
///         &mut self,
///         key: StoreKey,
///         listing: NormalizedListing,
///     ) -> Result<StoredListing, StoreError> {
///         let row = self
///             .rows
///             .iter_mut()
///             .find(|row| row.key == key)
///             .ok_or(StoreError::NotFound { key })?;
///         row.listing = listing;
///         Ok(row.clone())
///     }
///
///     fn delete(&mut self, key: StoreKey) -> Result<(), StoreError> {
///         self.rows.retain(|row| row.key != key);
///         Ok(())
///     }
/// }
///
/// let mut store = VecStore::default();
/// let created = store.create(NormalizedListing::new("A"))?;
/// assert_eq!(store.find_by_external_id(&ExternalId::from("A"))?, Some(created));
/// # Ok::<(), StoreError>(())
/// ```
pub trait ListingStore {
    /// Fetch the listing with the given provider identifier, if any.
    fn find_by_external_id(&self, id: &ExternalId) -> Result<Option<StoredListing>, StoreError>;

    /// Return every listing in the catalog.
    fn list_all(&self) -> Result<Vec<StoredListing>, StoreError>;

    /// Persist a new listing and return it with its assigned key.
    fn create(&mut self, listing: NormalizedListing) -> Result<StoredListing, StoreError>;

    /// Replace the fields of the listing stored under `key`.
    fn update(&mut self, key: StoreKey, listing: NormalizedListing)
    -> Result<StoredListing, StoreError>;

    /// Remove the listing stored under `key`.
    fn delete(&mut self, key: StoreKey) -> Result<(), StoreError>;
}
