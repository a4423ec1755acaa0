//! In-memory `ListingStore` and listing builders used by unit and behaviour
//! tests.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;

use crate::{
    ExternalId, FieldValue, ListingSchema, ListingStore, NormalizedListing, StoreError, StoreKey,
    StoredListing,
};

/// Write operations observed by a [`MemoryListingStore`], in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOperation {
    /// A `create` call for the identifier.
    Create(ExternalId),
    /// An `update` call for the identifier.
    Update(ExternalId),
    /// A `delete` call for the identifier.
    Delete(ExternalId),
}

/// In-memory [`ListingStore`] with scripted failures.
///
/// The store validates writes against its schema exactly like the SQLite
/// implementation and records every write attempt, successful or not, so
/// tests can assert on ordering and on the absence of writes.
#[derive(Debug)]
pub struct MemoryListingStore {
    schema: ListingSchema,
    rows: BTreeMap<StoreKey, StoredListing>,
    next_key: i64,
    operations: Vec<StoreOperation>,
    failing_ids: HashSet<ExternalId>,
    fail_list_all: bool,
}

impl Default for MemoryListingStore {
    fn default() -> Self {
        Self::new(ListingSchema::vehicle())
    }
}

impl MemoryListingStore {
    /// Create an empty store validating against `schema`.
    #[must_use]
    pub fn new(schema: ListingSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
            next_key: 1,
            operations: Vec::new(),
            failing_ids: HashSet::new(),
            fail_list_all: false,
        }
    }

    /// Seed the store with existing listings without recording operations.
    #[must_use]
    pub fn with_listings<I>(mut self, listings: I) -> Self
    where
        I: IntoIterator<Item = NormalizedListing>,
    {
        for listing in listings {
            let key = self.allocate_key();
            self.rows.insert(
                key,
                StoredListing {
                    key,
                    listing,
                    last_synced: Utc::now(),
                },
            );
        }
        self
    }

    /// Make every write touching `id` fail with a backend error.
    #[must_use]
    pub fn failing_for(mut self, id: impl Into<ExternalId>) -> Self {
        self.failing_ids.insert(id.into());
        self
    }

    /// Make [`ListingStore::list_all`] fail with a backend error.
    #[must_use]
    pub const fn failing_list_all(mut self) -> Self {
        self.fail_list_all = true;
        self
    }

    /// Write operations attempted so far.
    #[must_use]
    pub fn operations(&self) -> &[StoreOperation] {
        &self.operations
    }

    /// Snapshot of the stored listings ordered by key.
    #[must_use]
    pub fn listings(&self) -> Vec<StoredListing> {
        self.rows.values().cloned().collect()
    }

    /// Identifiers currently stored, sorted.
    #[must_use]
    pub fn external_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .rows
            .values()
            .map(|row| row.external_id().to_string())
            .collect();
        ids.sort_unstable();
        ids
    }

    fn allocate_key(&mut self) -> StoreKey {
        let key = StoreKey::new(self.next_key);
        self.next_key += 1;
        key
    }

    fn injected_failure(&self, operation: &'static str, id: &ExternalId) -> Result<(), StoreError> {
        if self.failing_ids.contains(id) {
            return Err(StoreError::Backend {
                operation,
                source: format!("injected failure for {id}").into(),
            });
        }
        Ok(())
    }
}

impl ListingStore for MemoryListingStore {
    fn find_by_external_id(&self, id: &ExternalId) -> Result<Option<StoredListing>, StoreError> {
        Ok(self
            .rows
            .values()
            .find(|row| row.external_id() == id)
            .cloned())
    }

    fn list_all(&self) -> Result<Vec<StoredListing>, StoreError> {
        if self.fail_list_all {
            return Err(StoreError::Backend {
                operation: "list",
                source: "injected list failure".into(),
            });
        }
        Ok(self.listings())
    }

    fn create(&mut self, listing: NormalizedListing) -> Result<StoredListing, StoreError> {
        self.operations
            .push(StoreOperation::Create(listing.external_id().clone()));
        self.injected_failure("insert", listing.external_id())?;
        self.schema.validate(&listing)?;
        if self.find_by_external_id(listing.external_id())?.is_some() {
            return Err(StoreError::DuplicateExternalId {
                external_id: listing.external_id().clone(),
            });
        }
        let key = self.allocate_key();
        let row = StoredListing {
            key,
            listing,
            last_synced: Utc::now(),
        };
        self.rows.insert(key, row.clone());
        Ok(row)
    }

    fn update(
        &mut self,
        key: StoreKey,
        listing: NormalizedListing,
    ) -> Result<StoredListing, StoreError> {
        self.operations
            .push(StoreOperation::Update(listing.external_id().clone()));
        self.injected_failure("update", listing.external_id())?;
        self.schema.validate(&listing)?;
        let row = self.rows.get_mut(&key).ok_or(StoreError::NotFound { key })?;
        row.listing = listing;
        row.last_synced = Utc::now();
        Ok(row.clone())
    }

    fn delete(&mut self, key: StoreKey) -> Result<(), StoreError> {
        let Some(id) = self.rows.get(&key).map(|row| row.external_id().clone()) else {
            return Err(StoreError::NotFound { key });
        };
        self.operations.push(StoreOperation::Delete(id.clone()));
        self.injected_failure("delete", &id)?;
        self.rows.remove(&key);
        Ok(())
    }
}

/// Build a listing carrying the three required vehicle fields.
///
/// The variant is derived from the model so callers only vary what the test
/// cares about.
#[must_use]
pub fn vehicle(id: &str, make: &str, model: &str) -> NormalizedListing {
    NormalizedListing::new(id)
        .with_field("make", FieldValue::Text(make.to_owned()))
        .with_field("model", FieldValue::Text(model.to_owned()))
        .with_field("variant", FieldValue::Text(format!("{model} base")))
}
