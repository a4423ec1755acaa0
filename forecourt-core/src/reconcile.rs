//! Diffing a run's normalised listings against the persisted catalog.

use std::collections::{HashMap, hash_map::Entry};

use crate::listing::{ExternalId, NormalizedListing, NormalizedSet, StoredListing};

/// A stored listing paired with the incoming version that replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingUpdate {
    /// Catalog state before the update.
    pub stored: StoredListing,
    /// Values to write.
    pub incoming: NormalizedListing,
}

impl ListingUpdate {
    /// Provider identifier shared by both sides.
    #[must_use]
    pub const fn external_id(&self) -> &ExternalId {
        self.incoming.external_id()
    }

    /// Names of the fields that will change.
    #[must_use]
    pub fn changed_fields(&self) -> Vec<&str> {
        self.stored.listing.changed_fields(&self.incoming)
    }
}

/// Write operations that bring the catalog in line with the feed.
///
/// Every external identifier appears in at most one of `to_create`,
/// `to_update` and `to_delete`. Surplus catalog rows that repeat an
/// identifier go to `duplicates` instead, so a listing that is updated or
/// unchanged may still have stale copies there. Each set is ordered by
/// external identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    /// Listings new to the catalog.
    pub to_create: Vec<NormalizedListing>,
    /// Listings whose content changed since the last sync.
    pub to_update: Vec<ListingUpdate>,
    /// Catalog listings no longer offered by the provider.
    pub to_delete: Vec<StoredListing>,
    /// Extra catalog rows sharing an identifier with an earlier row.
    pub duplicates: Vec<StoredListing>,
    /// Number of listings present on both sides with identical content.
    pub unchanged: usize,
}

impl SyncPlan {
    /// Whether applying the plan would leave the catalog untouched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty()
            && self.to_update.is_empty()
            && self.to_delete.is_empty()
            && self.duplicates.is_empty()
    }

    /// Total number of write operations in the plan.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_delete.len() + self.duplicates.len()
    }
}

/// Compute the operations that make `stored` match `incoming`.
///
/// Listings are matched by external identifier in a single pass over each
/// side. Content is compared with [`NormalizedListing::same_content`], so
/// numeric noise below the tolerance never produces an update. Should the
/// catalog hold several rows for one identifier, the first is reconciled and
/// the rest are listed in [`SyncPlan::duplicates`].
///
/// # Examples
/// ```
/// # use chrono::Utc;
/// # use forecourt_core::{
/// #     reconcile, FieldValue, NormalizedListing, NormalizedSet, StoreKey, StoredListing,
/// # };
/// let listing = |id: &str| {
///     NormalizedListing::new(id).with_field("make", FieldValue::Text("Ford".to_owned()))
/// };
/// let incoming = NormalizedSet::try_from(vec![listing("A"), listing("B")])
///     .expect("identifiers are unique");
/// let stored = vec![
///     StoredListing { key: StoreKey::new(1), listing: listing("B"), last_synced: Utc::now() },
///     StoredListing { key: StoreKey::new(2), listing: listing("D"), last_synced: Utc::now() },
/// ];
///
/// let plan = reconcile(incoming, stored);
/// assert_eq!(plan.to_create.len(), 1);
/// assert_eq!(plan.to_create[0].external_id().as_ref(), "A");
/// assert!(plan.to_update.is_empty());
/// assert_eq!(plan.unchanged, 1);
/// assert_eq!(plan.to_delete[0].external_id().as_ref(), "D");
/// ```
#[must_use]
pub fn reconcile(incoming: NormalizedSet, stored: Vec<StoredListing>) -> SyncPlan {
    let mut plan = SyncPlan::default();
    let mut catalog: HashMap<ExternalId, StoredListing> = HashMap::with_capacity(stored.len());
    for listing in stored {
        match catalog.entry(listing.external_id().clone()) {
            Entry::Occupied(_) => {
                log::warn!(
                    "catalog holds duplicate rows for {}; scheduling {} for deletion",
                    listing.external_id(),
                    listing.key
                );
                plan.duplicates.push(listing);
            }
            Entry::Vacant(slot) => {
                slot.insert(listing);
            }
        }
    }

    for (id, listing) in incoming.into_map() {
        match catalog.remove(&id) {
            None => plan.to_create.push(listing),
            Some(existing) if existing.listing.same_content(&listing) => plan.unchanged += 1,
            Some(existing) => plan.to_update.push(ListingUpdate {
                stored: existing,
                incoming: listing,
            }),
        }
    }
    plan.to_delete.extend(catalog.into_values());

    plan.to_create
        .sort_by(|lhs, rhs| lhs.external_id().cmp(rhs.external_id()));
    plan.to_update
        .sort_by(|lhs, rhs| lhs.external_id().cmp(rhs.external_id()));
    plan.to_delete
        .sort_by(|lhs, rhs| lhs.external_id().cmp(rhs.external_id()));
    plan.duplicates.sort_by(|lhs, rhs| {
        lhs.external_id()
            .cmp(rhs.external_id())
            .then(lhs.key.cmp(&rhs.key))
    });
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldValue, StoreKey};
    use chrono::Utc;
    use rstest::{fixture, rstest};

    fn listing(id: &str, make: &str) -> NormalizedListing {
        NormalizedListing::new(id)
            .with_field("make", FieldValue::Text(make.to_owned()))
            .with_field("model", FieldValue::Text("Golf".to_owned()))
            .with_field("variant", FieldValue::Text("1.5 TSI".to_owned()))
    }

    fn stored(key: i64, listing: NormalizedListing) -> StoredListing {
        StoredListing {
            key: StoreKey::new(key),
            listing,
            last_synced: Utc::now(),
        }
    }

    fn ids<'a>(listings: impl IntoIterator<Item = &'a ExternalId>) -> Vec<&'a str> {
        listings.into_iter().map(AsRef::as_ref).collect()
    }

    #[fixture]
    fn catalog() -> Vec<StoredListing> {
        vec![stored(1, listing("B", "VW")), stored(2, listing("D", "VW"))]
    }

    #[rstest]
    fn partitions_new_changed_and_removed(catalog: Vec<StoredListing>) {
        let incoming = NormalizedSet::try_from(vec![
            listing("A", "VW"),
            listing("B", "Volkswagen"),
            listing("C", "VW"),
        ])
        .expect("unique identifiers");
        let plan = reconcile(incoming, catalog);

        assert_eq!(ids(plan.to_create.iter().map(NormalizedListing::external_id)), ["A", "C"]);
        assert_eq!(ids(plan.to_update.iter().map(ListingUpdate::external_id)), ["B"]);
        assert_eq!(ids(plan.to_delete.iter().map(StoredListing::external_id)), ["D"]);
        let update = plan.to_update.first().expect("one update");
        assert_eq!(update.stored.key, StoreKey::new(1));
        assert_eq!(update.changed_fields(), vec!["make"]);
        assert_eq!(plan.unchanged, 0);
    }

    #[rstest]
    fn identical_listings_produce_an_empty_plan(catalog: Vec<StoredListing>) {
        let incoming = NormalizedSet::try_from(vec![listing("B", "VW"), listing("D", "VW")])
            .expect("unique identifiers");
        let plan = reconcile(incoming, catalog);
        assert!(plan.is_empty(), "unexpected plan: {plan:?}");
        assert_eq!(plan.unchanged, 2);
    }

    #[rstest]
    fn empty_feed_deletes_everything(catalog: Vec<StoredListing>) {
        let plan = reconcile(NormalizedSet::new(), catalog);
        assert_eq!(plan.to_delete.len(), 2);
        assert_eq!(plan.operation_count(), 2);
    }

    #[rstest]
    fn empty_catalog_creates_everything() {
        let incoming = NormalizedSet::try_from(vec![listing("A", "VW"), listing("B", "VW")])
            .expect("unique identifiers");
        let plan = reconcile(incoming, Vec::new());
        assert_eq!(plan.to_create.len(), 2);
        assert!(plan.to_update.is_empty());
        assert!(plan.to_delete.is_empty());
    }

    fn keys(listings: &[StoredListing]) -> Vec<StoreKey> {
        listings.iter().map(|entry| entry.key).collect()
    }

    #[rstest]
    #[case::unchanged("VW", 1, 0)]
    #[case::updated("Volkswagen", 0, 1)]
    fn duplicate_catalog_rows_are_kept_apart_from_deletions(
        #[case] incoming_make: &str,
        #[case] unchanged: usize,
        #[case] updated: usize,
    ) {
        let incoming = NormalizedSet::try_from(vec![listing("B", incoming_make)])
            .expect("unique identifiers");
        let catalog = vec![
            stored(4, listing("B", "VW")),
            stored(9, listing("B", "VW")),
            stored(7, listing("B", "VW")),
            stored(5, listing("D", "VW")),
        ];
        let plan = reconcile(incoming, catalog);
        assert_eq!(plan.unchanged, unchanged);
        assert_eq!(plan.to_update.len(), updated);
        assert_eq!(keys(&plan.to_delete), vec![StoreKey::new(5)]);
        assert_eq!(keys(&plan.duplicates), vec![StoreKey::new(7), StoreKey::new(9)]);
        assert_eq!(plan.operation_count(), updated + 3);
        assert!(!plan.is_empty());
    }

    #[rstest]
    fn decimal_noise_is_not_an_update() {
        let base = listing("A", "VW").with_field("kmPerLiter", FieldValue::Number(21.3));
        let noisy = listing("A", "VW").with_field("kmPerLiter", FieldValue::Number(21.300_000_4));
        let incoming = NormalizedSet::try_from(vec![noisy]).expect("unique identifiers");
        let plan = reconcile(incoming, vec![stored(1, base)]);
        assert!(plan.is_empty());
    }
}
