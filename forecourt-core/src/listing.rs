//! Listing records as they move through the ingestion pipeline.
//!
//! A provider record starts life as a [`RawListing`], becomes a
//! [`NormalizedListing`] once every field has been coerced into the catalog
//! schema, and is persisted as a [`StoredListing`] carrying the store's own key.

use std::{
    collections::{BTreeMap, HashMap, hash_map::Entry},
    fmt,
    ops::Deref,
};

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::FieldKind;

/// Absolute tolerance applied when comparing numeric field values.
///
/// Providers round decimals inconsistently between exports, so values closer
/// than this are treated as unchanged.
pub const NUMBER_EPSILON: f64 = 1e-6;

/// Provider-assigned identifier that is stable across feed exports.
///
/// # Examples
/// ```
/// # use forecourt_core::ExternalId;
/// let id = ExternalId::new("48213");
/// assert_eq!(id.as_ref(), "48213");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ExternalId(String);

impl ExternalId {
    /// Construct a new [`ExternalId`] from an owned or borrowed string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Consume the wrapper and return the inner [`String`].
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for ExternalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ExternalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ExternalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ExternalId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key assigned by a listing store when a record is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct StoreKey(i64);

impl StoreKey {
    /// Wrap a raw store key.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Return the raw key.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Untyped provider record exactly as it appeared in a feed page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawListing {
    fields: Map<String, Value>,
}

impl RawListing {
    /// Wrap an already decoded JSON object.
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Convert a JSON value into a raw listing, returning `None` for
    /// anything other than an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Look up a provider field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Iterate over provider fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of provider fields present on the record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record carries no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A typed value held by a normalised listing field.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "value", rename_all = "lowercase"))]
pub enum FieldValue {
    /// Integer or decimal quantity.
    Number(f64),
    /// Free text.
    Text(String),
    /// Calendar date without a time component.
    Date(NaiveDate),
    /// Boolean flag.
    Bool(bool),
}

impl FieldValue {
    /// Schema kind this value conforms to.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::Number(_) => FieldKind::Number,
            Self::Text(_) => FieldKind::Text,
            Self::Date(_) => FieldKind::Date,
            Self::Bool(_) => FieldKind::Bool,
        }
    }

    /// Compare two values, treating numbers within [`NUMBER_EPSILON`] as equal.
    ///
    /// # Examples
    /// ```
    /// # use forecourt_core::FieldValue;
    /// let stored = FieldValue::Number(7.4);
    /// assert!(stored.matches(&FieldValue::Number(7.400_000_1)));
    /// assert!(!stored.matches(&FieldValue::Number(7.5)));
    /// ```
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "tolerance comparison needs the absolute difference"
    )]
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(lhs), Self::Number(rhs)) => (lhs - rhs).abs() <= NUMBER_EPSILON,
            (lhs, rhs) => lhs == rhs,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// A provider record coerced into the catalog schema.
///
/// Optional fields are either present with a typed value or absent; there is
/// no separate "null" state.
///
/// # Examples
/// ```
/// # use forecourt_core::{FieldValue, NormalizedListing};
/// let listing = NormalizedListing::new("A1")
///     .with_field("make", FieldValue::Text("Skoda".to_owned()))
///     .with_field("mileage", FieldValue::Number(41_000.0));
/// assert_eq!(listing.external_id().as_ref(), "A1");
/// assert_eq!(listing.get("make"), Some(&FieldValue::Text("Skoda".to_owned())));
/// assert!(listing.get("color").is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalizedListing {
    external_id: ExternalId,
    fields: BTreeMap<String, FieldValue>,
}

impl NormalizedListing {
    /// Start an empty listing for the given provider identifier.
    pub fn new(external_id: impl Into<ExternalId>) -> Self {
        Self {
            external_id: external_id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style variant of [`NormalizedListing::insert`].
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field, returning the previous value when one was present.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(name.into(), value)
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// Provider identifier of the listing.
    #[must_use]
    pub const fn external_id(&self) -> &ExternalId {
        &self.external_id
    }

    /// Look up a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Iterate over present fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of present fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Whether both listings carry the same set of fields with matching values.
    ///
    /// Numbers are compared with [`FieldValue::matches`]; a field present on
    /// one side only counts as a difference.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self.fields.iter().all(|(name, value)| {
                other
                    .fields
                    .get(name)
                    .is_some_and(|candidate| value.matches(candidate))
            })
    }

    /// Names of fields whose values differ between `self` and `other`,
    /// including fields present on only one side.
    #[must_use]
    pub fn changed_fields<'a>(&'a self, other: &'a Self) -> Vec<&'a str> {
        let mut changed: Vec<&str> = self
            .fields
            .iter()
            .filter(|(name, value)| {
                other
                    .fields
                    .get(name.as_str())
                    .is_none_or(|candidate| !value.matches(candidate))
            })
            .map(|(name, _)| name.as_str())
            .collect();
        changed.extend(
            other
                .fields
                .keys()
                .filter(|name| !self.fields.contains_key(name.as_str()))
                .map(String::as_str),
        );
        changed.sort_unstable();
        changed
    }
}

/// A listing as persisted by a [`ListingStore`](crate::ListingStore).
#[derive(Debug, Clone, PartialEq)]
pub struct StoredListing {
    /// Store-assigned key.
    pub key: StoreKey,
    /// Persisted field values.
    pub listing: NormalizedListing,
    /// When the listing was last written by a sync run.
    pub last_synced: DateTime<Utc>,
}

impl StoredListing {
    /// Provider identifier of the stored listing.
    #[must_use]
    pub const fn external_id(&self) -> &ExternalId {
        self.listing.external_id()
    }
}

/// Raised when a second listing with an already seen identifier is inserted
/// into a [`NormalizedSet`].
#[derive(Debug, Clone, PartialEq, Error)]
#[error("external id {} appears more than once in the feed", .rejected.external_id())]
pub struct DuplicateExternalId {
    /// The listing that was turned away; the first occurrence is kept.
    pub rejected: NormalizedListing,
}

/// The normalised listings of one run, keyed by external identifier.
///
/// Identifiers are unique within the set: the first listing seen for an
/// identifier wins and later ones are rejected.
#[derive(Debug, Clone, Default)]
pub struct NormalizedSet {
    listings: HashMap<ExternalId, NormalizedListing>,
}

impl NormalizedSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listing, rejecting identifiers that are already present.
    pub fn insert(&mut self, listing: NormalizedListing) -> Result<(), DuplicateExternalId> {
        match self.listings.entry(listing.external_id().clone()) {
            Entry::Occupied(_) => Err(DuplicateExternalId { rejected: listing }),
            Entry::Vacant(slot) => {
                slot.insert(listing);
                Ok(())
            }
        }
    }

    /// Look up a listing by identifier.
    #[must_use]
    pub fn get(&self, id: &ExternalId) -> Option<&NormalizedListing> {
        self.listings.get(id)
    }

    /// Number of listings held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    /// Whether the set holds no listings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub(crate) fn into_map(self) -> HashMap<ExternalId, NormalizedListing> {
        self.listings
    }
}

impl TryFrom<Vec<NormalizedListing>> for NormalizedSet {
    type Error = DuplicateExternalId;

    fn try_from(listings: Vec<NormalizedListing>) -> Result<Self, Self::Error> {
        let mut set = Self::new();
        for listing in listings {
            set.insert(listing)?;
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn listing(id: &str) -> NormalizedListing {
        NormalizedListing::new(id)
            .with_field("make", FieldValue::Text("Volvo".to_owned()))
            .with_field("mileage", FieldValue::Number(12_500.0))
    }

    #[rstest]
    #[case(FieldValue::Number(1.0), FieldValue::Number(1.000_000_5), true)]
    #[case(FieldValue::Number(1.0), FieldValue::Number(1.000_01), false)]
    #[case(FieldValue::Text("a".to_owned()), FieldValue::Text("a".to_owned()), true)]
    #[case(FieldValue::Text("1".to_owned()), FieldValue::Number(1.0), false)]
    #[case(FieldValue::Bool(true), FieldValue::Bool(false), false)]
    fn field_values_match_with_tolerance(
        #[case] lhs: FieldValue,
        #[case] rhs: FieldValue,
        #[case] expected: bool,
    ) {
        assert_eq!(lhs.matches(&rhs), expected);
        assert_eq!(rhs.matches(&lhs), expected);
    }

    #[rstest]
    fn same_content_ignores_decimal_noise() {
        let stored = listing("A");
        let incoming = listing("A").with_field("mileage", FieldValue::Number(12_500.000_000_1));
        assert!(stored.same_content(&incoming));
        assert!(stored.changed_fields(&incoming).is_empty());
    }

    #[rstest]
    fn added_optional_field_counts_as_change() {
        let stored = listing("A");
        let incoming = listing("A").with_field("color", FieldValue::Text("Blå".to_owned()));
        assert!(!stored.same_content(&incoming));
        assert_eq!(stored.changed_fields(&incoming), vec!["color"]);
    }

    #[rstest]
    fn removed_optional_field_counts_as_change() {
        let stored = listing("A");
        let mut incoming = listing("A");
        incoming.remove("mileage");
        assert!(!stored.same_content(&incoming));
        assert_eq!(stored.changed_fields(&incoming), vec!["mileage"]);
    }

    #[rstest]
    fn normalized_set_rejects_duplicates() {
        let mut set = NormalizedSet::new();
        set.insert(listing("A")).expect("first insert should succeed");
        let err = set
            .insert(listing("A").with_field("make", FieldValue::Text("Saab".to_owned())))
            .expect_err("duplicate should be rejected");
        assert_eq!(err.rejected.external_id().as_ref(), "A");
        assert_eq!(set.len(), 1);
        let kept = set.get(&ExternalId::from("A")).expect("first listing kept");
        assert_eq!(kept.get("make"), Some(&FieldValue::Text("Volvo".to_owned())));
    }

    #[rstest]
    fn raw_listing_requires_an_object() {
        assert!(RawListing::from_value(serde_json::json!([1, 2])).is_none());
        let raw = RawListing::from_value(serde_json::json!({"Id": 1, "Make": "Kia"}))
            .expect("object should convert");
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.get("Make"), Some(&serde_json::json!("Kia")));
    }
}
