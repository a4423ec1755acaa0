//! Normalisation of provider records into the catalog schema.
//!
//! A [`Normalizer`] pairs a [`ListingSchema`] with a table of
//! [`FieldMapping`]s. Each mapped provider field is coerced into its schema
//! kind; unmapped provider fields are dropped. Coercion failures on optional
//! fields become [`NormalizationWarning`]s, while failures on required fields
//! reject the record with a [`ValidationError`].
#![forbid(unsafe_code)]

mod coerce;
mod mapping;

use std::collections::HashSet;
use std::fmt;

use forecourt_core::{
    ExternalId, FieldKind, ListingSchema, NormalizedListing, RawListing, ValidationError,
};
use serde_json::Value;
use thiserror::Error;

pub use coerce::{
    CoercionError, DecimalLocale, JsonType, coerce_bool, coerce_date, coerce_number, coerce_text,
};
pub use mapping::{FieldMapping, ProviderType, VEHICLE_FIELD_MAP, VEHICLE_ID_FIELD};

/// A mapping table does not fit the schema it targets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MappingError {
    /// A mapping targets a field the schema does not define.
    #[error("provider field `{provider}` maps to unknown schema field `{field}`")]
    UnknownField {
        /// Provider field name.
        provider: String,
        /// Missing schema field.
        field: String,
    },
    /// A mapping produces a different kind than the schema declares.
    #[error("schema field `{field}` is {expected} but its mapping produces {found}")]
    KindMismatch {
        /// Schema field name.
        field: String,
        /// Kind declared by the schema.
        expected: FieldKind,
        /// Kind produced by the mapping.
        found: FieldKind,
    },
    /// Two mappings read the same provider field.
    #[error("provider field `{provider}` is mapped more than once")]
    DuplicateProvider {
        /// Provider field name.
        provider: String,
    },
    /// Two mappings write the same schema field.
    #[error("schema field `{field}` is mapped more than once")]
    DuplicateField {
        /// Schema field name.
        field: String,
    },
}

/// An optional field was dropped because its value could not be coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationWarning {
    /// Listing the field belonged to.
    pub external_id: ExternalId,
    /// Schema field that was left absent.
    pub field: String,
    /// Provider field the value came from.
    pub provider_field: String,
    /// Why coercion failed.
    pub reason: CoercionError,
}

impl fmt::Display for NormalizationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "listing {}: dropped `{}` (from `{}`): {}",
            self.external_id, self.field, self.provider_field, self.reason
        )
    }
}

/// Outcome of normalising one provider record.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// The schema-conformant listing.
    pub listing: NormalizedListing,
    /// Optional fields dropped during coercion.
    pub warnings: Vec<NormalizationWarning>,
}

/// Converts provider records into listings conforming to a schema.
#[derive(Debug, Clone)]
pub struct Normalizer {
    schema: ListingSchema,
    mappings: Vec<FieldMapping>,
    id_field: String,
    locale: DecimalLocale,
}

impl Normalizer {
    /// Build a normaliser, checking every mapping against `schema`.
    ///
    /// # Examples
    /// ```
    /// # use forecourt_core::{FieldDef, FieldKind, ListingSchema};
    /// # use forecourt_data::normalize::{FieldMapping, MappingError, Normalizer};
    /// let schema = ListingSchema::new([FieldDef::required("make", FieldKind::Text)])
    ///     .expect("schema is valid");
    /// assert!(Normalizer::new(schema.clone(), [FieldMapping::text("Make", "make")]).is_ok());
    ///
    /// let outcome = Normalizer::new(schema, [FieldMapping::number("Make", "make")]);
    /// assert!(matches!(outcome, Err(MappingError::KindMismatch { .. })));
    /// ```
    pub fn new(
        schema: ListingSchema,
        mappings: impl IntoIterator<Item = FieldMapping>,
    ) -> Result<Self, MappingError> {
        let mappings: Vec<FieldMapping> = mappings.into_iter().collect();
        let mut providers = HashSet::new();
        let mut fields = HashSet::new();
        for mapping in &mappings {
            let Some(def) = schema.field(mapping.field) else {
                return Err(MappingError::UnknownField {
                    provider: mapping.provider.to_owned(),
                    field: mapping.field.to_owned(),
                });
            };
            if def.kind != mapping.target {
                return Err(MappingError::KindMismatch {
                    field: mapping.field.to_owned(),
                    expected: def.kind,
                    found: mapping.target,
                });
            }
            if !providers.insert(mapping.provider) {
                return Err(MappingError::DuplicateProvider {
                    provider: mapping.provider.to_owned(),
                });
            }
            if !fields.insert(mapping.field) {
                return Err(MappingError::DuplicateField {
                    field: mapping.field.to_owned(),
                });
            }
        }
        Ok(Self {
            schema,
            mappings,
            id_field: VEHICLE_ID_FIELD.to_owned(),
            locale: DecimalLocale::default(),
        })
    }

    /// Normaliser for the bilinfo export and the standard vehicle schema.
    pub fn vehicle() -> Self {
        Self {
            schema: ListingSchema::vehicle(),
            mappings: VEHICLE_FIELD_MAP.to_vec(),
            id_field: VEHICLE_ID_FIELD.to_owned(),
            locale: DecimalLocale::default(),
        }
    }

    /// Read the external identifier from `id_field` instead of `Id`.
    #[must_use]
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Read numeric strings with the separators of `locale`.
    ///
    /// Defaults to [`DecimalLocale::Danish`].
    #[must_use]
    pub fn with_decimal_locale(mut self, locale: DecimalLocale) -> Self {
        self.locale = locale;
        self
    }

    /// Separator convention applied to numeric strings.
    pub fn decimal_locale(&self) -> DecimalLocale {
        self.locale
    }

    /// Schema every normalised listing conforms to.
    pub fn schema(&self) -> &ListingSchema {
        &self.schema
    }

    /// Mappings applied by this normaliser.
    pub fn mappings(&self) -> &[FieldMapping] {
        &self.mappings
    }

    /// Normalise a single provider record.
    pub fn normalize(&self, raw: &RawListing) -> Result<Normalized, ValidationError> {
        normalize_with(
            raw,
            &self.schema,
            &self.mappings,
            &self.id_field,
            self.locale,
        )
    }
}

/// Normalise `raw` with the standard vehicle mapping table.
///
/// Mappings targeting fields that `schema` does not define are skipped and
/// numeric strings are read as Danish.
///
/// # Examples
/// ```
/// # use forecourt_core::{FieldValue, ListingSchema, RawListing};
/// # use forecourt_data::normalize::normalize;
/// # use serde_json::json;
/// let raw = RawListing::from_value(json!({
///     "Id": 48213,
///     "Make": "Skoda",
///     "Model": "Octavia",
///     "Variant": "1.5 TSI Style",
///     "Mileage": "61 000",
///     "RegistrationDate": "not a date",
///     "DealerNote": "ignored",
/// }))
/// .expect("record is an object");
/// let normalized = normalize(&raw, &ListingSchema::vehicle()).expect("record is valid");
/// assert_eq!(normalized.listing.external_id().as_ref(), "48213");
/// assert_eq!(normalized.listing.get("mileage"), Some(&FieldValue::Number(61_000.0)));
/// assert_eq!(normalized.listing.get("registrationDate"), None);
/// assert_eq!(normalized.warnings.len(), 1);
/// ```
pub fn normalize(raw: &RawListing, schema: &ListingSchema) -> Result<Normalized, ValidationError> {
    let mappings: Vec<FieldMapping> = VEHICLE_FIELD_MAP
        .iter()
        .filter(|mapping| schema.field(mapping.field).is_some())
        .copied()
        .collect();
    normalize_with(
        raw,
        schema,
        &mappings,
        VEHICLE_ID_FIELD,
        DecimalLocale::default(),
    )
}

fn normalize_with(
    raw: &RawListing,
    schema: &ListingSchema,
    mappings: &[FieldMapping],
    id_field: &str,
    locale: DecimalLocale,
) -> Result<Normalized, ValidationError> {
    let external_id = external_id(raw.get(id_field))?;
    let mut listing = NormalizedListing::new(external_id.clone());
    let mut warnings = Vec::new();

    for mapping in mappings {
        let Some(value) = raw.get(mapping.provider) else {
            continue;
        };
        match mapping.coerce(value, locale) {
            Ok(Some(coerced)) => {
                listing.insert(mapping.field, coerced);
            }
            Ok(None) => {}
            Err(reason) if schema.field(mapping.field).is_some_and(|def| def.required) => {
                return Err(ValidationError::InvalidRequiredField {
                    external_id,
                    field: mapping.field.to_owned(),
                    reason: reason.to_string(),
                });
            }
            Err(reason) => warnings.push(NormalizationWarning {
                external_id: external_id.clone(),
                field: mapping.field.to_owned(),
                provider_field: mapping.provider.to_owned(),
                reason,
            }),
        }
    }

    schema.validate(&listing)?;
    Ok(Normalized { listing, warnings })
}

fn external_id(value: Option<&Value>) -> Result<ExternalId, ValidationError> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::MissingExternalId),
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Err(ValidationError::MissingExternalId)
            } else {
                Ok(ExternalId::from(trimmed))
            }
        }
        Some(Value::Number(number)) if number.is_i64() || number.is_u64() => {
            Ok(ExternalId::new(number.to_string()))
        }
        Some(other) => Err(ValidationError::InvalidExternalId {
            found: other.to_string(),
        }),
    }
}
