//! Catalog schema: the fixed set of typed fields every listing conforms to.

use std::{collections::HashMap, fmt};

use thiserror::Error;

use crate::listing::{ExternalId, NormalizedListing};

/// Value type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FieldKind {
    /// Integer or decimal quantity.
    Number,
    /// Free text.
    Text,
    /// Calendar date.
    Date,
    /// Boolean flag.
    Bool,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Number => "number",
            Self::Text => "text",
            Self::Date => "date",
            Self::Bool => "bool",
        })
    }
}

/// A single named field of the catalog schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name as stored in the catalog.
    pub name: String,
    /// Value type.
    pub kind: FieldKind,
    /// Whether every listing must carry the field.
    pub required: bool,
}

impl FieldDef {
    /// Define a field that every listing must carry.
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    /// Define a field that may be absent.
    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

/// Errors raised when assembling a [`ListingSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// Two field definitions share a name.
    #[error("field `{name}` is defined more than once")]
    DuplicateField {
        /// Repeated field name.
        name: String,
    },
    /// A field was defined with an empty name.
    #[error("field names must not be empty")]
    EmptyFieldName,
}

/// Reasons a listing fails to conform to the catalog schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// The provider record carried no usable identifier.
    #[error("record has no external id")]
    MissingExternalId,
    /// The provider identifier was present but not a string or integer.
    #[error("record has an unusable external id: {found}")]
    InvalidExternalId {
        /// Rendering of the rejected identifier value.
        found: String,
    },
    /// A required field is absent.
    #[error("listing {external_id} is missing required field `{field}`")]
    MissingRequiredField {
        /// Listing identifier.
        external_id: ExternalId,
        /// Name of the absent field.
        field: String,
    },
    /// A required field was present but could not be coerced.
    #[error("listing {external_id} has an invalid value for required field `{field}`: {reason}")]
    InvalidRequiredField {
        /// Listing identifier.
        external_id: ExternalId,
        /// Name of the offending field.
        field: String,
        /// Why coercion failed.
        reason: String,
    },
    /// A value does not match the kind declared by the schema.
    #[error("listing {external_id} field `{field}` holds a {found} value, expected {expected}")]
    KindMismatch {
        /// Listing identifier.
        external_id: ExternalId,
        /// Name of the offending field.
        field: String,
        /// Kind declared by the schema.
        expected: FieldKind,
        /// Kind of the supplied value.
        found: FieldKind,
    },
    /// A field unknown to the schema was supplied.
    #[error("listing {external_id} carries unknown field `{field}`")]
    UnknownField {
        /// Listing identifier.
        external_id: ExternalId,
        /// Name of the unknown field.
        field: String,
    },
    /// The identifier was already used by another record of the same run.
    #[error("external id {external_id} appears more than once in the feed")]
    DuplicateExternalId {
        /// Repeated identifier.
        external_id: ExternalId,
    },
}

/// Ordered set of named, typed fields describing a catalog listing.
///
/// # Examples
/// ```
/// # use forecourt_core::{FieldDef, FieldKind, ListingSchema, SchemaError};
/// # fn main() -> Result<(), SchemaError> {
/// let schema = ListingSchema::new([
///     FieldDef::required("make", FieldKind::Text),
///     FieldDef::optional("mileage", FieldKind::Number),
/// ])?;
/// assert_eq!(schema.len(), 2);
/// assert!(schema.field("make").is_some_and(|field| field.required));
///
/// let duplicate = ListingSchema::new([
///     FieldDef::required("make", FieldKind::Text),
///     FieldDef::optional("make", FieldKind::Text),
/// ]);
/// assert!(matches!(duplicate, Err(SchemaError::DuplicateField { .. })));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSchema {
    fields: Vec<FieldDef>,
    positions: HashMap<String, usize>,
}

impl ListingSchema {
    /// Build a schema, rejecting empty or repeated field names.
    pub fn new(fields: impl IntoIterator<Item = FieldDef>) -> Result<Self, SchemaError> {
        let fields: Vec<FieldDef> = fields.into_iter().collect();
        let mut positions = HashMap::with_capacity(fields.len());
        for (position, field) in fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyFieldName);
            }
            if positions.insert(field.name.clone(), position).is_some() {
                return Err(SchemaError::DuplicateField {
                    name: field.name.clone(),
                });
            }
        }
        Ok(Self { fields, positions })
    }

    /// The standard vehicle listing schema.
    ///
    /// `make`, `model` and `variant` are required; the remaining fields are
    /// optional.
    ///
    /// # Examples
    /// ```
    /// # use forecourt_core::{FieldKind, ListingSchema};
    /// let schema = ListingSchema::vehicle();
    /// let required: Vec<&str> = schema.required_fields().map(|f| f.name.as_str()).collect();
    /// assert_eq!(required, ["make", "model", "variant"]);
    /// assert_eq!(schema.field("registrationDate").map(|f| f.kind), Some(FieldKind::Date));
    /// ```
    #[must_use]
    pub fn vehicle() -> Self {
        let fields: Vec<FieldDef> = VEHICLE_FIELDS
            .iter()
            .map(|&(name, kind, required)| FieldDef {
                name: name.to_owned(),
                kind,
                required,
            })
            .collect();
        let positions = fields
            .iter()
            .enumerate()
            .map(|(position, field)| (field.name.clone(), position))
            .collect();
        Self { fields, positions }
    }

    /// Field definitions in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.positions
            .get(name)
            .and_then(|&position| self.fields.get(position))
    }

    /// Iterate over the required fields in declaration order.
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|field| field.required)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check a listing against the schema.
    ///
    /// Every field must be known and carry a value of the declared kind, and
    /// every required field must be present.
    ///
    /// # Examples
    /// ```
    /// # use forecourt_core::{FieldValue, ListingSchema, NormalizedListing, ValidationError};
    /// let schema = ListingSchema::vehicle();
    /// let listing = NormalizedListing::new("7")
    ///     .with_field("make", FieldValue::Text("Audi".to_owned()))
    ///     .with_field("model", FieldValue::Text("A4".to_owned()));
    /// assert!(matches!(
    ///     schema.validate(&listing),
    ///     Err(ValidationError::MissingRequiredField { field, .. }) if field == "variant"
    /// ));
    /// ```
    pub fn validate(&self, listing: &NormalizedListing) -> Result<(), ValidationError> {
        if listing.external_id().trim().is_empty() {
            return Err(ValidationError::MissingExternalId);
        }
        for (name, value) in listing.fields() {
            let Some(field) = self.field(name) else {
                return Err(ValidationError::UnknownField {
                    external_id: listing.external_id().clone(),
                    field: name.to_owned(),
                });
            };
            if value.kind() != field.kind {
                return Err(ValidationError::KindMismatch {
                    external_id: listing.external_id().clone(),
                    field: name.to_owned(),
                    expected: field.kind,
                    found: value.kind(),
                });
            }
        }
        if let Some(missing) = self
            .required_fields()
            .find(|field| listing.get(&field.name).is_none())
        {
            return Err(ValidationError::MissingRequiredField {
                external_id: listing.external_id().clone(),
                field: missing.name.clone(),
            });
        }
        Ok(())
    }
}

const VEHICLE_FIELDS: &[(&str, FieldKind, bool)] = &[
    ("mileage", FieldKind::Number, false),
    ("year", FieldKind::Number, false),
    ("make", FieldKind::Text, true),
    ("model", FieldKind::Text, true),
    ("variant", FieldKind::Text, true),
    ("registrationDate", FieldKind::Date, false),
    ("serviceBook", FieldKind::Bool, false),
    ("color", FieldKind::Text, false),
    ("type", FieldKind::Text, false),
    ("motor", FieldKind::Number, false),
    ("propellant", FieldKind::Text, false),
    ("numberOfDoors", FieldKind::Number, false),
    ("newPrice", FieldKind::Number, false),
    ("numberOfGears", FieldKind::Number, false),
    ("gearType", FieldKind::Text, false),
    ("motorVolume", FieldKind::Number, false),
    ("effect", FieldKind::Number, false),
    ("cylinders", FieldKind::Number, false),
    ("valvesPerCylinder", FieldKind::Number, false),
    ("driveWheels", FieldKind::Text, false),
    ("trailerWeight", FieldKind::Number, false),
    ("gasTankMax", FieldKind::Number, false),
    ("litresUsedPer100Km", FieldKind::Number, false),
    ("kmPerLiter", FieldKind::Number, false),
    ("acceleration0To100", FieldKind::Number, false),
    ("topSpeed", FieldKind::Number, false),
    ("effectInNm", FieldKind::Number, false),
    ("effectInNmRpm", FieldKind::Number, false),
    ("weight", FieldKind::Number, false),
    ("greenTax", FieldKind::Number, false),
    ("greenTaxPeriod", FieldKind::Text, false),
    ("weightTax", FieldKind::Number, false),
    ("weightTaxPeriod", FieldKind::Text, false),
    ("payload", FieldKind::Number, false),
    ("modelSeries", FieldKind::Text, false),
    ("numberOfAirbags", FieldKind::Number, false),
    ("totalWeight", FieldKind::Number, false),
    ("length", FieldKind::Number, false),
    ("width", FieldKind::Number, false),
    ("height", FieldKind::Number, false),
    ("bodyType", FieldKind::Text, false),
    ("comment", FieldKind::Text, false),
    ("pictureCount", FieldKind::Number, false),
];
