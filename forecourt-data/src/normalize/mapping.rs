//! Provider field mapping tables.

use forecourt_core::{FieldKind, FieldValue};
use serde_json::Value;

use super::coerce::{
    CoercionError, DecimalLocale, coerce_bool, coerce_date, coerce_number, coerce_text,
};

/// Type the provider documents for a field.
///
/// Informational only: coercion accepts whatever the provider actually sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    /// Free text.
    String,
    /// Integer or decimal, possibly encoded as a string.
    Number,
    /// Boolean, possibly encoded as a token or `0`/`1`.
    Boolean,
    /// Date or date-time string.
    DateString,
}

/// Maps one provider field onto one schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    /// Provider field name as it appears in the feed.
    pub provider: &'static str,
    /// Schema field name.
    pub field: &'static str,
    /// Documented provider type.
    pub source: ProviderType,
    /// Schema kind the coercion produces.
    pub target: FieldKind,
}

impl FieldMapping {
    /// Map a provider number onto a number field.
    pub const fn number(provider: &'static str, field: &'static str) -> Self {
        Self {
            provider,
            field,
            source: ProviderType::Number,
            target: FieldKind::Number,
        }
    }

    /// Map a provider string onto a text field.
    pub const fn text(provider: &'static str, field: &'static str) -> Self {
        Self {
            provider,
            field,
            source: ProviderType::String,
            target: FieldKind::Text,
        }
    }

    /// Map a provider date string onto a date field.
    pub const fn date(provider: &'static str, field: &'static str) -> Self {
        Self {
            provider,
            field,
            source: ProviderType::DateString,
            target: FieldKind::Date,
        }
    }

    /// Map a provider boolean onto a bool field.
    pub const fn boolean(provider: &'static str, field: &'static str) -> Self {
        Self {
            provider,
            field,
            source: ProviderType::Boolean,
            target: FieldKind::Bool,
        }
    }

    /// Convert a provider value into the target kind.
    ///
    /// `Ok(None)` means the provider supplied no usable value. `locale`
    /// only affects numbers sent as strings.
    pub fn coerce(
        &self,
        value: &Value,
        locale: DecimalLocale,
    ) -> Result<Option<FieldValue>, CoercionError> {
        match self.target {
            FieldKind::Number => coerce_number(value, locale),
            FieldKind::Text => coerce_text(value),
            FieldKind::Date => coerce_date(value),
            FieldKind::Bool => coerce_bool(value),
        }
    }
}

/// Provider field holding the listing identifier.
pub const VEHICLE_ID_FIELD: &str = "Id";

/// Mapping from the bilinfo export onto [`ListingSchema::vehicle`].
///
/// [`ListingSchema::vehicle`]: forecourt_core::ListingSchema::vehicle
pub static VEHICLE_FIELD_MAP: [FieldMapping; 43] = [
    FieldMapping::number("Mileage", "mileage"),
    FieldMapping::number("Year", "year"),
    FieldMapping::text("Make", "make"),
    FieldMapping::text("Model", "model"),
    FieldMapping::text("Variant", "variant"),
    FieldMapping::date("RegistrationDate", "registrationDate"),
    FieldMapping::boolean("ServiceBook", "serviceBook"),
    FieldMapping::text("Color", "color"),
    FieldMapping::text("Type", "type"),
    FieldMapping::number("Motor", "motor"),
    FieldMapping::text("Propellant", "propellant"),
    FieldMapping::number("NumberOfDoors", "numberOfDoors"),
    FieldMapping::number("NewPrice", "newPrice"),
    FieldMapping::number("NumberOfGears", "numberOfGears"),
    FieldMapping::text("GearType", "gearType"),
    FieldMapping::number("MotorVolume", "motorVolume"),
    FieldMapping::number("Effect", "effect"),
    FieldMapping::number("Cylinders", "cylinders"),
    FieldMapping::number("ValvesPerCylinder", "valvesPerCylinder"),
    FieldMapping::text("DriveWheels", "driveWheels"),
    FieldMapping::number("TrailerWeight", "trailerWeight"),
    FieldMapping::number("GasTankMax", "gasTankMax"),
    FieldMapping::number("LitresUsedPer100Km", "litresUsedPer100Km"),
    FieldMapping::number("KmPerLiter", "kmPerLiter"),
    FieldMapping::number("Acceleration0To100", "acceleration0To100"),
    FieldMapping::number("TopSpeed", "topSpeed"),
    FieldMapping::number("EffectInNm", "effectInNm"),
    FieldMapping::number("EffectInNmRpm", "effectInNmRpm"),
    FieldMapping::number("Weight", "weight"),
    FieldMapping::number("GreenTax", "greenTax"),
    FieldMapping::text("GreenTaxPeriod", "greenTaxPeriod"),
    FieldMapping::number("WeightTax", "weightTax"),
    FieldMapping::text("WeightTaxPeriod", "weightTaxPeriod"),
    FieldMapping::number("Payload", "payload"),
    FieldMapping::text("ModelSeries", "modelSeries"),
    FieldMapping::number("NumberOfAirbags", "numberOfAirbags"),
    FieldMapping::number("TotalWeight", "totalWeight"),
    FieldMapping::number("Length", "length"),
    FieldMapping::number("Width", "width"),
    FieldMapping::number("Height", "height"),
    FieldMapping::text("BodyType", "bodyType"),
    FieldMapping::text("Comment", "comment"),
    FieldMapping::number("PictureCount", "pictureCount"),
];
