//! Coercion of provider JSON values into typed catalog fields.
//!
//! Every coercion treats JSON `null` and blank strings as an absent value.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use forecourt_core::FieldValue;
use serde_json::Value;
use thiserror::Error;

/// Separator convention for numbers the provider encodes as strings.
///
/// The bilinfo export writes Danish numbers, so `61.500` is sixty-one
/// thousand five hundred rather than sixty-one and a half.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecimalLocale {
    /// `,` separates decimals and `.` groups thousands: `1.234,5`.
    #[default]
    Danish,
    /// `.` separates decimals and `,` groups thousands: `1,234.5`.
    English,
}

impl DecimalLocale {
    const fn decimal(self) -> char {
        match self {
            Self::Danish => ',',
            Self::English => '.',
        }
    }

    const fn grouping(self) -> char {
        match self {
            Self::Danish => '.',
            Self::English => ',',
        }
    }

    /// Parse an integer or decimal written in this locale.
    ///
    /// Whitespace, including non-breaking spaces, groups digits like the
    /// grouping separator does. At most one decimal separator is accepted
    /// and no grouping may follow it.
    ///
    /// # Examples
    /// ```
    /// # use forecourt_data::normalize::DecimalLocale;
    /// assert_eq!(DecimalLocale::Danish.parse("61.500"), Some(61_500.0));
    /// assert_eq!(DecimalLocale::Danish.parse("19,6"), Some(19.6));
    /// assert_eq!(DecimalLocale::English.parse("1,250"), Some(1_250.0));
    /// assert_eq!(DecimalLocale::Danish.parse("1,2,3"), None);
    /// ```
    pub fn parse(self, text: &str) -> Option<f64> {
        let mut canonical = String::with_capacity(text.len());
        let mut seen_decimal = false;
        for c in text.trim().chars() {
            match c {
                c if c.is_whitespace() || c == self.grouping() => {
                    if seen_decimal {
                        return None;
                    }
                }
                c if c == self.decimal() => {
                    if seen_decimal {
                        return None;
                    }
                    seen_decimal = true;
                    canonical.push('.');
                }
                '0'..='9' | '-' | '+' => canonical.push(c),
                _ => return None,
            }
        }
        if !canonical.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }
        canonical.parse::<f64>().ok().filter(|n| n.is_finite())
    }
}

/// A provider value could not be converted to the target kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CoercionError {
    /// The value is not a recognisable integer or decimal.
    #[error("`{found}` is not a number")]
    NotANumber {
        /// Rendering of the rejected value.
        found: String,
    },
    /// The value is not a recognisable boolean.
    #[error("`{found}` is not a boolean")]
    NotABoolean {
        /// Rendering of the rejected value.
        found: String,
    },
    /// The value is not a date in a supported format.
    #[error("`{found}` is not a date")]
    NotADate {
        /// Rendering of the rejected value.
        found: String,
    },
    /// The JSON type cannot represent the target kind at all.
    #[error("unsupported JSON {found} value")]
    UnsupportedType {
        /// JSON type name.
        found: JsonType,
    },
}

/// JSON type names used in coercion errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    /// `true` or `false`.
    Bool,
    /// Integer or float.
    Number,
    /// String.
    String,
    /// Array.
    Array,
    /// Object.
    Object,
}

impl JsonType {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Self::Bool),
            Value::Number(_) => Some(Self::Number),
            Value::String(_) => Some(Self::String),
            Value::Array(_) => Some(Self::Array),
            Value::Object(_) => Some(Self::Object),
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bool => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        })
    }
}

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y", "%d/%m/%Y"];
const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const TRUE_TOKENS: [&str; 6] = ["true", "yes", "ja", "y", "j", "1"];
const FALSE_TOKENS: [&str; 5] = ["false", "no", "nej", "n", "0"];

fn unsupported(value: &Value) -> CoercionError {
    CoercionError::UnsupportedType {
        found: JsonType::of(value).unwrap_or(JsonType::Object),
    }
}

fn non_blank(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Coerce a JSON number or numeric string into [`FieldValue::Number`].
///
/// Strings are read with the separators of `locale`.
///
/// # Examples
/// ```
/// # use forecourt_core::FieldValue;
/// # use forecourt_data::normalize::{DecimalLocale, coerce_number};
/// # use serde_json::json;
/// let danish = DecimalLocale::Danish;
/// assert_eq!(coerce_number(&json!("1.234,5"), danish), Ok(Some(FieldValue::Number(1234.5))));
/// assert_eq!(coerce_number(&json!("125 000"), danish), Ok(Some(FieldValue::Number(125_000.0))));
/// assert_eq!(coerce_number(&json!(null), danish), Ok(None));
/// assert!(coerce_number(&json!("n/a"), danish).is_err());
/// ```
pub fn coerce_number(
    value: &Value,
    locale: DecimalLocale,
) -> Result<Option<FieldValue>, CoercionError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(number) => number
            .as_f64()
            .filter(|n| n.is_finite())
            .map(|n| Some(FieldValue::Number(n)))
            .ok_or_else(|| CoercionError::NotANumber {
                found: number.to_string(),
            }),
        Value::String(text) => match non_blank(text) {
            None => Ok(None),
            Some(text) => locale
                .parse(text)
                .map(|n| Some(FieldValue::Number(n)))
                .ok_or_else(|| CoercionError::NotANumber {
                    found: text.to_owned(),
                }),
        },
        other => Err(unsupported(other)),
    }
}

/// Coerce a string, number or boolean into trimmed [`FieldValue::Text`].
pub fn coerce_text(value: &Value) -> Result<Option<FieldValue>, CoercionError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(non_blank(text).map(|text| FieldValue::Text(text.to_owned()))),
        Value::Number(number) => Ok(Some(FieldValue::Text(number.to_string()))),
        Value::Bool(flag) => Ok(Some(FieldValue::Text(flag.to_string()))),
        other => Err(unsupported(other)),
    }
}

/// Coerce a date or date-time string into [`FieldValue::Date`].
///
/// Accepts `YYYY-MM-DD`, `DD-MM-YYYY`, `DD.MM.YYYY`, `DD/MM/YYYY` and ISO
/// date-times with or without an offset; the time of day is discarded.
///
/// # Examples
/// ```
/// # use chrono::NaiveDate;
/// # use forecourt_core::FieldValue;
/// # use forecourt_data::normalize::coerce_date;
/// # use serde_json::json;
/// let expected = NaiveDate::from_ymd_opt(2021, 3, 14).map(FieldValue::Date);
/// assert_eq!(coerce_date(&json!("2021-03-14T10:00:00")), Ok(expected.clone()));
/// assert_eq!(coerce_date(&json!("14.03.2021")), Ok(expected));
/// assert!(coerce_date(&json!("not-a-date")).is_err());
/// ```
pub fn coerce_date(value: &Value) -> Result<Option<FieldValue>, CoercionError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => match non_blank(text) {
            None => Ok(None),
            Some(text) => parse_date(text)
                .map(|date| Some(FieldValue::Date(date)))
                .ok_or_else(|| CoercionError::NotADate {
                    found: text.to_owned(),
                }),
        },
        other => Err(unsupported(other)),
    }
}

/// Coerce a boolean, `0`/`1` or a yes/no token into [`FieldValue::Bool`].
///
/// Tokens are matched case-insensitively and include the Danish `ja`/`nej`.
pub fn coerce_bool(value: &Value) -> Result<Option<FieldValue>, CoercionError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(flag) => Ok(Some(FieldValue::Bool(*flag))),
        Value::Number(number) => match number.as_u64() {
            Some(0) => Ok(Some(FieldValue::Bool(false))),
            Some(1) => Ok(Some(FieldValue::Bool(true))),
            _ => Err(CoercionError::NotABoolean {
                found: number.to_string(),
            }),
        },
        Value::String(text) => match non_blank(text) {
            None => Ok(None),
            Some(text) => parse_bool(text)
                .map(|flag| Some(FieldValue::Bool(flag)))
                .ok_or_else(|| CoercionError::NotABoolean {
                    found: text.to_owned(),
                }),
        },
        other => Err(unsupported(other)),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    let token = text.to_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|moment| moment.date_naive())
        })
        .or_else(|| {
            DATE_TIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|moment| moment.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::integer(DecimalLocale::Danish, "125000", 125_000.0)]
    #[case::negative(DecimalLocale::Danish, "-12", -12.0)]
    #[case::danish_decimal(DecimalLocale::Danish, "7,4", 7.4)]
    #[case::danish_thousands(DecimalLocale::Danish, "61.500", 61_500.0)]
    #[case::danish_millions(DecimalLocale::Danish, "1.061.500", 1_061_500.0)]
    #[case::danish_full(DecimalLocale::Danish, "1.234,50", 1_234.5)]
    #[case::danish_comma_thousands(DecimalLocale::Danish, "1,250", 1.25)]
    #[case::english_decimal(DecimalLocale::English, "7.4", 7.4)]
    #[case::english_thousands(DecimalLocale::English, "1,250", 1_250.0)]
    #[case::english_full(DecimalLocale::English, "1,234.50", 1_234.5)]
    #[case::space_grouping(DecimalLocale::Danish, "125 000", 125_000.0)]
    #[case::nbsp_grouping(DecimalLocale::Danish, "125\u{a0}000,5", 125_000.5)]
    #[case::padded(DecimalLocale::English, "  42 ", 42.0)]
    fn parses_locale_decimals(
        #[case] locale: DecimalLocale,
        #[case] input: &str,
        #[case] expected: f64,
    ) {
        let parsed = locale.parse(input).expect("input should parse");
        assert!(
            FieldValue::Number(parsed).matches(&FieldValue::Number(expected)),
            "{input} parsed as {parsed}"
        );
    }

    #[rstest]
    #[case::letters(DecimalLocale::Danish, "abc")]
    #[case::units(DecimalLocale::Danish, "12 km")]
    #[case::exponent(DecimalLocale::English, "1e5")]
    #[case::infinity(DecimalLocale::English, "inf")]
    #[case::separators_only(DecimalLocale::Danish, ",.")]
    #[case::two_decimals(DecimalLocale::Danish, "1,2,3")]
    #[case::grouping_after_decimal(DecimalLocale::Danish, "1,234.5")]
    #[case::english_grouping_after_decimal(DecimalLocale::English, "1.234,5")]
    fn rejects_non_numbers(#[case] locale: DecimalLocale, #[case] input: &str) {
        assert_eq!(locale.parse(input), None, "{input} should be rejected");
    }

    #[rstest]
    fn danish_is_the_default_locale() {
        assert_eq!(
            coerce_number(&json!("61.500"), DecimalLocale::default()),
            Ok(Some(FieldValue::Number(61_500.0)))
        );
    }

    #[rstest]
    #[case::json_true(json!(true), Some(true))]
    #[case::one(json!(1), Some(true))]
    #[case::zero_string(json!("0"), Some(false))]
    #[case::ja(json!("Ja"), Some(true))]
    #[case::nej(json!("NEJ"), Some(false))]
    #[case::yes(json!("yes"), Some(true))]
    #[case::blank(json!("  "), None)]
    #[case::null(json!(null), None)]
    fn coerces_booleans(#[case] input: Value, #[case] expected: Option<bool>) {
        assert_eq!(coerce_bool(&input), Ok(expected.map(FieldValue::Bool)));
    }

    #[rstest]
    #[case::two(json!(2))]
    #[case::word(json!("maybe"))]
    #[case::array(json!([true]))]
    fn rejects_non_booleans(#[case] input: Value) {
        assert!(coerce_bool(&input).is_err());
    }

    #[rstest]
    #[case::iso("2019-06-01")]
    #[case::dashed("01-06-2019")]
    #[case::dotted("01.06.2019")]
    #[case::slashed("01/06/2019")]
    #[case::rfc3339("2019-06-01T08:30:00+02:00")]
    #[case::naive_time("2019-06-01T08:30:00")]
    #[case::fractional("2019-06-01 08:30:00.250")]
    fn coerces_dates(#[case] input: &str) {
        let expected = NaiveDate::from_ymd_opt(2019, 6, 1).map(FieldValue::Date);
        assert_eq!(coerce_date(&json!(input)), Ok(expected));
    }

    #[rstest]
    fn rejects_impossible_dates() {
        assert_eq!(
            coerce_date(&json!("2019-02-30")),
            Err(CoercionError::NotADate {
                found: "2019-02-30".to_owned()
            })
        );
        assert!(matches!(
            coerce_date(&json!(20_190_601)),
            Err(CoercionError::UnsupportedType {
                found: JsonType::Number
            })
        ));
    }

    #[rstest]
    #[case::trimmed(json!("  Volvo "), Some("Volvo"))]
    #[case::blank(json!(""), None)]
    #[case::number(json!(5), Some("5"))]
    #[case::boolean(json!(false), Some("false"))]
    fn coerces_text(#[case] input: Value, #[case] expected: Option<&str>) {
        assert_eq!(
            coerce_text(&input),
            Ok(expected.map(|text| FieldValue::Text(text.to_owned())))
        );
    }

    #[rstest]
    fn json_numbers_pass_through() {
        assert_eq!(
            coerce_number(&json!(61_000), DecimalLocale::Danish),
            Ok(Some(FieldValue::Number(61_000.0)))
        );
        assert!(matches!(
            coerce_number(&json!({"value": 1}), DecimalLocale::Danish),
            Err(CoercionError::UnsupportedType {
                found: JsonType::Object
            })
        ));
    }
}
