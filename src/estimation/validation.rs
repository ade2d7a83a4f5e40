use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;
use crate::data::types::{Furnishing, PropertyType};
use crate::estimation::types::Query;

/// Oldest building year accepted from the form
pub const MIN_YEAR_BUILT: i32 = 1800;

/// Raw estimate form, every field as typed by the user. Batch files may
/// carry numbers or booleans; they are kept as text until `validate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryForm {
    #[serde(default, deserialize_with = "form_text")]
    pub property_type: String,
    #[serde(default, deserialize_with = "form_text")]
    pub location: String,
    #[serde(default, deserialize_with = "form_text")]
    pub area: String,
    #[serde(default, deserialize_with = "form_text")]
    pub bedrooms: String,
    #[serde(default, deserialize_with = "form_text")]
    pub bathrooms: String,
    #[serde(default, deserialize_with = "form_text")]
    pub year_built: String,
    #[serde(default, deserialize_with = "form_text")]
    pub furnished: String,
}

/// String, number, bool or null as raw form text
fn form_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(true) => Ok("yes".to_string()),
        Value::Bool(false) => Ok("no".to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected text or a number, got {}",
            other
        ))),
    }
}

impl QueryForm {
    /// Check every field before anything is computed
    pub fn validate(&self, current_year: i32) -> Result<Query, ValidationError> {
        // 1. Location is required, it drives the local baseline
        let location = self.location.trim();
        if location.is_empty() {
            return Err(ValidationError::MissingLocation);
        }

        // 2. Area must be a finite positive number
        let area_sq_m = parse_area(&self.area)?;

        // 3. Room counts, empty means zero
        let bedrooms = parse_count("bedrooms", &self.bedrooms)?;
        let bathrooms = parse_count("bathrooms", &self.bathrooms)?;

        // 4. Year built, empty means unknown
        let year_built = parse_year(&self.year_built, current_year)?;

        // 5. Property type, unknown text falls back to no type
        let property_type = parse_property_type(&self.property_type);

        Ok(Query {
            property_type,
            location: location.to_string(),
            area_sq_m,
            furnished: Furnishing::parse(&self.furnished),
            bedrooms,
            bathrooms,
            year_built,
        })
    }
}

fn parse_area(raw: &str) -> Result<f64, ValidationError> {
    let raw = raw.trim();
    let area: f64 = raw
        .replace(',', "")
        .parse()
        .map_err(|_| ValidationError::InvalidArea(raw.to_string()))?;

    if !area.is_finite() || area <= 0.0 {
        return Err(ValidationError::InvalidArea(raw.to_string()));
    }

    Ok(area)
}

fn parse_count(field: &'static str, raw: &str) -> Result<u32, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }

    raw.parse::<u32>()
        .map_err(|_| ValidationError::InvalidCount(field, raw.to_string()))
}

fn parse_year(raw: &str, current_year: i32) -> Result<Option<i32>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let year: i32 = raw
        .parse()
        .map_err(|_| ValidationError::InvalidYear(raw.to_string()))?;

    if !(MIN_YEAR_BUILT..=current_year).contains(&year) {
        return Err(ValidationError::InvalidYear(raw.to_string()));
    }

    Ok(Some(year))
}

fn parse_property_type(raw: &str) -> Option<PropertyType> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match raw.parse() {
        Ok(kind) => Some(kind),
        Err(e) => {
            warn!("{}, estimating without a property type", e);
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Location is required")]
    MissingLocation,

    #[error("Area must be a positive number, got {0:?}")]
    InvalidArea(String),

    #[error("Number of {0} must be a whole number, got {1:?}")]
    InvalidCount(&'static str, String),

    #[error("Year built must be a year between 1800 and this year, got {0:?}")]
    InvalidYear(String),
}
