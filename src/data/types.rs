use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Condo,
    House,
    Townhouse,
    Apartment,
    Commercial,
    Land,
}

impl PropertyType {
    pub const ALL: [PropertyType; 6] = [
        PropertyType::Condo,
        PropertyType::House,
        PropertyType::Townhouse,
        PropertyType::Apartment,
        PropertyType::Commercial,
        PropertyType::Land,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Condo => "Condo",
            PropertyType::House => "House",
            PropertyType::Townhouse => "Townhouse",
            PropertyType::Apartment => "Apartment",
            PropertyType::Commercial => "Commercial",
            PropertyType::Land => "Land",
        }
    }

    /// Thai label used by the listings table and the Thai-language UI
    pub fn thai_label(&self) -> &'static str {
        match self {
            PropertyType::Condo => "คอนโดมิเนียม",
            PropertyType::House => "บ้านเดี่ยว",
            PropertyType::Townhouse => "ทาวน์เฮาส์",
            PropertyType::Apartment => "อพาร์ทเมนท์",
            PropertyType::Commercial => "อาคารพาณิชย์",
            PropertyType::Land => "ที่ดิน",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let lower = trimmed.to_lowercase();

        for kind in PropertyType::ALL {
            if lower == kind.as_str().to_lowercase() || trimmed == kind.thai_label() {
                return Ok(kind);
            }
        }

        // Common aliases seen in the listings table
        match lower.as_str() {
            "condominium" | "คอนโด" => Ok(PropertyType::Condo),
            "บ้าน" => Ok(PropertyType::House),
            _ => bail!("Unknown property type: {}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Furnishing {
    Yes,
    No,
    Partial,
    #[default]
    Unknown,
}

impl Furnishing {
    /// Lenient parse, anything unrecognised is `Unknown`
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "yes" | "furnished" | "fully furnished" | "มีเฟอร์นิเจอร์" => Furnishing::Yes,
            "no" | "unfurnished" | "ไม่มีเฟอร์นิเจอร์" => Furnishing::No,
            "partial" | "partially furnished" | "เฟอร์นิเจอร์บางส่วน" => Furnishing::Partial,
            _ => Furnishing::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Furnishing::Yes => "Yes",
            Furnishing::No => "No",
            Furnishing::Partial => "Partial",
            Furnishing::Unknown => "N/A",
        }
    }
}

impl fmt::Display for Furnishing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One real-estate record from the listings store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub listing_id: String,
    pub property_type: PropertyType,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub price: f64,
    pub size_sq_m: f64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub year_built: Option<i32>,
    pub furnished: Furnishing,
    pub date_listed: NaiveDate,
}

impl Listing {
    /// Price per square metre, only for rows with a positive price and area
    pub fn price_per_sqm(&self) -> Option<f64> {
        if self.price > 0.0 && self.size_sq_m > 0.0 {
            Some(self.price / self.size_sq_m)
        } else {
            None
        }
    }

    /// Case-insensitive substring match on the location text.
    /// `needle_lower` must already be lowercased.
    pub fn location_contains(&self, needle_lower: &str) -> bool {
        self.location.to_lowercase().contains(needle_lower)
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Raw row as returned by the listings table. Every column is optional
/// because the hosted table is loosely typed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListingRow {
    #[serde(default)]
    pub listing_id: serde_json::Value,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub size_sq_m: Option<f64>,
    #[serde(default)]
    pub furnished: Option<String>,
    #[serde(default)]
    pub bedrooms: Option<f64>,
    #[serde(default)]
    pub bathrooms: Option<f64>,
    #[serde(default)]
    pub year_built: Option<f64>,
    #[serde(default)]
    pub date_listed: Option<String>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = anyhow::Error;

    fn try_from(row: ListingRow) -> Result<Self> {
        let listing_id = match row.listing_id {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => bail!("Unsupported listing_id: {}", other),
        };

        let property_type: PropertyType = row
            .property_type
            .as_deref()
            .context("Missing property_type")?
            .parse()?;

        let date_listed = parse_listing_date(
            row.date_listed.as_deref().context("Missing date_listed")?,
        )?;

        Ok(Listing {
            listing_id,
            property_type,
            location: row.location.unwrap_or_default(),
            latitude: row.latitude,
            longitude: row.longitude,
            price: row.price.unwrap_or(0.0),
            size_sq_m: row.size_sq_m.unwrap_or(0.0),
            bedrooms: count_or_zero(row.bedrooms),
            bathrooms: count_or_zero(row.bathrooms),
            year_built: row.year_built.filter(|y| y.is_finite()).map(|y| y as i32),
            furnished: row
                .furnished
                .as_deref()
                .map(Furnishing::parse)
                .unwrap_or_default(),
            date_listed,
        })
    }
}

fn count_or_zero(value: Option<f64>) -> u32 {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u32)
        .unwrap_or(0)
}

/// Accepts plain dates ("2024-05-01") and RFC 3339 timestamps
pub fn parse_listing_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }

    // Postgres timestamp without zone
    if let Some(date_part) = s.split(|c| c == 'T' || c == ' ').next() {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            return Ok(date);
        }
    }

    bail!("Unparseable listing date: {}", s)
}
