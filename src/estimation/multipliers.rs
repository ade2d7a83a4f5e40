//! Lookup tables for the multiplier chain. Every lookup is a pure function
//! with a fixed fallback for keys it does not know.

use crate::data::types::{Furnishing, PropertyType};

/// Provinces outside the table
pub const DEFAULT_LOCATION_MULTIPLIER: f64 = 0.85;

/// Location premium keyed by Thai and English province names (lowercase)
const LOCATION_MULTIPLIERS: &[(&str, f64)] = &[
    // Major economic centres
    ("กรุงเทพมหานคร", 1.5), ("bangkok", 1.5),
    ("นนทบุรี", 1.3), ("nonthaburi", 1.3),
    ("ปทุมธานี", 1.25), ("pathum thani", 1.25),
    ("สมุทรปราการ", 1.2), ("samut prakan", 1.2),
    ("ชลบุรี", 1.15), ("chonburi", 1.15),
    ("ระยอง", 1.1), ("rayong", 1.1),
    // Tourist destinations
    ("ภูเก็ต", 1.4), ("phuket", 1.4),
    ("เชียงใหม่", 1.2), ("chiang mai", 1.2),
    ("กระบี่", 1.15), ("krabi", 1.15),
    ("สุราษฎร์ธานี", 1.1), ("surat thani", 1.1),
    ("ประจวบคีรีขันธ์", 1.05), ("prachuap khiri khan", 1.05),
    // Regional centres
    ("นครราชสีมา", 1.0), ("nakhon ratchasima", 1.0),
    ("ขอนแก่น", 0.95), ("khon kaen", 0.95),
    ("อุดรธานี", 0.9), ("udon thani", 0.9),
    ("หาดใหญ่", 0.95), ("hat yai", 0.95),
    ("สงขลา", 0.95), ("songkhla", 0.95),
];

pub fn location(name: &str) -> f64 {
    let key = name.trim().to_lowercase();
    LOCATION_MULTIPLIERS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, m)| *m)
        .unwrap_or(DEFAULT_LOCATION_MULTIPLIER)
}

/// Whether the location table has an entry for `name`
pub fn is_known_location(name: &str) -> bool {
    let key = name.trim().to_lowercase();
    LOCATION_MULTIPLIERS.iter().any(|(k, _)| *k == key)
}

pub fn property_type(kind: Option<PropertyType>) -> f64 {
    match kind {
        Some(PropertyType::Condo) => 1.1,
        Some(PropertyType::House) => 1.05,
        Some(PropertyType::Townhouse) => 1.0,
        Some(PropertyType::Apartment) => 0.95,
        Some(PropertyType::Commercial) => 1.2,
        Some(PropertyType::Land) => 0.8,
        None => 1.0,
    }
}

/// Step function of building age in years
pub fn age(age_years: i32) -> f64 {
    if age_years <= 5 {
        1.1
    } else if age_years <= 10 {
        1.0
    } else if age_years <= 20 {
        0.95
    } else {
        0.9
    }
}

/// Additive bumps: +0.05 for 3+ bedrooms, +0.03 for 2+ bathrooms
pub fn amenities(bedrooms: u32, bathrooms: u32) -> f64 {
    let mut multiplier = 1.0;
    if bedrooms >= 3 {
        multiplier += 0.05;
    }
    if bathrooms >= 2 {
        multiplier += 0.03;
    }
    multiplier
}

pub fn furnished(state: Furnishing) -> f64 {
    match state {
        Furnishing::Yes => 1.1,
        Furnishing::Partial => 1.05,
        Furnishing::No | Furnishing::Unknown => 1.0,
    }
}
