use serde::Serialize;
use crate::data::types::{Furnishing, Listing, PropertyType};
use crate::estimation::validation::ValidationError;

/// Subject property of an estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub property_type: Option<PropertyType>,
    pub location: String,
    pub area_sq_m: f64,
    pub furnished: Furnishing,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub year_built: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceRange {
    pub low: f64,
    pub high: f64,
}

impl PriceRange {
    /// Symmetric range around `point`, e.g. spread 0.15 gives [0.85x, 1.15x]
    pub fn around(point: f64, spread: f64) -> Self {
        Self {
            low: point * (1.0 - spread),
            high: point * (1.0 + spread),
        }
    }
}

/// The five factors applied to the baseline price
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Multipliers {
    pub location: f64,
    pub property_type: f64,
    pub age: f64,
    pub amenities: f64,
    pub furnished: f64,
}

impl Multipliers {
    pub fn product(&self) -> f64 {
        self.location * self.property_type * self.age * self.amenities * self.furnished
    }
}

/// Display weights for the factor chart. Not used in the price math.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FactorBreakdown {
    pub location: f64,
    pub size: f64,
    pub age: f64,
    pub amenities: f64,
    pub furnished: f64,
}

impl From<&Multipliers> for FactorBreakdown {
    fn from(m: &Multipliers) -> Self {
        Self {
            location: m.location * 25.0,
            size: 20.0,
            age: (2.0 - m.age) * 25.0,
            amenities: (m.amenities - 1.0) * 100.0 + 15.0,
            furnished: (m.furnished - 1.0) * 100.0 + 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarketTrend {
    Increasing,
    Decreasing,
    Stable,
}

impl MarketTrend {
    /// More than 3% either way counts as a trend
    pub fn from_change_pct(change_pct: f64) -> Self {
        if change_pct > 3.0 {
            MarketTrend::Increasing
        } else if change_pct < -3.0 {
            MarketTrend::Decreasing
        } else {
            MarketTrend::Stable
        }
    }
}

/// Local market summary shown next to an estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketInsights {
    pub average_price_per_sqm: f64,
    pub total_listings: usize,
    pub price_growth_pct: f64,
    pub market_trend: MarketTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub estimated_price: f64,
    pub price_range: PriceRange,
    pub confidence: u8,
    pub baseline_price: f64,
    pub multipliers: Multipliers,
    pub factors: FactorBreakdown,
    pub comparables: Vec<Listing>,
    pub insights: MarketInsights,
}

#[derive(Debug, thiserror::Error)]
pub enum EstimateError {
    #[error("No market data found for this area")]
    NoData,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Listings store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl EstimateError {
    /// Store failures are worth retrying, bad input and missing data are not
    pub fn is_retryable(&self) -> bool {
        matches!(self, EstimateError::Store(_))
    }
}
