use anyhow::{Context, Result};
use async_trait::async_trait;
use crate::data::types::{Listing, ListingRow};
use tracing::{debug, info};

/// What a caller wants from the listings store. Results are always ordered
/// by listing date, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchRequest {
    pub purpose: FetchPurpose,
    pub limit: Option<usize>,
    pub geolocated_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchPurpose {
    Estimate,
    Trends,
    Comparison,
    Map,
}

impl FetchPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchPurpose::Estimate => "estimate",
            FetchPurpose::Trends => "trends",
            FetchPurpose::Comparison => "comparison",
            FetchPurpose::Map => "map",
        }
    }
}

impl FetchRequest {
    pub fn recent(purpose: FetchPurpose, limit: usize) -> Self {
        Self {
            purpose,
            limit: Some(limit),
            geolocated_only: false,
        }
    }

    /// Cache key: two requests with the same key return the same rows
    pub fn cache_key(&self) -> String {
        format!(
            "limit={}&geo={}",
            self.limit.map(|l| l.to_string()).unwrap_or_else(|| "all".to_string()),
            self.geolocated_only
        )
    }
}

/// Read-only access to the listings collection
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Listing>>;

    /// Short name for logs
    fn name(&self) -> &str;
}

#[async_trait]
impl ListingSource for Box<dyn ListingSource> {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Listing>> {
        self.as_ref().fetch(request).await
    }

    fn name(&self) -> &str {
        self.as_ref().name()
    }
}

/// Newest-first ordering plus the request's geo filter and limit. Shared by
/// sources that hold rows locally.
pub fn apply_request(mut listings: Vec<Listing>, request: &FetchRequest) -> Vec<Listing> {
    if request.geolocated_only {
        listings.retain(|l| l.coordinates().is_some());
    }

    listings.sort_by(|a, b| b.date_listed.cmp(&a.date_listed));

    if let Some(limit) = request.limit {
        listings.truncate(limit);
    }

    listings
}

/// Listings held in memory, loaded from a JSON export of the listings table
pub struct MemorySource {
    listings: Vec<Listing>,
}

impl MemorySource {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self { listings }
    }

    /// Load a JSON array of raw rows. Rows that do not convert are skipped.
    pub fn from_json_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read listings file: {}", path))?;

        let rows: Vec<serde_json::Value> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse listings file: {}", path))?;

        let listings = rows_to_listings(rows);
        info!("Loaded {} listings from {}", listings.len(), path);

        Ok(Self::new(listings))
    }
}

#[async_trait]
impl ListingSource for MemorySource {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Listing>> {
        Ok(apply_request(self.listings.clone(), request))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Convert raw JSON rows, skipping the ones that are not usable listings
pub fn rows_to_listings(rows: Vec<serde_json::Value>) -> Vec<Listing> {
    let total = rows.len();

    let listings: Vec<Listing> = rows
        .into_iter()
        .filter_map(|value| {
            let row: ListingRow = match serde_json::from_value(value) {
                Ok(row) => row,
                Err(e) => {
                    debug!("Skipping malformed row: {}", e);
                    return None;
                }
            };
            match Listing::try_from(row) {
                Ok(listing) => Some(listing),
                Err(e) => {
                    debug!("Skipping row: {}", e);
                    None
                }
            }
        })
        .collect();

    if listings.len() < total {
        debug!("Kept {} of {} rows", listings.len(), total);
    }

    listings
}
