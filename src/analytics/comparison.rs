use serde::Serialize;
use tracing::warn;
use crate::analytics::trends::AnalysisError;
use crate::data::types::Listing;

/// Listings that fit side by side
pub const MAX_COMPARED: usize = 4;

/// Free-text search across type (English or Thai), location, price, area and
/// year built. Blank text matches everything.
pub fn search_listings<'a>(listings: &'a [Listing], text: &str) -> Vec<&'a Listing> {
    let text = text.trim();
    if text.is_empty() {
        return listings.iter().collect();
    }

    let needle = text.to_lowercase();

    listings
        .iter()
        .filter(|l| {
            l.property_type.as_str().to_lowercase().contains(&needle)
                || l.property_type.thai_label().contains(text)
                || l.location.to_lowercase().contains(&needle)
                || format_number(l.price).contains(text)
                || format_number(l.size_sq_m).contains(text)
                || l.year_built.map_or(false, |y| y.to_string().contains(text))
        })
        .collect()
}

/// Build the comparison set for `search` and `ids`. With no ids the two
/// newest matches are preselected; unknown or surplus ids are skipped.
pub fn select_for_comparison(
    listings: &[Listing],
    search: &str,
    ids: &[String],
) -> Result<ComparisonSet, AnalysisError> {
    if listings.is_empty() {
        return Err(AnalysisError::NoData);
    }

    let candidates: Vec<Listing> = search_listings(listings, search)
        .into_iter()
        .cloned()
        .collect();
    if candidates.is_empty() {
        return Err(AnalysisError::NoMatches(search.trim().to_string()));
    }

    if ids.is_empty() {
        return Ok(ComparisonSet::seeded(&candidates));
    }

    let mut set = ComparisonSet::new();
    for id in ids {
        match candidates.iter().find(|l| &l.listing_id == id) {
            Some(listing) => {
                if let Err(e) = set.add(listing.clone()) {
                    warn!("Skipping {}: {}", id, e);
                }
            }
            None => warn!("Listing {} not found", id),
        }
    }

    if set.is_empty() {
        return Err(AnalysisError::NoMatches(ids.join(",")));
    }

    Ok(set)
}

/// Whole numbers print without a fraction so "3000000" finds 3,000,000.0
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComparisonError {
    #[error("At most {MAX_COMPARED} properties can be compared")]
    Full,

    #[error("Listing {0} is already being compared")]
    Duplicate(String),

    #[error("Listing {0} is not being compared")]
    NotFound(String),
}

/// Up to four listings picked for side-by-side comparison
#[derive(Debug, Clone, Default)]
pub struct ComparisonSet {
    selected: Vec<Listing>,
}

impl ComparisonSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the two newest listings, the way the comparison page opens
    pub fn seeded(listings: &[Listing]) -> Self {
        Self {
            selected: listings.iter().take(2).cloned().collect(),
        }
    }

    pub fn add(&mut self, listing: Listing) -> Result<(), ComparisonError> {
        if self.selected.iter().any(|l| l.listing_id == listing.listing_id) {
            return Err(ComparisonError::Duplicate(listing.listing_id));
        }
        if self.selected.len() >= MAX_COMPARED {
            return Err(ComparisonError::Full);
        }
        self.selected.push(listing);
        Ok(())
    }

    pub fn remove(&mut self, listing_id: &str) -> Result<Listing, ComparisonError> {
        let pos = self
            .selected
            .iter()
            .position(|l| l.listing_id == listing_id)
            .ok_or_else(|| ComparisonError::NotFound(listing_id.to_string()))?;
        Ok(self.selected.remove(pos))
    }

    pub fn listings(&self) -> &[Listing] {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Side-by-side numbers for the current selection
    pub fn summary(&self, current_year: i32) -> ComparisonSummary {
        let rows: Vec<ComparisonRow> = self
            .selected
            .iter()
            .map(|l| ComparisonRow {
                listing_id: l.listing_id.clone(),
                property_type: l.property_type.as_str().to_string(),
                location: l.location.clone(),
                price: l.price,
                size_sq_m: l.size_sq_m,
                price_per_sqm: l.price_per_sqm().unwrap_or(0.0),
                bedrooms: l.bedrooms,
                bathrooms: l.bathrooms,
                age_years: l.year_built.map(|y| (current_year - y).max(0)),
                furnished: l.furnished.as_str().to_string(),
                vs_average_pct: 0.0,
            })
            .collect();

        let priced: Vec<f64> = rows
            .iter()
            .map(|r| r.price_per_sqm)
            .filter(|p| *p > 0.0)
            .collect();
        let average = if priced.is_empty() {
            0.0
        } else {
            priced.iter().sum::<f64>() / priced.len() as f64
        };

        let rows: Vec<ComparisonRow> = rows
            .into_iter()
            .map(|mut r| {
                if average > 0.0 && r.price_per_sqm > 0.0 {
                    r.vs_average_pct = (r.price_per_sqm - average) / average * 100.0;
                }
                r
            })
            .collect();

        let best_value = rows
            .iter()
            .filter(|r| r.price_per_sqm > 0.0)
            .min_by(|a, b| a.price_per_sqm.total_cmp(&b.price_per_sqm))
            .map(|r| r.listing_id.clone());
        let largest = rows
            .iter()
            .max_by(|a, b| a.size_sq_m.total_cmp(&b.size_sq_m))
            .map(|r| r.listing_id.clone());
        let newest = rows
            .iter()
            .filter_map(|r| r.age_years.map(|age| (age, r)))
            .min_by_key(|(age, _)| *age)
            .map(|(_, r)| r.listing_id.clone());

        ComparisonSummary {
            rows,
            average_price_per_sqm: average,
            best_value,
            largest,
            newest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub listing_id: String,
    pub property_type: String,
    pub location: String,
    pub price: f64,
    pub size_sq_m: f64,
    pub price_per_sqm: f64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub age_years: Option<i32>,
    pub furnished: String,
    /// Price per sq m relative to the selection mean
    pub vs_average_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSummary {
    pub rows: Vec<ComparisonRow>,
    pub average_price_per_sqm: f64,
    pub best_value: Option<String>,
    pub largest: Option<String>,
    pub newest: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::tests::listing;
    use crate::data::types::PropertyType;

    fn catalogue() -> Vec<Listing> {
        let mut house = listing("h", "Chiang Mai", 4_000_000.0, 200.0, "2024-03-01");
        house.property_type = PropertyType::House;
        house.year_built = Some(2021);

        vec![
            listing("c1", "Bangkok", 3_000_000.0, 50.0, "2024-04-01"),
            house,
            listing("c2", "Nonthaburi", 2_000_000.0, 40.0, "2024-02-01"),
        ]
    }

    #[test]
    fn test_search_blank_matches_all() {
        assert_eq!(search_listings(&catalogue(), "  ").len(), 3);
    }

    #[test]
    fn test_search_by_type_location_and_numbers() {
        let all = catalogue();

        let ids = |hits: Vec<&Listing>| hits.iter().map(|l| l.listing_id.clone()).collect::<Vec<_>>();

        assert_eq!(ids(search_listings(&all, "house")), vec!["h"]);
        assert_eq!(ids(search_listings(&all, "บ้านเดี่ยว")), vec!["h"]);
        assert_eq!(ids(search_listings(&all, "nonthaburi")), vec!["c2"]);
        assert_eq!(ids(search_listings(&all, "3000000")), vec!["c1"]);
        assert_eq!(ids(search_listings(&all, "2021")), vec!["h"]);
    }

    #[test]
    fn test_set_limits() {
        let mut set = ComparisonSet::new();
        for i in 0..4 {
            set.add(listing(&i.to_string(), "Bangkok", 1.0, 1.0, "2024-01-01")).unwrap();
        }

        assert_eq!(
            set.add(listing("0", "Bangkok", 1.0, 1.0, "2024-01-01")),
            Err(ComparisonError::Duplicate("0".to_string()))
        );
        assert_eq!(
            set.add(listing("9", "Bangkok", 1.0, 1.0, "2024-01-01")),
            Err(ComparisonError::Full)
        );

        set.remove("2").unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.remove("2"), Err(ComparisonError::NotFound("2".to_string())));
    }

    #[test]
    fn test_seeded_takes_first_two() {
        let set = ComparisonSet::seeded(&catalogue());
        let ids: Vec<&str> = set.listings().iter().map(|l| l.listing_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "h"]);
    }

    #[test]
    fn test_select_on_empty_store_is_no_data() {
        assert_eq!(
            select_for_comparison(&[], "", &[]).unwrap_err(),
            AnalysisError::NoData
        );
    }

    #[test]
    fn test_select_without_matches() {
        assert_eq!(
            select_for_comparison(&catalogue(), "krabi", &[]).unwrap_err(),
            AnalysisError::NoMatches("krabi".to_string())
        );
        assert_eq!(
            select_for_comparison(&catalogue(), "", &["zz".to_string()]).unwrap_err(),
            AnalysisError::NoMatches("zz".to_string())
        );
    }

    #[test]
    fn test_select_by_ids_skips_unknown() {
        let ids = vec!["c2".to_string(), "missing".to_string(), "c1".to_string()];
        let set = select_for_comparison(&catalogue(), "", &ids).unwrap();

        let picked: Vec<&str> = set.listings().iter().map(|l| l.listing_id.as_str()).collect();
        assert_eq!(picked, vec!["c2", "c1"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_summary() {
        let mut set = ComparisonSet::new();
        for l in catalogue() {
            set.add(l).unwrap();
        }

        let summary = set.summary(2026);

        // 60,000 / 20,000 / 50,000 per sq m
        assert!((summary.average_price_per_sqm - 130_000.0 / 3.0).abs() < 1e-6);
        assert_eq!(summary.best_value.as_deref(), Some("h"));
        assert_eq!(summary.largest.as_deref(), Some("h"));
        assert_eq!(summary.newest.as_deref(), Some("h"));
        assert_eq!(summary.rows[1].age_years, Some(5));
        assert!(summary.rows[0].vs_average_pct > 0.0);
        assert!(summary.rows[1].vs_average_pct < 0.0);
    }
}
