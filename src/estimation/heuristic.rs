use tracing::{debug, info};
use crate::config::{ComparableSelection, EstimatorConfig};
use crate::data::types::{Furnishing, Listing};
use crate::estimation::multipliers;
use crate::estimation::types::{
    Estimate, EstimateError, FactorBreakdown, MarketInsights, MarketTrend, Multipliers,
    PriceRange, Query,
};

/// Confidence bounds, in percent
pub const BASE_CONFIDENCE: usize = 60;
pub const MAX_CONFIDENCE: usize = 95;

pub struct PriceEstimator {
    config: EstimatorConfig,
}

impl PriceEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    /// Turn a query and a snapshot of listings into an estimate:
    /// 1. Comparable selection
    /// 2. Local market baseline (mean price per sq m)
    /// 3. Multiplier chain over the baseline
    /// 4. Range, confidence and factor breakdown
    pub fn estimate_at(
        &self,
        query: &Query,
        listings: &[Listing],
        current_year: i32,
    ) -> Result<Estimate, EstimateError> {
        if listings.is_empty() {
            return Err(EstimateError::NoData);
        }
        if !query.area_sq_m.is_finite() || query.area_sq_m <= 0.0 {
            return Err(EstimateError::InvalidInput(format!(
                "area must be a positive number, got {}",
                query.area_sq_m
            )));
        }
        let location = query.location.trim().to_lowercase();
        if location.is_empty() {
            return Err(EstimateError::InvalidInput("location is required".to_string()));
        }

        // 1. Comparables
        let comparables = self.select_comparables(query, listings, &location);
        debug!("Found {} comparable properties", comparables.len());

        // 2. Local market
        let local: Vec<&Listing> = listings
            .iter()
            .filter(|l| l.location_contains(&location))
            .collect();
        debug!("Found {} properties in {}", local.len(), query.location);

        let local_price_per_sqm = mean_price_per_sqm(local.iter().copied())
            .unwrap_or(self.config.fallback_price_per_sqm);
        let insights = self.market_insights(&local, local_price_per_sqm);

        // 3. Baseline and multiplier chain
        let baseline_price = local_price_per_sqm * query.area_sq_m;

        if !multipliers::is_known_location(&query.location) {
            debug!("{} not in the location table, using the default multiplier", query.location);
        }

        let age_years = query.year_built.map(|y| current_year - y).unwrap_or(0);
        let multipliers = Multipliers {
            location: multipliers::location(&query.location),
            property_type: multipliers::property_type(query.property_type),
            age: multipliers::age(age_years),
            amenities: multipliers::amenities(query.bedrooms, query.bathrooms),
            furnished: multipliers::furnished(query.furnished),
        };

        let estimated_price = baseline_price * multipliers.product();

        // 4. Range and confidence
        let price_range = PriceRange::around(estimated_price, self.config.range_spread);
        let confidence = confidence_score(comparables.len(), local.len());

        info!(
            "Estimate for {} ({:.0} sq m): ฿{:.0} (baseline ฿{:.0} x {:.3}), confidence {}%",
            query.location,
            query.area_sq_m,
            estimated_price,
            baseline_price,
            multipliers.product(),
            confidence
        );

        Ok(Estimate {
            estimated_price,
            price_range,
            confidence,
            baseline_price,
            factors: FactorBreakdown::from(&multipliers),
            multipliers,
            comparables,
            insights,
        })
    }

    /// Listings relevant to the query. A listing qualifies when it matches on
    /// location, type, size (within tolerance) or furnishing.
    pub fn select_comparables(
        &self,
        query: &Query,
        listings: &[Listing],
        location_lower: &str,
    ) -> Vec<Listing> {
        let limit = self.config.comparable_limit;

        match self.config.selection {
            ComparableSelection::FirstMatch => listings
                .iter()
                .filter(|l| self.criteria_met(query, l, location_lower) > 0)
                .take(limit)
                .cloned()
                .collect(),
            ComparableSelection::Ranked => {
                let mut scored: Vec<(usize, &Listing)> = listings
                    .iter()
                    .map(|l| (self.criteria_met(query, l, location_lower), l))
                    .filter(|(score, _)| *score > 0)
                    .collect();

                // Stable sort keeps store order among equal scores
                scored.sort_by(|a, b| b.0.cmp(&a.0));

                scored
                    .into_iter()
                    .take(limit)
                    .map(|(_, l)| l.clone())
                    .collect()
            }
        }
    }

    /// Number of similarity criteria a listing satisfies (0-4)
    fn criteria_met(&self, query: &Query, listing: &Listing, location_lower: &str) -> usize {
        let location_match = listing.location_contains(location_lower);
        let type_match = query.property_type == Some(listing.property_type);
        let size_match =
            (listing.size_sq_m - query.area_sq_m).abs() <= self.config.area_tolerance_sq_m;
        let furnished_match =
            query.furnished != Furnishing::Unknown && listing.furnished == query.furnished;

        [location_match, type_match, size_match, furnished_match]
            .iter()
            .filter(|m| **m)
            .count()
    }

    /// Growth compares listings built since `recent_build_year` with older ones
    fn market_insights(&self, local: &[&Listing], average_price_per_sqm: f64) -> MarketInsights {
        let cutoff = self.config.recent_build_year;

        let recent = mean_price_per_sqm(
            local.iter().copied().filter(|l| l.year_built.map_or(false, |y| y >= cutoff)),
        )
        .unwrap_or(average_price_per_sqm);

        let older = mean_price_per_sqm(
            local.iter().copied().filter(|l| l.year_built.map_or(false, |y| y < cutoff)),
        )
        .unwrap_or(average_price_per_sqm);

        let growth = if older > 0.0 {
            (recent - older) / older * 100.0
        } else {
            0.0
        };

        MarketInsights {
            average_price_per_sqm: average_price_per_sqm.round(),
            total_listings: local.len(),
            price_growth_pct: (growth * 10.0).round() / 10.0,
            market_trend: MarketTrend::from_change_pct(growth),
        }
    }
}

/// 60 + 5 per comparable + local sample size (capped at 20), capped at 95
pub fn confidence_score(comparable_count: usize, local_listings: usize) -> u8 {
    let score = BASE_CONFIDENCE
        .saturating_add(comparable_count.saturating_mul(5))
        .saturating_add(local_listings.min(20));

    score.min(MAX_CONFIDENCE) as u8
}

/// Mean price per sq m over listings with a positive price and area
pub fn mean_price_per_sqm<'a>(listings: impl Iterator<Item = &'a Listing>) -> Option<f64> {
    let (sum, count) = listings
        .filter_map(|l| l.price_per_sqm())
        .fold((0.0, 0usize), |(sum, count), p| (sum + p, count + 1));

    if count > 0 {
        Some(sum / count as f64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::tests::listing;
    use crate::data::types::PropertyType;

    fn estimator() -> PriceEstimator {
        PriceEstimator::new(EstimatorConfig::default())
    }

    fn bangkok_condo_query() -> Query {
        Query {
            property_type: Some(PropertyType::Condo),
            location: "Bangkok".to_string(),
            area_sq_m: 50.0,
            furnished: Furnishing::Yes,
            bedrooms: 2,
            bathrooms: 2,
            year_built: Some(2022),
        }
    }

    fn bangkok_listings(n: usize) -> Vec<Listing> {
        (0..n)
            .map(|i| listing(&format!("bkk-{}", i), "Bangkok, Sukhumvit", 3_000_000.0, 50.0, "2024-01-01"))
            .collect()
    }

    #[test]
    fn test_bangkok_condo_scenario() {
        let est = estimator()
            .estimate_at(&bangkok_condo_query(), &bangkok_listings(10), 2026)
            .unwrap();

        // baseline = 60,000/sq m x 50 sq m
        assert!((est.baseline_price - 3_000_000.0).abs() < 1e-6);
        assert_eq!(est.multipliers.location, 1.5);
        assert_eq!(est.multipliers.property_type, 1.1);
        assert_eq!(est.multipliers.age, 1.1);
        assert!((est.multipliers.amenities - 1.03).abs() < 1e-12); // 2 bedrooms, 2 bathrooms
        assert_eq!(est.multipliers.furnished, 1.1);

        let expected = 3_000_000.0 * 1.5 * 1.1 * 1.1 * 1.03 * 1.1;
        assert!((est.estimated_price - expected).abs() < 1e-3);
        assert_eq!(est.comparables.len(), 10);
        assert_eq!(est.confidence, 95);
    }

    #[test]
    fn test_scenario_with_three_bedrooms() {
        let mut query = bangkok_condo_query();
        query.bedrooms = 3;

        let est = estimator()
            .estimate_at(&query, &bangkok_listings(10), 2026)
            .unwrap();

        let expected = 3_000_000.0 * 1.5 * 1.10 * 1.10 * 1.08 * 1.10;
        assert!((est.estimated_price - expected).abs() < 1e-3);
    }

    #[test]
    fn test_range_brackets_estimate() {
        let est = estimator()
            .estimate_at(&bangkok_condo_query(), &bangkok_listings(3), 2026)
            .unwrap();

        assert!(est.price_range.low <= est.estimated_price);
        assert!(est.estimated_price <= est.price_range.high);
        let ratio = est.price_range.high / est.price_range.low;
        assert!((ratio - 1.15 / 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_empty_listings_is_no_data() {
        let result = estimator().estimate_at(&bangkok_condo_query(), &[], 2026);
        assert!(matches!(result, Err(EstimateError::NoData)));
    }

    #[test]
    fn test_invalid_area_is_rejected() {
        let mut query = bangkok_condo_query();
        query.area_sq_m = f64::NAN;
        let result = estimator().estimate_at(&query, &bangkok_listings(1), 2026);
        assert!(matches!(result, Err(EstimateError::InvalidInput(_))));

        query.area_sq_m = 0.0;
        let result = estimator().estimate_at(&query, &bangkok_listings(1), 2026);
        assert!(matches!(result, Err(EstimateError::InvalidInput(_))));
    }

    #[test]
    fn test_unknown_location_uses_default_multiplier_and_fallback_baseline() {
        let mut query = bangkok_condo_query();
        query.location = "Atlantis".to_string();

        let est = estimator()
            .estimate_at(&query, &bangkok_listings(5), 2026)
            .unwrap();

        assert_eq!(est.multipliers.location, 0.85);
        // No local listings: fixed 50,000/sq m baseline
        assert!((est.baseline_price - 50_000.0 * 50.0).abs() < 1e-6);
        assert_eq!(est.insights.total_listings, 0);
        assert_eq!(est.insights.average_price_per_sqm, 50_000.0);
    }

    #[test]
    fn test_estimate_is_idempotent() {
        let listings = bangkok_listings(7);
        let a = estimator().estimate_at(&bangkok_condo_query(), &listings, 2026).unwrap();
        let b = estimator().estimate_at(&bangkok_condo_query(), &listings, 2026).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_comparables_first_match_keeps_store_order() {
        let mut far = listing("far", "Phuket", 9_000_000.0, 400.0, "2024-01-01");
        far.property_type = PropertyType::Land;
        let mut listings = vec![far];
        listings.extend(bangkok_listings(12));

        let est = estimator()
            .estimate_at(&bangkok_condo_query(), &listings, 2026)
            .unwrap();

        assert_eq!(est.comparables.len(), 10);
        assert_eq!(est.comparables[0].listing_id, "bkk-0");
        assert!(est.comparables.iter().all(|l| l.listing_id != "far"));
    }

    #[test]
    fn test_comparables_match_on_any_single_criterion() {
        // Different location, type and furnishing, but close in size
        let mut size_only = listing("size", "Krabi", 2_000_000.0, 120.0, "2024-01-01");
        size_only.property_type = PropertyType::House;

        let est = estimator()
            .estimate_at(&bangkok_condo_query(), &[size_only], 2026)
            .unwrap();

        assert_eq!(est.comparables.len(), 1);
    }

    #[test]
    fn test_ranked_selection_prefers_stronger_matches() {
        let config = EstimatorConfig {
            selection: ComparableSelection::Ranked,
            comparable_limit: 2,
            ..EstimatorConfig::default()
        };
        let ranked = PriceEstimator::new(config);

        // One criterion (size only)
        let mut weak = listing("weak", "Krabi", 2_000_000.0, 60.0, "2024-01-01");
        weak.property_type = PropertyType::House;
        // Location, type and size
        let strong = listing("strong", "Bangkok", 3_000_000.0, 50.0, "2024-01-01");
        // Everything including furnishing
        let mut best = listing("best", "Bangkok", 3_100_000.0, 55.0, "2024-01-01");
        best.furnished = Furnishing::Yes;

        let est = ranked
            .estimate_at(&bangkok_condo_query(), &[weak, strong, best], 2026)
            .unwrap();

        let ids: Vec<&str> = est.comparables.iter().map(|l| l.listing_id.as_str()).collect();
        assert_eq!(ids, vec!["best", "strong"]);
    }

    #[test]
    fn test_confidence_bounds_and_monotonicity() {
        assert_eq!(confidence_score(0, 0), 60);
        assert_eq!(confidence_score(1, 0), 65);
        assert_eq!(confidence_score(2, 15), 85);
        assert_eq!(confidence_score(10, 100), 95);

        for comparables in 0..12 {
            for local in 0..30 {
                let c = confidence_score(comparables, local);
                assert!((60..=95).contains(&c));
                assert!(confidence_score(comparables + 1, local) >= c);
                assert!(confidence_score(comparables, local + 1) >= c);
            }
        }
    }

    #[test]
    fn test_market_insights_growth() {
        let mut new_build = listing("n", "Chiang Mai", 6_000_000.0, 100.0, "2024-01-01");
        new_build.year_built = Some(2021);
        let mut old_build = listing("o", "Chiang Mai", 5_000_000.0, 100.0, "2024-01-01");
        old_build.year_built = Some(2010);

        let mut query = bangkok_condo_query();
        query.location = "chiang mai".to_string();

        let est = estimator()
            .estimate_at(&query, &[new_build, old_build], 2026)
            .unwrap();

        assert_eq!(est.insights.total_listings, 2);
        assert_eq!(est.insights.average_price_per_sqm, 55_000.0);
        assert_eq!(est.insights.price_growth_pct, 20.0);
        assert_eq!(est.insights.market_trend, MarketTrend::Increasing);
    }

    #[test]
    fn test_missing_year_built_counts_as_new() {
        let mut query = bangkok_condo_query();
        query.year_built = None;
        let est = estimator()
            .estimate_at(&query, &bangkok_listings(1), 2026)
            .unwrap();
        assert_eq!(est.multipliers.age, 1.1);
    }
}
