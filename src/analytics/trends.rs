use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;
use crate::data::types::{Listing, PropertyType};
use crate::estimation::heuristic::mean_price_per_sqm;
use crate::estimation::types::MarketTrend;

/// Areas shown in the ranking
pub const TOP_AREAS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum Timeframe {
    ThreeMonths,
    SixMonths,
    #[default]
    OneYear,
    TwoYears,
}

impl Timeframe {
    pub fn months(&self) -> u32 {
        match self {
            Timeframe::ThreeMonths => 3,
            Timeframe::SixMonths => 6,
            Timeframe::OneYear => 12,
            Timeframe::TwoYears => 24,
        }
    }

    /// "3m", "6m", "1y", "2y"; anything else is one year
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "3m" => Timeframe::ThreeMonths,
            "6m" => Timeframe::SixMonths,
            "2y" => Timeframe::TwoYears,
            _ => Timeframe::OneYear,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrendFilter {
    pub location: Option<String>,
    pub property_type: Option<PropertyType>,
    pub timeframe: Timeframe,
}

impl TrendFilter {
    /// Blank or "all" location means every area
    pub fn new(location: Option<&str>, property_type: Option<PropertyType>, timeframe: Timeframe) -> Self {
        let location = location
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty() && l != "all");

        Self {
            location,
            property_type,
            timeframe,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub start: NaiveDate,
    pub average_price: f64,
    pub listings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaSummary {
    pub name: String,
    pub average_price: f64,
    pub count: usize,
    pub price_change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketAnalysis {
    /// Average price in millions, x100
    pub price_index: f64,
    pub average_price: f64,
    pub average_price_per_sqm: f64,
    pub total_listings: usize,
    pub price_change_pct: f64,
    pub market_trend: MarketTrend,
    pub monthly: Vec<MonthlyPoint>,
    pub top_areas: Vec<AreaSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("No data found for selected criteria")]
    NoData,

    #[error("No listings match \"{0}\"")]
    NoMatches(String),
}

/// Descriptive statistics over the listings that pass `filter`, as of `today`
pub fn analyze_market(
    listings: &[Listing],
    filter: &TrendFilter,
    today: NaiveDate,
) -> Result<MarketAnalysis, AnalysisError> {
    let months = filter.timeframe.months();
    let cutoff = months_before(today, months);

    // 1. Filter: valid rows, area, type, window
    let filtered: Vec<&Listing> = listings
        .iter()
        .filter(|l| l.price > 0.0 && l.size_sq_m > 0.0)
        .filter(|l| match &filter.location {
            Some(loc) => l.location_contains(loc),
            None => true,
        })
        .filter(|l| match filter.property_type {
            Some(kind) => l.property_type == kind,
            None => true,
        })
        .filter(|l| l.date_listed >= cutoff)
        .collect();

    info!(
        "Market analysis: {} of {} listings in window since {}",
        filtered.len(),
        listings.len(),
        cutoff
    );

    if filtered.is_empty() {
        return Err(AnalysisError::NoData);
    }

    // 2. Headline numbers
    let average_price = mean_price(&filtered).unwrap_or(0.0);
    let average_price_per_sqm = mean_price_per_sqm(filtered.iter().copied()).unwrap_or(0.0);
    let price_index = average_price / 1_000_000.0 * 100.0;

    // 3. First half of the window against the second half
    let midpoint = months_before(today, months / 2);
    let price_change_pct = midpoint_change(&filtered, midpoint, average_price);

    Ok(MarketAnalysis {
        price_index,
        average_price,
        average_price_per_sqm,
        total_listings: filtered.len(),
        price_change_pct,
        market_trend: MarketTrend::from_change_pct(price_change_pct),
        monthly: monthly_series(&filtered, today, months),
        top_areas: top_areas(&filtered, midpoint),
    })
}

fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

fn mean_price(listings: &[&Listing]) -> Option<f64> {
    if listings.is_empty() {
        None
    } else {
        Some(listings.iter().map(|l| l.price).sum::<f64>() / listings.len() as f64)
    }
}

/// Percent change of mean price, listings on/after `midpoint` vs before.
/// An empty side falls back to `overall`.
fn midpoint_change(listings: &[&Listing], midpoint: NaiveDate, overall: f64) -> f64 {
    let (recent, older): (Vec<&Listing>, Vec<&Listing>) =
        listings.iter().partition(|l| l.date_listed >= midpoint);

    let recent_avg = mean_price(&recent).unwrap_or(overall);
    let older_avg = mean_price(&older).unwrap_or(overall);

    if older_avg > 0.0 {
        (recent_avg - older_avg) / older_avg * 100.0
    } else {
        0.0
    }
}

/// One point per calendar month of the window, oldest first
fn monthly_series(listings: &[&Listing], today: NaiveDate, months: u32) -> Vec<MonthlyPoint> {
    let this_month = today.with_day(1).unwrap_or(today);

    (0..months)
        .rev()
        .map(|i| {
            let start = months_before(this_month, i);
            let end = start
                .checked_add_months(Months::new(1))
                .map(|next| next - Duration::days(1))
                .unwrap_or(NaiveDate::MAX);

            let in_month: Vec<&Listing> = listings
                .iter()
                .copied()
                .filter(|l| l.date_listed >= start && l.date_listed <= end)
                .collect();

            MonthlyPoint {
                month: start.format("%b %Y").to_string(),
                start,
                average_price: mean_price(&in_month).unwrap_or(0.0),
                listings: in_month.len(),
            }
        })
        .collect()
}

/// Areas ranked by listing count, ties in first-seen order
fn top_areas(listings: &[&Listing], midpoint: NaiveDate) -> Vec<AreaSummary> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&Listing>)> = Vec::new();

    for &listing in listings {
        let name = if listing.location.trim().is_empty() {
            "Unknown"
        } else {
            listing.location.as_str()
        };

        match index.get(name) {
            Some(&i) => groups[i].1.push(listing),
            None => {
                index.insert(name, groups.len());
                groups.push((name, vec![listing]));
            }
        }
    }

    groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    groups
        .into_iter()
        .take(TOP_AREAS)
        .map(|(name, members)| {
            let average_price = mean_price(&members).unwrap_or(0.0);
            AreaSummary {
                name: name.to_string(),
                average_price,
                count: members.len(),
                price_change_pct: midpoint_change(&members, midpoint, average_price),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::tests::listing;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn sample() -> Vec<Listing> {
        let mut phuket = listing("p", "Phuket", 5_000_000.0, 100.0, "2026-08-15");
        phuket.property_type = PropertyType::House;

        vec![
            listing("b1", "Bangkok", 4_000_000.0, 50.0, "2026-09-01"),
            listing("b2", "Bangkok", 3_000_000.0, 50.0, "2026-05-01"),
            phuket,
            listing("old", "Bangkok", 9_000_000.0, 50.0, "2025-01-01"),
            listing("zero", "Bangkok", 0.0, 50.0, "2026-09-02"),
        ]
    }

    #[test]
    fn test_timeframe_parse() {
        assert_eq!(Timeframe::parse("3m").months(), 3);
        assert_eq!(Timeframe::parse("2Y").months(), 24);
        assert_eq!(Timeframe::parse("forever"), Timeframe::OneYear);
    }

    #[test]
    fn test_analysis_over_six_months() {
        let filter = TrendFilter::new(None, None, Timeframe::SixMonths);
        let analysis = analyze_market(&sample(), &filter, today()).unwrap();

        assert_eq!(analysis.total_listings, 3);
        assert!((analysis.average_price - 4_000_000.0).abs() < 1e-6);
        assert!((analysis.price_index - 400.0).abs() < 1e-9);
        // Recent half: 4M and 5M, older half: 3M
        assert!((analysis.price_change_pct - 50.0).abs() < 1e-9);
        assert_eq!(analysis.market_trend, MarketTrend::Increasing);
    }

    #[test]
    fn test_monthly_series_covers_window() {
        let filter = TrendFilter::new(None, None, Timeframe::SixMonths);
        let analysis = analyze_market(&sample(), &filter, today()).unwrap();

        let counts: Vec<usize> = analysis.monthly.iter().map(|m| m.listings).collect();
        assert_eq!(analysis.monthly.len(), 6);
        assert_eq!(analysis.monthly[0].month, "May 2026");
        assert_eq!(analysis.monthly[5].month, "Oct 2026");
        assert_eq!(counts, vec![1, 0, 0, 1, 1, 0]);
        assert_eq!(analysis.monthly[1].average_price, 0.0);
    }

    #[test]
    fn test_top_areas_ranked_by_count() {
        let filter = TrendFilter::new(Some("all"), None, Timeframe::SixMonths);
        let analysis = analyze_market(&sample(), &filter, today()).unwrap();

        assert_eq!(analysis.top_areas.len(), 2);
        assert_eq!(analysis.top_areas[0].name, "Bangkok");
        assert_eq!(analysis.top_areas[0].count, 2);
        assert!((analysis.top_areas[0].price_change_pct - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(analysis.top_areas[1].name, "Phuket");
        assert_eq!(analysis.top_areas[1].price_change_pct, 0.0);
    }

    #[test]
    fn test_top_areas_capped_at_six() {
        let listings: Vec<Listing> = (0..9)
            .map(|i| listing(&i.to_string(), &format!("Area {}", i), 1_000_000.0, 30.0, "2026-10-01"))
            .collect();

        let analysis = analyze_market(&listings, &TrendFilter::default(), today()).unwrap();
        assert_eq!(analysis.top_areas.len(), TOP_AREAS);
        assert_eq!(analysis.top_areas[0].name, "Area 0");
    }

    #[test]
    fn test_location_and_type_filters() {
        let filter = TrendFilter::new(Some("PHUKET"), Some(PropertyType::House), Timeframe::OneYear);
        let analysis = analyze_market(&sample(), &filter, today()).unwrap();
        assert_eq!(analysis.total_listings, 1);

        let filter = TrendFilter::new(Some("Phuket"), Some(PropertyType::Condo), Timeframe::OneYear);
        assert_eq!(
            analyze_market(&sample(), &filter, today()),
            Err(AnalysisError::NoData)
        );
    }

    #[test]
    fn test_empty_input_is_no_data() {
        assert_eq!(
            analyze_market(&[], &TrendFilter::default(), today()),
            Err(AnalysisError::NoData)
        );
    }
}
