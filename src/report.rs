use crate::analytics::comparison::ComparisonSummary;
use crate::analytics::map::MapView;
use crate::analytics::trends::MarketAnalysis;
use crate::estimation::types::{Estimate, MarketTrend};
use crate::forecast::model::Forecast;

/// "฿3,450,000"
pub fn thb(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if rounded < 0.0 {
        format!("-฿{}", grouped)
    } else {
        format!("฿{}", grouped)
    }
}

fn trend_label(trend: MarketTrend) -> &'static str {
    match trend {
        MarketTrend::Increasing => "increasing",
        MarketTrend::Decreasing => "decreasing",
        MarketTrend::Stable => "stable",
    }
}

pub fn print_estimate(estimate: &Estimate) {
    println!("Estimated price: {}", thb(estimate.estimated_price));
    println!(
        "Range:           {} - {}",
        thb(estimate.price_range.low),
        thb(estimate.price_range.high)
    );
    println!("Confidence:      {}%", estimate.confidence);
    println!("Baseline:        {}", thb(estimate.baseline_price));

    let m = &estimate.multipliers;
    println!(
        "Multipliers:     location {:.2} | type {:.2} | age {:.2} | amenities {:.2} | furnished {:.2}",
        m.location, m.property_type, m.age, m.amenities, m.furnished
    );

    let i = &estimate.insights;
    println!(
        "Local market:    {} listings, {}/sq.m, {:+.1}% ({})",
        i.total_listings,
        thb(i.average_price_per_sqm),
        i.price_growth_pct,
        trend_label(i.market_trend)
    );

    if !estimate.comparables.is_empty() {
        println!("Comparables:");
        for l in &estimate.comparables {
            println!(
                "  {:<10} {:<10} {:<24} {:>6.0} sq.m  {}",
                l.listing_id,
                l.property_type.as_str(),
                l.location,
                l.size_sq_m,
                thb(l.price)
            );
        }
    }
}

pub fn print_analysis(analysis: &MarketAnalysis) {
    println!("Listings:        {}", analysis.total_listings);
    println!("Average price:   {}", thb(analysis.average_price));
    println!("Average / sq.m:  {}", thb(analysis.average_price_per_sqm));
    println!("Price index:     {:.1}", analysis.price_index);
    println!(
        "Change:          {:+.1}% ({})",
        analysis.price_change_pct,
        trend_label(analysis.market_trend)
    );

    println!("Monthly:");
    for point in &analysis.monthly {
        println!(
            "  {:<9} {:>4} listings  {}",
            point.month,
            point.listings,
            thb(point.average_price)
        );
    }

    println!("Top areas:");
    for area in &analysis.top_areas {
        println!(
            "  {:<24} {:>4} listings  {}  {:+.1}%",
            area.name,
            area.count,
            thb(area.average_price),
            area.price_change_pct
        );
    }
}

pub fn print_comparison(summary: &ComparisonSummary) {
    for row in &summary.rows {
        let age = row
            .age_years
            .map(|a| format!("{} yrs", a))
            .unwrap_or_else(|| "N/A".to_string());

        println!(
            "{:<10} {:<10} {:<20} {:>14} {:>6.0} sq.m {:>10}/sq.m {:>+6.1}%  {}bd/{}ba  {}  furnished {}",
            row.listing_id,
            row.property_type,
            row.location,
            thb(row.price),
            row.size_sq_m,
            thb(row.price_per_sqm),
            row.vs_average_pct,
            row.bedrooms,
            row.bathrooms,
            age,
            row.furnished
        );
    }

    let none = "-".to_string();
    println!(
        "Best value: {}  Largest: {}  Newest: {}",
        summary.best_value.as_ref().unwrap_or(&none),
        summary.largest.as_ref().unwrap_or(&none),
        summary.newest.as_ref().unwrap_or(&none)
    );
}

pub fn print_map(view: &MapView) {
    println!(
        "Centre: {:.4}, {:.4} ({} markers)",
        view.center.0,
        view.center.1,
        view.markers.len()
    );

    for marker in &view.markers {
        println!(
            "  {:<10} {:>9.4},{:>9.4}  {:<10} {:<20} {}  [{}]",
            marker.listing_id,
            marker.latitude,
            marker.longitude,
            marker.property_type,
            marker.location,
            thb(marker.price),
            marker.details.join(", ")
        );
    }
}

pub fn print_forecast(forecast: &Forecast) {
    for p in &forecast.predictions {
        println!(
            "{:<3} {:>14}  confidence {:.0}%  volatility {:.2}",
            p.period.as_str(),
            thb(p.price),
            p.confidence,
            p.volatility
        );
    }

    println!("Factors:");
    for f in &forecast.factors {
        println!("  {:<18} {:.2}  {:?}", f.name, f.weight, f.impact);
    }

    println!(
        "Risk: {:?} ({:.2}) - {}",
        forecast.risk.level,
        forecast.risk.score,
        forecast.risk.reasons.join(", ")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thb_grouping() {
        assert_eq!(thb(0.0), "฿0");
        assert_eq!(thb(999.4), "฿999");
        assert_eq!(thb(1_000.0), "฿1,000");
        assert_eq!(thb(3_450_000.0), "฿3,450,000");
        assert_eq!(thb(-12_500.0), "-฿12,500");
    }
}
