use serde::Serialize;
use crate::analytics::trends::AnalysisError;
use crate::data::types::Listing;

/// Bangkok city centre
pub const DEFAULT_CENTER: (f64, f64) = (13.7563, 100.5018);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub listing_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub property_type: String,
    pub location: String,
    pub price: f64,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center: (f64, f64),
    pub markers: Vec<MapMarker>,
}

/// Markers for geolocated listings whose location or type contains `search`
pub fn build_map_view(listings: &[Listing], search: &str) -> MapView {
    let needle = search.trim().to_lowercase();

    let markers: Vec<MapMarker> = listings
        .iter()
        .filter_map(|l| l.coordinates().map(|coords| (l, coords)))
        .filter(|(l, _)| {
            needle.is_empty()
                || l.location_contains(&needle)
                || l.property_type.as_str().to_lowercase().contains(&needle)
        })
        .map(|(l, (latitude, longitude))| MapMarker {
            listing_id: l.listing_id.clone(),
            latitude,
            longitude,
            property_type: l.property_type.as_str().to_string(),
            location: l.location.clone(),
            price: l.price,
            details: vec![
                format!("Size: {} sq.m", l.size_sq_m),
                format!("Bedrooms: {}", l.bedrooms),
                format!("Bathrooms: {}", l.bathrooms),
                format!("Furnished: {}", l.furnished),
            ],
        })
        .collect();

    MapView {
        center: center_of(&markers),
        markers,
    }
}

/// Like `build_map_view`, but an empty store or a search with no markers
/// is an error instead of an empty map
pub fn map_view(listings: &[Listing], search: &str) -> Result<MapView, AnalysisError> {
    if listings.is_empty() {
        return Err(AnalysisError::NoData);
    }

    let view = build_map_view(listings, search);
    if view.markers.is_empty() {
        let search = search.trim();
        return Err(if search.is_empty() {
            AnalysisError::NoData
        } else {
            AnalysisError::NoMatches(search.to_string())
        });
    }

    Ok(view)
}

fn center_of(markers: &[MapMarker]) -> (f64, f64) {
    if markers.is_empty() {
        return DEFAULT_CENTER;
    }

    let n = markers.len() as f64;
    let lat = markers.iter().map(|m| m.latitude).sum::<f64>() / n;
    let lng = markers.iter().map(|m| m.longitude).sum::<f64>() / n;
    (lat, lng)
}
