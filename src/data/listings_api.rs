use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::info;
use crate::data::source::{rows_to_listings, FetchRequest, ListingSource};
use crate::data::types::Listing;

/// Client for the hosted listings table (PostgREST interface)
pub struct RestListingsClient {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl RestListingsClient {
    pub fn new(base_url: String, api_key: String, table: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            table,
        })
    }

    /// Full request URL for a fetch
    pub fn listings_url(&self, request: &FetchRequest) -> String {
        let mut url = format!(
            "{}/rest/v1/{}?select=*&order=date_listed.desc",
            self.base_url, self.table
        );

        if request.geolocated_only {
            url.push_str("&latitude=not.is.null&longitude=not.is.null");
        }

        if let Some(limit) = request.limit {
            url.push_str(&format!("&limit={}", limit));
        }

        url
    }

    /// Fetch the most recent listings
    pub async fn fetch_listings(&self, request: &FetchRequest) -> Result<Vec<Listing>> {
        let url = self.listings_url(request);

        let response = self.client
            .get(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .context("Failed to fetch listings")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Listings store returned {}: {}", status, body);
        }

        let rows: Vec<serde_json::Value> = response
            .json()
            .await
            .context("Failed to parse listings response")?;

        let fetched = rows.len();
        let listings = rows_to_listings(rows);

        info!(
            "Fetched {} listings ({} usable) for {}",
            fetched,
            listings.len(),
            request.purpose.as_str()
        );

        Ok(listings)
    }
}

#[async_trait]
impl ListingSource for RestListingsClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Listing>> {
        self.fetch_listings(request).await
    }

    fn name(&self) -> &str {
        "rest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::FetchPurpose;

    fn client() -> RestListingsClient {
        RestListingsClient::new(
            "https://example.supabase.co/".to_string(),
            "anon".to_string(),
            "realestatelistings".to_string(),
            10,
        )
        .unwrap()
    }

    #[test]
    fn test_listings_url_recent() {
        let url = client().listings_url(&FetchRequest::recent(FetchPurpose::Estimate, 200));
        assert_eq!(
            url,
            "https://example.supabase.co/rest/v1/realestatelistings?select=*&order=date_listed.desc&limit=200"
        );
    }

    #[test]
    fn test_listings_url_geolocated_without_limit() {
        let request = FetchRequest {
            purpose: FetchPurpose::Map,
            limit: None,
            geolocated_only: true,
        };
        let url = client().listings_url(&request);
        assert!(url.ends_with("&latitude=not.is.null&longitude=not.is.null"));
        assert!(!url.contains("limit="));
    }
}
