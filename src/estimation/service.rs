use chrono::{Datelike, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use crate::data::source::{FetchPurpose, FetchRequest, ListingSource};
use crate::estimation::heuristic::PriceEstimator;
use crate::estimation::types::{Estimate, EstimateError, Query};
use crate::estimation::validation::QueryForm;
use crate::monitoring::logger::CsvLogger;

/// Fetch, guard, estimate, log
pub struct EstimationService {
    source: Arc<dyn ListingSource>,
    estimator: PriceEstimator,
    fetch_limit: usize,
    logger: Option<CsvLogger>,
}

impl EstimationService {
    pub fn new(
        source: Arc<dyn ListingSource>,
        estimator: PriceEstimator,
        fetch_limit: usize,
        logger: Option<CsvLogger>,
    ) -> Self {
        Self {
            source,
            estimator,
            fetch_limit,
            logger,
        }
    }

    /// Validate a raw form and estimate it
    pub async fn estimate_form(&self, form: &QueryForm) -> Result<Estimate, EstimateError> {
        let current_year = Utc::now().year();
        let query = form.validate(current_year)?;
        self.estimate_query(&query, current_year).await
    }

    pub async fn estimate_query(
        &self,
        query: &Query,
        current_year: i32,
    ) -> Result<Estimate, EstimateError> {
        let request = FetchRequest::recent(FetchPurpose::Estimate, self.fetch_limit);

        let listings = match self.source.fetch(&request).await {
            Ok(listings) => listings,
            Err(e) => {
                warn!("Failed to fetch listings from {}: {:#}", self.source.name(), e);
                self.log_event(&format!("store error: {}", e));
                return Err(EstimateError::Store(e));
            }
        };

        // Never run the heuristic on an empty snapshot
        if listings.is_empty() {
            warn!("No market data available from {}", self.source.name());
            self.log_event(&format!("no data for {}", query.location));
            return Err(EstimateError::NoData);
        }

        info!("Analyzing {} listings for {}", listings.len(), query.location);

        let estimate = self.estimator.estimate_at(query, &listings, current_year)?;

        if let Some(logger) = &self.logger {
            if let Err(e) = logger.log_estimate(query, &estimate) {
                warn!("Failed to write estimate log {}: {}", logger.path(), e);
            }
        }

        Ok(estimate)
    }

    /// Estimate several forms; each result stands alone
    pub async fn estimate_batch(&self, forms: &[QueryForm]) -> Vec<Result<Estimate, EstimateError>> {
        let mut results = Vec::with_capacity(forms.len());
        for form in forms {
            results.push(self.estimate_form(form).await);
        }
        results
    }

    fn log_event(&self, event: &str) {
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.log_event(event) {
                warn!("Failed to write estimate log {}: {}", logger.path(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EstimatorConfig;
    use crate::data::source::tests::listing;
    use crate::data::source::MemorySource;
    use crate::data::types::{Furnishing, Listing, PropertyType};
    use crate::estimation::validation::ValidationError;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct FailingSource;

    #[async_trait]
    impl ListingSource for FailingSource {
        async fn fetch(&self, _request: &FetchRequest) -> anyhow::Result<Vec<Listing>> {
            Err(anyhow!("connection refused"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn service(source: Arc<dyn ListingSource>) -> EstimationService {
        EstimationService::new(source, PriceEstimator::new(EstimatorConfig::default()), 200, None)
    }

    fn query() -> Query {
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

    #[tokio::test]
    async fn test_empty_store_reports_no_data() {
        let svc = service(Arc::new(MemorySource::new(Vec::new())));
        let result = svc.estimate_query(&query(), 2026).await;
        assert!(matches!(result, Err(EstimateError::NoData)));
    }

    #[tokio::test]
    async fn test_store_failure_is_retryable() {
        let svc = service(Arc::new(FailingSource));
        let err = svc.estimate_query(&query(), 2026).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_estimate_from_source() {
        let svc = service(Arc::new(MemorySource::new(vec![
            listing("a", "Bangkok", 3_000_000.0, 50.0, "2024-01-01"),
            listing("b", "Bangkok", 3_600_000.0, 60.0, "2024-02-01"),
        ])));

        let est = svc.estimate_query(&query(), 2026).await.unwrap();
        assert_eq!(est.comparables.len(), 2);
        assert!((est.baseline_price - 60_000.0 * 50.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_invalid_form_is_rejected_before_fetch() {
        let svc = service(Arc::new(FailingSource));
        let form = QueryForm {
            location: "Bangkok".to_string(),
            area: "abc".to_string(),
            ..QueryForm::default()
        };

        // Validation fails first, so the failing store is never reached
        let err = svc.estimate_form(&form).await.unwrap_err();
        assert!(matches!(
            err,
            EstimateError::Validation(ValidationError::InvalidArea(_))
        ));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_batch_results_are_independent() {
        let svc = service(Arc::new(MemorySource::new(vec![listing(
            "a", "Phuket", 5_000_000.0, 100.0, "2024-01-01",
        )])));

        let good = QueryForm {
            location: "Phuket".to_string(),
            area: "80".to_string(),
            ..QueryForm::default()
        };
        let bad = QueryForm::default();

        let results = svc.estimate_batch(&[good, bad]).await;
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(EstimateError::Validation(ValidationError::MissingLocation))
        ));
    }
}
