use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use crate::config::CacheConfig;
use crate::data::source::{FetchPurpose, FetchRequest, ListingSource};
use crate::data::types::Listing;

pub struct ListingsCache {
    cache: DashMap<String, CachedBatch>,
    config: CacheConfig,
}

struct CachedBatch {
    listings: Arc<Vec<Listing>>,
    timestamp: Instant,
    ttl: Duration,
}

impl ListingsCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            cache: DashMap::new(),
            config,
        }
    }

    fn ttl_for(&self, purpose: FetchPurpose) -> Duration {
        let secs = match purpose {
            FetchPurpose::Estimate => self.config.ttl_estimate_secs,
            FetchPurpose::Trends => self.config.ttl_trends_secs,
            FetchPurpose::Comparison => self.config.ttl_comparison_secs,
            FetchPurpose::Map => self.config.ttl_map_secs,
        };
        Duration::from_secs(secs)
    }

    /// Insert a batch with a purpose-aware TTL
    pub fn insert(&self, request: &FetchRequest, listings: Arc<Vec<Listing>>) {
        let ttl = self.ttl_for(request.purpose);

        self.cache.insert(request.cache_key(), CachedBatch {
            listings,
            timestamp: Instant::now(),
            ttl,
        });
    }

    /// Get batch if not expired (evict on read)
    pub fn get(&self, request: &FetchRequest) -> Option<Arc<Vec<Listing>>> {
        let key = request.cache_key();
        self.cache.get(&key).and_then(|entry| {
            if entry.timestamp.elapsed() > entry.ttl {
                drop(entry); // Drop the read lock
                self.cache.remove(&key);
                None
            } else {
                Some(Arc::clone(&entry.listings))
            }
        })
    }

    /// Batches held, expired ones included until read
    fn len(&self) -> usize {
        self.cache.len()
    }
}

/// Any source, fronted by a `ListingsCache`
pub struct CachedSource<S> {
    inner: S,
    cache: ListingsCache,
}

impl<S: ListingSource> CachedSource<S> {
    pub fn new(inner: S, cache: ListingsCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<S: ListingSource> ListingSource for CachedSource<S> {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Listing>> {
        if let Some(hit) = self.cache.get(request) {
            debug!("Cache hit for {} ({})", request.purpose.as_str(), request.cache_key());
            return Ok(hit.as_ref().clone());
        }

        let listings = self.inner.fetch(request).await?;

        // Empty batches are not cached so a retry goes back to the store
        if !listings.is_empty() {
            self.cache.insert(request, Arc::new(listings.clone()));
            debug!(
                "Cached {} listings for {} ({} batches held)",
                listings.len(),
                request.purpose.as_str(),
                self.cache.len()
            );
        }

        Ok(listings)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::tests::listing;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    struct CountingSource {
        calls: AtomicUsize,
        listings: Vec<Listing>,
    }

    #[async_trait]
    impl ListingSource for CountingSource {
        async fn fetch(&self, _request: &FetchRequest) -> Result<Vec<Listing>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.listings.clone())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn short_ttls() -> CacheConfig {
        CacheConfig {
            ttl_estimate_secs: 300,
            ttl_trends_secs: 300,
            ttl_comparison_secs: 300,
            ttl_map_secs: 0,
        }
    }

    #[test]
    fn test_cache_insert_and_get() {
        let cache = ListingsCache::new(short_ttls());
        let request = FetchRequest::recent(FetchPurpose::Estimate, 200);
        let batch = Arc::new(vec![listing("1", "Bangkok", 1.0, 1.0, "2024-01-01")]);

        cache.insert(&request, batch);

        assert_eq!(cache.get(&request).map(|b| b.len()), Some(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_ttl_expiration() {
        let cache = ListingsCache::new(short_ttls());
        let request = FetchRequest {
            purpose: FetchPurpose::Map,
            limit: None,
            geolocated_only: true,
        };

        cache.insert(&request, Arc::new(Vec::new()));

        // Zero TTL: anything older than now is stale
        thread::sleep(Duration::from_millis(10));

        assert!(cache.get(&request).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_cached_source_fetches_once() {
        let inner = CountingSource {
            calls: AtomicUsize::new(0),
            listings: vec![listing("1", "Bangkok", 3_000_000.0, 50.0, "2024-01-01")],
        };
        let source = CachedSource::new(inner, ListingsCache::new(short_ttls()));
        let request = FetchRequest::recent(FetchPurpose::Estimate, 200);

        source.fetch(&request).await.unwrap();
        source.fetch(&request).await.unwrap();

        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_source_does_not_cache_empty() {
        let inner = CountingSource {
            calls: AtomicUsize::new(0),
            listings: Vec::new(),
        };
        let source = CachedSource::new(inner, ListingsCache::new(short_ttls()));
        let request = FetchRequest::recent(FetchPurpose::Trends, 500);

        source.fetch(&request).await.unwrap();
        source.fetch(&request).await.unwrap();

        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(source.cache.len(), 0);
    }
}
