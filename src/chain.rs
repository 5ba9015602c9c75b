//! Ordered fallback over quote sources for a single indicator.

use std::time::Duration;

use chrono::Utc;
use log::{info, warn};

use crate::cache::StalenessCache;
use crate::datasources::{QuoteResult, QuoteSource};
use crate::error::{AdapterFailure, TotalFailure};
use crate::indicator::Indicator;

pub const CACHED_SUFFIX: &str = " (cached)";

/// Sources for one indicator in priority order. Position is the only priority.
pub struct FallbackChain {
    indicator: Indicator,
    sources: Vec<Box<dyn QuoteSource>>,
    freshness_window: Option<Duration>,
}

/// A result from a live source or, when every source failed, from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSuccess {
    pub result: QuoteResult,
    /// Sources that failed before the result was found.
    pub failures: Vec<AdapterFailure>,
    pub cached: bool,
}

impl FallbackChain {
    /// `freshness_window` of `None` disables the cache fallback for this chain.
    pub fn new(
        indicator: Indicator,
        sources: Vec<Box<dyn QuoteSource>>,
        freshness_window: Option<Duration>,
    ) -> FallbackChain {
        FallbackChain {
            indicator,
            sources,
            freshness_window,
        }
    }

    pub fn indicator(&self) -> Indicator {
        self.indicator
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Tries each source in turn and returns the first success.
    ///
    /// Sources are never raced; later ones are only called after every earlier one has
    /// failed. Each success overwrites the indicator's cache slot. Once all sources have
    /// failed a cache entry younger than the freshness window is served with
    /// [`CACHED_SUFFIX`] appended to its source label.
    pub async fn run(&self, cache: &StalenessCache) -> Result<ChainSuccess, TotalFailure> {
        let mut failures = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            match source.attempt().await {
                Ok(result) => {
                    info!(
                        "{}: {} from '{}'",
                        self.indicator, result.price, result.source
                    );
                    cache.put(self.indicator, result.clone(), Utc::now()).await;
                    return Ok(ChainSuccess {
                        result,
                        failures,
                        cached: false,
                    });
                }
                Err(e) => {
                    warn!("{}: source '{}' failed: {}", self.indicator, source.label(), e);
                    failures.push(AdapterFailure {
                        source_label: source.label().to_owned(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Some(window) = self.freshness_window {
            if let Some(entry) = cache.get(self.indicator).await {
                let now = Utc::now();
                if entry.is_fresh(now, window) {
                    info!(
                        "{}: all sources failed, serving cache entry aged {}s",
                        self.indicator,
                        entry.age_millis(now) / 1000
                    );
                    let mut result = entry.result;
                    result.source.push_str(CACHED_SUFFIX);
                    return Ok(ChainSuccess {
                        result,
                        failures,
                        cached: true,
                    });
                }
                info!("{}: cache entry is stale", self.indicator);
            }
        }

        warn!("{}: all {} sources failed", self.indicator, failures.len());
        Err(TotalFailure {
            indicator: self.indicator,
            failures,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::error::FetchError;

    /// Fake source that counts calls and returns a canned outcome.
    pub(crate) struct FakeSource {
        label: String,
        outcome: Result<Decimal, FetchError>,
        pub(crate) calls: Arc<AtomicUsize>,
    }

    impl FakeSource {
        pub(crate) fn ok(label: &str, price: i64) -> FakeSource {
            FakeSource {
                label: label.to_owned(),
                outcome: Ok(Decimal::from(price)),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub(crate) fn failing(label: &str) -> FakeSource {
            FakeSource {
                label: label.to_owned(),
                outcome: Err(FetchError::data_shape(label, "price is not numeric: \".\"")),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl QuoteSource for FakeSource {
        fn label(&self) -> &str {
            &self.label
        }

        async fn attempt(&self) -> Result<QuoteResult, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
                .clone()
                .map(|price| QuoteResult::new(price, None, &self.label))
        }
    }

    fn chain_of(
        sources: Vec<FakeSource>,
        window: Option<Duration>,
    ) -> (FallbackChain, Vec<Arc<AtomicUsize>>) {
        let counters = sources.iter().map(|s| s.calls.clone()).collect();
        let boxed = sources
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn QuoteSource>)
            .collect();
        (FallbackChain::new(Indicator::Vix, boxed, window), counters)
    }

    fn calls(counters: &[Arc<AtomicUsize>]) -> Vec<usize> {
        counters.iter().map(|c| c.load(Ordering::SeqCst)).collect()
    }

    const TWO_HOURS: Duration = Duration::from_secs(2 * 3600);

    #[tokio::test]
    async fn test_first_success_stops_the_chain() {
        let (chain, counters) = chain_of(
            vec![
                FakeSource::failing("a"),
                FakeSource::ok("b", 15),
                FakeSource::ok("c", 16),
            ],
            Some(TWO_HOURS),
        );
        let cache = StalenessCache::new();

        let success = chain.run(&cache).await.unwrap();

        assert_eq!(success.result.source, "b");
        assert_eq!(success.result.price, Decimal::from(15));
        assert!(!success.cached);
        assert_eq!(success.failures.len(), 1);
        assert_eq!(success.failures[0].source_label, "a");
        assert_eq!(calls(&counters), vec![1, 1, 0]);
    }

    #[tokio::test]
    async fn test_healthy_primary_is_always_preferred() {
        let (chain, counters) = chain_of(
            vec![FakeSource::ok("a", 14), FakeSource::ok("b", 15)],
            None,
        );
        let success = chain.run(&StalenessCache::new()).await.unwrap();
        assert_eq!(success.result.source, "a");
        assert!(success.failures.is_empty());
        assert_eq!(calls(&counters), vec![1, 0]);
    }

    #[tokio::test]
    async fn test_success_is_written_to_cache() {
        let (chain, _) = chain_of(vec![FakeSource::ok("a", 14)], Some(TWO_HOURS));
        let cache = StalenessCache::new();
        chain.run(&cache).await.unwrap();

        let entry = cache.get(Indicator::Vix).await.unwrap();
        assert_eq!(entry.result.source, "a");
        assert!(entry.is_fresh(Utc::now(), TWO_HOURS));
    }

    #[tokio::test]
    async fn test_fresh_cache_served_after_total_failure() {
        let (chain, counters) = chain_of(
            vec![FakeSource::failing("a"), FakeSource::failing("b")],
            Some(TWO_HOURS),
        );
        let cache = StalenessCache::new();
        let cached = QuoteResult::new(Decimal::from(17), Some(Decimal::from(3)), "FRED VIXCLS (daily close)");
        cache
            .put(Indicator::Vix, cached.clone(), Utc::now() - chrono::Duration::minutes(30))
            .await;

        let success = chain.run(&cache).await.unwrap();

        assert!(success.cached);
        assert_eq!(success.result.source, "FRED VIXCLS (daily close) (cached)");
        assert_eq!(
            success.result,
            QuoteResult {
                source: format!("{}{}", cached.source, CACHED_SUFFIX),
                ..cached
            }
        );
        assert_eq!(success.failures.len(), 2);
        assert_eq!(calls(&counters), vec![1, 1]);
    }

    #[tokio::test]
    async fn test_stale_cache_is_total_failure() {
        let (chain, _) = chain_of(
            vec![FakeSource::failing("a"), FakeSource::failing("b"), FakeSource::failing("c")],
            Some(TWO_HOURS),
        );
        let cache = StalenessCache::new();
        cache
            .put(
                Indicator::Vix,
                QuoteResult::new(Decimal::from(17), None, "a"),
                Utc::now() - chrono::Duration::hours(2),
            )
            .await;

        let failure = chain.run(&cache).await.unwrap_err();
        assert_eq!(failure.indicator, Indicator::Vix);
        assert_eq!(failure.failures.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_cache_is_total_failure() {
        let (chain, _) = chain_of(
            vec![FakeSource::failing("a"), FakeSource::failing("b")],
            Some(TWO_HOURS),
        );
        let failure = chain.run(&StalenessCache::new()).await.unwrap_err();
        assert_eq!(
            failure
                .failures
                .iter()
                .map(|f| f.source_label.as_str())
                .collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[tokio::test]
    async fn test_cache_ignored_without_window() {
        let (chain, _) = chain_of(vec![FakeSource::failing("a")], None);
        let cache = StalenessCache::new();
        cache
            .put(Indicator::Vix, QuoteResult::new(Decimal::from(17), None, "a"), Utc::now())
            .await;
        assert!(chain.run(&cache).await.is_err());
    }

    #[tokio::test]
    async fn test_cache_entry_is_not_modified_by_serving() {
        let (chain, _) = chain_of(vec![FakeSource::failing("a")], Some(TWO_HOURS));
        let cache = StalenessCache::new();
        cache
            .put(Indicator::Vix, QuoteResult::new(Decimal::from(17), None, "a"), Utc::now())
            .await;
        chain.run(&cache).await.unwrap();
        chain.run(&cache).await.unwrap();
        assert_eq!(cache.get(Indicator::Vix).await.unwrap().result.source, "a");
    }
}
