//! Rate aggregation: routes each country to its bound source, caches
//! lookups and arbitrates between competing records.

pub mod cache;

pub use cache::{CacheStats, RateCache};

use duty_core::{RateRecord, RateSourceAdapter, TaxError, TaxResult};
use rate_sources::{EuRateSource, SourceConfig, UkRateSource, UsRateSource};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub struct RateAggregator {
    sources: Vec<Arc<dyn RateSourceAdapter>>,
    /// Country code -> index into `sources`
    routes: HashMap<String, usize>,
    cache: RateCache,
}

impl RateAggregator {
    pub fn new(cache: RateCache) -> Self {
        Self {
            sources: Vec::new(),
            routes: HashMap::new(),
            cache,
        }
    }

    /// EU member states, US and UK/GB bound to their provider sources.
    pub fn with_default_sources(config: &SourceConfig, cache: RateCache) -> Self {
        Self::new(cache)
            .with_source(Arc::new(EuRateSource::new(config.eu_base_url.clone(), config.timeout)))
            .with_source(Arc::new(UsRateSource::new(config.us_base_url.clone(), config.timeout)))
            .with_source(Arc::new(UkRateSource::new(config.uk_base_url.clone(), config.timeout)))
    }

    /// Bind every country the source serves to it. A country already bound
    /// to another source is rebound to this one.
    pub fn with_source(mut self, source: Arc<dyn RateSourceAdapter>) -> Self {
        let index = self.sources.len();
        for country in source.countries() {
            let country = country.to_uppercase();
            if let Some(previous) = self.routes.insert(country.clone(), index) {
                tracing::warn!(
                    "{} rebound from {} to {}",
                    country,
                    self.sources[previous].name(),
                    source.name()
                );
            }
        }
        self.sources.push(source);
        self
    }

    pub fn countries(&self) -> Vec<String> {
        let mut countries: Vec<String> = self.routes.keys().cloned().collect();
        countries.sort();
        countries
    }

    fn source_for(&self, country: &str) -> TaxResult<&Arc<dyn RateSourceAdapter>> {
        self.routes
            .get(&country.to_uppercase())
            .map(|&i| &self.sources[i])
            .ok_or_else(|| {
                TaxError::rate_not_found(format!("No rate source bound for {}", country))
                    .with_country(country)
            })
    }

    /// Rates for a country and optional code, served from cache while fresh.
    pub async fn get_rates(&self, country: &str, code: Option<&str>) -> TaxResult<Vec<RateRecord>> {
        let source = self.source_for(country)?;

        if let Some(records) = self.cache.get(country, code) {
            tracing::debug!("Rate cache hit for {}:{}", country, code.unwrap_or("all"));
            return Ok(records);
        }

        tracing::debug!("Rate cache miss for {}:{}, querying {}", country, code.unwrap_or("all"), source.name());
        let records = source.fetch(country, code).await?;
        self.cache.put(country, code, records.clone());
        Ok(records)
    }

    /// Ask every source to re-sync with its provider, then drop the cached
    /// rates of the countries it serves so the next lookup refetches.
    pub async fn update_all(&self) {
        for source in &self.sources {
            tracing::info!("Refreshing rate source {}", source.name());
            source.refresh().await;
            for country in source.countries() {
                self.cache.invalidate_country(&country);
            }
        }
    }

    /// Health of the source bound to each country.
    pub async fn validate_all(&self) -> BTreeMap<String, bool> {
        let mut health = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            health.push(source.health_check().await);
        }

        self.routes
            .iter()
            .map(|(country, &i)| (country.clone(), health[i]))
            .collect()
    }

    /// Pick one record: an exact code match wins outright, otherwise the most
    /// reliable source (first one on ties). `None` means use jurisdiction defaults.
    pub fn select_best(
        records: &[RateRecord],
        code: Option<&str>,
        category: Option<&str>,
    ) -> Option<RateRecord> {
        if let Some(code) = code {
            if let Some(exact) = records.iter().find(|r| r.matches_code(code)) {
                tracing::debug!("Exact rate match {} for {}", exact.id, code);
                return Some(exact.clone());
            }
        }

        let best = records.iter().fold(None::<&RateRecord>, |best, record| match best {
            Some(b) if b.source.reliability >= record.source.reliability => Some(b),
            _ => Some(record),
        });

        if let Some(record) = best {
            tracing::debug!(
                "Selected {} (reliability {:.2}) for code {:?}, category {:?}",
                record.id,
                record.source.reliability,
                code,
                category
            );
        }
        best.cloned()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!("Rate cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn configure_cache(&mut self, enabled: bool, ttl_secs: i64) -> TaxResult<()> {
        self.cache.configure(enabled, ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use duty_core::{SourceInfo, TaxErrorKind, Thresholds};
    use rate_sources::StaticRateSource;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    fn record(id: &str, country: &str, code: &str, reliability: f64) -> RateRecord {
        RateRecord {
            id: id.into(),
            country: country.into(),
            hs_code: code.into(),
            duty_rate: Some(dec!(0.05)),
            vat_rate: Some(dec!(0.19)),
            thresholds: Thresholds::new(dec!(150), dec!(22)),
            effective_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            expiry_date: None,
            source: SourceInfo {
                country: country.into(),
                source: "TEST".into(),
                last_updated: Utc::now(),
                version: "1".into(),
                reliability,
            },
            notes: None,
        }
    }

    /// Counts fetches so cache behaviour is observable.
    struct CountingSource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl RateSourceAdapter for CountingSource {
        fn name(&self) -> &str {
            "COUNTING"
        }

        fn countries(&self) -> Vec<String> {
            vec!["AU".into()]
        }

        async fn fetch(&self, country: &str, _code: Option<&str>) -> TaxResult<Vec<RateRecord>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(vec![record("au", country, "", 0.8)])
        }

        async fn refresh(&self) {}

        async fn health_check(&self) -> bool {
            false
        }
    }

    /// VAT in basis points that moves when the source is refreshed.
    struct RepricingSource {
        vat_bps: AtomicU32,
    }

    #[async_trait]
    impl RateSourceAdapter for RepricingSource {
        fn name(&self) -> &str {
            "REPRICING"
        }

        fn countries(&self) -> Vec<String> {
            vec!["NZ".into()]
        }

        async fn fetch(&self, country: &str, _code: Option<&str>) -> TaxResult<Vec<RateRecord>> {
            let mut nz = record("nz", country, "", 0.8);
            nz.vat_rate = Some(Decimal::new(self.vat_bps.load(Ordering::SeqCst) as i64, 4));
            Ok(vec![nz])
        }

        async fn refresh(&self) {
            self.vat_bps.store(1500, Ordering::SeqCst);
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_exact_code_beats_reliability() {
        let records = vec![
            record("general", "DE", "", 0.99),
            record("exact", "DE", "8517120000", 0.3),
        ];
        let best = RateAggregator::select_best(&records, Some("8517120000"), None).unwrap();
        assert_eq!(best.id, "exact");
    }

    #[test]
    fn test_highest_reliability_without_exact_match() {
        let records = vec![
            record("low", "DE", "", 0.4),
            record("high", "DE", "6109100000", 0.9),
            record("tie", "DE", "", 0.9),
        ];
        let best = RateAggregator::select_best(&records, Some("8517120000"), Some("electronics")).unwrap();
        assert_eq!(best.id, "high");

        let best = RateAggregator::select_best(&records, None, None).unwrap();
        assert_eq!(best.id, "high");
    }

    #[test]
    fn test_empty_candidates() {
        assert!(RateAggregator::select_best(&[], Some("8517120000"), None).is_none());
    }

    #[tokio::test]
    async fn test_unbound_country_is_rate_not_found() {
        let aggregator = RateAggregator::new(RateCache::default());
        let err = aggregator.get_rates("ZZ", None).await.unwrap_err();
        assert_eq!(err.kind(), TaxErrorKind::RateNotFound);
        assert_eq!(err.context().country.as_deref(), Some("ZZ"));
    }

    #[tokio::test]
    async fn test_cached_lookups_skip_the_source() {
        let source = Arc::new(CountingSource { fetches: AtomicUsize::new(0) });
        let aggregator = RateAggregator::new(RateCache::default()).with_source(source.clone());

        aggregator.get_rates("AU", None).await.unwrap();
        aggregator.get_rates("au", None).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        aggregator.get_rates("AU", Some("6109100000")).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);

        let stats = aggregator.cache_stats();
        assert_eq!(stats.size, 2);
        assert!(stats.countries.contains("AU"));

        aggregator.clear_cache();
        aggregator.get_rates("AU", None).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_update_all_serves_refreshed_rates() {
        let source = Arc::new(RepricingSource { vat_bps: AtomicU32::new(1000) });
        let aggregator = RateAggregator::new(RateCache::default())
            .with_source(source.clone())
            .with_source(Arc::new(CountingSource { fetches: AtomicUsize::new(0) }));

        let before = aggregator.get_rates("NZ", Some("6109100000")).await.unwrap();
        assert_eq!(before[0].vat_rate, Some(dec!(0.10)));
        aggregator.get_rates("AU", None).await.unwrap();

        aggregator.update_all().await;
        assert_eq!(aggregator.cache_stats().size, 0);

        let after = aggregator.get_rates("NZ", Some("6109100000")).await.unwrap();
        assert_eq!(after[0].vat_rate, Some(dec!(0.15)));
    }

    #[tokio::test]
    async fn test_disabled_cache_always_fetches() {
        let source = Arc::new(CountingSource { fetches: AtomicUsize::new(0) });
        let aggregator = RateAggregator::new(RateCache::disabled()).with_source(source.clone());

        aggregator.get_rates("AU", None).await.unwrap();
        aggregator.get_rates("AU", None).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_validate_all_reports_each_country() {
        let feed = StaticRateSource::new("FEED", vec![record("nz", "NZ", "", 0.7)]);
        let aggregator = RateAggregator::new(RateCache::default())
            .with_source(Arc::new(CountingSource { fetches: AtomicUsize::new(0) }))
            .with_source(Arc::new(feed));

        let health = aggregator.validate_all().await;
        assert_eq!(health.get("AU"), Some(&false));
        assert_eq!(health.get("NZ"), Some(&true));
        assert_eq!(aggregator.countries(), vec!["AU", "NZ"]);
    }

    #[test]
    fn test_default_sources_bind_eu_us_uk() {
        let config = SourceConfig {
            eu_base_url: "http://127.0.0.1:9".into(),
            us_base_url: "http://127.0.0.1:9".into(),
            uk_base_url: None,
            timeout: std::time::Duration::from_secs(1),
        };
        let aggregator = RateAggregator::with_default_sources(&config, RateCache::default());
        let countries = aggregator.countries();
        for country in ["DE", "FR", "US", "UK", "GB"] {
            assert!(countries.contains(&country.to_string()), "{}", country);
        }
        assert_eq!(countries.len(), 27 + 3);
    }
}
