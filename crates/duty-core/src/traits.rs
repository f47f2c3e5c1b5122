use async_trait::async_trait;

use crate::{RateRecord, TaxResult};

/// A jurisdiction-specific source of duty/VAT rates.
///
/// Implemented by the EU, US and UK provider clients and by the static
/// data-feed source. New jurisdictions are added by binding another
/// implementation to a country code in the aggregator.
#[async_trait]
pub trait RateSourceAdapter: Send + Sync {
    /// Short identifier recorded in rate provenance (e.g. `"EU_TARIC"`).
    fn name(&self) -> &str;

    /// Countries this source can answer for.
    fn countries(&self) -> Vec<String>;

    fn serves(&self, country: &str) -> bool {
        self.countries().iter().any(|c| c.eq_ignore_ascii_case(country))
    }

    /// Rates for a country, optionally narrowed to one harmonized code.
    /// Returns an empty list for countries the source does not serve.
    async fn fetch(&self, country: &str, code: Option<&str>) -> TaxResult<Vec<RateRecord>>;

    /// Best-effort re-sync with the provider. Failures are logged, not returned.
    async fn refresh(&self);

    async fn health_check(&self) -> bool;
}
