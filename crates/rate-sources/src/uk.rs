//! UK rate source.
//!
//! Placeholder until a UK Trade Tariff integration exists: answers from a
//! built-in table unless an endpoint speaking the EU response format is
//! configured, and falls back to the table when that endpoint fails.

use async_trait::async_trait;
use duty_core::{RateRecord, RateSourceAdapter, TaxError, TaxResult, Thresholds};
use rust_decimal::Decimal;
use std::time::Duration;

use crate::config::http_client;
use crate::eu::{fallback_record, map_rates_response, RatesResponse};

pub const SOURCE_NAME: &str = "UK_TARIFF";
const LIVE_RELIABILITY: f64 = 0.9;
const TABLE_RELIABILITY: f64 = 0.7;

/// Duty relief up to £135 equivalent; VAT is due from the first pound.
pub fn uk_thresholds() -> Thresholds {
    Thresholds::new(Decimal::from(135), Decimal::ZERO)
}

pub struct UkRateSource {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl UkRateSource {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    /// Table-only source.
    pub fn placeholder() -> Self {
        Self::new(None, Duration::from_secs(10))
    }

    fn table(&self, country: &str) -> Vec<RateRecord> {
        vec![fallback_record(
            country,
            SOURCE_NAME,
            Decimal::new(20, 2),
            uk_thresholds(),
            TABLE_RELIABILITY,
        )]
    }

    async fn fetch_remote(&self, base_url: &str, country: &str, code: Option<&str>) -> TaxResult<Vec<RateRecord>> {
        let mut request = self.client.get(format!("{}/rates/{}", base_url, country));
        if let Some(code) = code {
            request = request.query(&[("goods_code", code)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TaxError::api(e.to_string()).with_country(country))?;
        if !response.status().is_success() {
            return Err(TaxError::api(format!("HTTP {}", response.status())).with_country(country));
        }

        let body: RatesResponse = response
            .json()
            .await
            .map_err(|e| TaxError::api(format!("Invalid UK rates response: {}", e)).with_country(country))?;

        Ok(map_rates_response(body, country, SOURCE_NAME, LIVE_RELIABILITY, &uk_thresholds()))
    }
}

#[async_trait]
impl RateSourceAdapter for UkRateSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn countries(&self) -> Vec<String> {
        vec!["UK".to_string(), "GB".to_string()]
    }

    async fn fetch(&self, country: &str, code: Option<&str>) -> TaxResult<Vec<RateRecord>> {
        if !self.serves(country) {
            return Ok(Vec::new());
        }
        let country = country.to_uppercase();

        let Some(base_url) = &self.base_url else {
            return Ok(self.table(&country));
        };

        match self.fetch_remote(base_url, &country, code).await {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::warn!("UK rate provider failed, using built-in rates: {}", e);
                Ok(self.table(&country))
            }
        }
    }

    async fn refresh(&self) {
        let Some(base_url) = &self.base_url else {
            tracing::debug!("UK rate source has no endpoint; nothing to refresh");
            return;
        };
        match self.fetch_remote(base_url, "GB", None).await {
            Ok(_) => tracing::info!("UK rate refresh complete"),
            Err(e) => tracing::warn!("UK rate refresh failed: {}", e),
        }
    }

    async fn health_check(&self) -> bool {
        let Some(base_url) = &self.base_url else {
            return true;
        };
        match self.client.get(format!("{}/health", base_url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
