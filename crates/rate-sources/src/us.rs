//! US Harmonized Tariff Schedule rate source.
//!
//! No static fallback: tariff-line rates cannot be guessed safely, so any
//! provider failure is reported as `API_ERROR`.

use async_trait::async_trait;
use chrono::Utc;
use duty_core::{RateRecord, RateSourceAdapter, SourceInfo, TaxError, TaxResult, Thresholds};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use crate::config::http_client;
use crate::parse::normalize_rate;

pub const SOURCE_NAME: &str = "USITC_HTS";
const SCHEMA_VERSION: &str = "hts-reststop";
const RELIABILITY: f64 = 0.9;

/// Section 321 de-minimis value in USD.
pub const SECTION_321_LIMIT: u32 = 800;

pub fn us_thresholds() -> Thresholds {
    Thresholds::zero().with_special(Decimal::from(SECTION_321_LIMIT))
}

/// One row of the HTS search response.
#[derive(Debug, Clone, Deserialize)]
struct HtsRow {
    #[serde(default)]
    htsno: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    general: Option<String>,
}

fn provenance() -> SourceInfo {
    SourceInfo {
        country: "US".to_string(),
        source: SOURCE_NAME.to_string(),
        last_updated: Utc::now(),
        version: SCHEMA_VERSION.to_string(),
        reliability: RELIABILITY,
    }
}

fn map_hts_rows(rows: Vec<HtsRow>) -> Vec<RateRecord> {
    let source = provenance();
    let today = source.last_updated.date_naive();

    rows.into_iter()
        .filter_map(|row| {
            let code: String = row.htsno.chars().filter(|c| c.is_ascii_digit()).collect();
            if code.is_empty() {
                return None;
            }

            // Statistical suffix rows leave "general" blank and inherit the parent rate.
            let (duty_rate, rate_note) = match row.general.as_deref().map(str::trim) {
                Some(general) if !general.is_empty() => {
                    let normalized = normalize_rate(general);
                    (Some(normalized.rate), normalized.note)
                }
                _ => (None, Some("No general rate on this line".to_string())),
            };

            let notes = [rate_note, Some(row.description).filter(|d| !d.is_empty())]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>();

            Some(RateRecord {
                id: format!("usitc-{}", code),
                country: "US".to_string(),
                hs_code: code,
                duty_rate,
                vat_rate: Some(Decimal::ZERO),
                thresholds: us_thresholds(),
                effective_date: today,
                expiry_date: None,
                source: source.clone(),
                notes: if notes.is_empty() { None } else { Some(notes.join("; ")) },
            })
        })
        .collect()
}

fn general_record() -> RateRecord {
    let source = provenance();
    RateRecord {
        id: "usitc-general".to_string(),
        country: "US".to_string(),
        hs_code: String::new(),
        duty_rate: None,
        vat_rate: Some(Decimal::ZERO),
        thresholds: us_thresholds(),
        effective_date: source.last_updated.date_naive(),
        expiry_date: None,
        source,
        notes: Some("No federal consumption tax".to_string()),
    }
}

pub struct UsRateSource {
    client: reqwest::Client,
    base_url: String,
}

impl UsRateSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn search(&self, code: &str) -> TaxResult<Vec<RateRecord>> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("keyword", code)])
            .send()
            .await
            .map_err(|e| TaxError::api(format!("HTS request failed: {}", e)).with_country("US"))?;

        if !response.status().is_success() {
            return Err(TaxError::api(format!("HTTP {} from {}", response.status(), url))
                .with_country("US"));
        }

        let rows: Vec<HtsRow> = response
            .json()
            .await
            .map_err(|e| TaxError::api(format!("Invalid HTS response: {}", e)).with_country("US"))?;

        Ok(map_hts_rows(rows))
    }
}

#[async_trait]
impl RateSourceAdapter for UsRateSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn countries(&self) -> Vec<String> {
        vec!["US".to_string()]
    }

    async fn fetch(&self, country: &str, code: Option<&str>) -> TaxResult<Vec<RateRecord>> {
        if !self.serves(country) {
            return Ok(Vec::new());
        }

        match code {
            Some(code) => {
                let records = self.search(code).await?;
                tracing::debug!("HTS search for {} returned {} lines", code, records.len());
                Ok(records)
            }
            None => Ok(vec![general_record()]),
        }
    }

    async fn refresh(&self) {
        // The schedule is queried per code; a refresh only verifies reachability.
        if let Err(e) = self.search("8517").await {
            tracing::warn!("HTS refresh failed: {}", e);
        } else {
            tracing::info!("HTS refresh complete");
        }
    }

    async fn health_check(&self) -> bool {
        match self.client.get(format!("{}/health", self.base_url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("HTS health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duty_core::TaxErrorKind;
    use rust_decimal_macros::dec;

    fn unreachable_source() -> UsRateSource {
        UsRateSource::new("http://127.0.0.1:9", Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_transport_failure_is_api_error() {
        let err = unreachable_source()
            .fetch("US", Some("8517120000"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), TaxErrorKind::ApiError);
        assert_eq!(err.context().country.as_deref(), Some("US"));
    }

    #[tokio::test]
    async fn test_general_record_without_code() {
        let records = unreachable_source().fetch("us", None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_general());
        assert_eq!(records[0].vat_rate, Some(Decimal::ZERO));
        assert_eq!(records[0].thresholds.special, Some(dec!(800)));
    }

    #[tokio::test]
    async fn test_other_countries_are_empty() {
        assert!(unreachable_source().fetch("DE", Some("8517")).await.unwrap().is_empty());
    }

    #[test]
    fn test_map_hts_rows() {
        let rows: Vec<HtsRow> = serde_json::from_value(serde_json::json!([
            { "htsno": "8517.13.00.00", "description": "Smartphones", "general": "Free" },
            { "htsno": "6109.10.00", "description": "T-shirts of cotton", "general": "16.5%" },
            { "htsno": "6109.10.00.04", "description": "Men's", "general": "" },
            { "htsno": "0201.10.05", "description": "Beef", "general": "4.4¢/kg" },
            { "htsno": "", "description": "Heading text only" }
        ]))
        .unwrap();

        let records = map_hts_rows(rows);
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].hs_code, "8517130000");
        assert_eq!(records[0].duty_rate, Some(Decimal::ZERO));
        assert_eq!(records[1].duty_rate, Some(dec!(0.165)));
        assert_eq!(records[2].duty_rate, None);
        assert_eq!(records[3].duty_rate, Some(Decimal::ZERO));
        assert!(records[3].notes.as_deref().unwrap().contains("4.4¢/kg"));
        assert!(records.iter().all(|r| r.country == "US"));
    }
}
