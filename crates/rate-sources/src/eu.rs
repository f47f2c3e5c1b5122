//! EU customs rate source.
//!
//! Serves all member states from one provider. When the provider cannot be
//! reached the source answers from a built-in VAT table so a calculation
//! still completes (with lower reliability).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duty_core::{RateRecord, RateSourceAdapter, SourceInfo, TaxError, TaxResult, Thresholds};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use crate::config::http_client;
use crate::parse::RawRate;

pub const SOURCE_NAME: &str = "EU_TARIC";
const SCHEMA_VERSION: &str = "eu-rates/v1";
const LIVE_RELIABILITY: f64 = 0.95;
const FALLBACK_RELIABILITY: f64 = 0.6;

pub const EU_MEMBER_STATES: &[&str] = &[
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE", "IT",
    "LV", "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE",
];

/// Standard VAT rates in basis points.
const EU_STANDARD_VAT_BPS: &[(&str, u32)] = &[
    ("AT", 2000), ("BE", 2100), ("BG", 2000), ("HR", 2500), ("CY", 1900), ("CZ", 2100),
    ("DK", 2500), ("EE", 2400), ("FI", 2550), ("FR", 2000), ("DE", 1900), ("GR", 2400),
    ("HU", 2700), ("IE", 2300), ("IT", 2200), ("LV", 2100), ("LT", 2100), ("LU", 1700),
    ("MT", 1800), ("NL", 2100), ("PL", 2300), ("PT", 2300), ("RO", 1900), ("SK", 2300),
    ("SI", 2200), ("ES", 2100), ("SE", 2500),
];

/// Customs duty relief below €150, import VAT relief at €22.
pub fn eu_thresholds() -> Thresholds {
    Thresholds::new(Decimal::from(150), Decimal::from(22))
}

/// Built-in standard VAT rate of a member state.
pub fn standard_vat_rate(country: &str) -> Option<Decimal> {
    standard_vat(EU_STANDARD_VAT_BPS, country)
}

pub fn is_member_state(country: &str) -> bool {
    EU_MEMBER_STATES.iter().any(|c| c.eq_ignore_ascii_case(country))
}

pub(crate) fn standard_vat(table: &[(&str, u32)], country: &str) -> Option<Decimal> {
    table
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(country))
        .map(|(_, bps)| Decimal::new(*bps as i64, 4))
}

/// Provider response: one country, its VAT rate and the matching measures.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RatesResponse {
    #[serde(default)]
    pub vat_standard: Option<RawRate>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub measures: Vec<Measure>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Measure {
    pub goods_code: String,
    pub duty: RawRate,
    #[serde(default)]
    pub description: Option<String>,
}

/// Map a provider response into rate records.
pub(crate) fn map_rates_response(
    response: RatesResponse,
    country: &str,
    source: &str,
    reliability: f64,
    thresholds: &Thresholds,
) -> Vec<RateRecord> {
    // last_updated is the sync time; the provider's own date becomes the effective date.
    let synced = Utc::now();
    let effective_date = response.updated_at.unwrap_or(synced).date_naive();
    let provenance = SourceInfo {
        country: country.to_string(),
        source: source.to_string(),
        last_updated: synced,
        version: SCHEMA_VERSION.to_string(),
        reliability,
    };

    let vat = response.vat_standard.as_ref().map(RawRate::normalize);
    let vat_rate = vat.as_ref().map(|v| v.rate);
    let vat_note = vat.and_then(|v| v.note);

    let record = |id: String, hs_code: String, duty_rate: Option<Decimal>, notes: Option<String>| RateRecord {
        id,
        country: country.to_string(),
        hs_code,
        duty_rate,
        vat_rate,
        thresholds: thresholds.clone(),
        effective_date,
        expiry_date: None,
        source: provenance.clone(),
        notes,
    };

    if response.measures.is_empty() {
        return vec![record(
            format!("{}-{}-general", source.to_lowercase(), country),
            String::new(),
            None,
            vat_note,
        )];
    }

    response
        .measures
        .into_iter()
        .map(|m| {
            let code: String = m.goods_code.chars().filter(|c| c.is_ascii_digit()).collect();
            let duty = m.duty.normalize();
            let notes = [duty.note, vat_note.clone(), m.description]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>();
            record(
                format!("{}-{}-{}", source.to_lowercase(), country, code),
                code,
                Some(duty.rate),
                if notes.is_empty() { None } else { Some(notes.join("; ")) },
            )
        })
        .collect()
}

/// Built-in record used when the provider is unreachable.
pub(crate) fn fallback_record(
    country: &str,
    source: &str,
    vat_rate: Decimal,
    thresholds: Thresholds,
    reliability: f64,
) -> RateRecord {
    let now = Utc::now();
    RateRecord {
        id: format!("{}-{}-fallback", source.to_lowercase(), country),
        country: country.to_string(),
        hs_code: String::new(),
        duty_rate: None,
        vat_rate: Some(vat_rate),
        thresholds,
        effective_date: now.date_naive(),
        expiry_date: None,
        source: SourceInfo {
            country: country.to_string(),
            source: source.to_string(),
            last_updated: now,
            version: "static".to_string(),
            reliability,
        },
        notes: Some("Provider unavailable; built-in standard VAT rate, no tariff-line duty".to_string()),
    }
}

pub struct EuRateSource {
    client: reqwest::Client,
    base_url: String,
}

impl EuRateSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_remote(&self, country: &str, code: Option<&str>) -> TaxResult<Vec<RateRecord>> {
        let url = format!("{}/rates/{}", self.base_url, country);
        let mut request = self.client.get(&url);
        if let Some(code) = code {
            request = request.query(&[("goods_code", code)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TaxError::api(e.to_string()).with_country(country))?;

        if !response.status().is_success() {
            return Err(TaxError::api(format!("HTTP {} from {}", response.status(), url))
                .with_country(country));
        }

        let body: RatesResponse = response
            .json()
            .await
            .map_err(|e| TaxError::api(format!("Invalid EU rates response: {}", e)).with_country(country))?;

        Ok(map_rates_response(body, country, SOURCE_NAME, LIVE_RELIABILITY, &eu_thresholds()))
    }

    fn fallback(&self, country: &str) -> Vec<RateRecord> {
        standard_vat(EU_STANDARD_VAT_BPS, country)
            .map(|vat| {
                vec![fallback_record(
                    country,
                    SOURCE_NAME,
                    vat,
                    eu_thresholds(),
                    FALLBACK_RELIABILITY,
                )]
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl RateSourceAdapter for EuRateSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn countries(&self) -> Vec<String> {
        EU_MEMBER_STATES.iter().map(|c| c.to_string()).collect()
    }

    async fn fetch(&self, country: &str, code: Option<&str>) -> TaxResult<Vec<RateRecord>> {
        if !self.serves(country) {
            return Ok(Vec::new());
        }
        let country = country.to_uppercase();

        match self.fetch_remote(&country, code).await {
            Ok(records) => {
                tracing::debug!("EU rates for {} ({:?}): {} records", country, code, records.len());
                Ok(records)
            }
            Err(e) => {
                tracing::warn!("EU rate provider failed for {}, using built-in rates: {}", country, e);
                Ok(self.fallback(&country))
            }
        }
    }

    async fn refresh(&self) {
        let mut failures = 0;
        for country in EU_MEMBER_STATES {
            if let Err(e) = self.fetch_remote(country, None).await {
                failures += 1;
                tracing::debug!("EU refresh failed for {}: {}", country, e);
            }
        }
        if failures > 0 {
            tracing::warn!("EU rate refresh: {}/{} countries failed", failures, EU_MEMBER_STATES.len());
        } else {
            tracing::info!("EU rate refresh complete");
        }
    }

    async fn health_check(&self) -> bool {
        match self.client.get(format!("{}/health", self.base_url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("EU rate provider health check failed: {}", e);
                false
            }
        }
    }
}
