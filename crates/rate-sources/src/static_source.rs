//! In-memory rate source backed by a fixed list of records, e.g. a JSON
//! data feed exported from a tariff database.

use async_trait::async_trait;
use duty_core::{RateRecord, RateSourceAdapter, TaxError, TaxResult};
use std::path::Path;

pub struct StaticRateSource {
    name: String,
    records: Vec<RateRecord>,
}

impl StaticRateSource {
    pub fn new(name: impl Into<String>, records: Vec<RateRecord>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    /// Load a JSON array of rate records.
    pub fn from_json_file(name: impl Into<String>, path: impl AsRef<Path>) -> TaxResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            TaxError::validation(format!("Cannot read rate feed {}: {}", path.display(), e))
        })?;
        let records: Vec<RateRecord> = serde_json::from_str(&text).map_err(|e| {
            TaxError::validation(format!("Invalid rate feed {}: {}", path.display(), e))
        })?;
        tracing::info!("Loaded {} rate records from {}", records.len(), path.display());
        Ok(Self::new(name, records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RateSourceAdapter for StaticRateSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn countries(&self) -> Vec<String> {
        let mut countries: Vec<String> = Vec::new();
        for record in &self.records {
            let country = record.country.to_uppercase();
            if !countries.contains(&country) {
                countries.push(country);
            }
        }
        countries
    }

    /// Records for the country; with a code, the exact-code and general records.
    async fn fetch(&self, country: &str, code: Option<&str>) -> TaxResult<Vec<RateRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.country.eq_ignore_ascii_case(country))
            .filter(|r| match code {
                Some(code) => r.is_general() || r.hs_code == code,
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn refresh(&self) {
        tracing::debug!("{}: static source, nothing to refresh", self.name);
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use duty_core::{SourceInfo, Thresholds};
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn record(country: &str, code: &str) -> RateRecord {
        RateRecord {
            id: format!("{}-{}", country, code),
            country: country.to_string(),
            hs_code: code.to_string(),
            duty_rate: Some(dec!(0.05)),
            vat_rate: Some(dec!(0.10)),
            thresholds: Thresholds::new(dec!(100), dec!(50)),
            effective_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            expiry_date: None,
            source: SourceInfo {
                country: country.to_string(),
                source: "FEED".to_string(),
                last_updated: Utc::now(),
                version: "1".to_string(),
                reliability: 0.8,
            },
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_filters_by_country_and_code() {
        let source = StaticRateSource::new(
            "FEED",
            vec![record("AU", ""), record("AU", "6109100000"), record("AU", "8517120000"), record("NZ", "")],
        );

        assert_eq!(source.countries(), vec!["AU", "NZ"]);
        assert_eq!(source.fetch("AU", None).await.unwrap().len(), 3);

        let narrowed = source.fetch("au", Some("6109100000")).await.unwrap();
        assert_eq!(narrowed.len(), 2);
        assert!(narrowed.iter().any(|r| r.is_general()));

        assert!(source.fetch("CA", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_from_json_file() {
        let records = vec![record("CA", "")];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&records).unwrap().as_bytes()).unwrap();

        let source = StaticRateSource::from_json_file("FEED", file.path()).unwrap();
        assert_eq!(source.len(), 1);
        assert!(source.serves("CA"));
        assert!(source.health_check().await);
    }

    #[test]
    fn test_from_missing_file() {
        assert!(StaticRateSource::from_json_file("FEED", "/nonexistent/rates.json").is_err());
    }
}
