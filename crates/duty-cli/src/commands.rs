use std::path::Path;

use anyhow::{Context, Result};
use duty_core::{Product, TaxCalculation};
use serde::Serialize;
use serde_json::Value;
use tax_engine::TaxEngine;

pub fn load_product(path: &Path) -> Result<Product> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a product JSON object", path.display()))
}

pub fn load_products(path: &Path) -> Result<Vec<Product>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a JSON array of products", path.display()))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("failed to serialize output")
}

pub async fn calculate(engine: &TaxEngine, product: &Path, country: &str, summary: bool) -> Result<Value> {
    let product = load_product(product)?;
    let result = engine
        .calculate(&product, country)
        .await
        .with_context(|| format!("calculation for product '{}' failed", product.id))?;

    if summary {
        to_json(&TaxCalculation::from(&result))
    } else {
        to_json(&result)
    }
}

pub async fn batch(engine: &TaxEngine, products: &Path, country: &str, summary: bool) -> Result<Value> {
    let products = load_products(products)?;
    let results = engine.calculate_batch(&products, country).await;

    if summary {
        let rows: Vec<TaxCalculation> = results.iter().map(TaxCalculation::from).collect();
        to_json(&rows)
    } else {
        to_json(&results)
    }
}

pub async fn stats(engine: &TaxEngine) -> Result<Value> {
    to_json(&engine.service_stats().await)
}

pub async fn refresh(engine: &TaxEngine) -> Result<Value> {
    engine.update_tax_rates().await;
    stats(engine).await
}

pub fn classify(engine: &TaxEngine, title: &str) -> Result<Value> {
    let classification = engine.classifier().classify(title);
    let info = classification
        .suggested_code
        .as_deref()
        .and_then(|code| engine.classifier().lookup(code));

    Ok(serde_json::json!({
        "title": title,
        "classification": to_json(&classification)?,
        "code": to_json(&info)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use duty_core::{RateRecord, SourceInfo, Thresholds};
    use rate_aggregator::{RateAggregator, RateCache};
    use rate_sources::StaticRateSource;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use std::sync::Arc;
    use tax_engine::EngineConfig;

    fn engine() -> TaxEngine {
        let record = RateRecord {
            id: "de".into(),
            country: "DE".into(),
            hs_code: String::new(),
            duty_rate: None,
            vat_rate: Some(dec!(0.19)),
            thresholds: Thresholds::new(dec!(150), dec!(22)),
            effective_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            expiry_date: None,
            source: SourceInfo::local("DE"),
            notes: None,
        };
        let aggregator = RateAggregator::new(RateCache::default())
            .with_source(Arc::new(StaticRateSource::new("FEED", vec![record])));
        TaxEngine::new(EngineConfig::default(), aggregator).unwrap()
    }

    fn write_json(value: Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", value).unwrap();
        file
    }

    #[tokio::test]
    async fn test_calculate_from_file() {
        let file = write_json(serde_json::json!({
            "id": "sku-1",
            "title": "Smartphone",
            "price": "999",
            "currency": "USD",
            "hs_code": "8517.12.00.00"
        }));

        let output = calculate(&engine(), file.path(), "DE", false).await.unwrap();
        assert_eq!(output["calculation"]["total_tax"], "249.25");
        assert_eq!(output["product"]["hs_code"], "8517120000");

        let output = calculate(&engine(), file.path(), "DE", true).await.unwrap();
        assert_eq!(output["product_id"], "sku-1");
        assert_eq!(output["exempt"], false);
    }

    #[tokio::test]
    async fn test_batch_keeps_failures_in_place() {
        let file = write_json(serde_json::json!([
            { "id": "a", "title": "Mug", "price": 12, "currency": "USD" },
            { "id": "b", "title": "Mug", "price": 12, "currency": "USD", "hs_code": "12ab" }
        ]));

        let output = batch(&engine(), file.path(), "DE", false).await.unwrap();
        let rows = output.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["confidence"], 0.0);
        assert!(rows[1]["warnings"][0].as_str().unwrap().contains("Invalid HS code"));
    }

    #[tokio::test]
    async fn test_refresh_reports_empty_cache() {
        let engine = engine();
        let file = write_json(serde_json::json!({
            "id": "sku-1", "title": "Smartphone", "price": "999", "currency": "USD"
        }));
        calculate(&engine, file.path(), "DE", true).await.unwrap();
        assert_eq!(stats(&engine).await.unwrap()["cache_size"], 1);

        let output = refresh(&engine).await.unwrap();
        assert_eq!(output["cache_size"], 0);
        assert_eq!(output["health"]["DE"], true);
    }

    #[test]
    fn test_malformed_input_reports_path() {
        let file = write_json(serde_json::json!({ "id": "x" }));
        let err = load_product(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("not a product JSON object"));
    }

    #[test]
    fn test_classify_output() {
        let output = classify(&engine(), "Leather handbag").unwrap();
        assert_eq!(output["classification"]["category"], "bags");
        assert_eq!(output["code"]["code"], "4202210000");
    }
}
