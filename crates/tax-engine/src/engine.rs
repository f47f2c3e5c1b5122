//! Tax Calculation Engine
//!
//! Runs one (product, destination) pair through classification, rate
//! lookup and the duty/VAT state machine, producing an auditable result.

use chrono::Utc;
use duty_core::{
    CalculationStep, CalculationSummary, Exemption, ExemptionType, ExtendedTaxResult, Product,
    ProductSnapshot, RateRecord, SourceInfo, TaxError, TaxResult, Thresholds,
};
use hs_classifier::{normalize_code, validate_code, HsClassifier};
use rate_aggregator::{RateAggregator, RateCache};
use rate_sources::us::SECTION_321_LIMIT;
use rate_sources::SourceConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::EngineConfig;
use crate::currency::CurrencyConverter;
use crate::jurisdiction;

const BASE_CONFIDENCE: f64 = 0.5;
const CODE_BONUS: f64 = 0.2;
const RELIABILITY_WEIGHT: f64 = 0.3;
const CATEGORY_BONUS: f64 = 0.1;

/// Operational snapshot of the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStats {
    pub cache_size: usize,
    pub cached_countries: BTreeSet<String>,
    pub health: BTreeMap<String, bool>,
}

/// Resolved tariff identity of a product.
struct Resolution {
    hs_code: Option<String>,
    category: Option<String>,
}

/// Duty half of the state machine.
struct DutyOutcome {
    duty: Decimal,
    rate: Decimal,
}

/// VAT half of the state machine.
struct VatOutcome {
    vat: Decimal,
    rate: Decimal,
}

pub struct TaxEngine {
    config: EngineConfig,
    aggregator: RateAggregator,
    classifier: HsClassifier,
}

impl TaxEngine {
    /// Create an engine over an aggregator; the config's cache settings are
    /// pushed into the aggregator.
    pub fn new(config: EngineConfig, mut aggregator: RateAggregator) -> TaxResult<Self> {
        aggregator.configure_cache(config.cache.enabled, config.cache.ttl_seconds)?;
        Ok(Self {
            config,
            aggregator,
            classifier: HsClassifier::new(),
        })
    }

    /// Engine over the EU, US and UK provider sources.
    pub fn with_default_sources(config: EngineConfig, sources: &SourceConfig) -> TaxResult<Self> {
        let aggregator = RateAggregator::with_default_sources(sources, RateCache::default());
        Self::new(config, aggregator)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) -> TaxResult<()> {
        config
            .validate()
            .map_err(|e| TaxError::validation(format!("Invalid engine configuration: {:#}", e)))?;
        self.aggregator
            .configure_cache(config.cache.enabled, config.cache.ttl_seconds)?;
        self.config = config;
        tracing::info!("Engine configuration updated (base currency {})", self.config.base_currency);
        Ok(())
    }

    pub fn classifier(&self) -> &HsClassifier {
        &self.classifier
    }

    pub fn aggregator(&self) -> &RateAggregator {
        &self.aggregator
    }

    /// Calculate duty and VAT for one product shipped to `country`.
    pub async fn calculate(&self, product: &Product, country: &str) -> TaxResult<ExtendedTaxResult> {
        self.validate_input(product, country)?;
        let country = country.trim().to_uppercase();

        match self.run(product, &country).await {
            Ok(result) => {
                tracing::info!(
                    "Tax for {} to {}: duty {} vat {} total {} {} (confidence {:.2})",
                    product.id,
                    country,
                    result.calculation.duties,
                    result.calculation.vat,
                    result.calculation.total_tax,
                    result.calculation.base_currency,
                    result.confidence
                );
                Ok(result)
            }
            Err(e) => Err(escalate(e, &product.id, &country)),
        }
    }

    fn validate_input(&self, product: &Product, country: &str) -> TaxResult<()> {
        if product.id.trim().is_empty() {
            return Err(TaxError::invalid_product("Product has no id"));
        }

        let bounds = &self.config.validation;
        if product.price < bounds.min || product.price > bounds.max {
            return Err(TaxError::validation(format!(
                "Price {} outside allowed range [{}, {}]",
                product.price, bounds.min, bounds.max
            ))
            .with_product(&product.id));
        }
        if product.price.is_zero() && !bounds.allow_zero {
            return Err(TaxError::validation("Zero price not allowed").with_product(&product.id));
        }

        if country.trim().is_empty() {
            return Err(TaxError::invalid_country("Destination country is empty").with_product(&product.id));
        }
        Ok(())
    }

    async fn run(&self, product: &Product, country: &str) -> TaxResult<ExtendedTaxResult> {
        let mut warnings = Vec::new();

        let converter = CurrencyConverter::new(&self.config.base_currency, &self.config.exchange_rates);
        let conversion = converter.to_base(product.price, &product.currency);
        warnings.extend(conversion.warning.clone());
        let price_base = conversion.amount;

        let resolution = self.resolve(product, &mut warnings)?;
        let code = resolution.hs_code.as_deref();
        let category = resolution.category.as_deref();

        let records = self.aggregator.get_rates(country, code).await?;
        let best = RateAggregator::select_best(&records, code, category);
        match (&best, code) {
            (None, _) => warnings.push(format!(
                "No specific rate found for {}; jurisdiction defaults used",
                country
            )),
            (Some(record), Some(code)) if !record.matches_code(code) => warnings.push(format!(
                "No exact rate for {} in {}; using rate record {}",
                code, country, record.id
            )),
            _ => {}
        }

        let thresholds = best
            .as_ref()
            .map(|r| r.thresholds.clone())
            .unwrap_or_else(|| jurisdiction::default_thresholds(country));

        let mut details = Vec::new();
        let mut exemptions = Vec::new();

        let duty = self.duty_step(
            price_base,
            country,
            &thresholds,
            best.as_ref(),
            category,
            &mut details,
            &mut exemptions,
            &mut warnings,
        );
        let vat = self.vat_step(
            price_base,
            duty.duty,
            country,
            &thresholds,
            best.as_ref(),
            &mut details,
            &mut exemptions,
        );

        let mut confidence = BASE_CONFIDENCE;
        if code.is_some() {
            confidence += CODE_BONUS;
        }
        if let Some(record) = &best {
            confidence += record.source.reliability * RELIABILITY_WEIGHT;
        }
        if category.is_some() {
            confidence += CATEGORY_BONUS;
        }
        let confidence = confidence.clamp(0.0, 1.0);

        let rounding = self.config.rounding;
        let duties = rounding.apply(duty.duty);
        let vat_amount = rounding.apply(vat.vat);

        let result = ExtendedTaxResult {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            product: ProductSnapshot::of(product, resolution.hs_code.clone(), resolution.category.clone()),
            country: country.to_string(),
            calculation: CalculationSummary {
                duties,
                vat: vat_amount,
                total_tax: duties + vat_amount,
                total_value: rounding.apply(price_base) + duties + vat_amount,
                taxable_value: price_base,
                duty_rate: duty.rate,
                vat_rate: vat.rate,
                exchange_rate: conversion.rate,
                base_currency: self.config.base_currency.clone(),
            },
            details,
            thresholds,
            exemptions,
            warnings,
            confidence,
            source: best
                .map(|r| r.source)
                .unwrap_or_else(|| SourceInfo::local(country)),
        };

        result.validate()?;
        Ok(result)
    }

    /// Supplied code (normalized and validated) or a classified one, plus a category.
    fn resolve(&self, product: &Product, warnings: &mut Vec<String>) -> TaxResult<Resolution> {
        let supplied = product
            .hs_code
            .as_deref()
            .map(normalize_code)
            .filter(|c| !c.is_empty());

        let resolution = match supplied {
            Some(code) => {
                if !validate_code(&code) {
                    return Err(TaxError::invalid_hscode(format!(
                        "'{}' is not a 6-10 digit harmonized code",
                        product.hs_code.as_deref().unwrap_or_default()
                    ))
                    .with_product(&product.id));
                }
                let category = product
                    .category
                    .clone()
                    .or_else(|| self.classifier.lookup(&code).map(|info| info.category));
                Resolution {
                    hs_code: Some(code),
                    category,
                }
            }
            None if !product.title.trim().is_empty() => {
                let classification = self.classifier.classify(&product.title);
                Resolution {
                    hs_code: classification.suggested_code,
                    category: product.category.clone().or(classification.category),
                }
            }
            None => Resolution {
                hs_code: None,
                category: product.category.clone(),
            },
        };

        if resolution.hs_code.is_none() {
            warnings.push(format!(
                "No HS code could be resolved for product {}; default duty rates apply",
                product.id
            ));
        }
        Ok(resolution)
    }

    #[allow(clippy::too_many_arguments)]
    fn duty_step(
        &self,
        price_base: Decimal,
        country: &str,
        thresholds: &Thresholds,
        best: Option<&RateRecord>,
        category: Option<&str>,
        details: &mut Vec<CalculationStep>,
        exemptions: &mut Vec<Exemption>,
        warnings: &mut Vec<String>,
    ) -> DutyOutcome {
        let base = &self.config.base_currency;
        let exempt = price_base <= thresholds.duty_free;
        details.push(
            CalculationStep::new(
                "duty_threshold_check",
                format!(
                    "Value {} {} compared with duty-free threshold {} {}",
                    price_base, base, thresholds.duty_free, base
                ),
                thresholds.duty_free,
            )
            .formula("taxable_value <= duty_free_threshold")
            .var("taxable_value", price_base)
            .var("duty_free_threshold", thresholds.duty_free)
            .applied(exempt),
        );

        if exempt {
            exemptions.push(Exemption::full(
                ExemptionType::DutyFree,
                format!("Value at or below the {} duty-free threshold", country),
            ));
            return DutyOutcome { duty: Decimal::ZERO, rate: Decimal::ZERO };
        }

        let section_321 = Decimal::from(SECTION_321_LIMIT);
        if country == "US" && price_base <= section_321 {
            details.push(
                CalculationStep::new(
                    "section_321_check",
                    format!("Value {} {} at or below the Section 321 limit of {}", price_base, base, section_321),
                    section_321,
                )
                .formula("taxable_value <= section_321_limit")
                .var("taxable_value", price_base)
                .var("section_321_limit", section_321),
            );
            exemptions.push(Exemption::full(
                ExemptionType::Section321,
                "Section 321 de minimis entry",
            ));
            return DutyOutcome { duty: Decimal::ZERO, rate: Decimal::ZERO };
        }

        let rate = match best.and_then(|r| r.duty_rate) {
            Some(rate) => rate,
            None => match category.and_then(|c| self.classifier.category_default_duty_rate(c)) {
                Some(rate) => rate,
                None => {
                    warnings.push("No duty rate for product category; general duty rate applied".to_string());
                    jurisdiction::general_duty_rate()
                }
            },
        };

        let duty = price_base * rate;
        details.push(
            CalculationStep::new(
                "duty_calculation",
                format!("Duty at {} on {} {}", rate, price_base, base),
                duty,
            )
            .formula("taxable_value × duty_rate")
            .var("taxable_value", price_base)
            .var("duty_rate", rate),
        );
        DutyOutcome { duty, rate }
    }

    #[allow(clippy::too_many_arguments)]
    fn vat_step(
        &self,
        price_base: Decimal,
        duty: Decimal,
        country: &str,
        thresholds: &Thresholds,
        best: Option<&RateRecord>,
        details: &mut Vec<CalculationStep>,
        exemptions: &mut Vec<Exemption>,
    ) -> VatOutcome {
        let base = &self.config.base_currency;

        if country == "US" {
            details.push(
                CalculationStep::new(
                    "vat_country_check",
                    "No federal consumption tax on US imports",
                    Decimal::ZERO,
                )
                .formula("vat = 0"),
            );
            return VatOutcome { vat: Decimal::ZERO, rate: Decimal::ZERO };
        }

        let exempt = price_base <= thresholds.vat_free;
        details.push(
            CalculationStep::new(
                "vat_threshold_check",
                format!(
                    "Value {} {} compared with VAT-free threshold {} {}",
                    price_base, base, thresholds.vat_free, base
                ),
                thresholds.vat_free,
            )
            .formula("taxable_value <= vat_free_threshold")
            .var("taxable_value", price_base)
            .var("vat_free_threshold", thresholds.vat_free)
            .applied(exempt),
        );

        if exempt {
            exemptions.push(Exemption::full(
                ExemptionType::VatFree,
                format!("Value at or below the {} VAT-free threshold", country),
            ));
            return VatOutcome { vat: Decimal::ZERO, rate: Decimal::ZERO };
        }

        let rate = best
            .and_then(|r| r.vat_rate)
            .unwrap_or_else(|| jurisdiction::vat_rate(country));
        let taxable_base = price_base + duty;
        let vat = taxable_base * rate;
        details.push(
            CalculationStep::new(
                "vat_calculation",
                format!("VAT at {} on duty-inclusive value {} {}", rate, taxable_base, base),
                vat,
            )
            .formula("(taxable_value + duty) × vat_rate")
            .var("taxable_value", price_base)
            .var("duty", duty)
            .var("taxable_base", taxable_base)
            .var("vat_rate", rate),
        );
        VatOutcome { vat, rate }
    }

    /// Trigger a refresh on every rate source; cached rates of refreshed
    /// countries are dropped.
    pub async fn update_tax_rates(&self) {
        self.aggregator.update_all().await;
    }

    pub fn clear_cache(&self) {
        self.aggregator.clear_cache();
    }

    pub async fn service_stats(&self) -> ServiceStats {
        let cache = self.aggregator.cache_stats();
        ServiceStats {
            cache_size: cache.size,
            cached_countries: cache.countries,
            health: self.aggregator.validate_all().await,
        }
    }
}

/// Lower-layer failures become `CALCULATION_FAILED`; input errors pass through.
fn escalate(err: TaxError, product_id: &str, country: &str) -> TaxError {
    match err {
        TaxError::InvalidProduct(_)
        | TaxError::InvalidCountry(_)
        | TaxError::InvalidHscode(_)
        | TaxError::ValidationError(_)
        | TaxError::CalculationFailed(_) => err,
        TaxError::RateNotFound(_) | TaxError::ApiError(_) | TaxError::CacheError(_) => {
            tracing::warn!("Tax calculation failed for {} to {}: {}", product_id, country, err);
            TaxError::calculation_failed(format!("Rate lookup failed: {}", err))
                .with_product(product_id)
                .with_country(country)
                .with_cause(err.kind())
        }
    }
}
