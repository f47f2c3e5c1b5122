use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{TaxError, TaxResult};

/// A line item as supplied by the storefront. The engine never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub price: Decimal,
    pub currency: String,
    #[serde(default)]
    pub weight: Decimal,
    #[serde(default)]
    pub hs_code: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub origin_country: Option<String>,
}

impl Product {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        price: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            price,
            currency: currency.into(),
            weight: Decimal::ZERO,
            hs_code: None,
            category: None,
            origin_country: None,
        }
    }

    pub fn with_hs_code(mut self, code: impl Into<String>) -> Self {
        self.hs_code = Some(code.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_weight(mut self, weight: Decimal) -> Self {
        self.weight = weight;
        self
    }
}

/// Outcome of classifying a free-text title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub suggested_code: Option<String>,
    pub category: Option<String>,
    pub confidence: f64, // 0.0 to 1.0
    pub matched_keywords: Vec<String>,
}

/// De-minimis thresholds, in base currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub duty_free: Decimal,
    pub vat_free: Decimal,
    #[serde(default)]
    pub special: Option<Decimal>,
}

impl Thresholds {
    pub fn new(duty_free: Decimal, vat_free: Decimal) -> Self {
        Self {
            duty_free,
            vat_free,
            special: None,
        }
    }

    pub fn with_special(mut self, special: Decimal) -> Self {
        self.special = Some(special);
        self
    }

    pub fn zero() -> Self {
        Self::new(Decimal::ZERO, Decimal::ZERO)
    }
}

/// Where a rate came from and how much to trust it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub country: String,
    pub source: String,
    pub last_updated: DateTime<Utc>,
    pub version: String,
    pub reliability: f64, // 0.0 to 1.0
}

impl SourceInfo {
    pub const LOCAL: &'static str = "LOCAL";

    /// Provenance used when no rate record matched and jurisdiction defaults apply.
    pub fn local(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            source: Self::LOCAL.to_string(),
            last_updated: Utc::now(),
            version: "1.0".to_string(),
            reliability: 0.5,
        }
    }
}

/// One duty/VAT rate for a (country, code) pair. An empty `hs_code` means
/// the record applies to the whole jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    pub id: String,
    pub country: String,
    #[serde(default)]
    pub hs_code: String,
    /// Absent when the source has no tariff-line data.
    #[serde(default)]
    pub duty_rate: Option<Decimal>,
    #[serde(default)]
    pub vat_rate: Option<Decimal>,
    pub thresholds: Thresholds,
    pub effective_date: NaiveDate,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    pub source: SourceInfo,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RateRecord {
    pub fn is_general(&self) -> bool {
        self.hs_code.is_empty()
    }

    pub fn matches_code(&self, code: &str) -> bool {
        !self.hs_code.is_empty() && self.hs_code == code
    }
}

/// A single explainable step of a calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationStep {
    pub step: String,
    pub description: String,
    pub value: Decimal,
    pub formula: String,
    pub variables: BTreeMap<String, Decimal>,
    /// Whether the step's condition held.
    pub applied: bool,
}

impl CalculationStep {
    pub fn new(step: impl Into<String>, description: impl Into<String>, value: Decimal) -> Self {
        Self {
            step: step.into(),
            description: description.into(),
            value,
            formula: String::new(),
            variables: BTreeMap::new(),
            applied: true,
        }
    }

    pub fn formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = formula.into();
        self
    }

    pub fn var(mut self, name: &str, value: Decimal) -> Self {
        self.variables.insert(name.to_string(), value);
        self
    }

    pub fn applied(mut self, applied: bool) -> Self {
        self.applied = applied;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExemptionType {
    DutyFree,
    VatFree,
    #[serde(rename = "SECTION_321")]
    Section321,
    SpecialRegime,
    TradeAgreement,
}

/// Records why an amount is zero. Exemptions are never partial credits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exemption {
    #[serde(rename = "type")]
    pub exemption_type: ExemptionType,
    pub description: String,
    pub amount: Decimal,
}

impl Exemption {
    pub fn full(exemption_type: ExemptionType, description: impl Into<String>) -> Self {
        Self {
            exemption_type,
            description: description.into(),
            amount: Decimal::ZERO,
        }
    }
}

/// Denormalized copy of the product fields a result refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: String,
    pub title: String,
    pub price: Decimal,
    pub currency: String,
    pub weight: Decimal,
    pub hs_code: Option<String>,
    pub category: Option<String>,
}

impl ProductSnapshot {
    pub fn of(product: &Product, hs_code: Option<String>, category: Option<String>) -> Self {
        Self {
            id: product.id.clone(),
            title: product.title.clone(),
            price: product.price,
            currency: product.currency.clone(),
            weight: product.weight,
            hs_code,
            category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationSummary {
    pub duties: Decimal,
    pub vat: Decimal,
    pub total_tax: Decimal,
    /// taxable_value + total_tax
    pub total_value: Decimal,
    /// Product price converted to base currency.
    pub taxable_value: Decimal,
    pub duty_rate: Decimal,
    pub vat_rate: Decimal,
    pub exchange_rate: Decimal,
    pub base_currency: String,
}

/// Full, auditable result for one (product, country) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedTaxResult {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub product: ProductSnapshot,
    pub country: String,
    pub calculation: CalculationSummary,
    pub details: Vec<CalculationStep>,
    pub thresholds: Thresholds,
    pub exemptions: Vec<Exemption>,
    pub warnings: Vec<String>,
    pub confidence: f64, // 0.0 to 1.0
    pub source: SourceInfo,
}

impl ExtendedTaxResult {
    /// Zero-tax stand-in for an item whose calculation failed.
    pub fn placeholder(
        id: String,
        product: &Product,
        country: &str,
        base_currency: &str,
        error: &TaxError,
    ) -> Self {
        let mut source = SourceInfo::local(country);
        source.reliability = 0.0;

        Self {
            id,
            timestamp: Utc::now(),
            product: ProductSnapshot::of(product, product.hs_code.clone(), product.category.clone()),
            country: country.to_string(),
            calculation: CalculationSummary {
                duties: Decimal::ZERO,
                vat: Decimal::ZERO,
                total_tax: Decimal::ZERO,
                total_value: Decimal::ZERO,
                taxable_value: Decimal::ZERO,
                duty_rate: Decimal::ZERO,
                vat_rate: Decimal::ZERO,
                exchange_rate: Decimal::ONE,
                base_currency: base_currency.to_string(),
            },
            details: Vec::new(),
            thresholds: Thresholds::zero(),
            exemptions: Vec::new(),
            warnings: vec![format!("Tax calculation failed: {}", error)],
            confidence: 0.0,
            source,
        }
    }

    /// Check the output invariants.
    pub fn validate(&self) -> TaxResult<()> {
        let calc = &self.calculation;
        if calc.total_tax != calc.duties + calc.vat {
            return Err(TaxError::calculation_failed(format!(
                "total tax {} does not equal duties {} + vat {}",
                calc.total_tax, calc.duties, calc.vat
            )));
        }
        // One unit in the last rounded place.
        let unit = Decimal::new(1, calc.total_value.scale());
        let gap = calc.total_value - (calc.taxable_value + calc.total_tax);
        if gap.abs() > unit {
            return Err(TaxError::calculation_failed(format!(
                "total value {} does not equal taxable value {} + total tax {}",
                calc.total_value, calc.taxable_value, calc.total_tax
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(TaxError::calculation_failed(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }

    pub fn has_exemption(&self, exemption_type: ExemptionType) -> bool {
        self.exemptions
            .iter()
            .any(|e| e.exemption_type == exemption_type)
    }

    pub fn step(&self, name: &str) -> Option<&CalculationStep> {
        self.details.iter().find(|s| s.step == name)
    }
}

/// Simplified projection kept for older callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxCalculation {
    pub product_id: String,
    pub country: String,
    pub duties: Decimal,
    pub vat: Decimal,
    pub total_tax: Decimal,
    pub duty_rate: Decimal,
    pub vat_rate: Decimal,
    pub threshold: Decimal,
    pub currency: String,
    pub exempt: bool,
}

impl From<&ExtendedTaxResult> for TaxCalculation {
    fn from(result: &ExtendedTaxResult) -> Self {
        Self {
            product_id: result.product.id.clone(),
            country: result.country.clone(),
            duties: result.calculation.duties,
            vat: result.calculation.vat,
            total_tax: result.calculation.total_tax,
            duty_rate: result.calculation.duty_rate,
            vat_rate: result.calculation.vat_rate,
            threshold: result.thresholds.duty_free,
            currency: result.calculation.base_currency.clone(),
            exempt: !result.exemptions.is_empty(),
        }
    }
}
