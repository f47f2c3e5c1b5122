use anyhow::{bail, Context, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundingMethod {
    Round,
    Floor,
    Ceil,
}

impl FromStr for RoundingMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "round" => Ok(Self::Round),
            "floor" => Ok(Self::Floor),
            "ceil" => Ok(Self::Ceil),
            other => bail!("unknown rounding method '{}'", other),
        }
    }
}

/// Applied to user-facing amounts only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundingPolicy {
    pub decimals: u32,
    pub method: RoundingMethod,
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        Self {
            decimals: 2,
            method: RoundingMethod::Round,
        }
    }
}

impl RoundingPolicy {
    pub fn apply(&self, amount: Decimal) -> Decimal {
        let strategy = match self.method {
            RoundingMethod::Round => RoundingStrategy::MidpointAwayFromZero,
            RoundingMethod::Floor => RoundingStrategy::ToNegativeInfinity,
            RoundingMethod::Ceil => RoundingStrategy::ToPositiveInfinity,
        };
        amount.round_dp_with_strategy(self.decimals, strategy)
    }
}

/// Accepted product price range, in the product's own currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationBounds {
    pub min: Decimal,
    pub max: Decimal,
    pub allow_zero: bool,
}

impl Default for ValidationBounds {
    fn default() -> Self {
        Self {
            min: Decimal::ZERO,
            max: Decimal::from(1_000_000),
            allow_zero: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl_seconds: i64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub base_currency: String,
    /// Units of each currency per one unit of the base currency.
    pub exchange_rates: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub rounding: RoundingPolicy,
    #[serde(default)]
    pub validation: ValidationBounds,
    #[serde(default)]
    pub cache: CacheSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let exchange_rates = [
            ("USD", Decimal::ONE),
            ("EUR", Decimal::new(92, 2)),
            ("GBP", Decimal::new(79, 2)),
            ("CNY", Decimal::new(720, 2)),
            ("JPY", Decimal::from(150)),
            ("CAD", Decimal::new(136, 2)),
            ("AUD", Decimal::new(152, 2)),
        ]
        .into_iter()
        .map(|(c, r)| (c.to_string(), r))
        .collect();

        Self {
            base_currency: "USD".to_string(),
            exchange_rates,
            rounding: RoundingPolicy::default(),
            validation: ValidationBounds::default(),
            cache: CacheSettings::default(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("invalid value for {}: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl EngineConfig {
    /// Defaults overlaid with `TAX_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            base_currency: env_or("TAX_BASE_CURRENCY", defaults.base_currency.clone())?
                .to_uppercase(),
            exchange_rates: defaults.exchange_rates.clone(),
            rounding: RoundingPolicy {
                decimals: env_or("TAX_ROUNDING_DECIMALS", defaults.rounding.decimals)?,
                method: env_or("TAX_ROUNDING_METHOD", defaults.rounding.method)?,
            },
            validation: ValidationBounds {
                min: env_or("TAX_MIN_PRICE", defaults.validation.min)?,
                max: env_or("TAX_MAX_PRICE", defaults.validation.max)?,
                allow_zero: env_or("TAX_ALLOW_ZERO", defaults.validation.allow_zero)?,
            },
            cache: CacheSettings {
                enabled: env_or("TAX_CACHE_ENABLED", defaults.cache.enabled)?,
                ttl_seconds: env_or("TAX_CACHE_TTL_SECS", defaults.cache.ttl_seconds)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_currency.trim().is_empty() {
            bail!("base currency must not be empty");
        }
        if self.validation.min > self.validation.max {
            bail!(
                "validation min {} exceeds max {}",
                self.validation.min,
                self.validation.max
            );
        }
        if let Some((currency, rate)) = self.exchange_rates.iter().find(|(_, r)| **r <= Decimal::ZERO) {
            bail!("exchange rate for {} must be positive (got {})", currency, rate);
        }
        Ok(())
    }
}
