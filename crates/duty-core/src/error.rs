use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire names of the error kinds, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxErrorKind {
    InvalidProduct,
    InvalidCountry,
    InvalidHscode,
    RateNotFound,
    CalculationFailed,
    ValidationError,
    ApiError,
    CacheError,
}

impl TaxErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxErrorKind::InvalidProduct => "INVALID_PRODUCT",
            TaxErrorKind::InvalidCountry => "INVALID_COUNTRY",
            TaxErrorKind::InvalidHscode => "INVALID_HSCODE",
            TaxErrorKind::RateNotFound => "RATE_NOT_FOUND",
            TaxErrorKind::CalculationFailed => "CALCULATION_FAILED",
            TaxErrorKind::ValidationError => "VALIDATION_ERROR",
            TaxErrorKind::ApiError => "API_ERROR",
            TaxErrorKind::CacheError => "CACHE_ERROR",
        }
    }

    /// Input violations are never retried and never wrapped.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            TaxErrorKind::InvalidProduct
                | TaxErrorKind::InvalidCountry
                | TaxErrorKind::InvalidHscode
                | TaxErrorKind::ValidationError
        )
    }
}

impl std::fmt::Display for TaxErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traceability payload shared by every error variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    /// Kind of the lower-layer error this one wraps, if any.
    #[serde(default)]
    pub cause: Option<TaxErrorKind>,
}

impl ErrorContext {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now(),
            product_id: None,
            country: None,
            cause: None,
        }
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(country) = &self.country {
            write!(f, " (country: {})", country)?;
        }
        if let Some(product_id) = &self.product_id {
            write!(f, " (product: {})", product_id)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "context", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxError {
    #[error("Invalid product: {0}")]
    InvalidProduct(ErrorContext),

    #[error("Invalid country: {0}")]
    InvalidCountry(ErrorContext),

    #[error("Invalid HS code: {0}")]
    InvalidHscode(ErrorContext),

    #[error("Rate not found: {0}")]
    RateNotFound(ErrorContext),

    #[error("Calculation failed: {0}")]
    CalculationFailed(ErrorContext),

    #[error("Validation error: {0}")]
    ValidationError(ErrorContext),

    #[error("API error: {0}")]
    ApiError(ErrorContext),

    #[error("Cache error: {0}")]
    CacheError(ErrorContext),
}

pub type TaxResult<T> = Result<T, TaxError>;

impl TaxError {
    pub fn invalid_product(message: impl Into<String>) -> Self {
        Self::InvalidProduct(ErrorContext::new(message))
    }

    pub fn invalid_country(message: impl Into<String>) -> Self {
        Self::InvalidCountry(ErrorContext::new(message))
    }

    pub fn invalid_hscode(message: impl Into<String>) -> Self {
        Self::InvalidHscode(ErrorContext::new(message))
    }

    pub fn rate_not_found(message: impl Into<String>) -> Self {
        Self::RateNotFound(ErrorContext::new(message))
    }

    pub fn calculation_failed(message: impl Into<String>) -> Self {
        Self::CalculationFailed(ErrorContext::new(message))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(ErrorContext::new(message))
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::ApiError(ErrorContext::new(message))
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::CacheError(ErrorContext::new(message))
    }

    pub fn kind(&self) -> TaxErrorKind {
        match self {
            TaxError::InvalidProduct(_) => TaxErrorKind::InvalidProduct,
            TaxError::InvalidCountry(_) => TaxErrorKind::InvalidCountry,
            TaxError::InvalidHscode(_) => TaxErrorKind::InvalidHscode,
            TaxError::RateNotFound(_) => TaxErrorKind::RateNotFound,
            TaxError::CalculationFailed(_) => TaxErrorKind::CalculationFailed,
            TaxError::ValidationError(_) => TaxErrorKind::ValidationError,
            TaxError::ApiError(_) => TaxErrorKind::ApiError,
            TaxError::CacheError(_) => TaxErrorKind::CacheError,
        }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            TaxError::InvalidProduct(ctx)
            | TaxError::InvalidCountry(ctx)
            | TaxError::InvalidHscode(ctx)
            | TaxError::RateNotFound(ctx)
            | TaxError::CalculationFailed(ctx)
            | TaxError::ValidationError(ctx)
            | TaxError::ApiError(ctx)
            | TaxError::CacheError(ctx) => ctx,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            TaxError::InvalidProduct(ctx)
            | TaxError::InvalidCountry(ctx)
            | TaxError::InvalidHscode(ctx)
            | TaxError::RateNotFound(ctx)
            | TaxError::CalculationFailed(ctx)
            | TaxError::ValidationError(ctx)
            | TaxError::ApiError(ctx)
            | TaxError::CacheError(ctx) => ctx,
        }
    }

    pub fn with_product(mut self, product_id: impl Into<String>) -> Self {
        self.context_mut().product_id = Some(product_id.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.context_mut().country = Some(country.into());
        self
    }

    pub fn with_cause(mut self, cause: TaxErrorKind) -> Self {
        self.context_mut().cause = Some(cause);
        self
    }

    pub fn message(&self) -> &str {
        &self.context().message
    }
}
