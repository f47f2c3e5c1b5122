//! Tax Engine
//!
//! Import duty and VAT determination for cross-border line items:
//! classification, rate lookup, currency conversion and an explainable
//! duty/VAT calculation, one item at a time or in fault-isolated batches.

pub mod batch;
pub mod config;
pub mod currency;
pub mod engine;
pub mod jurisdiction;

pub use config::{CacheSettings, EngineConfig, RoundingMethod, RoundingPolicy, ValidationBounds};
pub use currency::{Conversion, CurrencyConverter};
pub use engine::{ServiceStats, TaxEngine};
