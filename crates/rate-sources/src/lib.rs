//! Rate sources
//!
//! One adapter per jurisdiction family. Each maps its provider's response
//! into `RateRecord`s; degradation on provider failure is adapter-specific.

pub mod config;
pub mod eu;
pub mod parse;
pub mod static_source;
pub mod uk;
pub mod us;

pub use config::SourceConfig;
pub use eu::{EuRateSource, EU_MEMBER_STATES};
pub use parse::{normalize_rate, NormalizedRate, RawRate};
pub use static_source::StaticRateSource;
pub use uk::UkRateSource;
pub use us::UsRateSource;
