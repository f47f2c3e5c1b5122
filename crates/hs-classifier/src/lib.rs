//! HS Classifier
//!
//! Static harmonized-system dictionary and keyword-based product
//! classification for titles that arrive without a tariff code.

pub mod classifier;
pub mod dictionary;

pub use classifier::{normalize_code, validate_code, HsClassifier};
pub use dictionary::{CategoryEntry, CodeInfo, HsEntry, CATEGORIES, HS_CODES};
