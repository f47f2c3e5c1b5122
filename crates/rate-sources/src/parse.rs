//! Rate string normalization.
//!
//! Providers publish rates as "19", "2.5%", "Free" or specific duties such
//! as "4.4¢/kg". Everything becomes a fraction in [0, 1]; formats that are
//! not ad valorem normalize to zero and keep the raw text in a note.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRate {
    pub rate: Decimal,
    pub note: Option<String>,
}

impl NormalizedRate {
    fn exact(rate: Decimal) -> Self {
        Self { rate, note: None }
    }

    fn zero_with_note(note: String) -> Self {
        Self {
            rate: Decimal::ZERO,
            note: Some(note),
        }
    }
}

/// A rate as it appears on the wire: JSON number or string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRate {
    Number(Decimal),
    Text(String),
}

impl RawRate {
    pub fn normalize(&self) -> NormalizedRate {
        match self {
            RawRate::Number(value) => from_percentage_points(*value, &value.to_string()),
            RawRate::Text(text) => normalize_rate(text),
        }
    }
}

/// Normalize a rate string. Bare numbers are percentage points.
pub fn normalize_rate(raw: &str) -> NormalizedRate {
    let text = raw.trim();

    if text.is_empty() {
        return NormalizedRate::zero_with_note("Empty rate recorded as 0".to_string());
    }

    if text.eq_ignore_ascii_case("free") {
        return NormalizedRate::exact(Decimal::ZERO);
    }

    let number = text.strip_suffix('%').unwrap_or(text).trim();
    match Decimal::from_str(number) {
        Ok(value) => from_percentage_points(value, raw),
        Err(_) => NormalizedRate::zero_with_note(format!(
            "Non ad valorem rate '{}' recorded as 0",
            raw
        )),
    }
}

fn from_percentage_points(value: Decimal, raw: &str) -> NormalizedRate {
    let rate = value / Decimal::ONE_HUNDRED;
    if rate < Decimal::ZERO {
        NormalizedRate::zero_with_note(format!("Negative rate '{}' recorded as 0", raw))
    } else if rate > Decimal::ONE {
        NormalizedRate {
            rate: Decimal::ONE,
            note: Some(format!("Rate '{}' above 100% capped at 1", raw)),
        }
    } else {
        NormalizedRate::exact(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percentages() {
        assert_eq!(normalize_rate("19%").rate, dec!(0.19));
        assert_eq!(normalize_rate(" 2.5 % ").rate, dec!(0.025));
        assert_eq!(normalize_rate("20").rate, dec!(0.20));
        assert!(normalize_rate("19%").note.is_none());
    }

    #[test]
    fn test_free() {
        let free = normalize_rate("Free");
        assert_eq!(free.rate, Decimal::ZERO);
        assert!(free.note.is_none());
        assert_eq!(normalize_rate("FREE").rate, Decimal::ZERO);
    }

    #[test]
    fn test_specific_duties_become_zero_with_note() {
        let specific = normalize_rate("4.4¢/kg");
        assert_eq!(specific.rate, Decimal::ZERO);
        assert!(specific.note.unwrap().contains("4.4¢/kg"));

        let compound = normalize_rate("2.5% + 3¢/kg");
        assert_eq!(compound.rate, Decimal::ZERO);
        assert!(compound.note.is_some());
    }

    #[test]
    fn test_out_of_range() {
        let high = normalize_rate("250%");
        assert_eq!(high.rate, Decimal::ONE);
        assert!(high.note.is_some());

        let negative = normalize_rate("-5%");
        assert_eq!(negative.rate, Decimal::ZERO);
        assert!(negative.note.is_some());
    }

    #[test]
    fn test_raw_rate_from_json() {
        let number: RawRate = serde_json::from_str("21").unwrap();
        assert_eq!(number.normalize().rate, dec!(0.21));

        let text: RawRate = serde_json::from_str("\"Free\"").unwrap();
        assert_eq!(text.normalize().rate, Decimal::ZERO);
    }
}
