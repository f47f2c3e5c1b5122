//! Jurisdiction defaults
//!
//! Thresholds and consumption-tax rates used when no rate source returns a
//! record for a destination. Placeholder values, to be replaced by a data feed.

use duty_core::Thresholds;
use rate_sources::{eu, uk, us};
use rust_decimal::Decimal;

/// Duty rate applied when neither a rate record nor a category supplies one.
pub const GENERAL_DUTY_BPS: u32 = 500;

pub fn general_duty_rate() -> Decimal {
    Decimal::new(GENERAL_DUTY_BPS as i64, 4)
}

/// Default de-minimis thresholds (base currency) for a destination.
pub fn default_thresholds(country: &str) -> Thresholds {
    let country = country.to_uppercase();
    if eu::is_member_state(&country) {
        return eu::eu_thresholds();
    }
    match country.as_str() {
        "UK" | "GB" => uk::uk_thresholds(),
        "US" => us::us_thresholds(),
        // Low-value import threshold AUD 1,000; GST collected at sale
        "AU" => Thresholds::new(Decimal::from(650), Decimal::ZERO),
        // CUSMA courier thresholds CAD 150 duty / CAD 40 tax
        "CA" => Thresholds::new(Decimal::from(110), Decimal::from(30)),
        // JPY 10,000
        "JP" => Thresholds::new(Decimal::from(66), Decimal::from(66)),
        _ => Thresholds::zero(),
    }
}

/// Standard consumption-tax rate for a destination.
pub fn vat_rate(country: &str) -> Decimal {
    let country = country.to_uppercase();
    if let Some(rate) = eu::standard_vat_rate(&country) {
        return rate;
    }
    match country.as_str() {
        "UK" | "GB" => Decimal::new(20, 2),
        "AU" => Decimal::new(10, 2),
        "CA" => Decimal::new(5, 2),
        "JP" => Decimal::new(10, 2),
        "CH" => Decimal::new(81, 3),
        "NO" => Decimal::new(25, 2),
        _ => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_eu_defaults() {
        let thresholds = default_thresholds("de");
        assert_eq!(thresholds.duty_free, dec!(150));
        assert_eq!(thresholds.vat_free, dec!(22));
        assert_eq!(vat_rate("DE"), dec!(0.19));
        assert_eq!(vat_rate("FR"), dec!(0.20));
    }

    #[test]
    fn test_us_defaults() {
        let thresholds = default_thresholds("US");
        assert_eq!(thresholds.duty_free, Decimal::ZERO);
        assert_eq!(thresholds.special, Some(dec!(800)));
        assert_eq!(vat_rate("US"), Decimal::ZERO);
    }

    #[test]
    fn test_uk_aliases() {
        assert_eq!(default_thresholds("UK"), default_thresholds("GB"));
        assert_eq!(vat_rate("UK"), dec!(0.20));
    }

    #[test]
    fn test_unknown_destination() {
        assert_eq!(default_thresholds("ZZ"), Thresholds::zero());
        assert_eq!(vat_rate("ZZ"), Decimal::ZERO);
        assert_eq!(general_duty_rate(), dec!(0.05));
    }
}
