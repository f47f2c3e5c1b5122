use duty_core::{TaxError, TaxResult};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Result of converting a price into the base currency.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub amount: Decimal,
    /// Units of the source currency per unit of base currency.
    pub rate: Decimal,
    pub warning: Option<String>,
}

/// Static-table currency conversion.
pub struct CurrencyConverter<'a> {
    base: &'a str,
    rates: &'a BTreeMap<String, Decimal>,
}

impl<'a> CurrencyConverter<'a> {
    pub fn new(base: &'a str, rates: &'a BTreeMap<String, Decimal>) -> Self {
        Self { base, rates }
    }

    pub fn rate(&self, currency: &str) -> Option<Decimal> {
        if currency.eq_ignore_ascii_case(self.base) {
            return Some(Decimal::ONE);
        }
        self.rates
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(currency))
            .map(|(_, r)| *r)
            .filter(|r| *r > Decimal::ZERO)
    }

    /// Convert into the base currency. Unknown currencies convert 1:1 with a warning.
    pub fn to_base(&self, amount: Decimal, currency: &str) -> Conversion {
        match self.rate(currency) {
            Some(rate) => Conversion {
                amount: amount / rate,
                rate,
                warning: None,
            },
            None => {
                tracing::warn!("No exchange rate for {}, assuming parity with {}", currency, self.base);
                Conversion {
                    amount,
                    rate: Decimal::ONE,
                    warning: Some(format!(
                        "No exchange rate for {}; converted 1:1 to {}",
                        currency, self.base
                    )),
                }
            }
        }
    }

    /// Convert between any two currencies in the table.
    pub fn convert(&self, amount: Decimal, from: &str, to: &str) -> TaxResult<Decimal> {
        let from_rate = self
            .rate(from)
            .ok_or_else(|| TaxError::validation(format!("No exchange rate for {}", from)))?;
        let to_rate = self
            .rate(to)
            .ok_or_else(|| TaxError::validation(format!("No exchange rate for {}", to)))?;
        Ok(amount / from_rate * to_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rates() -> BTreeMap<String, Decimal> {
        [("USD", dec!(1)), ("EUR", dec!(0.8)), ("JPY", dec!(150))]
            .into_iter()
            .map(|(c, r)| (c.to_string(), r))
            .collect()
    }

    #[test]
    fn test_to_base() {
        let rates = rates();
        let converter = CurrencyConverter::new("USD", &rates);

        let eur = converter.to_base(dec!(100), "EUR");
        assert_eq!(eur.amount, dec!(125));
        assert_eq!(eur.rate, dec!(0.8));
        assert!(eur.warning.is_none());

        assert_eq!(converter.to_base(dec!(20), "usd").amount, dec!(20));
    }

    #[test]
    fn test_unknown_currency_is_parity_with_warning() {
        let rates = rates();
        let converter = CurrencyConverter::new("USD", &rates);
        let conversion = converter.to_base(dec!(42), "XAU");
        assert_eq!(conversion.amount, dec!(42));
        assert_eq!(conversion.rate, Decimal::ONE);
        assert!(conversion.warning.unwrap().contains("XAU"));
    }

    #[test]
    fn test_convert_between_currencies() {
        let rates = rates();
        let converter = CurrencyConverter::new("USD", &rates);
        assert_eq!(converter.convert(dec!(100), "EUR", "JPY").unwrap(), dec!(18750));
        assert!(converter.convert(dec!(1), "EUR", "XAU").is_err());
    }
}
