//! Display-oriented price representation.
//!
//! The commerce backend computes every total and serializes amounts as
//! major-unit JSON numbers (e.g. `19.99` for EUR). The client never does
//! arithmetic on prices beyond the cosmetic discount preview, so a plain
//! `f64` plus a currency code is sufficient here.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., euros, not cents).
    pub amount: f64,
    /// ISO 4217 currency code, lowercase as the backend serializes it.
    pub currency_code: String,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub fn new(amount: f64, currency_code: impl Into<String>) -> Self {
        Self {
            amount,
            currency_code: currency_code.into(),
        }
    }

    /// Currency symbol for well-known codes, falling back to the code itself.
    #[must_use]
    pub fn symbol(&self) -> &str {
        match self.currency_code.to_ascii_lowercase().as_str() {
            "usd" | "cad" | "aud" => "$",
            "eur" => "€",
            "gbp" => "£",
            "jpy" => "¥",
            _ => &self.currency_code,
        }
    }

    /// Cosmetic discount preview: `amount × (1 − rate)`.
    ///
    /// This is display-only. Authoritative discounted totals always come
    /// from the backend on the next mutation response.
    #[must_use]
    pub fn discount_preview(&self, rate: f64) -> Self {
        let rate = rate.clamp(0.0, 1.0);
        Self {
            amount: self.amount * (1.0 - rate),
            currency_code: self.currency_code.clone(),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats_two_decimals() {
        let price = Price::new(19.9, "eur");
        assert_eq!(price.to_string(), "19.90 €");
    }

    #[test]
    fn test_symbol_fallback_to_code() {
        let price = Price::new(100.0, "sek");
        assert_eq!(price.symbol(), "sek");
    }

    #[test]
    fn test_discount_preview() {
        let price = Price::new(100.0, "usd");
        let discounted = price.discount_preview(0.25);
        assert!((discounted.amount - 75.0).abs() < f64::EPSILON);
        assert_eq!(discounted.currency_code, "usd");
    }

    #[test]
    fn test_discount_preview_clamps_rate() {
        let price = Price::new(50.0, "usd");
        assert!((price.discount_preview(1.5).amount - 0.0).abs() < f64::EPSILON);
        assert!((price.discount_preview(-0.5).amount - 50.0).abs() < f64::EPSILON);
    }
}
