//! Money Conversion Module
//!
//! Every amount inside the ledger is an `i64` count of minor units (cents for
//! BRL/USD/EUR). Decimal strings only exist at the API boundary and all
//! conversions go through this module.
//!
//! ```rust
//! use fund_ledger::money::{Currency, parse_amount, format_amount};
//!
//! let brl = Currency::new("BRL").unwrap();
//! assert_eq!(parse_amount("30.00", &brl).unwrap(), 3000);
//! assert_eq!(format_amount(-1250, &brl), "-12.50");
//! ```

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),
}

// ============================================================================
// Currency
// ============================================================================

/// ISO-4217 style currency code with its minor-unit exponent.
///
/// The ledger never converts between currencies; the code is only compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency {
    code: String,
}

impl Currency {
    pub fn new(code: &str) -> Result<Self, MoneyError> {
        let code = code.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(MoneyError::InvalidCurrency(code));
        }
        Ok(Self { code })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Number of decimal places in one major unit
    pub fn exponent(&self) -> u32 {
        match self.code.as_str() {
            "JPY" | "KRW" | "CLP" | "VND" => 0,
            "BHD" | "KWD" | "OMR" | "TND" => 3,
            _ => 2,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

impl TryFrom<String> for Currency {
    type Error = MoneyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::new(&value)
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.code
    }
}

// ============================================================================
// Parse: Client → Internal
// ============================================================================

/// Convert a client decimal string into signed minor units.
///
/// Rejects more fractional digits than the currency carries instead of rounding.
pub fn parse_amount(amount_str: &str, currency: &Currency) -> Result<i64, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }
    let decimal = Decimal::from_str_exact(amount_str)
        .map_err(|e| MoneyError::InvalidFormat(format!("{}: {}", amount_str, e)))?;
    to_minor_units(decimal, currency)
}

/// Convert a `Decimal` into signed minor units of `currency`.
pub fn to_minor_units(decimal: Decimal, currency: &Currency) -> Result<i64, MoneyError> {
    let exponent = currency.exponent();
    let normalized = decimal.normalize();
    if normalized.scale() > exponent {
        return Err(MoneyError::PrecisionOverflow {
            provided: normalized.scale(),
            max: exponent,
        });
    }

    let multiplier = Decimal::from(10i64.pow(exponent));
    let scaled = normalized
        .checked_mul(multiplier)
        .ok_or(MoneyError::Overflow)?;
    scaled.to_i64().ok_or(MoneyError::Overflow)
}

// ============================================================================
// Format: Internal → Client
// ============================================================================

/// Minor units as a `Decimal` with the currency's scale
pub fn to_decimal(minor_units: i64, currency: &Currency) -> Decimal {
    Decimal::new(minor_units, currency.exponent())
}

/// Minor units as a fixed-scale string, e.g. `7000` BRL -> `"70.00"`
pub fn format_amount(minor_units: i64, currency: &Currency) -> String {
    let exponent = currency.exponent();
    format!(
        "{:.prec$}",
        to_decimal(minor_units, currency),
        prec = exponent as usize
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brl() -> Currency {
        Currency::new("BRL").unwrap()
    }

    #[test]
    fn test_currency_normalizes_code() {
        let c = Currency::new(" brl ").unwrap();
        assert_eq!(c.code(), "BRL");
        assert_eq!(c.exponent(), 2);
        assert_eq!(Currency::new("JPY").unwrap().exponent(), 0);
    }

    #[test]
    fn test_currency_rejects_bad_codes() {
        assert!(Currency::new("").is_err());
        assert!(Currency::new("REAL").is_err());
        assert!(Currency::new("R$1").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("30.00", &brl()).unwrap(), 3000);
        assert_eq!(parse_amount("30", &brl()).unwrap(), 3000);
        assert_eq!(parse_amount("0.5", &brl()).unwrap(), 50);
        assert_eq!(parse_amount("-12.34", &brl()).unwrap(), -1234);
        assert_eq!(parse_amount("100.10", &brl()).unwrap(), 10010);
    }

    #[test]
    fn test_parse_amount_rejects_extra_precision() {
        assert_eq!(
            parse_amount("1.005", &brl()),
            Err(MoneyError::PrecisionOverflow {
                provided: 3,
                max: 2
            })
        );
        let jpy = Currency::new("JPY").unwrap();
        assert!(parse_amount("1.5", &jpy).is_err());
        assert_eq!(parse_amount("1500", &jpy).unwrap(), 1500);
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert!(matches!(
            parse_amount("", &brl()),
            Err(MoneyError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_amount("12,50", &brl()),
            Err(MoneyError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_amount("abc", &brl()),
            Err(MoneyError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_amount_overflow() {
        assert_eq!(
            parse_amount("999999999999999999999", &brl()),
            Err(MoneyError::Overflow)
        );
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(7000, &brl()), "70.00");
        assert_eq!(format_amount(5, &brl()), "0.05");
        assert_eq!(format_amount(-1250, &brl()), "-12.50");
        assert_eq!(format_amount(0, &brl()), "0.00");
        assert_eq!(format_amount(42, &Currency::new("JPY").unwrap()), "42");
    }

    #[test]
    fn test_repeated_cent_additions_do_not_drift() {
        // 0.10 added ten times is exactly 1.00 in minor units
        let ten_cents = parse_amount("0.10", &brl()).unwrap();
        let total: i64 = (0..10).map(|_| ten_cents).sum();
        assert_eq!(format_amount(total, &brl()), "1.00");
    }

    #[test]
    fn test_currency_serde_roundtrip_validates() {
        let c: Currency = serde_json::from_str("\"usd\"").unwrap();
        assert_eq!(c.code(), "USD");
        assert!(serde_json::from_str::<Currency>("\"dollars\"").is_err());
    }
}
