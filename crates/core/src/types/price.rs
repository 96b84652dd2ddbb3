//! Catalog price as an opaque JSON number.
//!
//! The cart never computes with prices; it carries whatever the catalog
//! quoted and writes it back out unchanged. A price is held as the exact
//! number token it was read from (serde_json's `arbitrary_precision`), so a
//! stored cart reloads to the same digits no matter how many there are or
//! whether they fit a [`Decimal`].

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a JSON number literal (e.g. `"ten"`, `"NaN"`).
    #[error("price must be a number, got '{0}'")]
    NotANumber(String),
}

/// A catalog unit price.
///
/// ## Examples
///
/// ```
/// use marketplace_core::Price;
///
/// let price = Price::parse("1234567.123456789012345").unwrap();
/// assert_eq!(price.to_string(), "1234567.123456789012345");
///
/// assert!(Price::parse("ten").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Number);

impl Price {
    /// Parse a price from a JSON number literal.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::NotANumber` if the input is not a number literal.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        Number::from_str(s.trim())
            .map(Self)
            .map_err(|_| PriceError::NotANumber(s.to_owned()))
    }

    /// The price as a [`Decimal`], `None` if it is outside `Decimal`'s range.
    #[must_use]
    pub fn to_decimal(&self) -> Option<Decimal> {
        let raw = self.0.to_string();
        Decimal::from_str_exact(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .ok()
    }

    /// The underlying JSON number.
    #[must_use]
    pub const fn as_number(&self) -> &Number {
        &self.0
    }
}

impl Default for Price {
    fn default() -> Self {
        Self(Number::from(0u8))
    }
}

impl From<i64> for Price {
    fn from(amount: i64) -> Self {
        Self(Number::from(amount))
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
