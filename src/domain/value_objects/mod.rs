//! Value objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a line is purchased. The storefront prices every product per unit,
/// per package and per bulk lot, and the cart keys lines by this choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseType {
    #[default]
    Unidad,
    Paquete,
    Bulto,
}

impl PurchaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unidad => "unidad",
            Self::Paquete => "paquete",
            Self::Bulto => "bulto",
        }
    }

    /// Picks the price matching this purchase type, falling back to the
    /// per-unit price when no package/bulk price is set.
    pub fn pick<T>(self, unit: T, package: Option<T>, bulk: Option<T>) -> T {
        match self {
            Self::Unidad => unit,
            Self::Paquete => package.unwrap_or(unit),
            Self::Bulto => bulk.unwrap_or(unit),
        }
    }
}

impl fmt::Display for PurchaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PurchaseType {
    type Err = PurchaseTypeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unidad" => Ok(Self::Unidad),
            "paquete" => Ok(Self::Paquete),
            "bulto" => Ok(Self::Bulto),
            other => Err(PurchaseTypeError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PurchaseTypeError(pub String);
impl std::error::Error for PurchaseTypeError {}
impl fmt::Display for PurchaseTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown purchase type: {}", self.0)
    }
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self {
        Self { amount, currency: currency.to_string() }
    }
    pub fn ars(amount: Decimal) -> Self {
        Self::new(amount, "ARS")
    }
    pub fn zero(currency: &str) -> Self {
        Self::new(Decimal::ZERO, currency)
    }
    pub fn amount(&self) -> Decimal {
        self.amount
    }
    pub fn currency(&self) -> &str {
        &self.currency
    }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch);
        }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money {
        Money::new(self.amount * Decimal::from(qty), &self.currency)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero("ARS")
    }
}

#[derive(Debug, Clone)]
pub enum MoneyError {
    CurrencyMismatch,
}
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency mismatch")
    }
}

/// Quantity value object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self {
        Self(value)
    }
    pub fn value(&self) -> u32 {
        self.0
    }
    pub fn add(&self, other: u32) -> Self {
        Self(self.0.saturating_add(other))
    }
    pub fn subtract(&self, other: u32) -> Option<Self> {
        if other > self.0 { None } else { Some(Self(self.0 - other)) }
    }
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}
