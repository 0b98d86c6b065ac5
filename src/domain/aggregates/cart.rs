//! Cart Aggregate

use crate::domain::value_objects::{Money, PurchaseType};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One cart line. The unit price is resolved from the product's
/// purchase-type pricing at add time and frozen on the line.
#[derive(Clone, Debug)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub purchase_type: PurchaseType,
    pub selected_color: Option<String>,
    pub selected_condition: Option<String>,
    pub selected_variant: Option<String>,
}

/// Identity under which lines merge. `selected_variant` is display-only and
/// deliberately not part of the key.
pub type LineKey<'a> = (Uuid, PurchaseType, Option<&'a str>, Option<&'a str>);

impl CartLine {
    pub fn key(&self) -> LineKey<'_> {
        (
            self.product_id,
            self.purchase_type,
            self.selected_color.as_deref(),
            self.selected_condition.as_deref(),
        )
    }

    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[derive(Clone, Debug)]
pub struct Cart {
    session_id: String,
    lines: Vec<CartLine>,
    subtotal: Money,
    currency: String,
    updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(session_id: impl Into<String>, currency: &str) -> Self {
        Self {
            session_id: session_id.into(),
            lines: vec![],
            subtotal: Money::zero(currency),
            currency: currency.to_string(),
            updated_at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }
    pub fn subtotal(&self) -> &Money {
        &self.subtotal
    }
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
    pub fn total_units(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Adds a line, merging into an existing one when the identity key
    /// (product, purchase type, color, condition) matches.
    pub fn add_line(&mut self, line: CartLine) {
        if let Some(existing) = self.lines.iter_mut().find(|l| l.key() == line.key()) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            self.lines.push(line);
        }
        self.recalculate();
    }

    /// Sets the quantity of the line with the given key. Zero removes the line.
    pub fn set_quantity(&mut self, key: LineKey<'_>, quantity: u32) -> Result<(), CartError> {
        let pos = self
            .lines
            .iter()
            .position(|l| l.key() == key)
            .ok_or(CartError::LineNotFound)?;
        if quantity == 0 {
            self.lines.remove(pos);
        } else {
            self.lines[pos].quantity = quantity;
        }
        self.recalculate();
        Ok(())
    }

    pub fn remove_line(&mut self, key: LineKey<'_>) -> Result<(), CartError> {
        self.set_quantity(key, 0)
    }

    /// Wholesale clear, called after a successful checkout.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.recalculate();
    }

    fn recalculate(&mut self) {
        self.subtotal = self
            .lines
            .iter()
            .fold(Money::zero(&self.currency), |acc, l| acc.add(&l.line_total()).unwrap_or(acc));
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone)]
pub enum CartError {
    LineNotFound,
}
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cart line not found")
    }
}
