//! Product Aggregate

use crate::domain::value_objects::{Money, PurchaseType, Quantity};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct Product {
    id: Uuid,
    name: String,
    description: String,
    price: Money,
    package_price: Option<Money>,
    bulk_price: Option<Money>,
    colors: Vec<String>,
    conditions: Vec<String>,
    variants: Vec<String>,
    stock: Quantity,
    status: ProductStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ProductStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

impl Product {
    pub fn create(name: impl Into<String>, price: Money) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            price,
            package_price: None,
            bulk_price: None,
            colors: vec![],
            conditions: vec![],
            variants: vec![],
            stock: Quantity::default(),
            status: ProductStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn price(&self) -> &Money {
        &self.price
    }
    pub fn stock(&self) -> &Quantity {
        &self.stock
    }
    pub fn status(&self) -> &ProductStatus {
        &self.status
    }
    pub fn colors(&self) -> &[String] {
        &self.colors
    }
    pub fn is_in_stock(&self) -> bool {
        !self.stock.is_zero()
    }

    /// Unit price for the given purchase type.
    pub fn price_for(&self, purchase_type: PurchaseType) -> Money {
        purchase_type.pick(self.price.clone(), self.package_price.clone(), self.bulk_price.clone())
    }

    pub fn set_package_price(&mut self, price: Money) {
        self.package_price = Some(price);
        self.touch();
    }

    pub fn set_bulk_price(&mut self, price: Money) {
        self.bulk_price = Some(price);
        self.touch();
    }

    pub fn set_options(&mut self, colors: Vec<String>, conditions: Vec<String>, variants: Vec<String>) {
        self.colors = colors;
        self.conditions = conditions;
        self.variants = variants;
        self.touch();
    }

    pub fn publish(&mut self) -> Result<(), ProductError> {
        if self.name.is_empty() {
            return Err(ProductError::MissingName);
        }
        self.status = ProductStatus::Active;
        self.touch();
        Ok(())
    }

    pub fn archive(&mut self) {
        self.status = ProductStatus::Archived;
        self.touch();
    }

    pub fn add_stock(&mut self, qty: u32) {
        self.stock = self.stock.add(qty);
        self.touch();
    }

    pub fn remove_stock(&mut self, qty: u32) -> Result<(), ProductError> {
        self.stock = self.stock.subtract(qty).ok_or(ProductError::InsufficientStock)?;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone)]
pub enum ProductError {
    MissingName,
    InsufficientStock,
}
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "Missing name"),
            Self::InsufficientStock => write!(f, "Insufficient stock"),
        }
    }
}
