//! Order Aggregate

use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct Order {
    id: Uuid,
    user_id: Option<Uuid>,
    customer_info: serde_json::Value,
    status: OrderStatus,
    payment_method: String,
    items: Vec<OrderItem>,
    total: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: u32,
    pub price: Money,
    pub variant_info: serde_json::Value,
}

impl OrderItem {
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    Shipped,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Delivered)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        !self.is_terminal() && *self != next
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Order {
    /// Assembles a pending order from checkout input and raises Placed.
    pub fn place(
        user_id: Option<Uuid>,
        customer_info: serde_json::Value,
        payment_method: impl Into<String>,
        items: Vec<OrderItem>,
        currency: &str,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        let id = Uuid::new_v4();
        let now = Utc::now();
        let total = items
            .iter()
            .fold(Money::zero(currency), |acc, i| acc.add(&i.line_total()).unwrap_or(acc));
        let mut order = Self {
            id,
            user_id,
            customer_info,
            status: OrderStatus::Pending,
            payment_method: payment_method.into(),
            items,
            total,
            created_at: now,
            updated_at: now,
            events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_id: id.to_string(),
            total: order.total.amount(),
        }));
        Ok(order)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }
    pub fn customer_info(&self) -> &serde_json::Value {
        &self.customer_info
    }
    pub fn status(&self) -> OrderStatus {
        self.status
    }
    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }
    pub fn total(&self) -> &Money {
        &self.total
    }
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Admin-driven status change. Confirmed and Cancelled raise events for
    /// downstream consumers.
    pub fn transition(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition { from: self.status, to: next });
        }
        self.status = next;
        self.touch();
        match next {
            OrderStatus::Confirmed => self.raise_event(DomainEvent::Order(OrderEvent::Confirmed {
                order_id: self.id.to_string(),
                total: self.total.amount(),
            })),
            OrderStatus::Cancelled => self.raise_event(DomainEvent::Order(OrderEvent::Cancelled {
                order_id: self.id.to_string(),
            })),
            _ => {}
        }
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }
    fn raise_event(&mut self, e: DomainEvent) {
        self.events.push(e);
    }
    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone)]
pub enum OrderError {
    NoItems,
    UnknownStatus(String),
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "No items"),
            Self::UnknownStatus(s) => write!(f, "Unknown status: {s}"),
            Self::InvalidTransition { from, to } => write!(f, "Cannot transition from {from} to {to}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(qty: u32, price: i64) -> OrderItem {
        OrderItem {
            product_id: Uuid::new_v4(),
            product_name: "Vaso".into(),
            quantity: qty,
            price: Money::ars(Decimal::new(price, 0)),
            variant_info: serde_json::json!({}),
        }
    }

    #[test]
    fn test_place_computes_total_and_raises_placed() {
        let mut order = Order::place(
            None,
            serde_json::json!({"name": "Ana"}),
            "whatsapp",
            vec![item(2, 100), item(1, 50)],
            "ARS",
        )
        .unwrap();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.total().amount(), Decimal::new(250, 0));
        let events = order.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DomainEvent::Order(OrderEvent::Placed { .. })));
    }

    #[test]
    fn test_place_rejects_empty() {
        let result = Order::place(None, serde_json::json!({}), "whatsapp", vec![], "ARS");
        assert!(matches!(result, Err(OrderError::NoItems)));
    }

    #[test]
    fn test_transition_lifecycle() {
        let mut order =
            Order::place(None, serde_json::json!({}), "whatsapp", vec![item(1, 10)], "ARS").unwrap();
        order.take_events();
        order.transition(OrderStatus::Confirmed).unwrap();
        order.transition(OrderStatus::Shipped).unwrap();
        order.transition(OrderStatus::Delivered).unwrap();
        // Delivered is terminal
        assert!(order.transition(OrderStatus::Cancelled).is_err());
        let events = order.take_events();
        assert!(matches!(events[0], DomainEvent::Order(OrderEvent::Confirmed { .. })));
    }

    #[test]
    fn test_cancelled_is_terminal() {
        let mut order =
            Order::place(None, serde_json::json!({}), "whatsapp", vec![item(1, 10)], "ARS").unwrap();
        order.transition(OrderStatus::Cancelled).unwrap();
        assert!(order.transition(OrderStatus::Pending).is_err());
    }
}
