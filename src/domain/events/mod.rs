//! Domain events
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: String, total: Decimal },
    Confirmed { order_id: String, total: Decimal },
    Cancelled { order_id: String },
}

impl OrderEvent {
    /// NATS subject the event is published under.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "orders.placed",
            Self::Confirmed { .. } => "orders.confirmed",
            Self::Cancelled { .. } => "orders.cancelled",
        }
    }
}
