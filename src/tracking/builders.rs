//! Pure mapping functions from commerce shapes to Conversions API
//! custom data, one per logical event.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::event::{ContentItem, CustomData, DELIVERY_HOME};

/// Product shape as the storefront reports it with view/add events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// Cart snapshot reported with checkout initiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartInfo {
    pub items: Vec<CartItemInfo>,
    #[serde(default)]
    pub total: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    pub quantity: u32,
}

/// Order shape reported with the purchase event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderInfo {
    pub id: String,
    #[serde(default)]
    pub total: Option<Decimal>,
    pub items: Vec<OrderItemInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInfo {
    pub product_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub product_name: Option<String>,
}

pub fn view_content(product: &ProductInfo) -> CustomData {
    CustomData {
        value: product.price,
        content_name: product.name.clone(),
        content_ids: vec![product.id.clone()],
        ..Default::default()
    }
}

pub fn add_to_cart(product: &ProductInfo, quantity: u32) -> CustomData {
    CustomData {
        value: product.price.map(|p| p * Decimal::from(quantity)),
        content_name: product.name.clone(),
        content_ids: vec![product.id.clone()],
        contents: vec![ContentItem {
            id: product.id.clone(),
            quantity,
            item_price: product.price,
            title: product.name.clone(),
            delivery_category: None,
        }],
        num_items: Some(quantity),
        ..Default::default()
    }
}

pub fn initiate_checkout(cart: &CartInfo) -> CustomData {
    let computed: Decimal = cart
        .items
        .iter()
        .map(|i| i.price.unwrap_or_default() * Decimal::from(i.quantity))
        .sum();
    CustomData {
        value: Some(cart.total.unwrap_or(computed)),
        contents: cart
            .items
            .iter()
            .map(|i| ContentItem {
                id: i.id.clone(),
                quantity: i.quantity,
                item_price: i.price,
                title: i.name.clone(),
                delivery_category: None,
            })
            .collect(),
        num_items: Some(cart.items.iter().map(|i| i.quantity).sum()),
        ..Default::default()
    }
}

/// Purchase custom data. `value` is intentionally left unset: the original
/// mapping never forwarded the order total here, and parity was chosen over
/// correction (see DESIGN.md). Every line ships as home delivery.
pub fn purchase(order: &OrderInfo) -> CustomData {
    CustomData {
        contents: order
            .items
            .iter()
            .map(|i| ContentItem {
                id: i.product_id.clone(),
                quantity: i.quantity,
                item_price: i.price,
                title: i.product_name.clone(),
                delivery_category: Some(DELIVERY_HOME.to_string()),
            })
            .collect(),
        content_ids: order.items.iter().map(|i| i.product_id.clone()).collect(),
        num_items: Some(order.items.iter().map(|i| i.quantity).sum()),
        ..Default::default()
    }
}

pub fn complete_registration() -> CustomData {
    CustomData { content_name: Some("registration".to_string()), content_type: None, ..Default::default() }
}
