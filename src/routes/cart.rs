//! Session cart endpoints.
//!
//! Lines merge under the identity (product, purchase type, color,
//! condition): adding a matching line increments its quantity, anything
//! else appends. Setting quantity to zero removes the line.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DEFAULT_CURRENCY;
use crate::domain::aggregates::cart::{Cart, CartLine};
use crate::domain::value_objects::{Money, PurchaseType};
use crate::error::AppError;

use super::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartLineRow {
    pub id: Uuid,
    pub session_id: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub purchase_type: String,
    pub selected_color: Option<String>,
    pub selected_condition: Option<String>,
    pub selected_variant: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub session_id: String,
    pub items: Vec<CartLineRow>,
    pub total_items: u32,
    pub subtotal: Decimal,
}

async fn load_cart(s: &AppState, session: &str) -> Result<Vec<CartLineRow>, AppError> {
    Ok(sqlx::query_as::<_, CartLineRow>(
        "SELECT * FROM cart_items WHERE session_id = $1 ORDER BY created_at ASC",
    )
    .bind(session)
    .fetch_all(&s.db)
    .await?)
}

/// Rebuilds the domain cart from rows; money math lives in one place.
pub(super) fn to_domain_cart(session: &str, rows: &[CartLineRow]) -> Cart {
    let mut cart = Cart::new(session, DEFAULT_CURRENCY);
    for row in rows {
        cart.add_line(CartLine {
            product_id: row.product_id,
            name: row.product_name.clone(),
            unit_price: Money::ars(row.unit_price),
            quantity: row.quantity.max(0) as u32,
            purchase_type: row.purchase_type.parse().unwrap_or_default(),
            selected_color: row.selected_color.clone(),
            selected_condition: row.selected_condition.clone(),
            selected_variant: row.selected_variant.clone(),
        });
    }
    cart
}

fn cart_view(session: &str, rows: Vec<CartLineRow>) -> CartView {
    let cart = to_domain_cart(session, &rows);
    CartView {
        session_id: session.to_string(),
        total_items: cart.total_units(),
        subtotal: cart.subtotal().amount(),
        items: rows,
    }
}

pub async fn get_cart(
    State(s): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<CartView>, AppError> {
    let rows = load_cart(&s, &session).await?;
    Ok(Json(cart_view(&session, rows)))
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: Option<u32>,
    #[serde(default)]
    pub purchase_type: PurchaseType,
    pub selected_color: Option<String>,
    pub selected_condition: Option<String>,
    pub selected_variant: Option<String>,
}

#[derive(sqlx::FromRow)]
struct PricingRow {
    name: String,
    price: Decimal,
    package_price: Option<Decimal>,
    bulk_price: Option<Decimal>,
}

pub async fn add_to_cart(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(r): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartView>), AppError> {
    let quantity = r.quantity.unwrap_or(1);
    if quantity == 0 {
        return Err(AppError::Validation("quantity must be positive".into()));
    }
    let product = sqlx::query_as::<_, PricingRow>(
        "SELECT name, price, package_price, bulk_price FROM products WHERE id = $1 AND status = 'active'",
    )
    .bind(r.product_id)
    .fetch_optional(&s.db)
    .await?
    .ok_or(AppError::NotFound("product"))?;

    // Unit price resolved at add time and frozen on the line.
    let unit_price = r.purchase_type.pick(product.price, product.package_price, product.bulk_price);

    sqlx::query(
        "INSERT INTO cart_items (id, session_id, product_id, product_name, unit_price, quantity, purchase_type, selected_color, selected_condition, selected_variant, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW()) \
         ON CONFLICT (session_id, product_id, purchase_type, COALESCE(selected_color, ''), COALESCE(selected_condition, '')) \
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = NOW()",
    )
    .bind(Uuid::now_v7())
    .bind(&session)
    .bind(r.product_id)
    .bind(&product.name)
    .bind(unit_price)
    .bind(quantity as i32)
    .bind(r.purchase_type.as_str())
    .bind(&r.selected_color)
    .bind(&r.selected_condition)
    .bind(&r.selected_variant)
    .execute(&s.db)
    .await?;

    let rows = load_cart(&s, &session).await?;
    Ok((StatusCode::CREATED, Json(cart_view(&session, rows))))
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub purchase_type: PurchaseType,
    pub selected_color: Option<String>,
    pub selected_condition: Option<String>,
    pub quantity: u32,
}

pub async fn set_quantity(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(r): Json<SetQuantityRequest>,
) -> Result<Json<CartView>, AppError> {
    let result = if r.quantity == 0 {
        sqlx::query(
            "DELETE FROM cart_items WHERE session_id = $1 AND product_id = $2 AND purchase_type = $3 \
             AND selected_color IS NOT DISTINCT FROM $4 AND selected_condition IS NOT DISTINCT FROM $5",
        )
        .bind(&session)
        .bind(r.product_id)
        .bind(r.purchase_type.as_str())
        .bind(&r.selected_color)
        .bind(&r.selected_condition)
        .execute(&s.db)
        .await?
    } else {
        sqlx::query(
            "UPDATE cart_items SET quantity = $6, updated_at = NOW() WHERE session_id = $1 AND product_id = $2 \
             AND purchase_type = $3 AND selected_color IS NOT DISTINCT FROM $4 AND selected_condition IS NOT DISTINCT FROM $5",
        )
        .bind(&session)
        .bind(r.product_id)
        .bind(r.purchase_type.as_str())
        .bind(&r.selected_color)
        .bind(&r.selected_condition)
        .bind(r.quantity as i32)
        .execute(&s.db)
        .await?
    };
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("cart line"));
    }
    let rows = load_cart(&s, &session).await?;
    Ok(Json(cart_view(&session, rows)))
}

pub async fn clear_cart(
    State(s): State<AppState>,
    Path(session): Path<String>,
) -> Result<StatusCode, AppError> {
    sqlx::query("DELETE FROM cart_items WHERE session_id = $1")
        .bind(&session)
        .execute(&s.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
