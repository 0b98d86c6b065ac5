//! Order endpoints: checkout submission, listing, admin status changes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::config::DEFAULT_CURRENCY;
use crate::domain::aggregates::order::{Order, OrderItem, OrderStatus};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::error::AppError;
use crate::tracking::builders::{self, OrderInfo, OrderItemInfo};
use crate::tracking::{EventName, RawUser, RequestContext, TrackContext};
use crate::whatsapp;

use super::cart::to_domain_cart;
use super::{AppState, ListParams, PaginatedResponse};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub customer_info: serde_json::Value,
    pub total: Decimal,
    pub currency: String,
    pub status: String,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    pub product_name: String,
    pub variant_info: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CustomerInfo {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub session_id: String,
    #[validate]
    pub customer: CustomerInfo,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    pub user_id: Option<Uuid>,
    #[serde(rename = "eventSourceUrl")]
    pub event_source_url: Option<String>,
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
}

fn default_payment_method() -> String {
    "whatsapp".to_string()
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order: OrderRow,
    pub items: Vec<OrderItemRow>,
    pub whatsapp_link: Option<String>,
}

pub async fn checkout(
    State(s): State<AppState>,
    request: RequestContext,
    Json(body): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let rows = sqlx::query_as::<_, super::cart::CartLineRow>(
        "SELECT * FROM cart_items WHERE session_id = $1 ORDER BY created_at ASC",
    )
    .bind(&body.session_id)
    .fetch_all(&s.db)
    .await?;
    if rows.is_empty() {
        return Err(AppError::Validation("cart is empty".into()));
    }

    let cart = to_domain_cart(&body.session_id, &rows);
    let items: Vec<OrderItem> = cart
        .lines()
        .iter()
        .map(|line| OrderItem {
            product_id: line.product_id,
            product_name: line.name.clone(),
            quantity: line.quantity,
            price: line.unit_price.clone(),
            variant_info: serde_json::json!({
                "purchase_type": line.purchase_type.as_str(),
                "color": line.selected_color,
                "condition": line.selected_condition,
                "variant": line.selected_variant,
            }),
        })
        .collect();

    let customer_info =
        serde_json::to_value(&body.customer).map_err(|e| AppError::Internal(e.to_string()))?;
    let mut order =
        Order::place(body.user_id, customer_info, &body.payment_method, items, DEFAULT_CURRENCY)
            .map_err(|e| AppError::Validation(e.to_string()))?;

    let mut tx = s.db.begin().await?;
    let order_row = sqlx::query_as::<_, OrderRow>(
        "INSERT INTO orders (id, user_id, customer_info, total, currency, status, payment_method, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) RETURNING *",
    )
    .bind(order.id())
    .bind(order.user_id())
    .bind(order.customer_info())
    .bind(order.total().amount())
    .bind(order.total().currency())
    .bind(order.status().as_str())
    .bind(order.payment_method())
    .fetch_one(&mut *tx)
    .await?;
    for item in order.items() {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, quantity, price, product_name, variant_info) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::now_v7())
        .bind(order.id())
        .bind(item.product_id)
        .bind(item.quantity as i32)
        .bind(item.price.amount())
        .bind(&item.product_name)
        .bind(&item.variant_info)
        .execute(&mut *tx)
        .await?;
    }
    // Cart is cleared wholesale as part of the same transaction.
    sqlx::query("DELETE FROM cart_items WHERE session_id = $1")
        .bind(&body.session_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    publish_events(&s.nats, order.take_events()).await;

    let item_rows = sqlx::query_as::<_, OrderItemRow>(
        "SELECT * FROM order_items WHERE order_id = $1",
    )
    .bind(order.id())
    .fetch_all(&s.db)
    .await?;

    // Purchase tracking rides along but never gates checkout.
    spawn_purchase_tracking(&s, &body, &order_row, &item_rows, request);

    let whatsapp_link = s.config.whatsapp_phone.as_deref().map(|phone| {
        whatsapp::order_link(phone, &order_row.id.to_string(), order_row.total, &order_row.currency)
    });

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse { order: order_row, items: item_rows, whatsapp_link }),
    ))
}

fn spawn_purchase_tracking(
    s: &AppState,
    body: &CheckoutRequest,
    order: &OrderRow,
    items: &[OrderItemRow],
    request: RequestContext,
) {
    let Some(url) = body.event_source_url.clone().filter(|u| !u.trim().is_empty()) else {
        warn!(order_id = %order.id, "checkout without event source url, purchase not tracked");
        return;
    };
    let tracker = s.tracker.clone();
    let order_info = OrderInfo {
        id: order.id.to_string(),
        total: Some(order.total),
        items: items
            .iter()
            .map(|i| OrderItemInfo {
                product_id: i.product_id.to_string(),
                quantity: i.quantity.max(0) as u32,
                price: Some(i.price),
                product_name: Some(i.product_name.clone()),
            })
            .collect(),
    };
    let user = RawUser {
        email: body.customer.email.clone(),
        phone: body.customer.phone.clone(),
        city: body.customer.city.clone(),
        state: body.customer.state.clone(),
        zip: body.customer.zip.clone(),
        user_id: body.user_id.map(|u| u.to_string()),
        ..Default::default()
    };
    let event_id = body.event_id.clone();
    tokio::spawn(async move {
        let data = builders::purchase(&order_info);
        tracker
            .track(
                EventName::Purchase,
                Some(data),
                TrackContext { user, request, event_source_url: url, event_id },
            )
            .await;
    });
}

async fn publish_events(nats: &Option<async_nats::Client>, events: Vec<DomainEvent>) {
    let Some(client) = nats else { return };
    for event in events {
        let DomainEvent::Order(ref order_event) = event;
        let subject = order_event.subject();
        match serde_json::to_vec(&event) {
            Ok(payload) => {
                if let Err(e) = client.publish(subject, payload.into()).await {
                    warn!(subject, error = %e, "order event publish failed");
                }
            }
            Err(e) => warn!(subject, error = %e, "order event serialization failed"),
        }
    }
}

pub async fn list_orders(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<OrderRow>>, AppError> {
    let orders = sqlx::query_as::<_, OrderRow>(
        "SELECT * FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(p.per_page() as i64)
    .bind(p.offset())
    .fetch_all(&s.db)
    .await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders").fetch_one(&s.db).await?;
    Ok(Json(PaginatedResponse { data: orders, total: total.0, page: p.page() }))
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderRow,
    pub items: Vec<OrderItemRow>,
}

pub async fn get_order(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetail>, AppError> {
    let order = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(AppError::NotFound("order"))?;
    let items = sqlx::query_as::<_, OrderItemRow>("SELECT * FROM order_items WHERE order_id = $1")
        .bind(id)
        .fetch_all(&s.db)
        .await?;
    Ok(Json(OrderDetail { order, items }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_status(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateStatusRequest>,
) -> Result<Json<OrderRow>, AppError> {
    let next = r
        .status
        .parse::<OrderStatus>()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let order = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(AppError::NotFound("order"))?;
    let current: OrderStatus = order
        .status
        .parse()
        .map_err(|_| AppError::Internal(format!("stored status is invalid: {}", order.status)))?;
    if !current.can_transition_to(next) {
        return Err(AppError::InvalidTransition(format!("{current} -> {next}")));
    }
    let refreshed = sqlx::query_as::<_, OrderRow>(
        "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(next.as_str())
    .fetch_one(&s.db)
    .await?;

    let event = match next {
        OrderStatus::Confirmed => Some(DomainEvent::Order(OrderEvent::Confirmed {
            order_id: id.to_string(),
            total: refreshed.total,
        })),
        OrderStatus::Cancelled => {
            Some(DomainEvent::Order(OrderEvent::Cancelled { order_id: id.to_string() }))
        }
        _ => None,
    };
    if let Some(event) = event {
        publish_events(&s.nats, vec![event]).await;
    }
    Ok(Json(refreshed))
}
