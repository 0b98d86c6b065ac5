//! HTTP surface: storefront API plus the conversion-tracking endpoints.

pub mod cart;
pub mod catalog;
pub mod orders;
pub mod tracking;

use std::sync::Arc;

use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::tracking::DualTracker;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub nats: Option<async_nats::Client>,
    pub tracker: Arc<DualTracker>,
    pub config: Arc<Config>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/facebook/track-view", post(tracking::track_view))
        .route("/api/facebook/track-add-to-cart", post(tracking::track_add_to_cart))
        .route("/api/facebook/track-checkout", post(tracking::track_checkout))
        .route("/api/facebook/track-purchase", post(tracking::track_purchase))
        .route("/api/facebook/track-registration", post(tracking::track_registration))
        .route("/api/facebook/matching/clear", post(tracking::clear_matching))
        .route("/api/v1/products", get(catalog::list_products).post(catalog::create_product))
        .route(
            "/api/v1/products/:id",
            get(catalog::get_product).put(catalog::update_product).delete(catalog::archive_product),
        )
        .route(
            "/api/v1/cart/:session",
            get(cart::get_cart).post(cart::add_to_cart).delete(cart::clear_cart),
        )
        .route("/api/v1/cart/:session/items", put(cart::set_quantity))
        .route("/api/v1/checkout", post(orders::checkout))
        .route("/api/v1/orders", get(orders::list_orders))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/api/v1/orders/:id/status", patch(orders::update_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "tienda-storefront"}))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

impl ListParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(20).min(100)
    }
    pub fn offset(&self) -> i64 {
        ((self.page() - 1) * self.per_page()) as i64
    }
}
