//! Conversion-tracking endpoints consumed by the storefront client.
//!
//! Each endpoint validates its domain payload before any dispatch, then
//! answers 200 `{success, data}` regardless of delivery outcome; tracking
//! failures stay invisible to the shopper. Missing required fields answer
//! 400; wrong methods answer 405 via method routing.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::tracking::builders::{self, CartInfo, OrderInfo, ProductInfo};
use crate::tracking::{CapiResponse, EventName, RawUser, RequestContext, TrackContext};

use super::AppState;

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub success: bool,
    pub data: Option<CapiResponse>,
}

#[derive(Debug, Deserialize)]
pub struct TrackViewRequest {
    pub product: Option<ProductInfo>,
    #[serde(default)]
    pub user: RawUser,
    #[serde(rename = "eventSourceUrl")]
    pub event_source_url: Option<String>,
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrackAddToCartRequest {
    pub product: Option<ProductInfo>,
    pub quantity: Option<u32>,
    #[serde(default)]
    pub user: RawUser,
    #[serde(rename = "eventSourceUrl")]
    pub event_source_url: Option<String>,
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrackCheckoutRequest {
    pub cart: Option<CartInfo>,
    #[serde(default)]
    pub user: RawUser,
    #[serde(rename = "eventSourceUrl")]
    pub event_source_url: Option<String>,
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrackPurchaseRequest {
    pub order: Option<OrderInfo>,
    #[serde(default)]
    pub user: RawUser,
    #[serde(rename = "eventSourceUrl")]
    pub event_source_url: Option<String>,
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrackRegistrationRequest {
    pub user: Option<RawUser>,
    #[serde(rename = "eventSourceUrl")]
    pub event_source_url: Option<String>,
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
}

fn require_url(url: Option<String>) -> Result<String, AppError> {
    url.filter(|u| !u.trim().is_empty()).ok_or(AppError::MissingField("eventSourceUrl"))
}

fn track_context(
    user: RawUser,
    request: RequestContext,
    event_source_url: String,
    event_id: Option<String>,
) -> TrackContext {
    TrackContext { user, request, event_source_url, event_id }
}

pub async fn track_view(
    State(state): State<AppState>,
    request: RequestContext,
    Json(body): Json<TrackViewRequest>,
) -> Result<Json<TrackResponse>, AppError> {
    let product = body.product.ok_or(AppError::MissingField("product"))?;
    let url = require_url(body.event_source_url)?;
    let data = builders::view_content(&product);
    let result = state
        .tracker
        .track(EventName::ViewContent, Some(data), track_context(body.user, request, url, body.event_id))
        .await;
    Ok(Json(TrackResponse { success: true, data: result }))
}

pub async fn track_add_to_cart(
    State(state): State<AppState>,
    request: RequestContext,
    Json(body): Json<TrackAddToCartRequest>,
) -> Result<Json<TrackResponse>, AppError> {
    let product = body.product.ok_or(AppError::MissingField("product"))?;
    let quantity = body.quantity.ok_or(AppError::MissingField("quantity"))?;
    let url = require_url(body.event_source_url)?;
    let data = builders::add_to_cart(&product, quantity);
    let result = state
        .tracker
        .track(EventName::AddToCart, Some(data), track_context(body.user, request, url, body.event_id))
        .await;
    Ok(Json(TrackResponse { success: true, data: result }))
}

pub async fn track_checkout(
    State(state): State<AppState>,
    request: RequestContext,
    Json(body): Json<TrackCheckoutRequest>,
) -> Result<Json<TrackResponse>, AppError> {
    let cart = body.cart.ok_or(AppError::MissingField("cart"))?;
    let url = require_url(body.event_source_url)?;
    let data = builders::initiate_checkout(&cart);
    let result = state
        .tracker
        .track(EventName::InitiateCheckout, Some(data), track_context(body.user, request, url, body.event_id))
        .await;
    Ok(Json(TrackResponse { success: true, data: result }))
}

pub async fn track_purchase(
    State(state): State<AppState>,
    request: RequestContext,
    Json(body): Json<TrackPurchaseRequest>,
) -> Result<Json<TrackResponse>, AppError> {
    let order = body.order.ok_or(AppError::MissingField("order"))?;
    let url = require_url(body.event_source_url)?;
    let data = builders::purchase(&order);
    let result = state
        .tracker
        .track(EventName::Purchase, Some(data), track_context(body.user, request, url, body.event_id))
        .await;
    Ok(Json(TrackResponse { success: true, data: result }))
}

pub async fn track_registration(
    State(state): State<AppState>,
    request: RequestContext,
    Json(body): Json<TrackRegistrationRequest>,
) -> Result<Json<TrackResponse>, AppError> {
    let user = body.user.ok_or(AppError::MissingField("user"))?;
    let url = require_url(body.event_source_url)?;
    let data = builders::complete_registration();
    let result = state
        .tracker
        .track(EventName::CompleteRegistration, Some(data), track_context(user, request, url, body.event_id))
        .await;
    Ok(Json(TrackResponse { success: true, data: result }))
}

/// Sign-out hook: drops the enhanced-matching identity.
pub async fn clear_matching(State(state): State<AppState>) -> Json<TrackResponse> {
    state.tracker.matching().clear(state.tracker.pixel());
    Json(TrackResponse { success: true, data: None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, MetaConfig};
    use crate::routes::{router, AppState};
    use crate::tracking::{CapiDispatcher, DisabledPixel, DualTracker};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn unconfigured_meta() -> MetaConfig {
        MetaConfig {
            pixel_id: None,
            access_token: None,
            test_event_code: None,
            graph_base: "http://127.0.0.1:9".into(),
            beacon_base: "http://127.0.0.1:9".into(),
        }
    }

    fn test_state() -> AppState {
        let meta = unconfigured_meta();
        let config = Config {
            database_url: "postgres://localhost/ignored".into(),
            port: 0,
            meta: meta.clone(),
            nats_url: None,
            whatsapp_phone: None,
        };
        // Lazy pool: no connection is made unless a query runs, and the
        // tracking routes never touch the database.
        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        AppState {
            db,
            nats: None,
            tracker: Arc::new(DualTracker::new(
                CapiDispatcher::new(meta).unwrap(),
                Arc::new(DisabledPixel),
            )),
            config: Arc::new(config),
        }
    }

    async fn send(app: axum::Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_missing_product_answers_400_with_error_body() {
        let app = router(test_state());
        let (status, body) = send(
            app,
            "/api/facebook/track-view",
            serde_json::json!({"eventSourceUrl": "https://tienda.example/p/1"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_missing_quantity_answers_400() {
        let app = router(test_state());
        let (status, _) = send(
            app,
            "/api/facebook/track-add-to-cart",
            serde_json::json!({
                "product": {"id": "5", "price": 100},
                "eventSourceUrl": "https://tienda.example/p/5"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_handled_request_succeeds_with_null_data_when_unconfigured() {
        let app = router(test_state());
        let (status, body) = send(
            app,
            "/api/facebook/track-view",
            serde_json::json!({
                "product": {"id": "5", "name": "Vaso", "price": 100},
                "eventSourceUrl": "https://tienda.example/p/5"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_wrong_method_answers_405() {
        let app = router(test_state());
        let response = app
            .oneshot(Request::get("/api/facebook/track-view").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
