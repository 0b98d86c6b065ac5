//! Product catalog endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

use super::{AppState, ListParams, PaginatedResponse};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub package_price: Option<Decimal>,
    pub bulk_price: Option<Decimal>,
    pub currency: String,
    pub colors: Vec<String>,
    pub conditions: Vec<String>,
    pub variants: Vec<String>,
    pub stock: i32,
    pub status: String,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn list_products(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<ProductRow>>, AppError> {
    let products = sqlx::query_as::<_, ProductRow>(
        "SELECT * FROM products WHERE status = 'active' ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(p.per_page() as i64)
    .bind(p.offset())
    .fetch_all(&s.db)
    .await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE status = 'active'")
        .fetch_one(&s.db)
        .await?;
    Ok(Json(PaginatedResponse { data: products, total: total.0, page: p.page() }))
}

pub async fn get_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductRow>, AppError> {
    sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("product"))
}

#[derive(Debug, Deserialize)]
pub struct UpsertProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub package_price: Option<Decimal>,
    pub bulk_price: Option<Decimal>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub variants: Vec<String>,
    pub stock: Option<i32>,
    #[serde(default)]
    pub images: Vec<String>,
}

pub async fn create_product(
    State(s): State<AppState>,
    Json(r): Json<UpsertProductRequest>,
) -> Result<(StatusCode, Json<ProductRow>), AppError> {
    if r.name.trim().is_empty() {
        return Err(AppError::MissingField("name"));
    }
    let product = sqlx::query_as::<_, ProductRow>(
        "INSERT INTO products (id, name, description, price, package_price, bulk_price, currency, colors, conditions, variants, stock, status, images, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, 'ARS', $7, $8, $9, $10, 'active', $11, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&r.name)
    .bind(&r.description)
    .bind(r.price)
    .bind(r.package_price)
    .bind(r.bulk_price)
    .bind(&r.colors)
    .bind(&r.conditions)
    .bind(&r.variants)
    .bind(r.stock.unwrap_or(0))
    .bind(&r.images)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<UpsertProductRequest>,
) -> Result<Json<ProductRow>, AppError> {
    sqlx::query_as::<_, ProductRow>(
        "UPDATE products SET name = $2, description = $3, price = $4, package_price = $5, bulk_price = $6, colors = $7, conditions = $8, variants = $9, stock = $10, images = $11, updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&r.name)
    .bind(&r.description)
    .bind(r.price)
    .bind(r.package_price)
    .bind(r.bulk_price)
    .bind(&r.colors)
    .bind(&r.conditions)
    .bind(&r.variants)
    .bind(r.stock.unwrap_or(0))
    .bind(&r.images)
    .fetch_optional(&s.db)
    .await?
    .map(Json)
    .ok_or(AppError::NotFound("product"))
}

pub async fn archive_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("UPDATE products SET status = 'archived', updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("product"));
    }
    Ok(StatusCode::NO_CONTENT)
}
