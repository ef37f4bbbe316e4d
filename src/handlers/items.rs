use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::entities::item::{self, UnitOfMeasure};
use crate::errors::{ServiceError, ValidationFailure};
use crate::services::items::{NewItem, UpdateItem};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub category_id: i64,
    /// Opening balance for a freshly catalogued item
    #[serde(default)]
    pub initial_quantity: i32,
    pub description: Option<String>,
    /// One of: pkts, pcs, bundles, dozen, pairs, rolls
    pub unit_of_measurement: String,
    #[serde(default)]
    pub reorder_level: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub description: Option<String>,
    pub unit_of_measurement: Option<String>,
    pub reorder_level: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemResponse {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    pub quantity: i32,
    pub description: Option<String>,
    pub unit_of_measurement: String,
    pub reorder_level: i32,
    /// Derived: "In Stock", "Low Stock" or "Out of Stock"
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<item::Model> for ItemResponse {
    fn from(model: item::Model) -> Self {
        let status = model.status().as_str().to_string();
        Self {
            id: model.id,
            name: model.name,
            category_id: model.category_id,
            quantity: model.quantity,
            description: model.description,
            unit_of_measurement: model.unit_of_measurement,
            reorder_level: model.reorder_level,
            status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ItemListQuery {
    #[serde(default = "crate::default_page")]
    pub page: u64,
    #[serde(default = "crate::default_limit")]
    pub limit: u64,
    pub search: Option<String>,
    pub category_id: Option<i64>,
}

fn parse_unit(raw: &str) -> Result<UnitOfMeasure, ServiceError> {
    UnitOfMeasure::from_str(raw).ok_or_else(|| {
        ServiceError::Validation(ValidationFailure::UnknownUnit {
            value: raw.to_string(),
        })
    })
}

/// Create the items router
pub fn items_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/low-stock", get(low_stock_items))
        .route("/out-of-stock", get(out_of_stock_items))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
}

async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemListQuery>,
) -> ApiResult<PaginatedResponse<ItemResponse>> {
    let (items, total) = state
        .items
        .list(query.page, query.limit, query.search, query.category_id)
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items.into_iter().map(ItemResponse::from).collect(),
        total,
        query.page,
        query.limit,
    ))))
}

async fn get_item(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<ItemResponse> {
    let item = state.items.get(id).await?;
    Ok(Json(ApiResponse::success(item.into())))
}

async fn create_item(
    State(state): State<AppState>,
    Json(req): Json<CreateItemRequest>,
) -> ApiResult<ItemResponse> {
    req.validate()?;
    let unit = parse_unit(&req.unit_of_measurement)?;

    let created = state
        .items
        .create(
            NewItem {
                name: req.name,
                category_id: req.category_id,
                initial_quantity: req.initial_quantity,
                description: req.description,
                unit_of_measurement: unit,
                reorder_level: req.reorder_level,
            },
            Utc::now(),
        )
        .await?;

    Ok(Json(ApiResponse::success(created.into())))
}

async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateItemRequest>,
) -> ApiResult<ItemResponse> {
    req.validate()?;

    let unit = match req.unit_of_measurement.as_deref() {
        Some(raw) => Some(parse_unit(raw)?),
        None => None,
    };

    let updated = state
        .items
        .update(
            id,
            UpdateItem {
                name: req.name,
                category_id: req.category_id,
                description: req.description.map(Some),
                unit_of_measurement: unit,
                reorder_level: req.reorder_level,
            },
            Utc::now(),
        )
        .await?;

    Ok(Json(ApiResponse::success(updated.into())))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    state.items.delete(id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}

async fn low_stock_items(State(state): State<AppState>) -> ApiResult<Vec<ItemResponse>> {
    let items = state.items.low_stock().await?;
    Ok(Json(ApiResponse::success(
        items.into_iter().map(ItemResponse::from).collect(),
    )))
}

async fn out_of_stock_items(State(state): State<AppState>) -> ApiResult<Vec<ItemResponse>> {
    let items = state.items.out_of_stock().await?;
    Ok(Json(ApiResponse::success(
        items.into_iter().map(ItemResponse::from).collect(),
    )))
}
