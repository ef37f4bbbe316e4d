use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::entities::{stock_in, stock_in_line};
use crate::services::stock_in::NewStockIn;
use crate::services::StockLine;
use crate::{ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StockLineRequest {
    pub item_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStockInRequest {
    /// Operator recording the receipt
    pub received_by: i64,
    pub lines: Vec<StockLineRequest>,
    #[serde(default)]
    pub comment: String,
    /// Overrides the receive timestamp
    pub received_at: Option<DateTime<Utc>>,
    /// Opaque reference to an attached delivery document
    pub document: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockInLineResponse {
    pub item_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockInResponse {
    pub id: i64,
    pub received_by: i64,
    pub document: Option<String>,
    pub comment: String,
    pub received_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<StockInLineResponse>>,
}

impl StockInResponse {
    fn from_header(model: stock_in::Model) -> Self {
        Self {
            id: model.id,
            received_by: model.received_by,
            document: model.document,
            comment: model.comment,
            received_at: model.received_at,
            lines: None,
        }
    }

    fn with_lines(model: stock_in::Model, lines: Vec<stock_in_line::Model>) -> Self {
        let mut resp = Self::from_header(model);
        resp.lines = Some(
            lines
                .into_iter()
                .map(|l| StockInLineResponse {
                    item_id: l.item_id,
                    quantity: l.quantity,
                })
                .collect(),
        );
        resp
    }
}

/// Create the stock-ins router
pub fn stock_ins_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stock_ins).post(create_stock_in))
        .route("/:id", get(get_stock_in))
}

async fn create_stock_in(
    State(state): State<AppState>,
    Json(req): Json<CreateStockInRequest>,
) -> ApiResult<StockInResponse> {
    req.validate()?;

    let header = state
        .stock_ins
        .create_stock_in(
            NewStockIn {
                received_by: req.received_by,
                lines: req
                    .lines
                    .iter()
                    .map(|l| StockLine {
                        item_id: l.item_id,
                        quantity: l.quantity,
                    })
                    .collect(),
                comment: req.comment,
                received_at: req.received_at,
                document: req.document,
            },
            Utc::now(),
        )
        .await?;

    Ok(Json(ApiResponse::success(StockInResponse::from_header(
        header,
    ))))
}

async fn list_stock_ins(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<StockInResponse>> {
    let (headers, total) = state.stock_ins.list(query.page, query.limit).await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        headers
            .into_iter()
            .map(StockInResponse::from_header)
            .collect(),
        total,
        query.page,
        query.limit,
    ))))
}

async fn get_stock_in(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StockInResponse> {
    let (header, lines) = state.stock_ins.get_with_lines(id).await?;
    Ok(Json(ApiResponse::success(StockInResponse::with_lines(
        header, lines,
    ))))
}
