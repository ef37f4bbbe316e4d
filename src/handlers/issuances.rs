use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;
use validator::Validate;

use crate::entities::{issuance, issuance_line};
use crate::errors::ServiceError;
use crate::services::issuance::NewIssuance;
use crate::services::StockLine;
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IssuanceLineRequest {
    pub item_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateIssuanceRequest {
    /// Staff member receiving the stock
    pub staff_id: i64,
    /// Operator performing the issuance
    pub issued_by: i64,
    pub lines: Vec<IssuanceLineRequest>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReverseIssuanceRequest {
    /// Operator undoing the issuance
    pub reversed_by: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IssuanceListQuery {
    #[serde(default = "crate::default_page")]
    pub page: u64,
    #[serde(default = "crate::default_limit")]
    pub limit: u64,
    pub department_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IssuanceLineResponse {
    pub item_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IssuanceResponse {
    pub id: i64,
    pub staff_id: i64,
    pub issued_by: i64,
    pub comment: String,
    pub issued_at: DateTime<Utc>,
    pub is_reversed: bool,
    pub reversed_at: Option<DateTime<Utc>>,
    pub reversed_by: Option<i64>,
    /// Derived: "Active", "Locked" or "Reversed"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<IssuanceLineResponse>>,
}

impl IssuanceResponse {
    fn from_header(model: issuance::Model, now: DateTime<Utc>) -> Self {
        let status = model.status_at(now).as_str().to_string();
        Self {
            id: model.id,
            staff_id: model.staff_id,
            issued_by: model.issued_by,
            comment: model.comment,
            issued_at: model.issued_at,
            is_reversed: model.is_reversed,
            reversed_at: model.reversed_at,
            reversed_by: model.reversed_by,
            status,
            lines: None,
        }
    }

    fn with_lines(
        model: issuance::Model,
        lines: Vec<issuance_line::Model>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut resp = Self::from_header(model, now);
        resp.lines = Some(
            lines
                .into_iter()
                .map(|l| IssuanceLineResponse {
                    item_id: l.item_id,
                    quantity: l.quantity,
                })
                .collect(),
        );
        resp
    }
}

/// Create the issuances router
pub fn issuances_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_issuances).post(create_issuance))
        .route("/:id", get(get_issuance))
        .route("/:id/reverse", post(reverse_issuance))
}

async fn create_issuance(
    State(state): State<AppState>,
    Json(req): Json<CreateIssuanceRequest>,
) -> ApiResult<IssuanceResponse> {
    req.validate()?;

    let now = Utc::now();
    let input = NewIssuance {
        staff_id: req.staff_id,
        issued_by: req.issued_by,
        lines: req
            .lines
            .iter()
            .map(|l| StockLine {
                item_id: l.item_id,
                quantity: l.quantity,
            })
            .collect(),
        comment: req.comment,
    };

    match state.issuances.create_issuance(input, now).await {
        Ok(header) => Ok(Json(ApiResponse::success(IssuanceResponse::from_header(
            header, now,
        )))),
        Err(err) => {
            // Rejected batches stay auditable; the failed-attempt record is
            // deliberately outside the rolled-back transaction.
            if matches!(
                err,
                ServiceError::Validation(_) | ServiceError::InsufficientStock { .. }
            ) {
                if let Err(log_err) = state
                    .issuances
                    .record_failed_issuance(req.issued_by, &err.to_string(), now)
                    .await
                {
                    warn!("Failed to record rejected issuance: {}", log_err);
                }
            }
            Err(err)
        }
    }
}

async fn list_issuances(
    State(state): State<AppState>,
    Query(query): Query<IssuanceListQuery>,
) -> ApiResult<PaginatedResponse<IssuanceResponse>> {
    let now = Utc::now();
    let (headers, total) = state
        .issuances
        .list(query.page, query.limit, query.department_id)
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        headers
            .into_iter()
            .map(|h| IssuanceResponse::from_header(h, now))
            .collect(),
        total,
        query.page,
        query.limit,
    ))))
}

async fn get_issuance(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<IssuanceResponse> {
    let now = Utc::now();
    let (header, lines) = state.issuances.get_with_lines(id).await?;
    Ok(Json(ApiResponse::success(IssuanceResponse::with_lines(
        header, lines, now,
    ))))
}

async fn reverse_issuance(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ReverseIssuanceRequest>,
) -> ApiResult<IssuanceResponse> {
    let now = Utc::now();
    let header = state
        .reversals
        .reverse_issuance(id, req.reversed_by, now)
        .await?;

    Ok(Json(ApiResponse::success(IssuanceResponse::from_header(
        header, now,
    ))))
}
