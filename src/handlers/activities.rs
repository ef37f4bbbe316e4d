use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::entities::activity;
use crate::{ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse};

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityResponse {
    pub id: i64,
    pub actor_id: i64,
    pub verb: String,
    pub target_type: String,
    pub target_id: i64,
    pub summary: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<activity::Model> for ActivityResponse {
    fn from(model: activity::Model) -> Self {
        Self {
            id: model.id,
            actor_id: model.actor_id,
            verb: model.verb,
            target_type: model.target_type,
            target_id: model.target_id,
            summary: model.summary,
            metadata: model.metadata,
            created_at: model.created_at,
        }
    }
}

/// Create the activities router
pub fn activities_routes() -> Router<AppState> {
    Router::new().route("/", get(list_activities))
}

async fn list_activities(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<ActivityResponse>> {
    let (entries, total) = state.activities.list(query.page, query.limit).await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        entries.into_iter().map(ActivityResponse::from).collect(),
        total,
        query.page,
        query.limit,
    ))))
}
