use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::services::reports::{
    render_csv, report_window_open, WeeklyReportRow, REPORT_WINDOW_LABEL,
};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct WeeklyReportQuery {
    /// "json" (default) or "csv"
    pub format: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WeeklyReportResponse {
    /// False outside the viewing window; rows are withheld until the week
    /// has ended.
    pub open: bool,
    pub window: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<WeeklyReportRow>>,
}

/// Create the reports router
pub fn reports_routes() -> Router<AppState> {
    Router::new().route("/weekly", get(weekly_report))
}

async fn weekly_report(
    State(state): State<AppState>,
    Query(query): Query<WeeklyReportQuery>,
) -> Result<Response, ServiceError> {
    let now = Utc::now();
    let wants_csv = query.format.as_deref() == Some("csv");

    if !report_window_open(now) {
        if wants_csv {
            return Err(ServiceError::Conflict(format!(
                "Weekly report is only available {}.",
                REPORT_WINDOW_LABEL
            )));
        }

        let body = WeeklyReportResponse {
            open: false,
            window: REPORT_WINDOW_LABEL.to_string(),
            start: None,
            end: None,
            rows: None,
        };
        return Ok(Json(ApiResponse::success(body)).into_response());
    }

    let report = state.reports.weekly_usage(now).await?;

    if wants_csv {
        let filename = format!(
            "weekly_report_{}_to_{}.csv",
            report.start.date_naive(),
            report.end.date_naive()
        );
        let csv = render_csv(&report.rows);

        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                ),
            ],
            csv,
        )
            .into_response());
    }

    let body = WeeklyReportResponse {
        open: true,
        window: REPORT_WINDOW_LABEL.to_string(),
        start: Some(report.start),
        end: Some(report.end),
        rows: Some(report.rows),
    };

    Ok(Json(ApiResponse::success(body)).into_response())
}
