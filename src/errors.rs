use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error payload returned to API clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Additional error details (validation errors in dev mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

/// Input problems detected before any storage mutation.
///
/// Every variant renders the message shown to the end user; the structured
/// fields exist so callers and tests do not have to parse strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ValidationFailure {
    /// The batch contained no lines at all.
    EmptyBatch,
    /// A line was missing its item or quantity (1-based row number).
    MissingField { row: usize },
    /// A line quantity was zero or negative.
    NonPositiveQuantity { row: usize },
    /// The same item appeared twice in one batch.
    DuplicateItem { row: usize, item_id: i64 },
    /// One or more referenced items do not exist.
    UnknownItems,
    /// Issuance was submitted without a resolvable staff member.
    MissingStaff,
    /// A unit of measurement outside the accepted set.
    UnknownUnit { value: String },
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyBatch => write!(f, "At least one item is required."),
            Self::MissingField { row } => {
                write!(f, "Row {}: Item and quantity are required.", row)
            }
            Self::NonPositiveQuantity { row } => {
                write!(f, "Row {}: Quantity must be greater than zero.", row)
            }
            Self::DuplicateItem { row, item_id } => {
                write!(f, "Row {}: Duplicate item selected (item_id={}).", row, item_id)
            }
            Self::UnknownItems => write!(f, "One or more items do not exist."),
            Self::MissingStaff => write!(f, "Staff is required."),
            Self::UnknownUnit { value } => {
                write!(f, "Unknown unit of measurement: {}.", value)
            }
        }
    }
}

/// Why a reversal was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReversalFailure {
    AlreadyReversed {
        issuance_id: i64,
    },
    WindowExpired {
        issuance_id: i64,
        deadline: chrono::DateTime<chrono::Utc>,
    },
}

impl std::fmt::Display for ReversalFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyReversed { .. } => {
                write!(f, "This issuance has already been reversed.")
            }
            Self::WindowExpired { .. } => write!(f, "Reversal window has expired."),
        }
    }
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(ValidationFailure),

    #[error("Not enough stock for {item_name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        item_id: i64,
        item_name: String,
        available: i32,
        requested: i32,
    },

    #[error("{0}")]
    Reversal(ReversalFailure),

    /// A best-effort audit append failed after the primary mutation
    /// committed. Logged for operators, never surfaced to callers.
    #[error("Audit logging error: {0}")]
    AuditLogging(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::BadRequest(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    pub fn validation(failure: ValidationFailure) -> Self {
        ServiceError::Validation(failure)
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Reversal(_) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::AuditLogging(_)
            | Self::EventError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::AuditLogging(_) | Self::EventError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = self.response_message();

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: error_message,
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
