use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    /// Malformed or out-of-range request data; the caller must change the
    /// request before retrying.
    InvalidInput(String),
    /// Referenced campaign/tier/offer/profile does not exist.
    NotFound(String),
    /// No usable credential on the request.
    Unauthorized(String),
    /// Caller is authenticated but lacks authorization for the transition.
    Forbidden(String),
    /// The offer or campaign is not in a state compatible with the action.
    InvalidTransition(String),
    /// Tier was full at approval time; recoverable by retrying against a
    /// different tier or as a custom offer.
    CapacityExceeded(String),
    /// Campaign is COMPLETED/EXPIRED/CANCELLED and refuses new offers.
    CampaignNotAcceptingOffers(String),
    /// Storage-layer fault; safe to retry, all ledger operations are
    /// idempotent.
    StorageUnavailable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::InvalidTransition(msg) => write!(f, "Invalid transition: {}", msg),
            AppError::CapacityExceeded(msg) => write!(f, "Capacity exceeded: {}", msg),
            AppError::CampaignNotAcceptingOffers(msg) => {
                write!(f, "Campaign not accepting offers: {}", msg)
            }
            AppError::StorageUnavailable(msg) => write!(f, "Storage unavailable: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

// Storage faults surface as a single retryable kind, distinct from the
// user-facing taxonomy above.
impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::StorageUnavailable(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::InvalidTransition(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::CapacityExceeded(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::CampaignNotAcceptingOffers(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::StorageUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
