//! Consumer error taxonomy and HTTP status mapping (spec §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

use order_domain::OrderIdError;

/// Top-level consumer error.
#[derive(Debug, Error)]
pub enum OrderServiceError {
    /// Malformed request (bad/missing orderId).
    #[error("validation failed: {0}")]
    Validation(String),
    /// No processed order is held for the requested id.
    #[error("order not found: {0}")]
    OrderNotFound(String),
}

impl From<OrderIdError> for OrderServiceError {
    fn from(err: OrderIdError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl OrderServiceError {
    /// HTTP status this error maps to (spec §6/§7).
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::OrderNotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

/// Wire shape of an error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for OrderServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: error_reason(&self),
            message: self.to_string(),
        };
        tracing::warn!(status = %status, error = %self, "request failed");
        (status, Json(body)).into_response()
    }
}

fn error_reason(err: &OrderServiceError) -> String {
    match err {
        OrderServiceError::Validation(_) => "VALIDATION".to_string(),
        OrderServiceError::OrderNotFound(_) => "ORDER_NOT_FOUND".to_string(),
    }
}
