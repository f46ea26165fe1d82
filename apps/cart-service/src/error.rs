//! Producer error taxonomy and HTTP status mapping (spec §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

use crate::broker::publish_engine::FailureKind;
use crate::domain::OrderStoreError;
use order_domain::OrderIdError;
use order_domain::TransitionError;

/// Top-level producer error.
#[derive(Debug, Error)]
pub enum CartServiceError {
    /// Malformed request (bad orderId, missing/invalid field).
    #[error("validation failed: {0}")]
    Validation(String),
    /// `createTentative` found the key already present.
    #[error("duplicate order: {0}")]
    DuplicateOrder(String),
    /// `updateTentative` found the key absent.
    #[error("order not found: {0}")]
    OrderNotFound(String),
    /// The requested transition is not permitted by the state machine.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    /// The requested status equals the current status.
    #[error("status conflict: order already in requested status")]
    StatusConflict,
    /// `PublishEngine` reported a definitive publish failure.
    #[error("publish failed: {0}")]
    PublishFailed(#[from] FailureKind),
}

impl From<OrderIdError> for CartServiceError {
    fn from(err: OrderIdError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<TransitionError> for CartServiceError {
    fn from(err: TransitionError) -> Self {
        if err.from.0 == Some(err.to) {
            Self::StatusConflict
        } else {
            Self::InvalidTransition(err.reason)
        }
    }
}

impl From<OrderStoreError> for CartServiceError {
    fn from(err: OrderStoreError) -> Self {
        match err {
            OrderStoreError::DuplicateOrder(id) => Self::DuplicateOrder(id),
            OrderStoreError::OrderNotFound(id) => Self::OrderNotFound(id),
        }
    }
}

impl CartServiceError {
    /// HTTP status this error maps to (spec §6/§7).
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateOrder(_) => StatusCode::CONFLICT,
            Self::OrderNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition(_) | Self::StatusConflict => StatusCode::CONFLICT,
            Self::PublishFailed(kind) => kind.status_code(),
        }
    }
}

/// Wire shape of an error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for CartServiceError {
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

fn error_reason(err: &CartServiceError) -> String {
    match err {
        CartServiceError::Validation(_) => "VALIDATION".to_string(),
        CartServiceError::DuplicateOrder(_) => "DUPLICATE_ORDER".to_string(),
        CartServiceError::OrderNotFound(_) => "ORDER_NOT_FOUND".to_string(),
        CartServiceError::InvalidTransition(_) => "INVALID_TRANSITION".to_string(),
        CartServiceError::StatusConflict => "STATUS_CONFLICT".to_string(),
        CartServiceError::PublishFailed(kind) => kind.reason().to_string(),
    }
}
