//! Response types for the reconciliation API.
//!
//! This module defines the error response structures and the mapping from
//! engine errors to HTTP status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::Watermark;

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates an unknown tenant error response.
    pub fn unknown_tenant(tenant_id: &str) -> Self {
        Self::with_details(
            "UNKNOWN_TENANT",
            format!("Unknown tenant: {}", tenant_id),
            format!("No reconciliation engine is registered for tenant '{}'", tenant_id),
        )
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let status = match &error {
            EngineError::InvalidRange { .. } => StatusCode::BAD_REQUEST,
            EngineError::RunInProgress { .. } => StatusCode::CONFLICT,
            EngineError::SourceFetchFailure { .. } | EngineError::SinkWriteFailure { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let details = match &error {
            EngineError::InvalidRange { .. } => {
                "The requested shift dates cannot be reprocessed".to_string()
            }
            EngineError::RunInProgress { .. } => {
                "Retry once the current run for this tenant has finished".to_string()
            }
            EngineError::SinkWriteFailure { .. } => {
                "The watermark was not advanced; the next run retries these punches".to_string()
            }
            EngineError::SourceFetchFailure { .. } => "Nothing was written".to_string(),
            _ => "The engine is misconfigured or hit an unexpected state".to_string(),
        };

        ApiErrorResponse {
            status,
            error: ApiError::with_details(error.code(), error.to_string(), details),
        }
    }
}

/// Response body for `GET /tenants/:tenant_id/watermark`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkResponse {
    /// The tenant.
    pub tenant_id: String,
    /// Timestamp of the newest punch reconciled so far; null before the first run.
    pub watermark: Watermark,
}
