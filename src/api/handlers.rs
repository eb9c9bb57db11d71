//! HTTP request handlers for the reconciliation API.
//!
//! This module contains the handler functions for all API endpoints.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineError;

use super::request::{ReprocessRequest, RunRequest};
use super::response::{ApiError, ApiErrorResponse, WatermarkResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/tenants/:tenant_id/runs", post(run_handler))
        .route("/tenants/:tenant_id/reprocess", post(reprocess_handler))
        .route("/tenants/:tenant_id/watermark", get(watermark_handler))
        .with_state(state)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

fn unknown_tenant(correlation_id: Uuid, tenant_id: &str) -> Response {
    warn!(correlation_id = %correlation_id, tenant_id, "Unknown tenant");
    json_response(StatusCode::NOT_FOUND, ApiError::unknown_tenant(tenant_id))
}

fn engine_error(correlation_id: Uuid, tenant_id: &str, error: EngineError) -> Response {
    warn!(
        correlation_id = %correlation_id,
        tenant_id,
        error = %error,
        "Reconciliation failed"
    );
    let api_error: ApiErrorResponse = error.into();
    json_response(api_error.status, api_error.error)
}

fn rejection_error(correlation_id: Uuid, rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            // Get the body text which contains the detailed error from serde
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Handler for POST /tenants/:tenant_id/runs.
///
/// Runs an incremental reconciliation from the tenant's stored watermark
/// and stores the new watermark if every write succeeded. A request without
/// a JSON body runs at the server's local time.
async fn run_handler(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Response {
    // Generate correlation ID for request tracking
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, tenant_id = %tenant_id, "Processing run request");

    let Some(engine) = state.engine(&tenant_id) else {
        return unknown_tenant(correlation_id, &tenant_id);
    };

    let request = match payload {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => RunRequest::default(),
        Err(rejection) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                rejection_error(correlation_id, rejection),
            );
        }
    };
    let now = request.now.unwrap_or_else(local_now);

    let watermark = state.watermark(&tenant_id).await;
    match engine.run_incremental(&tenant_id, watermark, now).await {
        Ok(summary) => {
            state.set_watermark(&tenant_id, summary.watermark_after).await;
            info!(
                correlation_id = %correlation_id,
                tenant_id = %tenant_id,
                run_id = %summary.run_id,
                upserted = summary.counts.upserted,
                watermark = %summary.watermark_after,
                duration_us = summary.duration_us,
                "Run request completed"
            );
            json_response(StatusCode::OK, summary)
        }
        Err(error) => engine_error(correlation_id, &tenant_id, error),
    }
}

/// Handler for POST /tenants/:tenant_id/reprocess.
///
/// Reassembles and reclassifies an explicit range of shift dates. The
/// tenant's watermark is left alone.
async fn reprocess_handler(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    payload: Result<Json<ReprocessRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, tenant_id = %tenant_id, "Processing reprocess request");

    let Some(engine) = state.engine(&tenant_id) else {
        return unknown_tenant(correlation_id, &tenant_id);
    };

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                rejection_error(correlation_id, rejection),
            );
        }
    };
    let now = request.now.unwrap_or_else(local_now);

    match engine
        .reprocess(&tenant_id, request.from, request.to, now)
        .await
    {
        Ok(summary) => {
            info!(
                correlation_id = %correlation_id,
                tenant_id = %tenant_id,
                run_id = %summary.run_id,
                upserted = summary.counts.upserted,
                duration_us = summary.duration_us,
                "Reprocess request completed"
            );
            json_response(StatusCode::OK, summary)
        }
        Err(error) => engine_error(correlation_id, &tenant_id, error),
    }
}

/// Handler for GET /tenants/:tenant_id/watermark.
async fn watermark_handler(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    if state.engine(&tenant_id).is_none() {
        return unknown_tenant(correlation_id, &tenant_id);
    }

    let watermark = state.watermark(&tenant_id).await;
    json_response(
        StatusCode::OK,
        WatermarkResponse {
            tenant_id,
            watermark,
        },
    )
}
