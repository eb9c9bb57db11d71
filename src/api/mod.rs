//! HTTP API module for the attendance reconciler.
//!
//! This module exposes the REST endpoints that trigger incremental runs and
//! manual reprocessing per tenant, and report each tenant's watermark.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{ReprocessRequest, RunRequest};
pub use response::{ApiError, ApiErrorResponse, WatermarkResponse};
pub use state::AppState;
