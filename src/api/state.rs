//! Application state for the reconciliation API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::engine::ReconciliationEngine;
use crate::models::Watermark;

/// Shared application state.
///
/// Holds one engine per tenant and the watermark each tenant's last
/// successful incremental run left behind.
#[derive(Clone, Default)]
pub struct AppState {
    /// Engines by tenant id.
    tenants: Arc<HashMap<String, Arc<ReconciliationEngine>>>,
    /// Persisted watermarks by tenant id.
    watermarks: Arc<RwLock<HashMap<String, Watermark>>>,
}

impl AppState {
    /// Creates a state with no tenants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `engine` to serve `tenant_id`.
    pub fn with_tenant(mut self, tenant_id: impl Into<String>, engine: ReconciliationEngine) -> Self {
        Arc::make_mut(&mut self.tenants).insert(tenant_id.into(), Arc::new(engine));
        self
    }

    /// The engine serving `tenant_id`, if the tenant is known.
    pub fn engine(&self, tenant_id: &str) -> Option<Arc<ReconciliationEngine>> {
        self.tenants.get(tenant_id).cloned()
    }

    /// The tenant's stored watermark; empty before the first successful run.
    pub async fn watermark(&self, tenant_id: &str) -> Watermark {
        self.watermarks
            .read()
            .await
            .get(tenant_id)
            .copied()
            .unwrap_or_default()
    }

    /// Stores the tenant's watermark.
    pub async fn set_watermark(&self, tenant_id: &str, watermark: Watermark) {
        self.watermarks
            .write()
            .await
            .insert(tenant_id.to_string(), watermark);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconConfig;
    use crate::engine::{InMemoryDirectory, InMemoryLedger, InMemoryPunchSource};
    use chrono::NaiveDateTime;

    #[test]
    fn test_app_state_is_clone() {
        // Verify AppState can be cloned (required for axum state)
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_unknown_tenant_has_no_engine() {
        let engine = ReconciliationEngine::new(
            ReconConfig::default(),
            Arc::new(InMemoryPunchSource::new()),
            Arc::new(InMemoryLedger::new()),
            Arc::new(InMemoryDirectory::default()),
        )
        .unwrap();
        let state = AppState::new().with_tenant("acme", engine);

        assert!(state.engine("acme").is_some());
        assert!(state.engine("globex").is_none());
    }

    #[tokio::test]
    async fn test_watermarks_are_per_tenant() {
        let state = AppState::new();
        let at = NaiveDateTime::parse_from_str("2026-01-16 03:45:00", "%Y-%m-%d %H:%M:%S").unwrap();

        state.set_watermark("acme", Watermark::at(at)).await;

        assert_eq!(state.watermark("acme").await, Watermark::at(at));
        assert_eq!(state.watermark("globex").await, Watermark::EMPTY);
    }
}
