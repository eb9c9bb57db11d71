//! One reconciliation run per tenant at a time.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Registry of per-tenant run locks.
///
/// Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct TenantLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

/// Proof that the holder owns a tenant's run lock; released on drop.
#[derive(Debug)]
pub struct TenantGuard {
    tenant_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl TenantGuard {
    /// The tenant this guard locks.
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

impl TenantLocks {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the tenant's lock without waiting.
    ///
    /// Fails with [`EngineError::RunInProgress`] if another run holds it.
    pub async fn try_acquire(&self, tenant_id: &str) -> EngineResult<TenantGuard> {
        let lock = {
            let mut locks = self.inner.lock().await;
            Arc::clone(locks.entry(tenant_id.to_string()).or_default())
        };

        match lock.try_lock_owned() {
            Ok(guard) => {
                debug!(tenant_id, "Acquired tenant run lock");
                Ok(TenantGuard {
                    tenant_id: tenant_id.to_string(),
                    _guard: guard,
                })
            }
            Err(_) => Err(EngineError::RunInProgress {
                tenant_id: tenant_id.to_string(),
            }),
        }
    }
}
