//! Hook dispatcher

use std::sync::Arc;

use tracing::{debug, error, instrument};

use roomsync_core::DomainEvent;

use super::registry::HookRegistry;
use crate::services::{ServiceContext, ServiceResult};

/// Delivers domain events to their listeners
///
/// Listeners run one after another on the calling task. The first error
/// stops the remaining listeners and is returned.
#[derive(Clone)]
pub struct HookDispatcher {
    ctx: ServiceContext,
    registry: Arc<HookRegistry>,
}

impl HookDispatcher {
    pub fn new(ctx: ServiceContext, registry: Arc<HookRegistry>) -> Self {
        Self { ctx, registry }
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }

    /// Dispatch one event; returns the number of listeners that ran
    #[instrument(skip_all, fields(event = %event.kind()))]
    pub async fn dispatch(&self, event: &DomainEvent) -> ServiceResult<usize> {
        let listeners = self.registry.listeners(event.kind());

        for (ran, listener) in listeners.iter().enumerate() {
            if let Err(e) = listener.handle(&self.ctx, event).await {
                error!(
                    listener = listener.name(),
                    skipped = listeners.len() - ran - 1,
                    code = e.error_code(),
                    error = %e,
                    "Hook listener failed"
                );
                return Err(e);
            }
            debug!(listener = listener.name(), "Hook listener done");
        }

        Ok(listeners.len())
    }
}

impl std::fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookDispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
