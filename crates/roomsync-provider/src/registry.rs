//! Provider registry
//!
//! Resolves a provider identifier to its adapter. Built once at startup and
//! shared read-only afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use roomsync_common::AppConfig;
use roomsync_core::{DomainError, ProviderId, ProviderResult, RoomProvider};

use crate::{LinkOnlyProvider, MatrixRoomProvider};

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<ProviderId, Arc<dyn RoomProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("registered", &self.registered())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapters available for the given configuration
    ///
    /// The link-only backend is always present; Matrix only when a
    /// homeserver is configured.
    pub fn from_config(config: &AppConfig) -> ProviderResult<Self> {
        let mut registry = Self::new().with(Arc::new(LinkOnlyProvider::new()));

        if let Some(matrix) = &config.matrix {
            registry = registry.with(Arc::new(MatrixRoomProvider::new(matrix)?));
        }

        info!(providers = ?registry.registered(), "Room providers registered");
        Ok(registry)
    }

    /// Register an adapter under its own identifier
    pub fn with(mut self, provider: Arc<dyn RoomProvider>) -> Self {
        self.adapters.insert(provider.id(), provider);
        self
    }

    pub fn is_registered(&self, id: ProviderId) -> bool {
        self.adapters.contains_key(&id)
    }

    /// Registered identifiers in stable order
    pub fn registered(&self) -> Vec<ProviderId> {
        ProviderId::BACKENDS
            .into_iter()
            .filter(|id| self.adapters.contains_key(id))
            .collect()
    }

    /// Adapter for `id`
    ///
    /// `None` means the provider is the `none` sentinel: no adapter call is
    /// ever made for it.
    pub fn resolve(&self, id: ProviderId) -> ProviderResult<Option<Arc<dyn RoomProvider>>> {
        if id.is_none() {
            return Ok(None);
        }

        self.adapters
            .get(&id)
            .cloned()
            .map(Some)
            .ok_or_else(|| DomainError::NotConfigured(format!("room provider '{id}' is not enabled")))
    }

    /// Adapter for an identifier read from storage
    pub fn resolve_stored(&self, stored: &str) -> ProviderResult<Option<Arc<dyn RoomProvider>>> {
        self.resolve(ProviderId::parse(stored)?)
    }
}
