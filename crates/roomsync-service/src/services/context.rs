//! Service context - dependency container for services
//!
//! Holds the storage ports, the host directory and the provider registry.

use std::sync::Arc;

use roomsync_common::CommunicationConfig;
use roomsync_core::traits::{CourseDirectory, InstanceRepository, MappingRepository};
use roomsync_core::{DomainError, ProviderId, RoomProvider};
use roomsync_provider::ProviderRegistry;

use super::error::{ServiceError, ServiceResult};

/// Service context containing all dependencies
///
/// Cheap to clone; every dependency sits behind an `Arc`.
#[derive(Clone)]
pub struct ServiceContext {
    communication: CommunicationConfig,

    // Storage
    instance_repo: Arc<dyn InstanceRepository>,
    mapping_repo: Arc<dyn MappingRepository>,

    // Host application
    directory: Arc<dyn CourseDirectory>,

    // Backends
    providers: Arc<ProviderRegistry>,
}

impl ServiceContext {
    /// Create a new service context with all dependencies
    pub fn new(
        communication: CommunicationConfig,
        instance_repo: Arc<dyn InstanceRepository>,
        mapping_repo: Arc<dyn MappingRepository>,
        directory: Arc<dyn CourseDirectory>,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            communication,
            instance_repo,
            mapping_repo,
            directory,
            providers,
        }
    }

    /// Global capability switch
    pub fn is_enabled(&self) -> bool {
        self.communication.enabled
    }

    pub fn default_provider(&self) -> ProviderId {
        self.communication.default_provider
    }

    // === Repositories ===

    pub fn instance_repo(&self) -> &dyn InstanceRepository {
        self.instance_repo.as_ref()
    }

    pub fn mapping_repo(&self) -> &dyn MappingRepository {
        self.mapping_repo.as_ref()
    }

    // === Host ===

    pub fn directory(&self) -> &dyn CourseDirectory {
        self.directory.as_ref()
    }

    // === Providers ===

    pub fn providers(&self) -> &ProviderRegistry {
        self.providers.as_ref()
    }

    /// Adapter for a provider; `None` for the `none` sentinel
    pub fn provider(&self, id: ProviderId) -> Result<Option<Arc<dyn RoomProvider>>, DomainError> {
        self.providers.resolve(id)
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("communication", &self.communication)
            .field("repositories", &"...")
            .field("providers", &self.providers)
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
pub struct ServiceContextBuilder {
    communication: CommunicationConfig,
    instance_repo: Option<Arc<dyn InstanceRepository>>,
    mapping_repo: Option<Arc<dyn MappingRepository>>,
    directory: Option<Arc<dyn CourseDirectory>>,
    providers: ProviderRegistry,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self {
            communication: CommunicationConfig::default(),
            instance_repo: None,
            mapping_repo: None,
            directory: None,
            providers: ProviderRegistry::new(),
        }
    }

    pub fn communication(mut self, config: CommunicationConfig) -> Self {
        self.communication = config;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.communication.enabled = enabled;
        self
    }

    pub fn instance_repo(mut self, repo: Arc<dyn InstanceRepository>) -> Self {
        self.instance_repo = Some(repo);
        self
    }

    pub fn mapping_repo(mut self, repo: Arc<dyn MappingRepository>) -> Self {
        self.mapping_repo = Some(repo);
        self
    }

    pub fn directory(mut self, directory: Arc<dyn CourseDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    /// Register one more adapter
    pub fn provider(mut self, provider: Arc<dyn RoomProvider>) -> Self {
        self.providers = self.providers.with(provider);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext::new(
            self.communication,
            self.instance_repo
                .ok_or_else(|| ServiceError::validation("instance_repo is required"))?,
            self.mapping_repo
                .ok_or_else(|| ServiceError::validation("mapping_repo is required"))?,
            self.directory
                .ok_or_else(|| ServiceError::validation("directory is required"))?,
            Arc::new(self.providers),
        ))
    }
}

impl Default for ServiceContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
