//! Communication API - instance loader
//!
//! Resolves (and creates on first use) the processor behind a
//! (component, instance type, instance id) key.

use tracing::{debug, instrument};

use roomsync_core::{DomainError, InstanceId, InstanceKey, NewCommunicationInstance, ProviderId};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::processor::CommunicationProcessor;

/// Entry point for loading processors
pub struct CommunicationApi<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> CommunicationApi<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Global capability switch
    pub fn is_available(&self) -> bool {
        self.ctx.is_enabled()
    }

    /// Existing processor for a key, if any
    #[instrument(skip(self))]
    pub async fn find_by_instance(&self, key: &InstanceKey) -> ServiceResult<Option<CommunicationProcessor<'a>>> {
        let instance = self.ctx.instance_repo().find_by_key(key).await?;
        Ok(instance.map(|i| CommunicationProcessor::new(self.ctx, i)))
    }

    /// Processor by its own id
    #[instrument(skip(self))]
    pub async fn load_by_id(&self, id: InstanceId) -> ServiceResult<CommunicationProcessor<'a>> {
        let instance = self
            .ctx
            .instance_repo()
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("CommunicationInstance", id.to_string()))?;
        Ok(CommunicationProcessor::new(self.ctx, instance))
    }

    /// Existing processor, or a new one with synchronisation disabled
    pub async fn load_by_instance(&self, key: InstanceKey) -> ServiceResult<CommunicationProcessor<'a>> {
        self.load_or_create(NewCommunicationInstance::new(key, ProviderId::None))
            .await
    }

    /// Existing processor, or a new one starting with `provider` and `room_name`
    ///
    /// An existing row keeps its own provider and name.
    pub async fn load_by_instance_with_provider(
        &self,
        key: InstanceKey,
        provider: ProviderId,
        room_name: impl Into<String>,
    ) -> ServiceResult<CommunicationProcessor<'a>> {
        self.load_or_create(NewCommunicationInstance::new(key, provider).with_room_name(room_name))
            .await
    }

    #[instrument(skip(self, new), fields(key = %new.key))]
    async fn load_or_create(&self, new: NewCommunicationInstance) -> ServiceResult<CommunicationProcessor<'a>> {
        if let Some(processor) = self.find_by_instance(&new.key).await? {
            return Ok(processor);
        }

        if !self.is_available() {
            return Err(DomainError::NotConfigured("communication is disabled".to_string()).into());
        }

        let repo = self.ctx.instance_repo();
        let instance = match repo.create(&new).await {
            Ok(instance) => instance,
            // Lost a race against another creator
            Err(DomainError::InstanceExists(_)) => repo
                .find_by_key(&new.key)
                .await?
                .ok_or_else(|| ServiceError::internal(format!("instance {} vanished after conflict", new.key)))?,
            Err(e) => return Err(e.into()),
        };

        debug!(instance_id = %instance.id, provider = %instance.provider, "Communication instance created");
        Ok(CommunicationProcessor::new(self.ctx, instance))
    }
}
