//! Test helpers for integration tests
//!
//! [`TestSystem`] plays the host application: it owns the directory the
//! services read from and emits the domain events they react to.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use roomsync_common::CommunicationConfig;
use roomsync_core::{
    Course, CourseDirectory, DomainEvent, Group, InstanceKey, MembershipState, MappingRepository, ProviderId, User,
    UserId,
};
use roomsync_db::{MemoryCommunicationStore, MemoryDirectory};
use roomsync_provider::{LinkOnlyProvider, MemoryRoomProvider};
use roomsync_service::{
    default_registry, CommunicationApi, CommunicationProcessor, HookDispatcher, ReconciliationReport,
    ReconciliationService, ServiceContext, ServiceContextBuilder,
};

/// The whole communication stack over in-memory backends
pub struct TestSystem {
    pub ctx: ServiceContext,
    pub dispatcher: HookDispatcher,
    pub store: MemoryCommunicationStore,
    pub directory: MemoryDirectory,
    pub provider: Arc<MemoryRoomProvider>,
}

impl TestSystem {
    pub fn new() -> Self {
        Self::with_config(CommunicationConfig {
            enabled: true,
            default_provider: ProviderId::Memory,
        })
    }

    pub fn with_config(communication: CommunicationConfig) -> Self {
        let store = MemoryCommunicationStore::new();
        let directory = MemoryDirectory::new();
        let provider = Arc::new(MemoryRoomProvider::new());

        let ctx = ServiceContextBuilder::new()
            .communication(communication)
            .instance_repo(Arc::new(store.clone()))
            .mapping_repo(Arc::new(store.clone()))
            .directory(Arc::new(directory.clone()))
            .provider(provider.clone())
            .provider(Arc::new(LinkOnlyProvider::new()))
            .build()
            .unwrap_or_else(|e| panic!("test context: {e}"));

        let dispatcher = HookDispatcher::new(ctx.clone(), Arc::new(default_registry()));

        Self {
            ctx,
            dispatcher,
            store,
            directory,
            provider,
        }
    }

    pub async fn dispatch(&self, event: DomainEvent) -> Result<usize> {
        Ok(self.dispatcher.dispatch(&event).await?)
    }

    // =========================================================================
    // Host-side changes, each followed by its event
    // =========================================================================

    pub async fn create_course(&self, course: &Course) -> Result<()> {
        self.directory.put_course(course.clone());
        self.dispatch(DomainEvent::course_created(course.clone())).await?;
        Ok(())
    }

    pub async fn update_course(&self, course: &Course) -> Result<()> {
        let previous = self
            .directory
            .find_course(course.id)
            .await?
            .context("course must exist before it is updated")?;
        self.directory.put_course(course.clone());
        self.dispatch(DomainEvent::course_updated(course.clone(), previous)).await?;
        Ok(())
    }

    pub async fn create_group(&self, group: &Group) -> Result<()> {
        self.directory.put_group(group.clone());
        self.dispatch(DomainEvent::group_created(group.clone())).await?;
        Ok(())
    }

    pub async fn add_to_group(&self, group: &Group, user_ids: &[UserId]) -> Result<()> {
        for id in user_ids {
            self.directory.add_group_member(group.id, *id);
        }
        self.dispatch(DomainEvent::group_members_added(group.clone(), user_ids.to_vec()))
            .await?;
        Ok(())
    }

    pub async fn enrol(&self, course: &Course, users: &[User]) -> Result<()> {
        for user in users {
            self.directory.put_user(user.clone());
            self.directory.enrol(course.id, user.id);
        }
        let ids = users.iter().map(|u| u.id).collect();
        self.dispatch(DomainEvent::user_enrolled(course.id, ids)).await?;
        Ok(())
    }

    /// User events fire before the change is stored
    pub async fn update_user(&self, user: &User, previous: &User) -> Result<()> {
        self.dispatch(DomainEvent::user_updated(user.clone(), previous.clone()))
            .await?;
        self.directory.put_user(user.clone());
        Ok(())
    }

    pub async fn delete_user(&self, user: &User) -> Result<()> {
        self.dispatch(DomainEvent::user_deleted(user.clone())).await?;
        self.directory.remove_user(user.id);
        Ok(())
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub async fn processor(&self, key: InstanceKey) -> Result<CommunicationProcessor<'_>> {
        CommunicationApi::new(&self.ctx)
            .find_by_instance(&key)
            .await?
            .with_context(|| format!("no processor for {key}"))
    }

    pub async fn confirmed(&self, key: InstanceKey) -> Result<BTreeSet<UserId>> {
        Ok(self.processor(key).await?.get_confirmed_userids().await?)
    }

    /// Members of the external room behind a processor
    pub async fn room_members(&self, key: InstanceKey) -> Result<BTreeSet<UserId>> {
        let processor = self.processor(key).await?;
        let room_id = processor.room_id().context("processor has no room")?;
        Ok(self.provider.members(room_id))
    }

    /// Mapping rows of a user, as (instance key, state)
    pub async fn mappings_of(&self, user_id: UserId) -> Result<Vec<(InstanceKey, MembershipState)>> {
        let api = CommunicationApi::new(&self.ctx);
        let mut rows = Vec::new();
        for mapping in MappingRepository::find_by_user(&self.store, user_id).await? {
            let processor = api.load_by_id(mapping.instance_id).await?;
            rows.push((processor.key().clone(), mapping.state));
        }
        Ok(rows)
    }

    pub async fn reconcile(&self) -> Result<ReconciliationReport> {
        Ok(ReconciliationService::new(&self.ctx).run_once(100).await?)
    }
}

impl Default for TestSystem {
    fn default() -> Self {
        Self::new()
    }
}
