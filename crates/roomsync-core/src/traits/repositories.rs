//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation.

use async_trait::async_trait;

use crate::entities::{
    CommunicationInstance, InstanceUserMapping, MembershipState, NewCommunicationInstance,
};
use crate::error::DomainError;
use crate::value_objects::{InstanceId, InstanceKey, UserId};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Instance Repository
// ============================================================================

#[async_trait]
pub trait InstanceRepository: Send + Sync {
    /// Find instance by ID
    async fn find_by_id(&self, id: InstanceId) -> RepoResult<Option<CommunicationInstance>>;

    /// Find instance by its owning entity
    async fn find_by_key(&self, key: &InstanceKey) -> RepoResult<Option<CommunicationInstance>>;

    /// Create a new instance; fails with `InstanceExists` for a duplicate key
    async fn create(&self, instance: &NewCommunicationInstance) -> RepoResult<CommunicationInstance>;

    /// Write provider, room and active columns
    ///
    /// Succeeds only if the stored version equals `instance.version`
    /// (otherwise `StaleInstance`); returns the record with the bumped version.
    async fn update(&self, instance: &CommunicationInstance) -> RepoResult<CommunicationInstance>;

    /// Write a provider switch together with its mapping reset
    ///
    /// In one unit: update the instance (same version rule as `update`),
    /// drop its pending-delete mappings and mark every remaining mapping
    /// pending-add.
    async fn switch_provider(
        &self,
        instance: &CommunicationInstance,
    ) -> RepoResult<CommunicationInstance>;

    /// Delete instance and its mappings
    async fn delete(&self, id: InstanceId) -> RepoResult<()>;

    /// Instances the sweep has work for, least recently swept first
    ///
    /// Due are active instances with pending mappings or a real provider and
    /// no room, and inactive instances still holding a room (the entity was
    /// deleted but the room deletion did not go through). Instances never
    /// swept come first.
    async fn find_needing_reconciliation(&self, limit: i64)
        -> RepoResult<Vec<CommunicationInstance>>;

    /// Record that the sweep just looked at an instance
    ///
    /// Does not touch the version. Unknown ids are ignored.
    async fn mark_reconciled(&self, id: InstanceId) -> RepoResult<()>;
}

// ============================================================================
// Mapping Repository
// ============================================================================

#[async_trait]
pub trait MappingRepository: Send + Sync {
    /// List all mappings of an instance
    async fn find_by_instance(&self, instance_id: InstanceId) -> RepoResult<Vec<InstanceUserMapping>>;

    /// List mappings of an instance in a given state
    async fn find_by_state(
        &self,
        instance_id: InstanceId,
        state: MembershipState,
    ) -> RepoResult<Vec<InstanceUserMapping>>;

    /// List every mapping held by a user
    async fn find_by_user(&self, user_id: UserId) -> RepoResult<Vec<InstanceUserMapping>>;

    /// Insert or overwrite the state of mappings
    async fn upsert(
        &self,
        instance_id: InstanceId,
        user_ids: &[UserId],
        state: MembershipState,
    ) -> RepoResult<()>;

    /// Delete mappings for the given users, returning the number removed
    async fn delete_users(&self, instance_id: InstanceId, user_ids: &[UserId]) -> RepoResult<u64>;

    /// Delete every mapping of an instance
    async fn delete_by_instance(&self, instance_id: InstanceId) -> RepoResult<u64>;
}
