//! Room provider port - the contract every chat backend implements

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::DomainError;
use crate::value_objects::{ProviderId, RoomId, RoomSpec, UserId};

/// Result type for provider operations
///
/// Failures are `ProviderUnavailable` (transient, includes timeouts) or
/// `ProviderRejected` (permanent for the given input).
pub type ProviderResult<T> = Result<T, DomainError>;

#[async_trait]
pub trait RoomProvider: Send + Sync {
    /// Backend this adapter implements
    fn id(&self) -> ProviderId;

    /// Create a room, returning its backend identifier
    async fn create_room(&self, spec: &RoomSpec) -> ProviderResult<RoomId>;

    /// Update name and topic of an existing room
    async fn update_room(&self, room_id: &RoomId, spec: &RoomSpec) -> ProviderResult<()>;

    /// Delete a room; deleting an already deleted room is a no-op
    async fn delete_room(&self, room_id: &RoomId) -> ProviderResult<()>;

    /// Add members, returning the users that were added
    ///
    /// Adding a user who is already a member counts as success.
    async fn add_members(&self, room_id: &RoomId, user_ids: &[UserId])
        -> ProviderResult<HashSet<UserId>>;

    /// Remove members, returning the users that were removed
    ///
    /// Removing a user who is not a member counts as success.
    async fn remove_members(
        &self,
        room_id: &RoomId,
        user_ids: &[UserId],
    ) -> ProviderResult<HashSet<UserId>>;
}
