//! Link-only backend
//!
//! The course page shows an external meeting link instead of a managed room,
//! so there is nothing to create or join. Every call succeeds.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::debug;

use roomsync_core::{ProviderId, ProviderResult, RoomId, RoomProvider, RoomSpec, UserId};

#[derive(Debug, Clone, Copy, Default)]
pub struct LinkOnlyProvider;

impl LinkOnlyProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RoomProvider for LinkOnlyProvider {
    fn id(&self) -> ProviderId {
        ProviderId::CustomLink
    }

    async fn create_room(&self, spec: &RoomSpec) -> ProviderResult<RoomId> {
        // Stable per owning entity so recreating yields the same reference
        let room_id = RoomId::new(format!("link:{}", spec.context));
        debug!(room_id = %room_id, "Link room registered");
        Ok(room_id)
    }

    async fn update_room(&self, _room_id: &RoomId, _spec: &RoomSpec) -> ProviderResult<()> {
        Ok(())
    }

    async fn delete_room(&self, _room_id: &RoomId) -> ProviderResult<()> {
        Ok(())
    }

    async fn add_members(
        &self,
        _room_id: &RoomId,
        user_ids: &[UserId],
    ) -> ProviderResult<HashSet<UserId>> {
        Ok(user_ids.iter().copied().collect())
    }

    async fn remove_members(
        &self,
        _room_id: &RoomId,
        user_ids: &[UserId],
    ) -> ProviderResult<HashSet<UserId>> {
        Ok(user_ids.iter().copied().collect())
    }
}
