//! Simulated room backend
//!
//! Keeps rooms and their members in memory and records every call. Faults
//! can be injected to exercise the pending and retry paths:
//!
//! - [`MemoryRoomProvider::set_offline`] makes every call fail as unavailable
//! - [`MemoryRoomProvider::reject_user`] makes joins and kicks of one user fail

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use tracing::debug;

use roomsync_core::{DomainError, ProviderId, ProviderResult, RoomId, RoomProvider, RoomSpec, UserId};

/// A simulated room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRoom {
    pub name: String,
    pub topic: Option<String>,
    pub members: BTreeSet<UserId>,
}

/// One recorded adapter call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    CreateRoom { name: String },
    UpdateRoom { room_id: RoomId, name: String },
    DeleteRoom { room_id: RoomId },
    AddMembers { room_id: RoomId, user_ids: Vec<UserId> },
    RemoveMembers { room_id: RoomId, user_ids: Vec<UserId> },
}

pub struct MemoryRoomProvider {
    id: ProviderId,
    rooms: DashMap<RoomId, MemoryRoom>,
    next_room: AtomicU64,
    offline: AtomicBool,
    rejected: DashSet<UserId>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl Default for MemoryRoomProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRoomProvider {
    pub fn new() -> Self {
        Self::with_id(ProviderId::Memory)
    }

    /// Simulate another backend, e.g. to test switching between two providers
    pub fn with_id(id: ProviderId) -> Self {
        Self {
            id,
            rooms: DashMap::new(),
            next_room: AtomicU64::new(1),
            offline: AtomicBool::new(false),
            rejected: DashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn reject_user(&self, user_id: UserId) {
        self.rejected.insert(user_id);
    }

    pub fn accept_user(&self, user_id: UserId) {
        self.rejected.remove(&user_id);
    }

    pub fn room(&self, room_id: &RoomId) -> Option<MemoryRoom> {
        self.rooms.get(room_id).map(|r| r.value().clone())
    }

    pub fn members(&self, room_id: &RoomId) -> BTreeSet<UserId> {
        self.rooms
            .get(room_id)
            .map(|r| r.members.clone())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: ProviderCall) -> ProviderResult<()> {
        self.calls.lock().push(call);
        if self.offline.load(Ordering::SeqCst) {
            return Err(DomainError::ProviderUnavailable(format!(
                "{} backend offline",
                self.id
            )));
        }
        Ok(())
    }

    fn unknown_room(room_id: &RoomId) -> DomainError {
        DomainError::ProviderRejected(format!("unknown room {room_id}"))
    }

    fn apply<F>(&self, room_id: &RoomId, user_ids: &[UserId], mut change: F) -> ProviderResult<HashSet<UserId>>
    where
        F: FnMut(&mut BTreeSet<UserId>, UserId),
    {
        let mut room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| Self::unknown_room(room_id))?;

        let mut succeeded = HashSet::with_capacity(user_ids.len());
        for &user_id in user_ids {
            if self.rejected.contains(&user_id) {
                debug!(user_id = %user_id, "Simulated rejection");
                continue;
            }
            change(&mut room.members, user_id);
            succeeded.insert(user_id);
        }
        Ok(succeeded)
    }
}

#[async_trait]
impl RoomProvider for MemoryRoomProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn create_room(&self, spec: &RoomSpec) -> ProviderResult<RoomId> {
        self.record(ProviderCall::CreateRoom {
            name: spec.name.clone(),
        })?;

        let n = self.next_room.fetch_add(1, Ordering::SeqCst);
        let room_id = RoomId::new(format!("!mem{n}:{}", self.id));
        self.rooms.insert(
            room_id.clone(),
            MemoryRoom {
                name: spec.name.clone(),
                topic: spec.topic.clone(),
                members: BTreeSet::new(),
            },
        );
        Ok(room_id)
    }

    async fn update_room(&self, room_id: &RoomId, spec: &RoomSpec) -> ProviderResult<()> {
        self.record(ProviderCall::UpdateRoom {
            room_id: room_id.clone(),
            name: spec.name.clone(),
        })?;

        let mut room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| Self::unknown_room(room_id))?;
        room.name.clone_from(&spec.name);
        room.topic.clone_from(&spec.topic);
        Ok(())
    }

    async fn delete_room(&self, room_id: &RoomId) -> ProviderResult<()> {
        self.record(ProviderCall::DeleteRoom {
            room_id: room_id.clone(),
        })?;
        // Already gone is fine
        self.rooms.remove(room_id);
        Ok(())
    }

    async fn add_members(
        &self,
        room_id: &RoomId,
        user_ids: &[UserId],
    ) -> ProviderResult<HashSet<UserId>> {
        self.record(ProviderCall::AddMembers {
            room_id: room_id.clone(),
            user_ids: user_ids.to_vec(),
        })?;
        self.apply(room_id, user_ids, |members, user_id| {
            members.insert(user_id);
        })
    }

    async fn remove_members(
        &self,
        room_id: &RoomId,
        user_ids: &[UserId],
    ) -> ProviderResult<HashSet<UserId>> {
        self.record(ProviderCall::RemoveMembers {
            room_id: room_id.clone(),
            user_ids: user_ids.to_vec(),
        })?;
        self.apply(room_id, user_ids, |members, user_id| {
            members.remove(&user_id);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomsync_core::{CourseId, InstanceKey};

    fn spec(name: &str) -> RoomSpec {
        RoomSpec::new(name, None, InstanceKey::course(CourseId::new(1)))
    }

    #[tokio::test]
    async fn test_room_lifecycle() {
        let provider = MemoryRoomProvider::new();
        let room_id = provider.create_room(&spec("Maths")).await.unwrap();

        let added = provider
            .add_members(&room_id, &[UserId::new(1), UserId::new(2)])
            .await
            .unwrap();
        assert_eq!(added.len(), 2);

        provider.update_room(&room_id, &spec("Algebra")).await.unwrap();
        assert_eq!(provider.room(&room_id).unwrap().name, "Algebra");

        provider.remove_members(&room_id, &[UserId::new(1)]).await.unwrap();
        assert_eq!(provider.members(&room_id), BTreeSet::from([UserId::new(2)]));

        provider.delete_room(&room_id).await.unwrap();
        provider.delete_room(&room_id).await.unwrap();
        assert_eq!(provider.room_count(), 0);
        assert_eq!(provider.call_count(), 6);
    }

    #[tokio::test]
    async fn test_offline_fails_transiently() {
        let provider = MemoryRoomProvider::new();
        provider.set_offline(true);

        let err = provider.create_room(&spec("Maths")).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(provider.room_count(), 0);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rejected_user_is_left_out() {
        let provider = MemoryRoomProvider::new();
        let room_id = provider.create_room(&spec("Maths")).await.unwrap();
        provider.reject_user(UserId::new(3));

        let added = provider
            .add_members(&room_id, &[UserId::new(1), UserId::new(3)])
            .await
            .unwrap();
        assert_eq!(added, HashSet::from([UserId::new(1)]));

        provider.accept_user(UserId::new(3));
        let added = provider.add_members(&room_id, &[UserId::new(3)]).await.unwrap();
        assert!(added.contains(&UserId::new(3)));
    }

    #[tokio::test]
    async fn test_unknown_room_is_rejected() {
        let provider = MemoryRoomProvider::new();
        let err = provider
            .add_members(&RoomId::new("!nope"), &[UserId::new(1)])
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
