//! In-memory communication instance and mapping store

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::instrument;

use roomsync_core::entities::{
    CommunicationInstance, InstanceUserMapping, MembershipState, NewCommunicationInstance,
};
use roomsync_core::error::DomainError;
use roomsync_core::traits::{InstanceRepository, MappingRepository, RepoResult};
use roomsync_core::value_objects::{InstanceId, InstanceKey, UserId};

#[derive(Default)]
struct StoreState {
    next_id: i64,
    sweep_seq: u64,
    instances: HashMap<InstanceId, CommunicationInstance>,
    /// Sweep order stamp per instance; absent means never swept
    reconciled: HashMap<InstanceId, u64>,
    mappings: BTreeMap<(InstanceId, UserId), InstanceUserMapping>,
}

impl StoreState {
    fn write_versioned(
        &mut self,
        instance: &CommunicationInstance,
    ) -> RepoResult<CommunicationInstance> {
        let stored = self
            .instances
            .get_mut(&instance.id)
            .ok_or(DomainError::InstanceNotFound(instance.id))?;

        if stored.version != instance.version {
            return Err(DomainError::StaleInstance(instance.id));
        }

        let mut next = instance.clone();
        next.key = stored.key.clone();
        next.created_at = stored.created_at;
        next.version += 1;
        next.updated_at = Utc::now();
        *stored = next.clone();
        Ok(next)
    }

    fn mappings_of(&self, instance_id: InstanceId) -> impl Iterator<Item = &InstanceUserMapping> {
        self.mappings
            .range((instance_id, UserId::new(i64::MIN))..=(instance_id, UserId::new(i64::MAX)))
            .map(|(_, m)| m)
    }
}

/// Both storage ports backed by one locked map
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryCommunicationStore {
    state: std::sync::Arc<RwLock<StoreState>>,
}

impl MemoryCommunicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored instances
    pub fn instance_count(&self) -> usize {
        self.state.read().instances.len()
    }

    /// Number of stored mapping rows across all instances
    pub fn mapping_count(&self) -> usize {
        self.state.read().mappings.len()
    }

    /// Bump a stored version behind the caller's back, as a concurrent writer would
    pub fn touch(&self, id: InstanceId) {
        if let Some(instance) = self.state.write().instances.get_mut(&id) {
            instance.version += 1;
        }
    }

    /// Overwrite a stored instance as-is, skipping version checks
    pub fn force_write(&self, instance: CommunicationInstance) {
        self.state.write().instances.insert(instance.id, instance);
    }
}

#[async_trait]
impl InstanceRepository for MemoryCommunicationStore {
    async fn find_by_id(&self, id: InstanceId) -> RepoResult<Option<CommunicationInstance>> {
        Ok(self.state.read().instances.get(&id).cloned())
    }

    async fn find_by_key(&self, key: &InstanceKey) -> RepoResult<Option<CommunicationInstance>> {
        Ok(self
            .state
            .read()
            .instances
            .values()
            .find(|i| &i.key == key)
            .cloned())
    }

    #[instrument(skip(self))]
    async fn create(&self, instance: &NewCommunicationInstance) -> RepoResult<CommunicationInstance> {
        let mut state = self.state.write();
        if state.instances.values().any(|i| i.key == instance.key) {
            return Err(DomainError::InstanceExists(instance.key.to_string()));
        }

        state.next_id += 1;
        let created = instance.clone().into_instance(InstanceId::new(state.next_id));
        state.instances.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, instance: &CommunicationInstance) -> RepoResult<CommunicationInstance> {
        self.state.write().write_versioned(instance)
    }

    #[instrument(skip(self), fields(instance_id = %instance.id))]
    async fn switch_provider(
        &self,
        instance: &CommunicationInstance,
    ) -> RepoResult<CommunicationInstance> {
        let mut state = self.state.write();
        let updated = state.write_versioned(instance)?;

        let now = Utc::now();
        state.mappings.retain(|(id, _), m| {
            *id != instance.id || m.state != MembershipState::PendingDelete
        });
        for ((id, _), mapping) in &mut state.mappings {
            if *id == instance.id {
                mapping.state = MembershipState::PendingAdd;
                mapping.updated_at = now;
            }
        }

        Ok(updated)
    }

    async fn delete(&self, id: InstanceId) -> RepoResult<()> {
        let mut state = self.state.write();
        if state.instances.remove(&id).is_none() {
            return Err(DomainError::InstanceNotFound(id));
        }
        state.mappings.retain(|(instance_id, _), _| *instance_id != id);
        state.reconciled.remove(&id);
        Ok(())
    }

    async fn find_needing_reconciliation(
        &self,
        limit: i64,
    ) -> RepoResult<Vec<CommunicationInstance>> {
        let state = self.state.read();
        let limit = usize::try_from(limit.clamp(1, 1000)).unwrap_or(1000);

        let mut due: Vec<CommunicationInstance> = state
            .instances
            .values()
            .filter(|i| {
                let mut mappings = state.mappings_of(i.id);
                if !i.active {
                    i.has_room()
                } else if i.is_provider_none() {
                    mappings.any(|m| m.state == MembershipState::PendingDelete)
                } else {
                    !i.has_room() || mappings.any(|m| m.state.is_pending())
                }
            })
            .cloned()
            .collect();

        due.sort_by_key(|i| (state.reconciled.get(&i.id).copied(), i.id));
        due.truncate(limit);
        Ok(due)
    }

    async fn mark_reconciled(&self, id: InstanceId) -> RepoResult<()> {
        let mut state = self.state.write();
        if state.instances.contains_key(&id) {
            state.sweep_seq += 1;
            let seq = state.sweep_seq;
            state.reconciled.insert(id, seq);
        }
        Ok(())
    }
}

#[async_trait]
impl MappingRepository for MemoryCommunicationStore {
    async fn find_by_instance(&self, instance_id: InstanceId) -> RepoResult<Vec<InstanceUserMapping>> {
        Ok(self.state.read().mappings_of(instance_id).cloned().collect())
    }

    async fn find_by_state(
        &self,
        instance_id: InstanceId,
        state: MembershipState,
    ) -> RepoResult<Vec<InstanceUserMapping>> {
        Ok(self
            .state
            .read()
            .mappings_of(instance_id)
            .filter(|m| m.state == state)
            .cloned()
            .collect())
    }

    async fn find_by_user(&self, user_id: UserId) -> RepoResult<Vec<InstanceUserMapping>> {
        Ok(self
            .state
            .read()
            .mappings
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert(
        &self,
        instance_id: InstanceId,
        user_ids: &[UserId],
        state: MembershipState,
    ) -> RepoResult<()> {
        let mut store = self.state.write();
        if !store.instances.contains_key(&instance_id) {
            // Mirrors the foreign key on the mapping table
            return Err(DomainError::InstanceNotFound(instance_id));
        }

        for &user_id in user_ids {
            store
                .mappings
                .insert((instance_id, user_id), InstanceUserMapping::new(instance_id, user_id, state));
        }
        Ok(())
    }

    async fn delete_users(&self, instance_id: InstanceId, user_ids: &[UserId]) -> RepoResult<u64> {
        let mut state = self.state.write();
        let removed = user_ids
            .iter()
            .filter(|&&user_id| state.mappings.remove(&(instance_id, user_id)).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn delete_by_instance(&self, instance_id: InstanceId) -> RepoResult<u64> {
        let mut state = self.state.write();
        let before = state.mappings.len();
        state.mappings.retain(|(id, _), _| *id != instance_id);
        Ok((before - state.mappings.len()) as u64)
    }
}
