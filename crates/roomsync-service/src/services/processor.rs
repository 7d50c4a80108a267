//! Communication processor
//!
//! One processor wraps one communication instance: the provider selected for
//! an entity, its external room and the membership rows of its users. Every
//! provider call goes through here, and every outcome (including partial
//! failure) is written back so the reconciliation sweep can retry it.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use roomsync_core::entities::{CommunicationInstance, MembershipState};
use roomsync_core::{DomainError, InstanceId, InstanceKey, ProviderId, RoomId, RoomProvider, RoomSpec, UserId};

use super::context::ServiceContext;
use super::error::{tolerate, ServiceError, ServiceResult};

/// Result of a membership change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MembershipSync {
    /// Users the provider confirmed (or that needed no provider call)
    pub completed: Vec<UserId>,
    /// Users left pending for a later retry
    pub pending: Vec<UserId>,
}

impl MembershipSync {
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Result of retrying pending rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub confirmed: usize,
    pub removed: usize,
    pub still_pending: usize,
}

enum WriteMode {
    Plain,
    /// Provider switch: also migrates mapping rows in the same write
    SwitchProvider,
}

/// Room and membership state of one entity
pub struct CommunicationProcessor<'a> {
    ctx: &'a ServiceContext,
    instance: CommunicationInstance,
}

impl std::fmt::Debug for CommunicationProcessor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommunicationProcessor")
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

impl<'a> CommunicationProcessor<'a> {
    pub(crate) fn new(ctx: &'a ServiceContext, instance: CommunicationInstance) -> Self {
        Self { ctx, instance }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn instance(&self) -> &CommunicationInstance {
        &self.instance
    }

    pub fn id(&self) -> InstanceId {
        self.instance.id
    }

    pub fn key(&self) -> &InstanceKey {
        &self.instance.key
    }

    pub fn room_id(&self) -> Option<&RoomId> {
        self.instance.room_id.as_ref()
    }

    pub fn room_name(&self) -> Option<&str> {
        self.instance.room_name.as_deref()
    }

    pub fn room_topic(&self) -> Option<&str> {
        self.instance.room_topic.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.instance.active
    }

    /// The owning entity is gone but its room still has to be deleted
    pub fn is_retired(&self) -> bool {
        !self.instance.active && self.instance.room_id.is_some()
    }

    /// Selected provider; fails with `NotConfigured` for an unknown stored id
    pub fn get_provider(&self) -> ServiceResult<ProviderId> {
        Ok(self.instance.provider_id()?)
    }

    /// Re-fetch the instance from storage
    pub async fn reload(&mut self) -> ServiceResult<()> {
        self.instance = self
            .ctx
            .instance_repo()
            .find_by_id(self.instance.id)
            .await?
            .ok_or(DomainError::InstanceNotFound(self.instance.id))?;
        Ok(())
    }

    // =========================================================================
    // Membership queries
    // =========================================================================

    async fn states(&self) -> ServiceResult<HashMap<UserId, MembershipState>> {
        Ok(self
            .ctx
            .mapping_repo()
            .find_by_instance(self.instance.id)
            .await?
            .into_iter()
            .map(|m| (m.user_id, m.state))
            .collect())
    }

    async fn users_in_state(&self, state: MembershipState) -> ServiceResult<BTreeSet<UserId>> {
        Ok(self
            .ctx
            .mapping_repo()
            .find_by_state(self.instance.id, state)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .collect())
    }

    /// Every user with a mapping row, whatever its state
    pub async fn get_all_userids_for_instance(&self) -> ServiceResult<BTreeSet<UserId>> {
        Ok(self.states().await?.into_keys().collect())
    }

    /// Users waiting for removal from the room
    pub async fn get_all_delete_flagged_userids(&self) -> ServiceResult<BTreeSet<UserId>> {
        self.users_in_state(MembershipState::PendingDelete).await
    }

    pub async fn get_confirmed_userids(&self) -> ServiceResult<BTreeSet<UserId>> {
        self.users_in_state(MembershipState::Confirmed).await
    }

    pub async fn get_pending_add_userids(&self) -> ServiceResult<BTreeSet<UserId>> {
        self.users_in_state(MembershipState::PendingAdd).await
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Apply `change` and write it, retrying once on a concurrent update
    async fn persist<F>(&mut self, mode: WriteMode, change: F) -> ServiceResult<()>
    where
        F: Fn(&mut CommunicationInstance) + Send + Sync,
    {
        match self.write(&mode, &change).await {
            Err(ServiceError::Domain(DomainError::StaleInstance(id))) => {
                debug!(instance_id = %id, "Stale instance, reloading and retrying");
                self.reload().await?;
                self.write(&mode, &change).await
            }
            other => other,
        }
    }

    async fn write<F>(&mut self, mode: &WriteMode, change: &F) -> ServiceResult<()>
    where
        F: Fn(&mut CommunicationInstance) + Send + Sync,
    {
        let mut next = self.instance.clone();
        change(&mut next);

        let repo = self.ctx.instance_repo();
        self.instance = match mode {
            WriteMode::Plain => repo.update(&next).await?,
            WriteMode::SwitchProvider => repo.switch_provider(&next).await?,
        };
        Ok(())
    }

    /// Adapter of the current provider together with the room, if both exist
    fn room_adapter(&self) -> ServiceResult<Option<(Arc<dyn RoomProvider>, RoomId)>> {
        let Some(room_id) = self.instance.room_id.clone() else {
            return Ok(None);
        };
        let adapter = self.ctx.provider(self.get_provider()?)?;
        Ok(adapter.map(|adapter| (adapter, room_id)))
    }

    // =========================================================================
    // Provider and room
    // =========================================================================

    /// Switch to another provider
    ///
    /// Tears down the current room through the old adapter first. Nothing is
    /// written unless the teardown succeeded completely.
    #[instrument(skip(self), fields(instance_id = %self.instance.id, from = %self.instance.provider))]
    pub async fn set_provider(&mut self, provider: ProviderId) -> ServiceResult<()> {
        let current = self.instance.provider_id();
        if matches!(current, Ok(p) if p == provider) {
            return Ok(());
        }

        if let Some(room_id) = self.instance.room_id.clone() {
            let unsupported = || DomainError::ProviderChangeUnsupported {
                from: self.instance.provider.clone(),
                to: provider.to_string(),
            };

            let adapter = current
                .ok()
                .and_then(|p| self.ctx.provider(p).ok().flatten())
                .ok_or_else(unsupported)?;

            let members: Vec<UserId> = self.get_all_userids_for_instance().await?.into_iter().collect();
            if !members.is_empty() {
                let removed = adapter.remove_members(&room_id, &members).await?;
                if removed.len() < members.len() {
                    return Err(DomainError::ProviderUnavailable(format!(
                        "room teardown incomplete: {} of {} members removed",
                        removed.len(),
                        members.len()
                    ))
                    .into());
                }
            }
            adapter.delete_room(&room_id).await?;
            info!(room_id = %room_id, "Old room torn down");
        }

        self.persist(WriteMode::SwitchProvider, |i| {
            i.set_provider(provider);
            i.room_id = None;
        })
        .await?;

        info!(provider = %provider, "Room provider changed");
        Ok(())
    }

    /// Create or update the room
    ///
    /// Switches provider first when `provider` differs. On provider failure
    /// the stored room reference and name are left untouched.
    #[instrument(skip(self), fields(instance_id = %self.instance.id))]
    pub async fn update_room(
        &mut self,
        provider: ProviderId,
        name: Option<String>,
        topic: Option<String>,
    ) -> ServiceResult<()> {
        if self.instance.provider_id().ok() != Some(provider) {
            self.set_provider(provider).await?;
        }

        let name = name
            .or_else(|| self.instance.room_name.clone())
            .unwrap_or_else(|| self.instance.key.to_string());

        let Some(adapter) = self.ctx.provider(provider)? else {
            if self.instance.room_name.as_deref() != Some(name.as_str()) || self.instance.room_topic != topic {
                self.persist(WriteMode::Plain, |i| {
                    i.room_name = Some(name.clone());
                    i.room_topic.clone_from(&topic);
                })
                .await?;
            }
            return Ok(());
        };

        let spec = RoomSpec::new(name.clone(), topic.clone(), self.instance.key.clone());

        match self.instance.room_id.clone() {
            None => {
                let room_id = adapter.create_room(&spec).await?;
                info!(room_id = %room_id, provider = %provider, "Room created");

                self.persist(WriteMode::Plain, |i| {
                    i.set_room(Some(room_id.clone()), Some(name.clone()), topic.clone());
                    i.active = true;
                })
                .await?;

                tolerate(self.sync_pending_members().await, "flush pending members")?;
            }
            Some(room_id) => {
                let unchanged = self.instance.room_name.as_deref() == Some(name.as_str())
                    && self.instance.room_topic == topic;
                if unchanged {
                    return Ok(());
                }

                adapter.update_room(&room_id, &spec).await?;
                self.persist(WriteMode::Plain, |i| {
                    i.room_name = Some(name.clone());
                    i.room_topic.clone_from(&topic);
                })
                .await?;
                debug!(room_id = %room_id, "Room updated");
            }
        }

        Ok(())
    }

    /// Delete the external room and forget its members
    ///
    /// The instance stays, inactive and without a room.
    #[instrument(skip(self), fields(instance_id = %self.instance.id))]
    pub async fn delete_room(&mut self) -> ServiceResult<()> {
        if let Some((adapter, room_id)) = self.room_adapter()? {
            adapter.delete_room(&room_id).await?;
            info!(room_id = %room_id, "Room deleted");
        }

        self.ctx.mapping_repo().delete_by_instance(self.instance.id).await?;
        self.persist(WriteMode::Plain, |i| {
            i.room_id = None;
            i.active = false;
        })
        .await
    }

    /// Delete the room, then the instance
    ///
    /// The instance is first marked inactive with its room kept, so when the
    /// provider call fails the row stays behind for the sweep to finish.
    #[instrument(skip(self), fields(instance_id = %self.instance.id))]
    pub async fn retire(mut self) -> ServiceResult<()> {
        if self.instance.active && self.instance.room_id.is_some() {
            self.persist(WriteMode::Plain, |i| i.active = false).await?;
        }
        self.delete_room().await?;
        self.delete_instance().await
    }

    /// Remove the instance and all of its mappings
    #[instrument(skip(self), fields(instance_id = %self.instance.id))]
    pub async fn delete_instance(self) -> ServiceResult<()> {
        match self.ctx.instance_repo().delete(self.instance.id).await {
            Ok(()) => {
                info!(key = %self.instance.key, "Communication instance deleted");
                Ok(())
            }
            // Already gone
            Err(DomainError::InstanceNotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Membership
    // =========================================================================

    /// Add users to the room
    ///
    /// Users not yet confirmed are marked pending-add. Without a room the rows
    /// wait for the room to be created; otherwise the users the provider
    /// confirms are moved to confirmed and the rest stay pending.
    #[instrument(skip(self, user_ids), fields(instance_id = %self.instance.id, count = user_ids.len()))]
    pub async fn add_members_to_room(&self, user_ids: &[UserId]) -> ServiceResult<MembershipSync> {
        let states = self.states().await?;

        let mut to_add = Vec::new();
        for user_id in user_ids.iter().copied().collect::<BTreeSet<_>>() {
            let from = states.get(&user_id).copied();
            if from == Some(MembershipState::Confirmed) {
                continue;
            }
            MembershipState::check_transition(user_id, from, Some(MembershipState::PendingAdd))?;
            to_add.push(user_id);
        }

        if to_add.is_empty() {
            return Ok(MembershipSync::default());
        }

        self.ctx
            .mapping_repo()
            .upsert(self.instance.id, &to_add, MembershipState::PendingAdd)
            .await?;

        let Some((adapter, room_id)) = self.room_adapter()? else {
            debug!(pending = to_add.len(), "No room yet, members left pending");
            return Ok(MembershipSync {
                completed: Vec::new(),
                pending: to_add,
            });
        };

        let succeeded = adapter.add_members(&room_id, &to_add).await?;
        let (completed, pending): (Vec<UserId>, Vec<UserId>) =
            to_add.into_iter().partition(|id| succeeded.contains(id));

        self.ctx
            .mapping_repo()
            .upsert(self.instance.id, &completed, MembershipState::Confirmed)
            .await?;

        if !pending.is_empty() {
            warn!(pending = pending.len(), "Some members could not be added");
        }
        Ok(MembershipSync { completed, pending })
    }

    /// Remove users from the room
    ///
    /// Users without a mapping row are ignored. Without an external room the
    /// rows are purged directly; otherwise they are flagged pending-delete and
    /// purged once the provider confirms.
    #[instrument(skip(self, user_ids), fields(instance_id = %self.instance.id, count = user_ids.len()))]
    pub async fn remove_members_from_room(&self, user_ids: &[UserId]) -> ServiceResult<MembershipSync> {
        let states = self.states().await?;

        let mut to_remove = Vec::new();
        for user_id in user_ids.iter().copied().collect::<BTreeSet<_>>() {
            let Some(&from) = states.get(&user_id) else {
                continue;
            };
            MembershipState::check_transition(user_id, Some(from), Some(MembershipState::PendingDelete))?;
            to_remove.push(user_id);
        }

        if to_remove.is_empty() {
            return Ok(MembershipSync::default());
        }

        let repo = self.ctx.mapping_repo();
        let Some((adapter, room_id)) = self.room_adapter()? else {
            repo.delete_users(self.instance.id, &to_remove).await?;
            return Ok(MembershipSync {
                completed: to_remove,
                pending: Vec::new(),
            });
        };

        repo.upsert(self.instance.id, &to_remove, MembershipState::PendingDelete)
            .await?;

        let succeeded = adapter.remove_members(&room_id, &to_remove).await?;
        let (completed, pending): (Vec<UserId>, Vec<UserId>) =
            to_remove.into_iter().partition(|id| succeeded.contains(id));

        repo.delete_users(self.instance.id, &completed).await?;

        if !pending.is_empty() {
            warn!(pending = pending.len(), "Some members could not be removed");
        }
        Ok(MembershipSync { completed, pending })
    }

    /// Drop mapping rows without touching the room
    pub async fn delete_instance_user_mapping(&self, user_ids: &[UserId]) -> ServiceResult<u64> {
        Ok(self
            .ctx
            .mapping_repo()
            .delete_users(self.instance.id, user_ids)
            .await?)
    }

    /// Retry every pending row
    #[instrument(skip(self), fields(instance_id = %self.instance.id))]
    pub async fn sync_pending_members(&self) -> ServiceResult<SyncOutcome> {
        let pending_add: Vec<UserId> = self.get_pending_add_userids().await?.into_iter().collect();
        let pending_delete: Vec<UserId> = self.get_all_delete_flagged_userids().await?.into_iter().collect();
        let repo = self.ctx.mapping_repo();

        let Some((adapter, room_id)) = self.room_adapter()? else {
            // Nothing to remove anyone from
            let removed = repo.delete_users(self.instance.id, &pending_delete).await?;
            return Ok(SyncOutcome {
                confirmed: 0,
                removed: usize::try_from(removed).unwrap_or(usize::MAX),
                still_pending: pending_add.len(),
            });
        };

        let mut outcome = SyncOutcome::default();

        if !pending_add.is_empty() {
            let succeeded = adapter.add_members(&room_id, &pending_add).await?;
            let confirmed: Vec<UserId> = pending_add.iter().copied().filter(|id| succeeded.contains(id)).collect();
            repo.upsert(self.instance.id, &confirmed, MembershipState::Confirmed).await?;
            outcome.confirmed = confirmed.len();
            outcome.still_pending += pending_add.len() - confirmed.len();
        }

        if !pending_delete.is_empty() {
            let succeeded = adapter.remove_members(&room_id, &pending_delete).await?;
            let removed: Vec<UserId> = pending_delete.iter().copied().filter(|id| succeeded.contains(id)).collect();
            repo.delete_users(self.instance.id, &removed).await?;
            outcome.removed = removed.len();
            outcome.still_pending += pending_delete.len() - removed.len();
        }

        debug!(?outcome, "Pending members synced");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{users, Harness};
    use crate::CommunicationApi;
    use roomsync_core::CourseId;
    use roomsync_provider::ProviderCall;

    fn key() -> InstanceKey {
        InstanceKey::course(CourseId::new(1))
    }

    #[tokio::test]
    async fn test_add_without_room_stays_pending() {
        let h = Harness::new();
        let api = CommunicationApi::new(&h.ctx);
        let processor = api.load_by_instance(key()).await.unwrap();

        let sync = processor.add_members_to_room(&users(&[1, 2])).await.unwrap();
        assert_eq!(sync.pending, users(&[1, 2]));
        assert_eq!(processor.get_pending_add_userids().await.unwrap().len(), 2);
        assert_eq!(h.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_room_creation_flushes_pending() {
        let h = Harness::new();
        let api = CommunicationApi::new(&h.ctx);
        let mut processor = api.load_by_instance(key()).await.unwrap();
        processor.add_members_to_room(&users(&[1, 2])).await.unwrap();

        processor
            .update_room(ProviderId::Memory, Some("Maths".to_string()), None)
            .await
            .unwrap();

        let room_id = processor.room_id().cloned().unwrap();
        assert_eq!(h.provider.members(&room_id).len(), 2);
        assert_eq!(processor.get_confirmed_userids().await.unwrap().len(), 2);
        assert_eq!(processor.room_name(), Some("Maths"));
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let h = Harness::new();
        let processor = h.memory_room(key()).await;

        processor.add_members_to_room(&users(&[1, 2])).await.unwrap();
        h.provider.clear_calls();

        let sync = processor.add_members_to_room(&users(&[1, 2])).await.unwrap();
        assert_eq!(sync, MembershipSync::default());
        assert_eq!(h.provider.call_count(), 0);
        assert_eq!(processor.get_confirmed_userids().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_partial_add_keeps_failures_pending() {
        let h = Harness::new();
        let processor = h.memory_room(key()).await;
        h.provider.reject_user(UserId::new(3));

        let sync = processor.add_members_to_room(&users(&[1, 2, 3])).await.unwrap();
        assert_eq!(sync.completed, users(&[1, 2]));
        assert_eq!(sync.pending, users(&[3]));
        assert!(!sync.is_complete());

        h.provider.accept_user(UserId::new(3));
        let outcome = processor.sync_pending_members().await.unwrap();
        assert_eq!(outcome.confirmed, 1);
        assert_eq!(processor.get_confirmed_userids().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_provider_offline_surfaces_error() {
        let h = Harness::new();
        let processor = h.memory_room(key()).await;
        h.provider.set_offline(true);

        let err = processor.add_members_to_room(&users(&[1])).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(processor.get_pending_add_userids().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_members() {
        let h = Harness::new();
        let processor = h.memory_room(key()).await;
        processor.add_members_to_room(&users(&[1, 2])).await.unwrap();
        h.provider.reject_user(UserId::new(2));

        let sync = processor.remove_members_from_room(&users(&[1, 2, 9])).await.unwrap();
        assert_eq!(sync.completed, users(&[1]));
        assert_eq!(sync.pending, users(&[2]));
        assert_eq!(
            processor.get_all_delete_flagged_userids().await.unwrap(),
            BTreeSet::from([UserId::new(2)])
        );
        assert_eq!(processor.get_all_userids_for_instance().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_without_room_purges() {
        let h = Harness::new();
        let api = CommunicationApi::new(&h.ctx);
        let processor = api.load_by_instance(key()).await.unwrap();
        processor.add_members_to_room(&users(&[1])).await.unwrap();

        let sync = processor.remove_members_from_room(&users(&[1])).await.unwrap();
        assert_eq!(sync.completed, users(&[1]));
        assert!(processor.get_all_userids_for_instance().await.unwrap().is_empty());
        assert_eq!(h.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_readd_while_removal_pending() {
        let h = Harness::new();
        let processor = h.memory_room(key()).await;
        processor.add_members_to_room(&users(&[1])).await.unwrap();
        h.provider.set_offline(true);
        assert!(processor.remove_members_from_room(&users(&[1])).await.is_err());
        assert_eq!(processor.get_all_delete_flagged_userids().await.unwrap().len(), 1);

        h.provider.set_offline(false);
        processor.add_members_to_room(&users(&[1])).await.unwrap();
        assert_eq!(processor.get_confirmed_userids().await.unwrap().len(), 1);
        assert!(processor.get_all_delete_flagged_userids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_room_failure_leaves_state() {
        let h = Harness::new();
        let api = CommunicationApi::new(&h.ctx);
        let mut processor = api.load_by_instance(key()).await.unwrap();
        h.provider.set_offline(true);

        let err = processor
            .update_room(ProviderId::Memory, Some("Maths".to_string()), None)
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(processor.room_id().is_none());

        processor.reload().await.unwrap();
        assert!(processor.room_id().is_none());
        assert_eq!(processor.get_provider().unwrap(), ProviderId::Memory);
    }

    #[tokio::test]
    async fn test_update_room_is_idempotent() {
        let h = Harness::new();
        let mut processor = h.memory_room(key()).await;
        h.provider.clear_calls();

        processor
            .update_room(ProviderId::Memory, Some("Maths".to_string()), None)
            .await
            .unwrap();
        assert_eq!(h.provider.call_count(), 0);

        processor
            .update_room(ProviderId::Memory, Some("Algebra".to_string()), None)
            .await
            .unwrap();
        assert!(matches!(h.provider.calls()[..], [ProviderCall::UpdateRoom { .. }]));
    }

    #[tokio::test]
    async fn test_provider_none_round_trip_makes_no_calls() {
        let h = Harness::new();
        let api = CommunicationApi::new(&h.ctx);
        let mut processor = api.load_by_instance(key()).await.unwrap();

        processor
            .update_room(ProviderId::None, Some("Maths".to_string()), None)
            .await
            .unwrap();
        processor.add_members_to_room(&users(&[1, 2])).await.unwrap();
        processor.remove_members_from_room(&users(&[2])).await.unwrap();

        assert_eq!(h.provider.call_count(), 0);
        assert_eq!(processor.get_pending_add_userids().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_provider_tears_down_old_room() {
        let h = Harness::new();
        let mut processor = h.memory_room(key()).await;
        processor.add_members_to_room(&users(&[1, 2])).await.unwrap();
        let old_room = processor.room_id().cloned().unwrap();

        processor.set_provider(ProviderId::CustomLink).await.unwrap();

        assert!(h.provider.room(&old_room).is_none());
        assert!(processor.room_id().is_none());
        assert_eq!(processor.get_provider().unwrap(), ProviderId::CustomLink);
        assert_eq!(processor.get_pending_add_userids().await.unwrap().len(), 2);

        processor
            .update_room(ProviderId::CustomLink, None, None)
            .await
            .unwrap();
        assert_eq!(processor.get_confirmed_userids().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_set_provider_teardown_failure_persists_nothing() {
        let h = Harness::new();
        let mut processor = h.memory_room(key()).await;
        processor.add_members_to_room(&users(&[1])).await.unwrap();
        h.provider.set_offline(true);

        assert!(processor.set_provider(ProviderId::CustomLink).await.is_err());

        processor.reload().await.unwrap();
        assert_eq!(processor.get_provider().unwrap(), ProviderId::Memory);
        assert!(processor.room_id().is_some());
        assert_eq!(processor.get_confirmed_userids().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_provider_unresolvable_old_provider() {
        let h = Harness::new();
        let mut processor = h.memory_room(key()).await;

        let mut instance = processor.instance().clone();
        instance.provider = "communication_retired".to_string();
        h.store.force_write(instance);
        processor.reload().await.unwrap();

        let err = processor.set_provider(ProviderId::Memory).await.unwrap_err();
        assert_eq!(err.error_code(), "PROVIDER_CHANGE_UNSUPPORTED");
    }

    #[tokio::test]
    async fn test_stale_write_is_retried_once() {
        let h = Harness::new();
        let mut processor = h.memory_room(key()).await;
        h.store.touch(processor.id());

        processor
            .update_room(ProviderId::Memory, Some("Renamed".to_string()), None)
            .await
            .unwrap();
        assert_eq!(processor.room_name(), Some("Renamed"));
    }

    #[tokio::test]
    async fn test_delete_room_and_instance() {
        let h = Harness::new();
        let mut processor = h.memory_room(key()).await;
        processor.add_members_to_room(&users(&[1])).await.unwrap();
        let room_id = processor.room_id().cloned().unwrap();

        processor.delete_room().await.unwrap();
        assert!(h.provider.room(&room_id).is_none());
        assert!(processor.room_id().is_none());
        assert!(!processor.is_active());
        assert_eq!(h.store.mapping_count(), 0);

        processor.delete_instance().await.unwrap();
        assert_eq!(h.store.instance_count(), 0);
    }

    #[tokio::test]
    async fn test_retire_survives_provider_outage() {
        let h = Harness::new();
        let processor = h.memory_room(key()).await;
        processor.add_members_to_room(&users(&[1])).await.unwrap();
        let room_id = processor.room_id().cloned().unwrap();

        h.provider.set_offline(true);
        assert!(processor.retire().await.unwrap_err().is_transient());

        let processor = h.processor(key()).await.unwrap();
        assert!(processor.is_retired());
        assert_eq!(processor.room_id(), Some(&room_id));

        h.provider.set_offline(false);
        processor.retire().await.unwrap();
        assert!(h.provider.room(&room_id).is_none());
        assert_eq!(h.store.instance_count(), 0);
        assert_eq!(h.store.mapping_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_instance_user_mapping_skips_provider() {
        let h = Harness::new();
        let processor = h.memory_room(key()).await;
        processor.add_members_to_room(&users(&[1, 2])).await.unwrap();
        h.provider.clear_calls();

        let removed = processor.delete_instance_user_mapping(&users(&[1])).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(h.provider.call_count(), 0);
    }
}
