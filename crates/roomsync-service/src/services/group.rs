//! Group communication service
//!
//! Group rooms only carry a provider while their course is in group mode.

use std::collections::BTreeSet;

use tracing::instrument;

use roomsync_core::{Course, DomainError, Group, GroupId, InstanceKey, UserId};

use super::api::CommunicationApi;
use super::context::ServiceContext;
use super::course::{apply_membership, delete_rooms, CourseCommunicationService};
use super::error::{tolerate, ServiceResult};
use super::processor::CommunicationProcessor;

/// Group-level room policy
pub struct GroupCommunicationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> GroupCommunicationService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn load_for_group_id(&self, group_id: GroupId) -> ServiceResult<Option<CommunicationProcessor<'a>>> {
        CommunicationApi::new(self.ctx)
            .find_by_instance(&InstanceKey::group(group_id))
            .await
    }

    async fn course_of(&self, group: &Group) -> ServiceResult<Course> {
        Ok(self
            .ctx
            .directory()
            .find_course(group.course_id)
            .await?
            .ok_or(DomainError::CourseNotFound(group.course_id))?)
    }

    /// Set up the room of a new group
    ///
    /// The group inherits the course provider; its first members are the
    /// holders of the all-groups capability.
    #[instrument(skip(self, group), fields(group_id = %group.id))]
    pub async fn create_group_communication(&self, group: &Group) -> ServiceResult<()> {
        if !self.ctx.is_enabled() {
            return Ok(());
        }

        let course = self.course_of(group).await?;
        if !course.group_mode_enabled() || course.communication_provider.is_none() {
            return Ok(());
        }

        let directory = self.ctx.directory();
        let qualified: BTreeSet<UserId> = directory.room_member_ids(course.id).await?.into_iter().collect();
        let all_groups: BTreeSet<UserId> = directory.all_groups_member_ids(course.id).await?.into_iter().collect();

        CourseCommunicationService::new(self.ctx)
            .configure_group(&course, group, course.communication_provider, &qualified, &all_groups)
            .await
    }

    /// Rename the group room
    #[instrument(skip(self, group, previous), fields(group_id = %group.id))]
    pub async fn update_group_communication(&self, group: &Group, previous: &Group) -> ServiceResult<()> {
        if !self.ctx.is_enabled() || (group.name == previous.name && group.description == previous.description) {
            return Ok(());
        }

        let Some(mut processor) = self.load_for_group_id(group.id).await? else {
            return Ok(());
        };

        let course = self.course_of(group).await?;
        let provider = processor.get_provider()?;
        tolerate(
            processor
                .update_room(provider, Some(group.room_name(course.room_name())), group.description.clone())
                .await,
            "rename group room",
        )?;
        Ok(())
    }

    /// Delete the group room and its processor
    #[instrument(skip(self, group), fields(group_id = %group.id))]
    pub async fn delete_group_communication(&self, group: &Group) -> ServiceResult<()> {
        if !self.ctx.is_enabled() {
            return Ok(());
        }

        match self.load_for_group_id(group.id).await? {
            Some(processor) => delete_rooms(processor).await,
            None => Ok(()),
        }
    }

    /// Add new group members to the group room
    ///
    /// Only users qualifying for the course room are added.
    #[instrument(skip(self, group, user_ids), fields(group_id = %group.id, count = user_ids.len()))]
    pub async fn add_members_to_group_room(&self, group: &Group, user_ids: &[UserId]) -> ServiceResult<()> {
        if !self.ctx.is_enabled() || user_ids.is_empty() {
            return Ok(());
        }

        let course = self.course_of(group).await?;
        if !course.group_mode_enabled() {
            return Ok(());
        }
        let Some(processor) = self.load_for_group_id(group.id).await? else {
            return Ok(());
        };

        let qualified: BTreeSet<UserId> = self
            .ctx
            .directory()
            .room_member_ids(course.id)
            .await?
            .into_iter()
            .collect();
        let add: Vec<UserId> = user_ids.iter().copied().filter(|id| qualified.contains(id)).collect();

        apply_membership(&processor, &add, &[]).await
    }

    /// Remove departing group members from the group room
    ///
    /// Holders of the all-groups capability stay.
    #[instrument(skip(self, group, user_ids), fields(group_id = %group.id, count = user_ids.len()))]
    pub async fn remove_members_from_group_room(&self, group: &Group, user_ids: &[UserId]) -> ServiceResult<()> {
        if !self.ctx.is_enabled() || user_ids.is_empty() {
            return Ok(());
        }

        let Some(processor) = self.load_for_group_id(group.id).await? else {
            return Ok(());
        };

        let all_groups: BTreeSet<UserId> = self
            .ctx
            .directory()
            .all_groups_member_ids(group.course_id)
            .await?
            .into_iter()
            .collect();
        let remove: Vec<UserId> = user_ids.iter().copied().filter(|id| !all_groups.contains(id)).collect();

        apply_membership(&processor, &[], &remove).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{users, Harness};
    use roomsync_core::{GroupMode, ProviderId};

    async fn confirmed(h: &Harness, group: &Group) -> BTreeSet<UserId> {
        h.processor(InstanceKey::group(group.id))
            .await
            .unwrap()
            .get_confirmed_userids()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_created_group_holds_all_groups_users() {
        let h = Harness::new();
        let course = h.course(1, GroupMode::Separate);
        h.enrol(&course, &[1, 2, 3]);
        h.directory.grant_all_groups(course.id, UserId::new(3));
        let group = h.group(&course, 10, "A");

        GroupCommunicationService::new(&h.ctx)
            .create_group_communication(&group)
            .await
            .unwrap();

        let processor = h.processor(InstanceKey::group(group.id)).await.unwrap();
        assert_eq!(processor.get_provider().unwrap(), ProviderId::Memory);
        assert_eq!(processor.room_name(), Some("A (Course 1)"));
        assert_eq!(confirmed(&h, &group).await, users(&[3]).into_iter().collect());
    }

    #[tokio::test]
    async fn test_no_group_mode_no_room() {
        let h = Harness::new();
        let course = h.course(1, GroupMode::NoGroups);
        let group = h.group(&course, 10, "A");

        let service = GroupCommunicationService::new(&h.ctx);
        service.create_group_communication(&group).await.unwrap();
        service.add_members_to_group_room(&group, &users(&[1])).await.unwrap();
        assert!(service.load_for_group_id(group.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_course() {
        let h = Harness::new();
        let group = Group::new(GroupId::new(10), roomsync_core::CourseId::new(99), "A");

        let err = GroupCommunicationService::new(&h.ctx)
            .create_group_communication(&group)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_COURSE");
    }

    #[tokio::test]
    async fn test_members_stay_in_their_group() {
        let h = Harness::new();
        let course = h.course(1, GroupMode::Separate);
        h.enrol(&course, &[1, 2, 9]);
        h.directory.grant_all_groups(course.id, UserId::new(9));
        let a = h.group(&course, 10, "A");
        let b = h.group(&course, 11, "B");

        let service = GroupCommunicationService::new(&h.ctx);
        service.create_group_communication(&a).await.unwrap();
        service.create_group_communication(&b).await.unwrap();

        h.join(&a, &[1]);
        service.add_members_to_group_room(&a, &users(&[1])).await.unwrap();

        assert_eq!(confirmed(&h, &a).await, users(&[1, 9]).into_iter().collect());
        assert_eq!(confirmed(&h, &b).await, users(&[9]).into_iter().collect());
    }

    #[tokio::test]
    async fn test_remove_keeps_all_groups_holders() {
        let h = Harness::new();
        let course = h.course(1, GroupMode::Separate);
        h.enrol(&course, &[1, 9]);
        h.directory.grant_all_groups(course.id, UserId::new(9));
        let group = h.group(&course, 10, "A");
        h.join(&group, &[1, 9]);

        let service = GroupCommunicationService::new(&h.ctx);
        service.create_group_communication(&group).await.unwrap();
        service
            .remove_members_from_group_room(&group, &users(&[1, 9]))
            .await
            .unwrap();

        assert_eq!(confirmed(&h, &group).await, users(&[9]).into_iter().collect());
    }

    #[tokio::test]
    async fn test_rename_and_delete() {
        let h = Harness::new();
        let course = h.course(1, GroupMode::Separate);
        let group = h.group(&course, 10, "A");
        let service = GroupCommunicationService::new(&h.ctx);
        service.create_group_communication(&group).await.unwrap();

        let mut renamed = group.clone();
        renamed.name = "Alpha".to_string();
        service.update_group_communication(&renamed, &group).await.unwrap();

        let processor = service.load_for_group_id(group.id).await.unwrap().unwrap();
        let room_id = processor.room_id().cloned().unwrap();
        assert_eq!(h.provider.room(&room_id).unwrap().name, "Alpha (Course 1)");

        service.delete_group_communication(&renamed).await.unwrap();
        assert!(h.provider.room(&room_id).is_none());
        assert!(service.load_for_group_id(group.id).await.unwrap().is_none());
    }
}
