//! Course communication service
//!
//! Decides which rooms a course has and who belongs in them. Without group
//! mode there is one course room holding every qualifying enrolled user.
//! With group mode the course room is switched off and each group gets its
//! own room, shared with every holder of the all-groups capability.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use roomsync_core::{Course, CourseId, Group, InstanceKey, ProviderId, UserId};

use super::api::CommunicationApi;
use super::context::ServiceContext;
use super::error::{tolerate, ServiceResult};
use super::processor::CommunicationProcessor;

/// What to do with a set of users in a course's rooms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipAction {
    Add,
    Remove,
    /// Add qualifying users, remove the rest
    Sync,
}

/// Course-level room policy
pub struct CourseCommunicationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> CourseCommunicationService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Course processor, if the course ever had communication configured
    pub async fn load_for_course_id(&self, course_id: CourseId) -> ServiceResult<Option<CommunicationProcessor<'a>>> {
        CommunicationApi::new(self.ctx)
            .find_by_instance(&InstanceKey::course(course_id))
            .await
    }

    /// Set up rooms for a new course
    #[instrument(skip(self, course), fields(course_id = %course.id))]
    pub async fn create_course_communication(&self, course: &Course) -> ServiceResult<()> {
        if !self.ctx.is_enabled() || course.communication_provider.is_none() {
            return Ok(());
        }
        self.configure(course).await
    }

    /// Bring the rooms in line with the course settings
    ///
    /// Handles provider changes, renames and group mode switches.
    #[instrument(skip(self, course, previous), fields(course_id = %course.id))]
    pub async fn update_course_communication(&self, course: &Course, previous: &Course) -> ServiceResult<()> {
        if !self.ctx.is_enabled() {
            return Ok(());
        }

        if course.group_mode_enabled() != previous.group_mode_enabled() {
            info!(group_mode = course.group_mode_enabled(), "Group mode switched");
        }
        if course.communication_provider != previous.communication_provider {
            info!(
                from = %previous.communication_provider,
                to = %course.communication_provider,
                "Course provider changed"
            );
        }

        self.configure(course).await
    }

    /// Delete the course room and every group room
    #[instrument(skip(self, course), fields(course_id = %course.id))]
    pub async fn delete_course_communication(&self, course: &Course) -> ServiceResult<()> {
        if !self.ctx.is_enabled() {
            return Ok(());
        }

        let api = CommunicationApi::new(self.ctx);
        for group in self.ctx.directory().groups_in_course(course.id).await? {
            if let Some(processor) = api.find_by_instance(&InstanceKey::group(group.id)).await? {
                delete_rooms(processor).await?;
            }
        }

        if let Some(processor) = self.load_for_course_id(course.id).await? {
            delete_rooms(processor).await?;
        }
        Ok(())
    }

    /// Apply a membership change for some users across the course's rooms
    #[instrument(skip(self, course, user_ids), fields(course_id = %course.id, count = user_ids.len()))]
    pub async fn update_course_room_membership(
        &self,
        course: &Course,
        user_ids: &[UserId],
        action: MembershipAction,
    ) -> ServiceResult<()> {
        if !self.ctx.is_enabled() || user_ids.is_empty() {
            return Ok(());
        }

        let directory = self.ctx.directory();
        let qualified: BTreeSet<UserId> = directory.room_member_ids(course.id).await?.into_iter().collect();

        let (add, remove): (Vec<UserId>, Vec<UserId>) = match action {
            MembershipAction::Add => (
                user_ids.iter().copied().filter(|id| qualified.contains(id)).collect(),
                Vec::new(),
            ),
            MembershipAction::Remove => (Vec::new(), user_ids.to_vec()),
            MembershipAction::Sync => user_ids.iter().copied().partition(|id| qualified.contains(id)),
        };

        self.apply_to_rooms(course, &add, &remove).await
    }

    /// Add and remove already-qualified users in every room of the course
    ///
    /// In group mode added users only go to the rooms of their own groups,
    /// unless they hold the all-groups capability.
    pub(crate) async fn apply_to_rooms(&self, course: &Course, add: &[UserId], remove: &[UserId]) -> ServiceResult<()> {
        if let Some(processor) = self.load_for_course_id(course.id).await? {
            apply_membership(&processor, add, remove).await?;
        }

        if !course.group_mode_enabled() {
            return Ok(());
        }

        let directory = self.ctx.directory();
        let all_groups: BTreeSet<UserId> = directory.all_groups_member_ids(course.id).await?.into_iter().collect();
        let api = CommunicationApi::new(self.ctx);

        for group in directory.groups_in_course(course.id).await? {
            let Some(processor) = api.find_by_instance(&InstanceKey::group(group.id)).await? else {
                continue;
            };

            let members: BTreeSet<UserId> = directory.group_member_ids(group.id).await?.into_iter().collect();
            let (group_add, outside): (Vec<UserId>, Vec<UserId>) = add
                .iter()
                .copied()
                .partition(|id| members.contains(id) || all_groups.contains(id));
            let group_remove: Vec<UserId> = remove.iter().copied().chain(outside).collect();

            apply_membership(&processor, &group_add, &group_remove).await?;
        }

        Ok(())
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    async fn configure(&self, course: &Course) -> ServiceResult<()> {
        let api = CommunicationApi::new(self.ctx);
        let key = InstanceKey::course(course.id);
        let provider = course.communication_provider;
        let (course_provider, group_provider) = if course.group_mode_enabled() {
            (ProviderId::None, provider)
        } else {
            (provider, ProviderId::None)
        };

        let course_processor = if provider.is_none() {
            api.find_by_instance(&key).await?
        } else {
            Some(
                api.load_by_instance_with_provider(key, course_provider, course.room_name())
                    .await?,
            )
        };

        let directory = self.ctx.directory();
        let qualified: BTreeSet<UserId> = directory.room_member_ids(course.id).await?.into_iter().collect();

        if let Some(mut processor) = course_processor {
            if tolerate(
                processor
                    .update_room(course_provider, Some(course.room_name().to_string()), course.summary.clone())
                    .await,
                "update course room",
            )?
            .is_some()
            {
                sync_membership(&processor, &qualified).await?;
            }
        }

        let all_groups: BTreeSet<UserId> = directory.all_groups_member_ids(course.id).await?.into_iter().collect();
        for group in directory.groups_in_course(course.id).await? {
            self.configure_group(course, &group, group_provider, &qualified, &all_groups)
                .await?;
        }

        debug!(group_mode = course.group_mode_enabled(), "Course communication configured");
        Ok(())
    }

    /// Configure one group room under the course's current settings
    pub(crate) async fn configure_group(
        &self,
        course: &Course,
        group: &Group,
        provider: ProviderId,
        qualified: &BTreeSet<UserId>,
        all_groups: &BTreeSet<UserId>,
    ) -> ServiceResult<()> {
        let api = CommunicationApi::new(self.ctx);
        let key = InstanceKey::group(group.id);
        let name = group.room_name(course.room_name());

        let processor = if provider.is_none() {
            api.find_by_instance(&key).await?
        } else {
            Some(api.load_by_instance_with_provider(key, provider, name.clone()).await?)
        };
        let Some(mut processor) = processor else {
            return Ok(());
        };

        if tolerate(
            processor
                .update_room(provider, Some(name), group.description.clone())
                .await,
            "update group room",
        )?
        .is_none()
        {
            return Ok(());
        }

        let mut desired: BTreeSet<UserId> = self
            .ctx
            .directory()
            .group_member_ids(group.id)
            .await?
            .into_iter()
            .filter(|id| qualified.contains(id))
            .collect();
        desired.extend(all_groups.iter().filter(|id| qualified.contains(id)));

        sync_membership(&processor, &desired).await
    }
}

// =============================================================================
// Shared membership helpers
// =============================================================================

/// Add and remove users, deferring transient failures
pub(crate) async fn apply_membership(
    processor: &CommunicationProcessor<'_>,
    add: &[UserId],
    remove: &[UserId],
) -> ServiceResult<()> {
    if !add.is_empty() {
        tolerate(processor.add_members_to_room(add).await, "add room members")?;
    }
    if !remove.is_empty() {
        tolerate(processor.remove_members_from_room(remove).await, "remove room members")?;
    }
    Ok(())
}

/// Converge a room's membership to `desired`
pub(crate) async fn sync_membership(
    processor: &CommunicationProcessor<'_>,
    desired: &BTreeSet<UserId>,
) -> ServiceResult<()> {
    let all = processor.get_all_userids_for_instance().await?;
    let leaving = processor.get_all_delete_flagged_userids().await?;
    let current: BTreeSet<UserId> = all.difference(&leaving).copied().collect();

    let add: Vec<UserId> = desired.difference(&current).copied().collect();
    let remove: Vec<UserId> = current.difference(desired).copied().collect();
    apply_membership(processor, &add, &remove).await
}

/// Delete the room of a processor and then the processor itself
///
/// A deferred failure leaves the instance retired; the sweep deletes it later.
pub(crate) async fn delete_rooms(processor: CommunicationProcessor<'_>) -> ServiceResult<()> {
    tolerate(processor.retire().await, "delete room")?;
    Ok(())
}
