//! Communication listeners
//!
//! Each listener routes the events it is bound to onto one service. Events
//! a listener does not know are ignored.

use async_trait::async_trait;

use roomsync_core::{CourseId, DomainEvent, UserId};

use super::registry::HookListener;
use crate::services::{
    CourseCommunicationService, GroupCommunicationService, MembershipAction, ServiceContext,
    ServiceResult, UserCommunicationService,
};

/// Course lifecycle
pub struct CourseListener;

#[async_trait]
impl HookListener for CourseListener {
    fn name(&self) -> &'static str {
        "course_communication"
    }

    async fn handle(&self, ctx: &ServiceContext, event: &DomainEvent) -> ServiceResult<()> {
        let service = CourseCommunicationService::new(ctx);
        match event {
            DomainEvent::CourseCreated(e) => service.create_course_communication(&e.course).await,
            DomainEvent::CourseUpdated(e) => service.update_course_communication(&e.course, &e.previous).await,
            DomainEvent::CourseDeleted(e) => service.delete_course_communication(&e.course).await,
            _ => Ok(()),
        }
    }
}

/// Group lifecycle and group membership
pub struct GroupListener;

#[async_trait]
impl HookListener for GroupListener {
    fn name(&self) -> &'static str {
        "group_communication"
    }

    async fn handle(&self, ctx: &ServiceContext, event: &DomainEvent) -> ServiceResult<()> {
        let service = GroupCommunicationService::new(ctx);
        match event {
            DomainEvent::GroupCreated(e) => service.create_group_communication(&e.group).await,
            DomainEvent::GroupUpdated(e) => service.update_group_communication(&e.group, &e.previous).await,
            DomainEvent::GroupDeleted(e) => service.delete_group_communication(&e.group).await,
            DomainEvent::GroupMembersAdded(e) => service.add_members_to_group_room(&e.group, &e.user_ids).await,
            DomainEvent::GroupMembersRemoved(e) => {
                service.remove_members_from_group_room(&e.group, &e.user_ids).await
            }
            _ => Ok(()),
        }
    }
}

/// User suspension and deletion
pub struct UserListener;

#[async_trait]
impl HookListener for UserListener {
    fn name(&self) -> &'static str {
        "user_communication"
    }

    async fn handle(&self, ctx: &ServiceContext, event: &DomainEvent) -> ServiceResult<()> {
        let service = UserCommunicationService::new(ctx);
        match event {
            DomainEvent::UserUpdated(e) => service.update_user_room_memberships(&e.user, &e.previous).await,
            DomainEvent::UserDeleted(e) => service.delete_user_room_membership(&e.user).await,
            _ => Ok(()),
        }
    }
}

/// Role and enrolment changes
pub struct EnrolmentListener;

impl EnrolmentListener {
    fn target(event: &DomainEvent) -> Option<(CourseId, Vec<UserId>, MembershipAction)> {
        match event {
            DomainEvent::RoleAssigned(e) => Some((e.course_id, vec![e.user_id], MembershipAction::Sync)),
            DomainEvent::RoleUnassigned(e) => Some((e.course_id, vec![e.user_id], MembershipAction::Sync)),
            DomainEvent::EnrolInstanceStatusChanged(e) => {
                Some((e.course_id, e.user_ids.clone(), MembershipAction::Sync))
            }
            DomainEvent::UserEnrolled(e) => Some((e.course_id, e.user_ids.clone(), MembershipAction::Sync)),
            DomainEvent::UserEnrolmentUpdated(e) => {
                Some((e.course_id, e.user_ids.clone(), MembershipAction::Sync))
            }
            DomainEvent::EnrolInstanceDeleted(e) => {
                Some((e.course_id, e.user_ids.clone(), MembershipAction::Remove))
            }
            DomainEvent::UserUnenrolled(e) => Some((e.course_id, e.user_ids.clone(), MembershipAction::Remove)),
            _ => None,
        }
    }
}

#[async_trait]
impl HookListener for EnrolmentListener {
    fn name(&self) -> &'static str {
        "enrolment_communication"
    }

    async fn handle(&self, ctx: &ServiceContext, event: &DomainEvent) -> ServiceResult<()> {
        let Some((course_id, user_ids, action)) = Self::target(event) else {
            return Ok(());
        };

        // Course already gone; its rooms went with it
        let Some(course) = ctx.directory().find_course(course_id).await? else {
            return Ok(());
        };

        CourseCommunicationService::new(ctx)
            .update_course_room_membership(&course, &user_ids, action)
            .await
    }
}
