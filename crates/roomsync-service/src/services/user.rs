//! User communication service
//!
//! Reacts to user changes across every room the user can be in.

use tracing::{info, instrument, warn};

use roomsync_core::{InstanceKey, User, UserId};

use super::api::CommunicationApi;
use super::context::ServiceContext;
use super::course::{delete_rooms, CourseCommunicationService};
use super::error::{tolerate, ServiceResult};
use super::processor::CommunicationProcessor;

/// User-level room policy
pub struct UserCommunicationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> UserCommunicationService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Personal room of a user
    pub async fn load_for_user_id(&self, user_id: UserId) -> ServiceResult<Option<CommunicationProcessor<'a>>> {
        CommunicationApi::new(self.ctx)
            .find_by_instance(&InstanceKey::user(user_id))
            .await
    }

    /// Follow a suspension change into every enrolled course
    ///
    /// Runs before the change is stored, so an unsuspended user does not yet
    /// show up as an active room member and is added without that check.
    #[instrument(skip(self, user, previous), fields(user_id = %user.id))]
    pub async fn update_user_room_memberships(&self, user: &User, previous: &User) -> ServiceResult<()> {
        if !self.ctx.is_enabled() || user.suspended == previous.suspended {
            return Ok(());
        }

        let directory = self.ctx.directory();
        let courses = CourseCommunicationService::new(self.ctx);
        let ids = [user.id];

        for course_id in directory.enrolled_course_ids(user.id).await? {
            let Some(course) = directory.find_course(course_id).await? else {
                continue;
            };

            if user.suspended {
                courses.apply_to_rooms(&course, &[], &ids).await?;
            } else {
                courses.apply_to_rooms(&course, &ids, &[]).await?;
            }
        }

        info!(suspended = user.suspended, "User room memberships updated");
        Ok(())
    }

    /// Take a deleted user out of every room and drop their mappings
    ///
    /// Rooms that no longer exist are cleaned up locally. A row whose removal
    /// the provider did not confirm stays flagged for the next sweep.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn delete_user_room_membership(&self, user: &User) -> ServiceResult<()> {
        if !self.ctx.is_enabled() {
            return Ok(());
        }

        let api = CommunicationApi::new(self.ctx);
        let ids = [user.id];
        let mut pending = 0usize;

        for mapping in self.ctx.mapping_repo().find_by_user(user.id).await? {
            let processor = api.load_by_id(mapping.instance_id).await?;

            if processor.room_id().is_none() {
                processor.delete_instance_user_mapping(&ids).await?;
                continue;
            }

            match tolerate(processor.remove_members_from_room(&ids).await, "remove deleted user")? {
                Some(sync) if sync.is_complete() => {}
                _ => pending += 1,
            }
        }

        if pending > 0 {
            warn!(pending, "Deleted user still awaits removal from some rooms");
        }

        if let Some(processor) = self.load_for_user_id(user.id).await? {
            delete_rooms(processor).await?;
        }
        Ok(())
    }
}
