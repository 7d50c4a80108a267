//! Directory port - read access to the host application's entities
//!
//! Implemented by the host application. Capability checks (room access,
//! access to all groups) are resolved on the host side.

use async_trait::async_trait;

use crate::entities::{Course, Group};
use crate::value_objects::{CourseId, GroupId, UserId};

use super::repositories::RepoResult;

#[async_trait]
pub trait CourseDirectory: Send + Sync {
    /// Find course by ID
    async fn find_course(&self, id: CourseId) -> RepoResult<Option<Course>>;

    /// List all groups of a course
    async fn groups_in_course(&self, course_id: CourseId) -> RepoResult<Vec<Group>>;

    /// List explicit members of a group
    async fn group_member_ids(&self, group_id: GroupId) -> RepoResult<Vec<UserId>>;

    /// Users with an active enrolment holding the room access capability
    async fn room_member_ids(&self, course_id: CourseId) -> RepoResult<Vec<UserId>>;

    /// Room members that also hold the "access all groups" capability
    async fn all_groups_member_ids(&self, course_id: CourseId) -> RepoResult<Vec<UserId>>;

    /// Courses the user is enrolled in, whatever the enrolment status
    async fn enrolled_course_ids(&self, user_id: UserId) -> RepoResult<Vec<CourseId>>;
}
