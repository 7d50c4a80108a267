//! In-memory course directory

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use roomsync_core::entities::{Course, Group, User};
use roomsync_core::traits::{CourseDirectory, RepoResult};
use roomsync_core::value_objects::{CourseId, GroupId, UserId};

#[derive(Default)]
struct DirectoryState {
    courses: HashMap<CourseId, Course>,
    groups: HashMap<GroupId, Group>,
    users: HashMap<UserId, User>,
    group_members: HashMap<GroupId, BTreeSet<UserId>>,
    /// Users enrolled with the room access capability
    enrolments: HashMap<CourseId, BTreeSet<UserId>>,
    /// Holders of the access-all-groups capability
    all_groups: HashMap<CourseId, BTreeSet<UserId>>,
}

/// Host application stand-in with mutable fixtures
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_course(&self, course: Course) {
        self.state.write().courses.insert(course.id, course);
    }

    pub fn put_group(&self, group: Group) {
        self.state.write().groups.insert(group.id, group);
    }

    pub fn remove_group(&self, group_id: GroupId) {
        let mut state = self.state.write();
        state.groups.remove(&group_id);
        state.group_members.remove(&group_id);
    }

    pub fn put_user(&self, user: User) {
        self.state.write().users.insert(user.id, user);
    }

    pub fn set_suspended(&self, user_id: UserId, suspended: bool) {
        if let Some(user) = self.state.write().users.get_mut(&user_id) {
            user.suspended = suspended;
        }
    }

    /// Drop the user and every enrolment, group and capability they hold
    pub fn remove_user(&self, user_id: UserId) {
        let mut state = self.state.write();
        state.users.remove(&user_id);
        for members in state.group_members.values_mut() {
            members.remove(&user_id);
        }
        for members in state.enrolments.values_mut() {
            members.remove(&user_id);
        }
        for members in state.all_groups.values_mut() {
            members.remove(&user_id);
        }
    }

    pub fn enrol(&self, course_id: CourseId, user_id: UserId) {
        self.state
            .write()
            .enrolments
            .entry(course_id)
            .or_default()
            .insert(user_id);
    }

    pub fn unenrol(&self, course_id: CourseId, user_id: UserId) {
        if let Some(members) = self.state.write().enrolments.get_mut(&course_id) {
            members.remove(&user_id);
        }
    }

    pub fn add_group_member(&self, group_id: GroupId, user_id: UserId) {
        self.state
            .write()
            .group_members
            .entry(group_id)
            .or_default()
            .insert(user_id);
    }

    pub fn remove_group_member(&self, group_id: GroupId, user_id: UserId) {
        if let Some(members) = self.state.write().group_members.get_mut(&group_id) {
            members.remove(&user_id);
        }
    }

    pub fn grant_all_groups(&self, course_id: CourseId, user_id: UserId) {
        self.state
            .write()
            .all_groups
            .entry(course_id)
            .or_default()
            .insert(user_id);
    }
}

#[async_trait]
impl CourseDirectory for MemoryDirectory {
    async fn find_course(&self, id: CourseId) -> RepoResult<Option<Course>> {
        Ok(self.state.read().courses.get(&id).cloned())
    }

    async fn groups_in_course(&self, course_id: CourseId) -> RepoResult<Vec<Group>> {
        let state = self.state.read();
        let mut groups: Vec<Group> = state
            .groups
            .values()
            .filter(|g| g.course_id == course_id)
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.id);
        Ok(groups)
    }

    async fn group_member_ids(&self, group_id: GroupId) -> RepoResult<Vec<UserId>> {
        Ok(self
            .state
            .read()
            .group_members
            .get(&group_id)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn room_member_ids(&self, course_id: CourseId) -> RepoResult<Vec<UserId>> {
        let state = self.state.read();
        Ok(state
            .enrolments
            .get(&course_id)
            .map(|members| {
                members
                    .iter()
                    .filter(|id| state.users.get(*id).is_some_and(User::is_active))
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn all_groups_member_ids(&self, course_id: CourseId) -> RepoResult<Vec<UserId>> {
        let state = self.state.read();
        Ok(state
            .all_groups
            .get(&course_id)
            .map(|members| {
                members
                    .iter()
                    .filter(|id| state.users.get(*id).is_some_and(User::is_active))
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn enrolled_course_ids(&self, user_id: UserId) -> RepoResult<Vec<CourseId>> {
        let state = self.state.read();
        let mut ids: Vec<CourseId> = state
            .enrolments
            .iter()
            .filter(|(_, members)| members.contains(&user_id))
            .map(|(course_id, _)| *course_id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}
