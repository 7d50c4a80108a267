//! Shared fixtures for service tests

use std::sync::Arc;

use roomsync_core::{
    Course, CourseId, Group, GroupId, GroupMode, InstanceKey, ProviderId, User, UserId,
};
use roomsync_db::{MemoryCommunicationStore, MemoryDirectory};
use roomsync_provider::{LinkOnlyProvider, MemoryRoomProvider};

use super::api::CommunicationApi;
use super::context::{ServiceContext, ServiceContextBuilder};
use super::processor::CommunicationProcessor;

pub(crate) fn users(ids: &[i64]) -> Vec<UserId> {
    ids.iter().copied().map(UserId::new).collect()
}

pub(crate) struct Harness {
    pub ctx: ServiceContext,
    pub store: MemoryCommunicationStore,
    pub directory: MemoryDirectory,
    pub provider: Arc<MemoryRoomProvider>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(true)
    }

    pub fn disabled() -> Self {
        Self::build(false)
    }

    fn build(enabled: bool) -> Self {
        let store = MemoryCommunicationStore::new();
        let directory = MemoryDirectory::new();
        let provider = Arc::new(MemoryRoomProvider::new());

        let ctx = ServiceContextBuilder::new()
            .enabled(enabled)
            .instance_repo(Arc::new(store.clone()))
            .mapping_repo(Arc::new(store.clone()))
            .directory(Arc::new(directory.clone()))
            .provider(provider.clone())
            .provider(Arc::new(LinkOnlyProvider::new()))
            .build()
            .unwrap();

        Self {
            ctx,
            store,
            directory,
            provider,
        }
    }

    /// Instance with an existing room on the memory provider
    pub async fn memory_room(&self, key: InstanceKey) -> CommunicationProcessor<'_> {
        let mut processor = CommunicationApi::new(&self.ctx)
            .load_by_instance(key)
            .await
            .unwrap();
        processor
            .update_room(ProviderId::Memory, Some("Maths".to_string()), None)
            .await
            .unwrap();
        processor
    }

    /// Course using the memory provider, stored in the directory
    pub fn course(&self, id: i64, group_mode: GroupMode) -> Course {
        let mut course = Course::new(CourseId::new(id), format!("Course {id}"));
        course.group_mode = group_mode;
        course.communication_provider = ProviderId::Memory;
        self.directory.put_course(course.clone());
        course
    }

    pub fn group(&self, course: &Course, id: i64, name: &str) -> Group {
        let group = Group::new(GroupId::new(id), course.id, name);
        self.directory.put_group(group.clone());
        group
    }

    /// Active users enrolled in the course
    pub fn enrol(&self, course: &Course, ids: &[i64]) -> Vec<UserId> {
        for id in users(ids) {
            self.directory.put_user(User::new(id, format!("user{id}")));
            self.directory.enrol(course.id, id);
        }
        users(ids)
    }

    pub fn join(&self, group: &Group, ids: &[i64]) {
        for id in users(ids) {
            self.directory.add_group_member(group.id, id);
        }
    }

    pub async fn processor(&self, key: InstanceKey) -> Option<CommunicationProcessor<'_>> {
        CommunicationApi::new(&self.ctx)
            .find_by_instance(&key)
            .await
            .unwrap()
    }
}
