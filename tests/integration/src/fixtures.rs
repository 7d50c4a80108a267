//! Test fixtures and data generators

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};

use roomsync_core::{Course, CourseId, Group, GroupId, GroupMode, ProviderId, User, UserId};

/// Counter for unique entity ids
static COUNTER: AtomicI64 = AtomicI64::new(1000);

/// Get a unique id for test data
pub fn unique_id() -> i64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Course with communication on the in-memory provider
pub fn course(group_mode: GroupMode) -> Course {
    let id = unique_id();
    let mut course = Course::new(CourseId::new(id), format!("Course {id}"));
    course.group_mode = group_mode;
    course.communication_provider = ProviderId::Memory;
    course
}

pub fn group(course: &Course, name: &str) -> Group {
    Group::new(GroupId::new(unique_id()), course.id, name)
}

pub fn user(id: i64) -> User {
    User::new(UserId::new(id), format!("user{id}"))
}

pub fn suspended(user: &User) -> User {
    User {
        suspended: true,
        ..user.clone()
    }
}

pub fn ids(ids: &[i64]) -> Vec<UserId> {
    ids.iter().copied().map(UserId::new).collect()
}

pub fn id_set(ids: &[i64]) -> BTreeSet<UserId> {
    ids.iter().copied().map(UserId::new).collect()
}
