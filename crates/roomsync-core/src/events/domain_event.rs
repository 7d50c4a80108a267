//! Domain events - lifecycle changes of host entities
//!
//! These events are produced by the host application and consumed by the
//! hook dispatcher, which routes them to the communication helpers. Events
//! for "updated" changes carry the prior snapshot next to the new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::{Course, Group, User};
use crate::value_objects::{CourseId, UserId};

/// All events the communication core listens to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    // =========================================================================
    // Course Events
    // =========================================================================
    CourseCreated(CourseCreatedEvent),
    CourseUpdated(CourseUpdatedEvent),
    CourseDeleted(CourseDeletedEvent),

    // =========================================================================
    // Group Events
    // =========================================================================
    GroupCreated(GroupCreatedEvent),
    GroupUpdated(GroupUpdatedEvent),
    GroupDeleted(GroupDeletedEvent),
    GroupMembersAdded(GroupMembersAddedEvent),
    GroupMembersRemoved(GroupMembersRemovedEvent),

    // =========================================================================
    // User Events (dispatched before the change is written)
    // =========================================================================
    UserUpdated(UserUpdatedEvent),
    UserDeleted(UserDeletedEvent),

    // =========================================================================
    // Role Events
    // =========================================================================
    RoleAssigned(RoleAssignedEvent),
    RoleUnassigned(RoleUnassignedEvent),

    // =========================================================================
    // Enrolment Events
    // =========================================================================
    EnrolInstanceStatusChanged(EnrolInstanceStatusChangedEvent),
    EnrolInstanceDeleted(EnrolInstanceDeletedEvent),
    UserEnrolled(UserEnrolledEvent),
    UserEnrolmentUpdated(UserEnrolmentUpdatedEvent),
    UserUnenrolled(UserUnenrolledEvent),
}

/// Discriminant of [`DomainEvent`], used as the hook registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CourseCreated,
    CourseUpdated,
    CourseDeleted,
    GroupCreated,
    GroupUpdated,
    GroupDeleted,
    GroupMembersAdded,
    GroupMembersRemoved,
    UserUpdated,
    UserDeleted,
    RoleAssigned,
    RoleUnassigned,
    EnrolInstanceStatusChanged,
    EnrolInstanceDeleted,
    UserEnrolled,
    UserEnrolmentUpdated,
    UserUnenrolled,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CourseCreated => "COURSE_CREATED",
            Self::CourseUpdated => "COURSE_UPDATED",
            Self::CourseDeleted => "COURSE_DELETED",
            Self::GroupCreated => "GROUP_CREATED",
            Self::GroupUpdated => "GROUP_UPDATED",
            Self::GroupDeleted => "GROUP_DELETED",
            Self::GroupMembersAdded => "GROUP_MEMBERS_ADDED",
            Self::GroupMembersRemoved => "GROUP_MEMBERS_REMOVED",
            Self::UserUpdated => "USER_UPDATED",
            Self::UserDeleted => "USER_DELETED",
            Self::RoleAssigned => "ROLE_ASSIGNED",
            Self::RoleUnassigned => "ROLE_UNASSIGNED",
            Self::EnrolInstanceStatusChanged => "ENROL_INSTANCE_STATUS_CHANGED",
            Self::EnrolInstanceDeleted => "ENROL_INSTANCE_DELETED",
            Self::UserEnrolled => "USER_ENROLLED",
            Self::UserEnrolmentUpdated => "USER_ENROLMENT_UPDATED",
            Self::UserUnenrolled => "USER_UNENROLLED",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DomainEvent {
    /// Get the event kind
    pub fn kind(&self) -> EventKind {
        match self {
            Self::CourseCreated(_) => EventKind::CourseCreated,
            Self::CourseUpdated(_) => EventKind::CourseUpdated,
            Self::CourseDeleted(_) => EventKind::CourseDeleted,
            Self::GroupCreated(_) => EventKind::GroupCreated,
            Self::GroupUpdated(_) => EventKind::GroupUpdated,
            Self::GroupDeleted(_) => EventKind::GroupDeleted,
            Self::GroupMembersAdded(_) => EventKind::GroupMembersAdded,
            Self::GroupMembersRemoved(_) => EventKind::GroupMembersRemoved,
            Self::UserUpdated(_) => EventKind::UserUpdated,
            Self::UserDeleted(_) => EventKind::UserDeleted,
            Self::RoleAssigned(_) => EventKind::RoleAssigned,
            Self::RoleUnassigned(_) => EventKind::RoleUnassigned,
            Self::EnrolInstanceStatusChanged(_) => EventKind::EnrolInstanceStatusChanged,
            Self::EnrolInstanceDeleted(_) => EventKind::EnrolInstanceDeleted,
            Self::UserEnrolled(_) => EventKind::UserEnrolled,
            Self::UserEnrolmentUpdated(_) => EventKind::UserEnrolmentUpdated,
            Self::UserUnenrolled(_) => EventKind::UserUnenrolled,
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Get the timestamp of the event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::CourseCreated(e) => e.timestamp,
            Self::CourseUpdated(e) => e.timestamp,
            Self::CourseDeleted(e) => e.timestamp,
            Self::GroupCreated(e) => e.timestamp,
            Self::GroupUpdated(e) => e.timestamp,
            Self::GroupDeleted(e) => e.timestamp,
            Self::GroupMembersAdded(e) => e.timestamp,
            Self::GroupMembersRemoved(e) => e.timestamp,
            Self::UserUpdated(e) => e.timestamp,
            Self::UserDeleted(e) => e.timestamp,
            Self::RoleAssigned(e) => e.timestamp,
            Self::RoleUnassigned(e) => e.timestamp,
            Self::EnrolInstanceStatusChanged(e) => e.timestamp,
            Self::EnrolInstanceDeleted(e) => e.timestamp,
            Self::UserEnrolled(e) => e.timestamp,
            Self::UserEnrolmentUpdated(e) => e.timestamp,
            Self::UserUnenrolled(e) => e.timestamp,
        }
    }
}

// ============================================================================
// Event Structs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseCreatedEvent {
    pub course: Course,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseUpdatedEvent {
    pub course: Course,
    pub previous: Course,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseDeletedEvent {
    pub course: Course,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupCreatedEvent {
    pub group: Group,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupUpdatedEvent {
    pub group: Group,
    pub previous: Group,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDeletedEvent {
    pub group: Group,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMembersAddedEvent {
    pub group: Group,
    pub user_ids: Vec<UserId>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMembersRemovedEvent {
    pub group: Group,
    pub user_ids: Vec<UserId>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUpdatedEvent {
    pub user: User,
    /// Stored state before the update is written
    pub previous: User,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDeletedEvent {
    pub user: User,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignedEvent {
    pub course_id: CourseId,
    pub user_id: UserId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleUnassignedEvent {
    pub course_id: CourseId,
    pub user_id: UserId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolInstanceStatusChangedEvent {
    pub course_id: CourseId,
    pub enabled: bool,
    pub user_ids: Vec<UserId>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolInstanceDeletedEvent {
    pub course_id: CourseId,
    pub user_ids: Vec<UserId>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEnrolledEvent {
    pub course_id: CourseId,
    pub user_ids: Vec<UserId>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEnrolmentUpdatedEvent {
    pub course_id: CourseId,
    pub user_ids: Vec<UserId>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUnenrolledEvent {
    pub course_id: CourseId,
    pub user_ids: Vec<UserId>,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Event Creation Helpers
// ============================================================================

impl DomainEvent {
    pub fn course_created(course: Course) -> Self {
        Self::CourseCreated(CourseCreatedEvent {
            course,
            timestamp: Utc::now(),
        })
    }

    pub fn course_updated(course: Course, previous: Course) -> Self {
        Self::CourseUpdated(CourseUpdatedEvent {
            course,
            previous,
            timestamp: Utc::now(),
        })
    }

    pub fn course_deleted(course: Course) -> Self {
        Self::CourseDeleted(CourseDeletedEvent {
            course,
            timestamp: Utc::now(),
        })
    }

    pub fn group_created(group: Group) -> Self {
        Self::GroupCreated(GroupCreatedEvent {
            group,
            timestamp: Utc::now(),
        })
    }

    pub fn group_updated(group: Group, previous: Group) -> Self {
        Self::GroupUpdated(GroupUpdatedEvent {
            group,
            previous,
            timestamp: Utc::now(),
        })
    }

    pub fn group_deleted(group: Group) -> Self {
        Self::GroupDeleted(GroupDeletedEvent {
            group,
            timestamp: Utc::now(),
        })
    }

    pub fn group_members_added(group: Group, user_ids: Vec<UserId>) -> Self {
        Self::GroupMembersAdded(GroupMembersAddedEvent {
            group,
            user_ids,
            timestamp: Utc::now(),
        })
    }

    pub fn group_members_removed(group: Group, user_ids: Vec<UserId>) -> Self {
        Self::GroupMembersRemoved(GroupMembersRemovedEvent {
            group,
            user_ids,
            timestamp: Utc::now(),
        })
    }

    pub fn user_updated(user: User, previous: User) -> Self {
        Self::UserUpdated(UserUpdatedEvent {
            user,
            previous,
            timestamp: Utc::now(),
        })
    }

    pub fn user_deleted(user: User) -> Self {
        Self::UserDeleted(UserDeletedEvent {
            user,
            timestamp: Utc::now(),
        })
    }

    pub fn role_assigned(course_id: CourseId, user_id: UserId) -> Self {
        Self::RoleAssigned(RoleAssignedEvent {
            course_id,
            user_id,
            timestamp: Utc::now(),
        })
    }

    pub fn role_unassigned(course_id: CourseId, user_id: UserId) -> Self {
        Self::RoleUnassigned(RoleUnassignedEvent {
            course_id,
            user_id,
            timestamp: Utc::now(),
        })
    }

    pub fn enrol_instance_status_changed(
        course_id: CourseId,
        enabled: bool,
        user_ids: Vec<UserId>,
    ) -> Self {
        Self::EnrolInstanceStatusChanged(EnrolInstanceStatusChangedEvent {
            course_id,
            enabled,
            user_ids,
            timestamp: Utc::now(),
        })
    }

    pub fn enrol_instance_deleted(course_id: CourseId, user_ids: Vec<UserId>) -> Self {
        Self::EnrolInstanceDeleted(EnrolInstanceDeletedEvent {
            course_id,
            user_ids,
            timestamp: Utc::now(),
        })
    }

    pub fn user_enrolled(course_id: CourseId, user_ids: Vec<UserId>) -> Self {
        Self::UserEnrolled(UserEnrolledEvent {
            course_id,
            user_ids,
            timestamp: Utc::now(),
        })
    }

    pub fn user_enrolment_updated(course_id: CourseId, user_ids: Vec<UserId>) -> Self {
        Self::UserEnrolmentUpdated(UserEnrolmentUpdatedEvent {
            course_id,
            user_ids,
            timestamp: Utc::now(),
        })
    }

    pub fn user_unenrolled(course_id: CourseId, user_ids: Vec<UserId>) -> Self {
        Self::UserUnenrolled(UserUnenrolledEvent {
            course_id,
            user_ids,
            timestamp: Utc::now(),
        })
    }
}
