//! Instance key - identifies the host entity a communication instance belongs to

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{CourseId, GroupId, UserId};

/// Composite key (component, instance type, instance id)
///
/// At most one communication instance exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceKey {
    pub component: String,
    pub instance_type: String,
    pub instance_id: i64,
}

impl InstanceKey {
    pub const COURSE_COMPONENT: &'static str = "core_course";
    pub const COURSE_INSTANCE_TYPE: &'static str = "coursecommunication";
    pub const GROUP_COMPONENT: &'static str = "core_group";
    pub const GROUP_INSTANCE_TYPE: &'static str = "groupcommunication";
    pub const USER_COMPONENT: &'static str = "core_user";
    pub const USER_INSTANCE_TYPE: &'static str = "usercommunication";

    /// Create a new key
    pub fn new(component: impl Into<String>, instance_type: impl Into<String>, instance_id: i64) -> Self {
        Self {
            component: component.into(),
            instance_type: instance_type.into(),
            instance_id,
        }
    }

    /// Key of a course room
    pub fn course(course_id: CourseId) -> Self {
        Self::new(
            Self::COURSE_COMPONENT,
            Self::COURSE_INSTANCE_TYPE,
            course_id.into_inner(),
        )
    }

    /// Key of a group room
    pub fn group(group_id: GroupId) -> Self {
        Self::new(
            Self::GROUP_COMPONENT,
            Self::GROUP_INSTANCE_TYPE,
            group_id.into_inner(),
        )
    }

    /// Key of a personal user room
    pub fn user(user_id: UserId) -> Self {
        Self::new(
            Self::USER_COMPONENT,
            Self::USER_INSTANCE_TYPE,
            user_id.into_inner(),
        )
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.component, self.instance_type, self.instance_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_keys() {
        let key = InstanceKey::course(CourseId::new(12));
        assert_eq!(key.component, "core_course");
        assert_eq!(key.instance_type, "coursecommunication");
        assert_eq!(key.instance_id, 12);

        assert_ne!(
            InstanceKey::group(GroupId::new(12)),
            InstanceKey::course(CourseId::new(12))
        );
    }

    #[test]
    fn test_display() {
        let key = InstanceKey::group(GroupId::new(3));
        assert_eq!(key.to_string(), "core_group/groupcommunication/3");
    }
}
