//! Group entity - a partition of a course's participants

use serde::{Deserialize, Serialize};

use crate::value_objects::{CourseId, GroupId};

/// Group snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub course_id: CourseId,
    pub name: String,
    pub description: Option<String>,
}

impl Group {
    pub fn new(id: GroupId, course_id: CourseId, name: impl Into<String>) -> Self {
        Self {
            id,
            course_id,
            name: name.into(),
            description: None,
        }
    }

    /// Group room name, qualified by the course room name
    pub fn room_name(&self, course_room_name: &str) -> String {
        format!("{} ({})", self.name, course_room_name)
    }
}
