//! Course entity - snapshot of a host course as seen by communication

use serde::{Deserialize, Serialize};

use crate::value_objects::{CourseId, ProviderId};

/// Course group mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupMode {
    #[default]
    NoGroups,
    Separate,
    Visible,
}

/// Course snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub full_name: String,
    pub summary: Option<String>,
    pub group_mode: GroupMode,
    /// Provider selected on the course settings form
    pub communication_provider: ProviderId,
    /// Custom room name; falls back to the full name when empty
    pub communication_room_name: Option<String>,
}

impl Course {
    /// Create a course without communication configured
    pub fn new(id: CourseId, full_name: impl Into<String>) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            summary: None,
            group_mode: GroupMode::NoGroups,
            communication_provider: ProviderId::None,
            communication_room_name: None,
        }
    }

    /// Name used for the course room
    pub fn room_name(&self) -> &str {
        match self.communication_room_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.full_name,
        }
    }

    /// Check if membership is partitioned per group
    #[inline]
    pub fn group_mode_enabled(&self) -> bool {
        !matches!(self.group_mode, GroupMode::NoGroups)
    }
}
