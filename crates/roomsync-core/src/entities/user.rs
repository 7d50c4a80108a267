//! User entity

use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// User snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub suspended: bool,
    pub deleted: bool,
}

impl User {
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            suspended: false,
            deleted: false,
        }
    }

    /// Check if the user may currently hold room memberships
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.suspended && !self.deleted
    }
}
