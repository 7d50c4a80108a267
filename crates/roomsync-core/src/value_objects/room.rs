//! Room value objects

use serde::{Deserialize, Serialize};
use std::fmt;

use super::instance_key::InstanceKey;

/// Opaque backend-assigned room identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// What a provider needs to create or update a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSpec {
    pub name: String,
    pub topic: Option<String>,
    /// Owning entity, for providers that tag rooms with their origin
    pub context: InstanceKey,
}

impl RoomSpec {
    pub fn new(name: impl Into<String>, topic: Option<String>, context: InstanceKey) -> Self {
        Self {
            name: name.into(),
            topic,
            context,
        }
    }
}
