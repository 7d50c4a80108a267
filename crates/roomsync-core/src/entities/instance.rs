//! Communication instance entity - the persistent record behind a processor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{InstanceId, InstanceKey, ProviderId, RoomId};

/// Binds a host entity to a provider and an external room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationInstance {
    pub id: InstanceId,
    pub key: InstanceKey,
    /// Stored provider identifier; kept raw so an unknown value can be reported
    pub provider: String,
    pub room_name: Option<String>,
    pub room_topic: Option<String>,
    pub room_id: Option<RoomId>,
    pub active: bool,
    /// Optimistic concurrency counter
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommunicationInstance {
    /// Resolve the stored provider identifier
    pub fn provider_id(&self) -> Result<ProviderId, DomainError> {
        ProviderId::parse(&self.provider)
    }

    /// Check if synchronisation is disabled for this instance
    pub fn is_provider_none(&self) -> bool {
        matches!(self.provider_id(), Ok(ProviderId::None))
    }

    /// Check if an external room exists
    #[inline]
    pub fn has_room(&self) -> bool {
        self.room_id.is_some()
    }

    /// Set the provider and bump `updated_at`
    pub fn set_provider(&mut self, provider: ProviderId) {
        self.provider = provider.as_str().to_string();
        self.updated_at = Utc::now();
    }

    /// Record room attributes and bump `updated_at`
    pub fn set_room(&mut self, room_id: Option<RoomId>, name: Option<String>, topic: Option<String>) {
        self.room_id = room_id;
        self.room_name = name;
        self.room_topic = topic;
        self.updated_at = Utc::now();
    }
}

/// Values for inserting a new instance; the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommunicationInstance {
    pub key: InstanceKey,
    pub provider: ProviderId,
    pub room_name: Option<String>,
    pub room_topic: Option<String>,
}

impl NewCommunicationInstance {
    pub fn new(key: InstanceKey, provider: ProviderId) -> Self {
        Self {
            key,
            provider,
            room_name: None,
            room_topic: None,
        }
    }

    pub fn with_room_name(mut self, name: impl Into<String>) -> Self {
        self.room_name = Some(name.into());
        self
    }

    /// Materialise the record with the id assigned by the store
    pub fn into_instance(self, id: InstanceId) -> CommunicationInstance {
        let now = Utc::now();
        CommunicationInstance {
            id,
            key: self.key,
            provider: self.provider.as_str().to_string(),
            room_name: self.room_name,
            room_topic: self.room_topic,
            room_id: None,
            active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
