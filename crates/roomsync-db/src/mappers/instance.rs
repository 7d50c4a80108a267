//! CommunicationInstance entity <-> model mapper

use roomsync_core::entities::CommunicationInstance;
use roomsync_core::value_objects::{InstanceId, InstanceKey, RoomId};

use crate::models::CommunicationInstanceModel;

impl From<CommunicationInstanceModel> for CommunicationInstance {
    fn from(model: CommunicationInstanceModel) -> Self {
        CommunicationInstance {
            id: InstanceId::new(model.id),
            key: InstanceKey::new(model.component, model.instance_type, model.instance_id),
            provider: model.provider,
            room_name: model.room_name,
            room_topic: model.room_topic,
            room_id: model.room_id.map(RoomId::new),
            active: model.active,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Column values written by an instance update
pub struct InstanceWrite<'a> {
    pub id: i64,
    pub provider: &'a str,
    pub room_name: Option<&'a str>,
    pub room_topic: Option<&'a str>,
    pub room_id: Option<&'a str>,
    pub active: bool,
    /// Version the caller read; the update only applies if it still matches
    pub expected_version: i64,
}

impl<'a> InstanceWrite<'a> {
    pub fn new(instance: &'a CommunicationInstance) -> Self {
        Self {
            id: instance.id.into_inner(),
            provider: &instance.provider,
            room_name: instance.room_name.as_deref(),
            room_topic: instance.room_topic.as_deref(),
            room_id: instance.room_id.as_ref().map(RoomId::as_str),
            active: instance.active,
            expected_version: instance.version,
        }
    }
}
