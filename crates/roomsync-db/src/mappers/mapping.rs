//! InstanceUserMapping entity <-> model mapper

use roomsync_core::entities::{InstanceUserMapping, MembershipState};
use roomsync_core::error::DomainError;
use roomsync_core::value_objects::{InstanceId, UserId};

use crate::models::InstanceUserMappingModel;

/// Fails if the stored state is not a known membership state
impl TryFrom<InstanceUserMappingModel> for InstanceUserMapping {
    type Error = DomainError;

    fn try_from(model: InstanceUserMappingModel) -> Result<Self, Self::Error> {
        Ok(InstanceUserMapping {
            instance_id: InstanceId::new(model.instance_id),
            user_id: UserId::new(model.user_id),
            state: MembershipState::parse(&model.state)?,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn model(state: &str) -> InstanceUserMappingModel {
        InstanceUserMappingModel {
            instance_id: 1,
            user_id: 2,
            state: state.to_string(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_model_to_entity() {
        let mapping = InstanceUserMapping::try_from(model("pending_delete")).unwrap();
        assert_eq!(mapping.user_id, UserId::new(2));
        assert_eq!(mapping.state, MembershipState::PendingDelete);
    }

    #[test]
    fn test_unknown_state() {
        assert!(InstanceUserMapping::try_from(model("joined")).is_err());
    }
}
