//! Value objects - immutable types that represent domain concepts

mod ids;
mod instance_key;
mod provider_id;
mod room;

pub use ids::{CourseId, GroupId, IdParseError, InstanceId, UserId};
pub use instance_key::InstanceKey;
pub use provider_id::ProviderId;
pub use room::{RoomId, RoomSpec};
