//! # roomsync-core
//!
//! Domain layer containing communication instances, membership mappings,
//! domain events, and the ports (storage, directory, room provider) that the
//! outer crates implement. This crate has zero dependencies on infrastructure.

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    CommunicationInstance, Course, GroupMode, Group, InstanceUserMapping, MembershipState,
    NewCommunicationInstance, User,
};
pub use error::DomainError;
pub use events::{DomainEvent, EventKind};
pub use traits::{
    CourseDirectory, InstanceRepository, MappingRepository, ProviderResult, RepoResult,
    RoomProvider,
};
pub use value_objects::{
    CourseId, GroupId, IdParseError, InstanceId, InstanceKey, ProviderId, RoomId, RoomSpec, UserId,
};
