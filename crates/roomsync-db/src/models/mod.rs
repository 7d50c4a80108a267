//! Database models with SQLx `FromRow` derives

mod instance;
mod mapping;

pub use instance::CommunicationInstanceModel;
pub use mapping::InstanceUserMappingModel;
