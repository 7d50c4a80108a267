//! Ports - interfaces the outer crates implement

mod directory;
mod provider;
mod repositories;

pub use directory::CourseDirectory;
pub use provider::{ProviderResult, RoomProvider};
pub use repositories::{InstanceRepository, MappingRepository, RepoResult};
