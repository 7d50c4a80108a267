//! Domain entities - core business objects

mod course;
mod group;
mod instance;
mod mapping;
mod user;

pub use course::{Course, GroupMode};
pub use group::Group;
pub use instance::{CommunicationInstance, NewCommunicationInstance};
pub use mapping::{InstanceUserMapping, MembershipState};
pub use user::User;
