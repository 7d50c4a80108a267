//! Communication services
//!
//! The processor owns one entity's room; the course, group and user services
//! hold no state and decide which processors to touch for a domain change.

pub mod api;
pub mod context;
pub mod course;
pub mod error;
pub mod group;
pub mod processor;
pub mod reconcile;
pub mod user;

pub use api::CommunicationApi;
pub use context::{ServiceContext, ServiceContextBuilder};
pub use course::{CourseCommunicationService, MembershipAction};
pub use error::{ServiceError, ServiceResult};
pub use group::GroupCommunicationService;
pub use processor::{CommunicationProcessor, MembershipSync, SyncOutcome};
pub use reconcile::{ReconciliationReport, ReconciliationService};
pub use user::UserCommunicationService;

#[cfg(test)]
pub(crate) mod test_support;
