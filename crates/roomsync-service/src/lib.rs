//! # roomsync-service
//!
//! Application layer keeping external chat rooms in step with courses,
//! groups and users.
//!
//! - [`CommunicationApi`]: loads or creates the processor of an entity
//! - [`CommunicationProcessor`]: room and membership state of one entity
//! - course, group and user services translating domain changes into
//!   processor calls
//! - [`HookDispatcher`]: delivers domain events to registered listeners
//! - [`ReconciliationService`]: retries pending work

pub mod hooks;
pub mod services;

pub use hooks::{default_registry, HookDispatcher, HookListener, HookRegistry, HookRegistryBuilder};
pub use services::{
    CommunicationApi, CommunicationProcessor, CourseCommunicationService, GroupCommunicationService,
    MembershipAction, MembershipSync, ReconciliationReport, ReconciliationService, ServiceContext,
    ServiceContextBuilder, ServiceError, ServiceResult, SyncOutcome, UserCommunicationService,
};
