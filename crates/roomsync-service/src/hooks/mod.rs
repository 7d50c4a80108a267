//! Hook dispatch
//!
//! Routes domain events to the listeners registered for them. The registry
//! is built once at startup and never changes afterwards.

mod dispatcher;
mod listeners;
mod registry;

pub use dispatcher::HookDispatcher;
pub use listeners::{CourseListener, EnrolmentListener, GroupListener, UserListener};
pub use registry::{default_registry, HookListener, HookRegistry, HookRegistryBuilder};
