//! Hook registry

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use roomsync_core::{DomainEvent, EventKind};

use super::listeners::{CourseListener, EnrolmentListener, GroupListener, UserListener};
use crate::services::{ServiceContext, ServiceResult};

/// A callback bound to one or more event kinds
#[async_trait]
pub trait HookListener: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    async fn handle(&self, ctx: &ServiceContext, event: &DomainEvent) -> ServiceResult<()>;
}

/// Event kind to ordered listeners
#[derive(Default)]
pub struct HookRegistry {
    bindings: HashMap<EventKind, Vec<Arc<dyn HookListener>>>,
}

impl HookRegistry {
    pub fn builder() -> HookRegistryBuilder {
        HookRegistryBuilder::new()
    }

    /// Listeners for a kind, in registration order
    pub fn listeners(&self, kind: EventKind) -> &[Arc<dyn HookListener>] {
        self.bindings.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of (kind, listener) bindings
    pub fn len(&self) -> usize {
        self.bindings.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (kind, listeners) in &self.bindings {
            let names: Vec<&str> = listeners.iter().map(|l| l.name()).collect();
            map.entry(kind, &names);
        }
        map.finish()
    }
}

/// Builder for [`HookRegistry`]
#[derive(Default)]
pub struct HookRegistryBuilder {
    bindings: HashMap<EventKind, Vec<Arc<dyn HookListener>>>,
}

impl HookRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a listener to one event kind
    pub fn on(mut self, kind: EventKind, listener: Arc<dyn HookListener>) -> Self {
        self.bindings.entry(kind).or_default().push(listener);
        self
    }

    /// Bind a listener to several event kinds
    pub fn on_each(mut self, kinds: &[EventKind], listener: Arc<dyn HookListener>) -> Self {
        for kind in kinds {
            self = self.on(*kind, Arc::clone(&listener));
        }
        self
    }

    pub fn build(self) -> HookRegistry {
        HookRegistry {
            bindings: self.bindings,
        }
    }
}

/// Registry wiring every communication listener
pub fn default_registry() -> HookRegistry {
    HookRegistry::builder()
        .on_each(
            &[
                EventKind::CourseCreated,
                EventKind::CourseUpdated,
                EventKind::CourseDeleted,
            ],
            Arc::new(CourseListener),
        )
        .on_each(
            &[
                EventKind::GroupCreated,
                EventKind::GroupUpdated,
                EventKind::GroupDeleted,
                EventKind::GroupMembersAdded,
                EventKind::GroupMembersRemoved,
            ],
            Arc::new(GroupListener),
        )
        .on_each(
            &[EventKind::UserUpdated, EventKind::UserDeleted],
            Arc::new(UserListener),
        )
        .on_each(
            &[
                EventKind::RoleAssigned,
                EventKind::RoleUnassigned,
                EventKind::EnrolInstanceStatusChanged,
                EventKind::EnrolInstanceDeleted,
                EventKind::UserEnrolled,
                EventKind::UserEnrolmentUpdated,
                EventKind::UserUnenrolled,
            ],
            Arc::new(EnrolmentListener),
        )
        .build()
}
