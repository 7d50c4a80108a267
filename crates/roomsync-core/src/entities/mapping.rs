//! Instance-user mapping entity - a user's relationship to an instance's room

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;
use crate::value_objects::{InstanceId, UserId};

/// Membership state of a mapping row
///
/// Every change between "absent" and "confirmed" passes through a pending
/// state, so a crash between the provider call and the local write leaves a
/// marker that the next attempt retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipState {
    PendingAdd,
    Confirmed,
    PendingDelete,
}

impl MembershipState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingAdd => "pending_add",
            Self::Confirmed => "confirmed",
            Self::PendingDelete => "pending_delete",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "pending_add" => Ok(Self::PendingAdd),
            "confirmed" => Ok(Self::Confirmed),
            "pending_delete" => Ok(Self::PendingDelete),
            other => Err(DomainError::ValidationError(format!(
                "unknown membership state '{other}'"
            ))),
        }
    }

    /// Check if this row still needs a provider call
    #[inline]
    pub fn is_pending(&self) -> bool {
        !matches!(self, Self::Confirmed)
    }

    /// Check a transition, `None` standing for "no row"
    pub fn transition_allowed(from: Option<Self>, to: Option<Self>) -> bool {
        match (from, to) {
            (None, Some(Self::PendingAdd))
            | (Some(Self::PendingAdd), Some(Self::Confirmed | Self::PendingDelete))
            | (Some(Self::Confirmed), Some(Self::PendingDelete))
            | (Some(Self::PendingDelete), None | Some(Self::PendingAdd)) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Validate a transition for a user
    pub fn check_transition(
        user_id: UserId,
        from: Option<Self>,
        to: Option<Self>,
    ) -> Result<(), DomainError> {
        if Self::transition_allowed(from, to) {
            Ok(())
        } else {
            Err(DomainError::IllegalTransition {
                user_id,
                from: from.map_or("absent", |s| s.as_str()),
                to: to.map_or("absent", |s| s.as_str()),
            })
        }
    }
}

impl fmt::Display for MembershipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping row, unique per (instance, user)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceUserMapping {
    pub instance_id: InstanceId,
    pub user_id: UserId,
    pub state: MembershipState,
    pub updated_at: DateTime<Utc>,
}

impl InstanceUserMapping {
    pub fn new(instance_id: InstanceId, user_id: UserId, state: MembershipState) -> Self {
        Self {
            instance_id,
            user_id,
            state,
            updated_at: Utc::now(),
        }
    }
}
