//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::{CourseId, GroupId, InstanceId, UserId};

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Communication Errors
    // =========================================================================
    #[error("Communication not configured: {0}")]
    NotConfigured(String),

    #[error("Room provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Room provider rejected request: {0}")]
    ProviderRejected(String),

    #[error("Cannot change room provider from {from} to {to}")]
    ProviderChangeUnsupported { from: String, to: String },

    #[error("Illegal membership transition for user {user_id}: {from} -> {to}")]
    IllegalTransition {
        user_id: UserId,
        from: &'static str,
        to: &'static str,
    },

    #[error("Communication instance {0} was modified concurrently")]
    StaleInstance(InstanceId),

    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Communication instance not found: {0}")]
    InstanceNotFound(InstanceId),

    #[error("Course not found: {0}")]
    CourseNotFound(CourseId),

    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    // =========================================================================
    // Conflict / Validation Errors
    // =========================================================================
    #[error("Communication instance already exists: {0}")]
    InstanceExists(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for logs and reports
    pub fn code(&self) -> &'static str {
        match self {
            // Communication
            Self::NotConfigured(_) => "NOT_CONFIGURED",
            Self::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            Self::ProviderRejected(_) => "PROVIDER_REJECTED",
            Self::ProviderChangeUnsupported { .. } => "PROVIDER_CHANGE_UNSUPPORTED",
            Self::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            Self::StaleInstance(_) => "STALE_INSTANCE",

            // Not Found
            Self::InstanceNotFound(_) => "UNKNOWN_INSTANCE",
            Self::CourseNotFound(_) => "UNKNOWN_COURSE",
            Self::GroupNotFound(_) => "UNKNOWN_GROUP",
            Self::UserNotFound(_) => "UNKNOWN_USER",

            // Conflict / Validation
            Self::InstanceExists(_) => "INSTANCE_EXISTS",
            Self::ValidationError(_) => "VALIDATION_ERROR",

            // Infrastructure
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Transient failure; the operation can be retried later
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_))
    }

    /// Communication is not set up for the target
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured(_))
    }

    /// The backend or the operator must act before a retry makes sense
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ProviderRejected(_) | Self::ProviderChangeUnsupported { .. }
        )
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::InstanceNotFound(_)
                | Self::CourseNotFound(_)
                | Self::GroupNotFound(_)
                | Self::UserNotFound(_)
        )
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::InstanceExists(_) | Self::StaleInstance(_))
    }
}
