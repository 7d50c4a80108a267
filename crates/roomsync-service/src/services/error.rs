//! Service layer error types

use roomsync_common::AppError;
use roomsync_core::DomainError;
use std::fmt;
use tracing::warn;

/// Service layer error type
#[derive(Debug)]
pub enum ServiceError {
    /// Domain, storage or provider failure
    Domain(DomainError),

    /// Application error
    App(AppError),

    /// Resource not found
    NotFound { resource: &'static str, id: String },

    /// Validation error
    Validation(String),

    /// Internal error
    Internal(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(e) => write!(f, "{e}"),
            Self::App(e) => write!(f, "{e}"),
            Self::NotFound { resource, id } => write!(f, "{resource} not found: {id}"),
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Domain(e) => Some(e),
            Self::App(e) => Some(e),
            _ => None,
        }
    }
}

impl ServiceError {
    /// Create a not found error
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Communication is off or the provider is not enabled
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::Domain(e) if e.is_not_configured())
    }

    /// Provider temporarily unreachable
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Domain(e) if e.is_transient())
    }

    /// Errors a helper logs and moves past; the pending rows are retried later
    pub fn is_deferrable(&self) -> bool {
        self.is_not_configured() || self.is_transient()
    }

    /// Get the error code for logs and reports
    pub fn error_code(&self) -> &str {
        match self {
            Self::Domain(e) => e.code(),
            Self::App(e) => e.error_code(),
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<AppError> for ServiceError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => AppError::Domain(e),
            ServiceError::App(e) => e,
            ServiceError::NotFound { resource, id } => AppError::NotFound(format!("{resource} {id}")),
            ServiceError::Validation(msg) => AppError::Validation(msg),
            ServiceError::Internal(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Swallow deferrable failures with a warning
///
/// Returns `Ok(None)` when the error was swallowed.
pub(crate) fn tolerate<T>(result: ServiceResult<T>, action: &'static str) -> ServiceResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_deferrable() => {
            warn!(action, code = e.error_code(), error = %e, "Communication step deferred");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = ServiceError::not_found("Course", "12");
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(err.to_string().contains("Course not found: 12"));
    }

    #[test]
    fn test_deferrable() {
        let unavailable = ServiceError::from(DomainError::ProviderUnavailable("down".into()));
        let not_configured = ServiceError::from(DomainError::NotConfigured("off".into()));
        let rejected = ServiceError::from(DomainError::ProviderRejected("bad".into()));

        assert!(unavailable.is_deferrable());
        assert!(not_configured.is_deferrable());
        assert!(!rejected.is_deferrable());
        assert!(!ServiceError::internal("boom").is_deferrable());
    }

    #[test]
    fn test_tolerate() {
        let swallowed: ServiceResult<Option<u8>> = tolerate(
            Err(DomainError::ProviderUnavailable("down".into()).into()),
            "add members",
        );
        assert!(matches!(swallowed, Ok(None)));

        let kept = tolerate(Ok(3), "add members").unwrap();
        assert_eq!(kept, Some(3));

        let propagated = tolerate::<()>(
            Err(DomainError::ProviderChangeUnsupported {
                from: "a".into(),
                to: "b".into(),
            }
            .into()),
            "set provider",
        );
        assert!(propagated.is_err());
    }

    #[test]
    fn test_convert_to_app_error() {
        let app_err: AppError = ServiceError::not_found("Group", "4").into();
        assert_eq!(app_err.error_code(), "NOT_FOUND");
    }
}
