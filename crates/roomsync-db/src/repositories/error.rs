//! Error handling utilities for repositories

use roomsync_core::error::DomainError;
use roomsync_core::value_objects::{InstanceId, InstanceKey};
use sqlx::Error as SqlxError;

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

/// Check for unique violation and return appropriate error or fallback
pub fn map_unique_violation<F>(e: SqlxError, on_unique: F) -> DomainError
where
    F: FnOnce() -> DomainError,
{
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return on_unique();
        }
    }
    DomainError::DatabaseError(e.to_string())
}

/// Create an "instance not found" error
pub fn instance_not_found(id: InstanceId) -> DomainError {
    DomainError::InstanceNotFound(id)
}

/// Create an "instance exists" error
pub fn instance_exists(key: &InstanceKey) -> DomainError {
    DomainError::InstanceExists(key.to_string())
}
