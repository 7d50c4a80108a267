//! Instance-user mapping database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for communication_user_mappings table
#[derive(Debug, Clone, FromRow)]
pub struct InstanceUserMappingModel {
    pub instance_id: i64,
    pub user_id: i64,
    pub state: String,
    pub updated_at: DateTime<Utc>,
}
