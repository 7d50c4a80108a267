//! Communication instance database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for communication_instances table
#[derive(Debug, Clone, FromRow)]
pub struct CommunicationInstanceModel {
    pub id: i64,
    pub component: String,
    pub instance_type: String,
    pub instance_id: i64,
    pub provider: String,
    pub room_name: Option<String>,
    pub room_topic: Option<String>,
    pub room_id: Option<String>,
    pub active: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
