//! PostgreSQL implementation of MappingRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use roomsync_core::entities::{InstanceUserMapping, MembershipState};
use roomsync_core::traits::{MappingRepository, RepoResult};
use roomsync_core::value_objects::{InstanceId, UserId};

use crate::models::InstanceUserMappingModel;

use super::error::map_db_error;

fn raw_ids(user_ids: &[UserId]) -> Vec<i64> {
    user_ids.iter().map(|id| id.into_inner()).collect()
}

fn into_entities(models: Vec<InstanceUserMappingModel>) -> RepoResult<Vec<InstanceUserMapping>> {
    models.into_iter().map(InstanceUserMapping::try_from).collect()
}

/// PostgreSQL implementation of MappingRepository
#[derive(Clone)]
pub struct PgMappingRepository {
    pool: PgPool,
}

impl PgMappingRepository {
    /// Create a new PgMappingRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MappingRepository for PgMappingRepository {
    #[instrument(skip(self))]
    async fn find_by_instance(&self, instance_id: InstanceId) -> RepoResult<Vec<InstanceUserMapping>> {
        let results = sqlx::query_as::<_, InstanceUserMappingModel>(
            r#"
            SELECT instance_id, user_id, state, updated_at
            FROM communication_user_mappings
            WHERE instance_id = $1
            ORDER BY user_id
            "#,
        )
        .bind(instance_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        into_entities(results)
    }

    #[instrument(skip(self))]
    async fn find_by_state(
        &self,
        instance_id: InstanceId,
        state: MembershipState,
    ) -> RepoResult<Vec<InstanceUserMapping>> {
        let results = sqlx::query_as::<_, InstanceUserMappingModel>(
            r#"
            SELECT instance_id, user_id, state, updated_at
            FROM communication_user_mappings
            WHERE instance_id = $1 AND state = $2
            ORDER BY user_id
            "#,
        )
        .bind(instance_id.into_inner())
        .bind(state.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        into_entities(results)
    }

    #[instrument(skip(self))]
    async fn find_by_user(&self, user_id: UserId) -> RepoResult<Vec<InstanceUserMapping>> {
        let results = sqlx::query_as::<_, InstanceUserMappingModel>(
            r#"
            SELECT instance_id, user_id, state, updated_at
            FROM communication_user_mappings
            WHERE user_id = $1
            ORDER BY instance_id
            "#,
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        into_entities(results)
    }

    #[instrument(skip(self, user_ids), fields(count = user_ids.len()))]
    async fn upsert(
        &self,
        instance_id: InstanceId,
        user_ids: &[UserId],
        state: MembershipState,
    ) -> RepoResult<()> {
        if user_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO communication_user_mappings (instance_id, user_id, state, updated_at)
            SELECT $1, u, $3, NOW() FROM UNNEST($2::BIGINT[]) AS u
            ON CONFLICT (instance_id, user_id)
            DO UPDATE SET state = EXCLUDED.state, updated_at = NOW()
            "#,
        )
        .bind(instance_id.into_inner())
        .bind(raw_ids(user_ids))
        .bind(state.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, user_ids), fields(count = user_ids.len()))]
    async fn delete_users(&self, instance_id: InstanceId, user_ids: &[UserId]) -> RepoResult<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            DELETE FROM communication_user_mappings
            WHERE instance_id = $1 AND user_id = ANY($2)
            "#,
        )
        .bind(instance_id.into_inner())
        .bind(raw_ids(user_ids))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete_by_instance(&self, instance_id: InstanceId) -> RepoResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM communication_user_mappings WHERE instance_id = $1
            "#,
        )
        .bind(instance_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}
