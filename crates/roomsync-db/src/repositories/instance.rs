//! PostgreSQL implementation of InstanceRepository

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use roomsync_core::entities::{CommunicationInstance, NewCommunicationInstance};
use roomsync_core::error::DomainError;
use roomsync_core::traits::{InstanceRepository, RepoResult};
use roomsync_core::value_objects::{InstanceId, InstanceKey};

use crate::mappers::InstanceWrite;
use crate::models::CommunicationInstanceModel;

use super::error::{instance_exists, instance_not_found, map_db_error, map_unique_violation};

const INSTANCE_COLUMNS: &str = "id, component, instance_type, instance_id, provider, room_name, \
     room_topic, room_id, active, version, created_at, updated_at";

/// PostgreSQL implementation of InstanceRepository
#[derive(Clone)]
pub struct PgInstanceRepository {
    pool: PgPool,
}

impl PgInstanceRepository {
    /// Create a new PgInstanceRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Versioned update inside an open transaction
    async fn write_versioned(
        tx: &mut Transaction<'_, Postgres>,
        instance: &CommunicationInstance,
    ) -> RepoResult<CommunicationInstance> {
        let write = InstanceWrite::new(instance);

        let updated = sqlx::query_as::<_, CommunicationInstanceModel>(&format!(
            r#"
            UPDATE communication_instances
            SET provider = $2, room_name = $3, room_topic = $4, room_id = $5, active = $6,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $7
            RETURNING {INSTANCE_COLUMNS}
            "#
        ))
        .bind(write.id)
        .bind(write.provider)
        .bind(write.room_name)
        .bind(write.room_topic)
        .bind(write.room_id)
        .bind(write.active)
        .bind(write.expected_version)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_db_error)?;

        if let Some(model) = updated {
            return Ok(model.into());
        }

        // Zero rows: either the row is gone or someone else bumped the version.
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM communication_instances WHERE id = $1)
            "#,
        )
        .bind(write.id)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_db_error)?;

        if exists {
            Err(DomainError::StaleInstance(instance.id))
        } else {
            Err(instance_not_found(instance.id))
        }
    }
}

#[async_trait]
impl InstanceRepository for PgInstanceRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: InstanceId) -> RepoResult<Option<CommunicationInstance>> {
        let result = sqlx::query_as::<_, CommunicationInstanceModel>(&format!(
            r#"
            SELECT {INSTANCE_COLUMNS}
            FROM communication_instances
            WHERE id = $1
            "#
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_by_key(&self, key: &InstanceKey) -> RepoResult<Option<CommunicationInstance>> {
        let result = sqlx::query_as::<_, CommunicationInstanceModel>(&format!(
            r#"
            SELECT {INSTANCE_COLUMNS}
            FROM communication_instances
            WHERE component = $1 AND instance_type = $2 AND instance_id = $3
            "#
        ))
        .bind(&key.component)
        .bind(&key.instance_type)
        .bind(key.instance_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn create(&self, instance: &NewCommunicationInstance) -> RepoResult<CommunicationInstance> {
        let model = sqlx::query_as::<_, CommunicationInstanceModel>(&format!(
            r#"
            INSERT INTO communication_instances
                (component, instance_type, instance_id, provider, room_name, room_topic)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {INSTANCE_COLUMNS}
            "#
        ))
        .bind(&instance.key.component)
        .bind(&instance.key.instance_type)
        .bind(instance.key.instance_id)
        .bind(instance.provider.as_str())
        .bind(&instance.room_name)
        .bind(&instance.room_topic)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || instance_exists(&instance.key)))?;

        Ok(model.into())
    }

    #[instrument(skip(self), fields(instance_id = %instance.id, version = instance.version))]
    async fn update(&self, instance: &CommunicationInstance) -> RepoResult<CommunicationInstance> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let updated = Self::write_versioned(&mut tx, instance).await?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(updated)
    }

    #[instrument(skip(self), fields(instance_id = %instance.id, provider = %instance.provider))]
    async fn switch_provider(
        &self,
        instance: &CommunicationInstance,
    ) -> RepoResult<CommunicationInstance> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let updated = Self::write_versioned(&mut tx, instance).await?;

        let dropped = sqlx::query(
            r#"
            DELETE FROM communication_user_mappings
            WHERE instance_id = $1 AND state = 'pending_delete'
            "#,
        )
        .bind(instance.id.into_inner())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let requeued = sqlx::query(
            r#"
            UPDATE communication_user_mappings
            SET state = 'pending_add', updated_at = NOW()
            WHERE instance_id = $1
            "#,
        )
        .bind(instance.id.into_inner())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        debug!(
            dropped = dropped.rows_affected(),
            requeued = requeued.rows_affected(),
            "Mappings migrated to new provider"
        );
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: InstanceId) -> RepoResult<()> {
        // Mappings go with the row through ON DELETE CASCADE
        let result = sqlx::query(
            r#"
            DELETE FROM communication_instances WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(instance_not_found(id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_needing_reconciliation(
        &self,
        limit: i64,
    ) -> RepoResult<Vec<CommunicationInstance>> {
        let limit = limit.clamp(1, 1000);

        let results = sqlx::query_as::<_, CommunicationInstanceModel>(&format!(
            r#"
            SELECT {INSTANCE_COLUMNS}
            FROM communication_instances i
            WHERE (NOT i.active AND i.room_id IS NOT NULL)
               OR (i.active AND (
                (i.provider <> 'none' AND (
                    i.room_id IS NULL
                    OR EXISTS(
                        SELECT 1 FROM communication_user_mappings m
                        WHERE m.instance_id = i.id AND m.state <> 'confirmed'
                    )
                ))
                OR EXISTS(
                    SELECT 1 FROM communication_user_mappings m
                    WHERE m.instance_id = i.id AND m.state = 'pending_delete'
                )
              ))
            ORDER BY i.reconciled_at ASC NULLS FIRST, i.id
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn mark_reconciled(&self, id: InstanceId) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE communication_instances
            SET reconciled_at = clock_timestamp()
            WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }
}
