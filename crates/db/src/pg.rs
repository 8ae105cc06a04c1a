//! [`ScheduleStore`] over Postgres, built on the repository functions.

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::{
    AlertStore, DbError, DbPool, ScheduleStore,
    models::{AlertRow, ScheduleBatch, ScheduleRow},
    repository::{alerts, schedules},
};

/// Postgres-backed store. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertStore for PgStore {
    async fn list_alerts(
        &self,
        project_id: Uuid,
        include_dismissed: bool,
    ) -> Result<Vec<AlertRow>, DbError> {
        alerts::list_alerts(&self.pool, project_id, include_dismissed).await
    }

    async fn dismiss_alert(&self, alert_id: Uuid) -> Result<(), DbError> {
        alerts::dismiss_alert(&self.pool, alert_id).await
    }
}

#[async_trait]
impl ScheduleStore for PgStore {
    async fn list_by_project(&self, project_id: Uuid) -> Result<Vec<ScheduleRow>, DbError> {
        schedules::list_by_project(&self.pool, project_id).await
    }

    async fn get(&self, id: Uuid) -> Result<ScheduleRow, DbError> {
        schedules::get_schedule(&self.pool, id).await
    }

    async fn upsert(&self, row: ScheduleRow) -> Result<ScheduleRow, DbError> {
        schedules::insert_or_get(&self.pool, &row).await
    }

    async fn update_notes(&self, id: Uuid, notes: Option<String>) -> Result<(), DbError> {
        schedules::update_notes(&self.pool, id, notes.as_deref()).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        schedules::delete_schedule(&self.pool, id).await
    }

    /// One transaction per batch; any error rolls the whole pass back when
    /// `tx` is dropped uncommitted.
    async fn apply_batch(&self, batch: ScheduleBatch) -> Result<(), DbError> {
        batch.validate_shape()?;
        let mut tx = self.pool.begin().await?;

        for row in &batch.rows {
            schedules::write_schedule(&mut *tx, row).await?;
        }
        for replacement in &batch.alerts {
            let removed = alerts::delete_for_item(&mut *tx, replacement.schedule_item_id).await?;
            debug!(
                "replacing {removed} alerts of item {} with {}",
                replacement.schedule_item_id,
                replacement.alerts.len()
            );
            for alert in &replacement.alerts {
                alerts::insert_alert(&mut *tx, alert).await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
