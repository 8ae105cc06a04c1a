//! Store contracts consumed by the scheduling engine.
//!
//! Two implementations ship with this crate: [`crate::PgStore`] over Postgres
//! and [`crate::MemoryStore`] for tests and the `--memory` server mode.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    DbError,
    models::{AlertRow, ScheduleBatch, ScheduleRow},
};

/// Persisted, dismissable reminders.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Alerts of a project ordered by `alert_date`.
    async fn list_alerts(
        &self,
        project_id: Uuid,
        include_dismissed: bool,
    ) -> Result<Vec<AlertRow>, DbError>;

    /// Mark an alert dismissed. Dismissing twice is a no-op.
    async fn dismiss_alert(&self, alert_id: Uuid) -> Result<(), DbError>;
}

/// Per-project schedule rows.
#[async_trait]
pub trait ScheduleStore: AlertStore {
    /// Every row of a project, in no particular order.
    async fn list_by_project(&self, project_id: Uuid) -> Result<Vec<ScheduleRow>, DbError>;

    /// One row by id, or [`DbError::NotFound`].
    async fn get(&self, id: Uuid) -> Result<ScheduleRow, DbError>;

    /// Insert keyed on (project, step). When a row already exists for the
    /// pair it is returned unchanged, so retries never create duplicates.
    async fn upsert(&self, row: ScheduleRow) -> Result<ScheduleRow, DbError>;

    /// Replace a row's notes without touching anything else.
    async fn update_notes(&self, id: Uuid, notes: Option<String>) -> Result<(), DbError>;

    /// Delete a row together with its alerts.
    async fn delete(&self, id: Uuid) -> Result<(), DbError>;

    /// Apply a full recalculation pass atomically.
    async fn apply_batch(&self, batch: ScheduleBatch) -> Result<(), DbError>;
}
