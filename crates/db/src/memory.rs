//! In-process store backed by hash maps behind a single `RwLock`.
//!
//! Every batch is validated in full before the write lock mutates anything,
//! so a rejected batch leaves the store exactly as it was.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::{
    AlertStore, DbError, ScheduleStore,
    models::{AlertRow, ScheduleBatch, ScheduleRow},
};

#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<Uuid, ScheduleRow>,
    alerts: HashMap<Uuid, AlertRow>,
}

impl Tables {
    fn step_owner(&self, project_id: Uuid, step_id: &str) -> Option<Uuid> {
        self.rows
            .values()
            .find(|r| r.project_id == project_id && r.step_id == step_id)
            .map(|r| r.id)
    }

    fn check_batch(&self, batch: &ScheduleBatch) -> Result<(), DbError> {
        batch.validate_shape()?;

        for row in &batch.rows {
            if let Some(existing) = self.rows.get(&row.id) {
                if existing.project_id != row.project_id {
                    return Err(DbError::Integrity(format!(
                        "row {} cannot move between projects",
                        row.id
                    )));
                }
            }
            match self.step_owner(row.project_id, &row.step_id) {
                Some(owner) if owner != row.id => {
                    // Allowed only when the owning row is itself rewritten
                    // to another step inside this batch.
                    let moved_away = batch
                        .rows
                        .iter()
                        .any(|r| r.id == owner && r.step_id != row.step_id);
                    if !moved_away {
                        return Err(DbError::DuplicateStep {
                            project_id: row.project_id,
                            step_id: row.step_id.clone(),
                        });
                    }
                }
                _ => {}
            }
        }

        for replacement in &batch.alerts {
            let known = self.rows.contains_key(&replacement.schedule_item_id)
                || batch.rows.iter().any(|r| r.id == replacement.schedule_item_id);
            if !known {
                return Err(DbError::Integrity(format!(
                    "alerts reference unknown schedule item {}",
                    replacement.schedule_item_id
                )));
            }
        }
        Ok(())
    }
}

/// Thread-safe in-memory [`ScheduleStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn list_alerts(
        &self,
        project_id: Uuid,
        include_dismissed: bool,
    ) -> Result<Vec<AlertRow>, DbError> {
        let tables = self.tables.read().await;
        let mut alerts: Vec<AlertRow> = tables
            .alerts
            .values()
            .filter(|a| a.project_id == project_id && (include_dismissed || !a.is_dismissed))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| a.alert_date.cmp(&b.alert_date).then(a.id.cmp(&b.id)));
        Ok(alerts)
    }

    async fn dismiss_alert(&self, alert_id: Uuid) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        let alert = tables.alerts.get_mut(&alert_id).ok_or(DbError::NotFound)?;
        alert.is_dismissed = true;
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn list_by_project(&self, project_id: Uuid) -> Result<Vec<ScheduleRow>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .rows
            .values()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<ScheduleRow, DbError> {
        let tables = self.tables.read().await;
        tables.rows.get(&id).cloned().ok_or(DbError::NotFound)
    }

    async fn upsert(&self, row: ScheduleRow) -> Result<ScheduleRow, DbError> {
        let mut tables = self.tables.write().await;
        if let Some(owner) = tables.step_owner(row.project_id, &row.step_id) {
            debug!("step '{}' already has row {owner}", row.step_id);
            return tables.rows.get(&owner).cloned().ok_or(DbError::NotFound);
        }
        tables.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_notes(&self, id: Uuid, notes: Option<String>) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        let row = tables.rows.get_mut(&id).ok_or(DbError::NotFound)?;
        row.notes = notes;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        tables.rows.remove(&id).ok_or(DbError::NotFound)?;
        tables.alerts.retain(|_, a| a.schedule_item_id != id);
        Ok(())
    }

    async fn apply_batch(&self, batch: ScheduleBatch) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        tables.check_batch(&batch)?;

        for row in batch.rows {
            tables.rows.insert(row.id, row);
        }
        for replacement in batch.alerts {
            tables
                .alerts
                .retain(|_, a| a.schedule_item_id != replacement.schedule_item_id);
            for alert in replacement.alerts {
                tables.alerts.insert(alert.id, alert);
            }
        }
        Ok(())
    }
}
