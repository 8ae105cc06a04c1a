//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models: they carry no domain behaviour.
//! Domain types live in the `engine` crate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// schedule_items
// ---------------------------------------------------------------------------

/// A persisted schedule item row: one per (project, canonical step).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ScheduleRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub step_id: String,
    pub step_name: String,
    pub trade_type: String,
    pub trade_color: String,
    pub estimated_days: i32,
    pub actual_days: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// `pending`, `scheduled` or `completed`.
    pub status: String,
    /// Supplier / fabrication / measurement sub-record as JSONB.
    pub logistics: serde_json::Value,
    pub notes: Option<String>,
    /// Start the step had in its last estimated plan. Completion never
    /// overwrites it.
    pub planned_start_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// schedule_alerts
// ---------------------------------------------------------------------------

/// A persisted reminder row tied to one schedule item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AlertRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub schedule_item_id: Uuid,
    /// `supplier_call`, `fabrication_start`, `measurement`,
    /// `urgent_supplier_call` or `schedule_delayed`.
    pub alert_type: String,
    pub alert_date: NaiveDate,
    pub message: String,
    pub is_dismissed: bool,
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

/// Replace every alert of one schedule item with `alerts`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertReplacement {
    pub schedule_item_id: Uuid,
    pub alerts: Vec<AlertRow>,
}

/// All writes of one recalculation pass. Applied all-or-nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleBatch {
    pub project_id: Uuid,
    /// Rows to insert or overwrite (keyed by `id`).
    pub rows: Vec<ScheduleRow>,
    pub alerts: Vec<AlertReplacement>,
}

impl ScheduleBatch {
    pub fn new(project_id: Uuid) -> Self {
        Self {
            project_id,
            rows: Vec::new(),
            alerts: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.alerts.is_empty()
    }

    /// Checks that can be made without looking at stored state.
    pub fn validate_shape(&self) -> Result<(), crate::DbError> {
        let mut steps = std::collections::HashSet::new();
        for row in &self.rows {
            if row.project_id != self.project_id {
                return Err(crate::DbError::Integrity(format!(
                    "row {} belongs to project {}, batch is for {}",
                    row.id, row.project_id, self.project_id
                )));
            }
            if let (Some(start), Some(end)) = (row.start_date, row.end_date) {
                if end < start {
                    return Err(crate::DbError::Integrity(format!(
                        "row {} ends {end} before it starts {start}",
                        row.id
                    )));
                }
            }
            if !steps.insert(row.step_id.as_str()) {
                return Err(crate::DbError::DuplicateStep {
                    project_id: row.project_id,
                    step_id: row.step_id.clone(),
                });
            }
        }
        for replacement in &self.alerts {
            if replacement
                .alerts
                .iter()
                .any(|a| a.schedule_item_id != replacement.schedule_item_id)
            {
                return Err(crate::DbError::Integrity(format!(
                    "alert replacement for {} contains foreign alerts",
                    replacement.schedule_item_id
                )));
            }
        }
        Ok(())
    }
}
