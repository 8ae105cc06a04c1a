//! Core domain models for the scheduling engine.
//!
//! Rows from the `db` crate are mapped onto these types exactly once, at the
//! store boundary; the recalculation code never touches raw rows or JSON.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use db::models::{AlertRow, ScheduleRow};

use crate::EngineError;
use crate::catalog::CanonicalStep;

// ---------------------------------------------------------------------------
// StepStatus
// ---------------------------------------------------------------------------

/// `pending` → `scheduled` → `completed`, with `completed` → `pending` only
/// through an explicit un-completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Scheduled,
    Completed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Scheduled => write!(f, "scheduled"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for StepStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown step status: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// StepLogistics
// ---------------------------------------------------------------------------

/// Supplier, fabrication and measurement metadata of one step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepLogistics {
    pub supplier_name: Option<String>,
    pub supplier_phone: Option<String>,
    /// Business days before `start_date` to call the supplier.
    pub supplier_lead_days: Option<i32>,
    /// Business days before `start_date` fabrication must begin.
    pub fabrication_lead_days: Option<i32>,
    /// Pinned fabrication start, overriding the lead-day computation.
    pub fabrication_start_date: Option<NaiveDate>,
    pub measurement_required: bool,
    pub measurement_after_step_id: Option<String>,
    pub measurement_notes: Option<String>,
}

impl StepLogistics {
    /// Defaults copied from the canonical catalog when a row is created.
    pub fn from_canonical(step: &CanonicalStep) -> Self {
        Self {
            supplier_lead_days: step.supplier_lead_days,
            fabrication_lead_days: step.fabrication_lead_days,
            measurement_required: step.measurement_after.is_some(),
            measurement_after_step_id: step.measurement_after.clone(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// ScheduleItem
// ---------------------------------------------------------------------------

/// One row per (project, canonical step).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
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
    pub status: StepStatus,
    pub logistics: StepLogistics,
    pub notes: Option<String>,
    /// Start of the step in its most recent estimated plan. A completion
    /// rewrites `start_date` but leaves this alone.
    pub planned_start_date: Option<NaiveDate>,
}

impl ScheduleItem {
    /// A fresh `pending` row for a canonical step.
    pub fn from_canonical(project_id: Uuid, step: &CanonicalStep, trade_color: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            step_id: step.id.clone(),
            step_name: step.title.clone(),
            trade_type: step.trade_type.clone(),
            trade_color: trade_color.to_string(),
            estimated_days: step.estimated_days,
            actual_days: None,
            start_date: None,
            end_date: None,
            status: StepStatus::Pending,
            logistics: StepLogistics::from_canonical(step),
            notes: None,
            planned_start_date: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }

    /// Duration the forward cascade uses: actual if recorded, else planned.
    pub fn effective_days(&self) -> i32 {
        self.actual_days.unwrap_or(self.estimated_days)
    }

    /// `true` when the item breaks the `end >= start` invariant.
    pub fn has_inverted_dates(&self) -> bool {
        matches!((self.start_date, self.end_date), (Some(s), Some(e)) if e < s)
    }
}

impl TryFrom<ScheduleRow> for ScheduleItem {
    type Error = EngineError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<StepStatus>()
            .map_err(|message| EngineError::MalformedRow { id: row.id, message })?;
        let logistics = if row.logistics.is_null() {
            StepLogistics::default()
        } else {
            serde_json::from_value(row.logistics).map_err(|e| EngineError::MalformedRow {
                id: row.id,
                message: format!("logistics: {e}"),
            })?
        };

        Ok(Self {
            id: row.id,
            project_id: row.project_id,
            step_id: row.step_id,
            step_name: row.step_name,
            trade_type: row.trade_type,
            trade_color: row.trade_color,
            estimated_days: row.estimated_days,
            actual_days: row.actual_days,
            start_date: row.start_date,
            end_date: row.end_date,
            status,
            logistics,
            notes: row.notes,
            planned_start_date: row.planned_start_date,
        })
    }
}

impl TryFrom<&ScheduleItem> for ScheduleRow {
    type Error = EngineError;

    fn try_from(item: &ScheduleItem) -> Result<Self, Self::Error> {
        let logistics =
            serde_json::to_value(&item.logistics).map_err(|e| EngineError::MalformedRow {
                id: item.id,
                message: format!("logistics: {e}"),
            })?;
        Ok(Self {
            id: item.id,
            project_id: item.project_id,
            step_id: item.step_id.clone(),
            step_name: item.step_name.clone(),
            trade_type: item.trade_type.clone(),
            trade_color: item.trade_color.clone(),
            estimated_days: item.estimated_days,
            actual_days: item.actual_days,
            start_date: item.start_date,
            end_date: item.end_date,
            status: item.status.to_string(),
            logistics,
            notes: item.notes.clone(),
            planned_start_date: item.planned_start_date,
        })
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    SupplierCall,
    FabricationStart,
    Measurement,
    UrgentSupplierCall,
    ScheduleDelayed,
}

impl AlertType {
    /// Alerts raised by a completion cascade rather than by the plan itself.
    pub fn is_cascade_notice(self) -> bool {
        matches!(self, Self::UrgentSupplierCall | Self::ScheduleDelayed)
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SupplierCall => write!(f, "supplier_call"),
            Self::FabricationStart => write!(f, "fabrication_start"),
            Self::Measurement => write!(f, "measurement"),
            Self::UrgentSupplierCall => write!(f, "urgent_supplier_call"),
            Self::ScheduleDelayed => write!(f, "schedule_delayed"),
        }
    }
}

impl FromStr for AlertType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "supplier_call" => Ok(Self::SupplierCall),
            "fabrication_start" => Ok(Self::FabricationStart),
            "measurement" => Ok(Self::Measurement),
            "urgent_supplier_call" => Ok(Self::UrgentSupplierCall),
            "schedule_delayed" => Ok(Self::ScheduleDelayed),
            other => Err(format!("unknown alert type: {other}")),
        }
    }
}

/// A dismissable reminder tied to one schedule item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleAlert {
    pub id: Uuid,
    pub project_id: Uuid,
    pub schedule_item_id: Uuid,
    pub alert_type: AlertType,
    pub alert_date: NaiveDate,
    pub message: String,
    pub is_dismissed: bool,
}

impl TryFrom<AlertRow> for ScheduleAlert {
    type Error = EngineError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        let alert_type = row
            .alert_type
            .parse::<AlertType>()
            .map_err(|message| EngineError::MalformedRow { id: row.id, message })?;
        Ok(Self {
            id: row.id,
            project_id: row.project_id,
            schedule_item_id: row.schedule_item_id,
            alert_type,
            alert_date: row.alert_date,
            message: row.message,
            is_dismissed: row.is_dismissed,
        })
    }
}

impl From<&ScheduleAlert> for AlertRow {
    fn from(alert: &ScheduleAlert) -> Self {
        Self {
            id: alert.id,
            project_id: alert.project_id,
            schedule_item_id: alert.schedule_item_id,
            alert_type: alert.alert_type.to_string(),
            alert_date: alert.alert_date,
            message: alert.message.clone(),
            is_dismissed: alert.is_dismissed,
        }
    }
}

// ---------------------------------------------------------------------------
// Operation inputs and outputs
// ---------------------------------------------------------------------------

/// A manual edit of one step. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleEdit {
    pub start_date: Option<NaiveDate>,
    pub estimated_days: Option<i32>,
    pub actual_days: Option<i32>,
    pub trade_type: Option<String>,
    pub logistics: Option<StepLogistics>,
    pub notes: Option<String>,
}

impl ScheduleEdit {
    /// Whether the edit can move dates (and therefore needs a cascade).
    pub fn affects_dates(&self) -> bool {
        self.start_date.is_some() || self.estimated_days.is_some() || self.actual_days.is_some()
    }

    /// Whether only free-form notes change.
    pub fn is_notes_only(&self) -> bool {
        !self.affects_dates()
            && self.trade_type.is_none()
            && self.logistics.is_none()
            && self.notes.is_some()
    }
}

/// Rows and alerts written by one mutating operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleChange {
    /// Every row whose persisted state changed, in execution order.
    pub items: Vec<ScheduleItem>,
    /// The regenerated alerts of those rows.
    pub alerts: Vec<ScheduleAlert>,
}

/// Result of completing a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSummary {
    /// Business days the completed step finished ahead of plan (negative = late).
    pub days_ahead: i64,
    /// `urgent_supplier_call` and `schedule_delayed` alerts raised.
    pub alerts_created: usize,
    #[serde(flatten)]
    pub change: ScheduleChange,
}

/// One business day on which incompatible trades overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub date: NaiveDate,
    /// Distinct trades present that day, sorted.
    pub trades: Vec<String>,
    /// Steps active that day, in execution order.
    pub step_ids: Vec<String>,
}
