//! Schedule recalculation engine.
//!
//! `ScheduleEngine` is the central orchestrator. Every mutating operation:
//! 1. Takes the project's lock, so cascades on one project never interleave.
//! 2. Reads the project's full, current schedule from the store.
//! 3. Runs a pure pass from [`crate::cascade`].
//! 4. Validates the result and writes every changed row, together with its
//!    regenerated alerts, in one atomic batch.
//! 5. Returns the changed slice of state to the caller.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, instrument};
use uuid::Uuid;

use db::models::{AlertReplacement, AlertRow, ScheduleBatch, ScheduleRow};
use db::{DbError, ScheduleStore};

use crate::alerts::{notice_alert, plan_alerts};
use crate::calendar::roll_forward;
use crate::cascade::{self, CascadeOutcome};
use crate::clock::Clock;
use crate::conflicts::check_conflicts;
use crate::models::{
    CompletionSummary, ConflictReport, ScheduleAlert, ScheduleChange, ScheduleEdit, ScheduleItem,
};
use crate::rules::ScheduleRules;
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Duration recorded when a step is completed without `actual_days`.
    pub default_actual_days: i32,
    /// A supplier call due this many business days ahead is still urgent.
    pub urgent_window_ahead: i64,
    /// A supplier call missed by at most this many business days is still urgent.
    pub urgent_window_past: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_actual_days: 1,
            urgent_window_ahead: 5,
            urgent_window_past: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-project serialisation
// ---------------------------------------------------------------------------

/// One async mutex per project. Different projects never contend.
#[derive(Debug, Default)]
struct ProjectLocks {
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProjectLocks {
    async fn acquire(&self, project_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(project_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

// ---------------------------------------------------------------------------
// ScheduleEngine
// ---------------------------------------------------------------------------

pub struct ScheduleEngine {
    store: Arc<dyn ScheduleStore>,
    rules: Arc<ScheduleRules>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    locks: ProjectLocks,
}

impl ScheduleEngine {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        rules: Arc<ScheduleRules>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            rules,
            config,
            clock,
            locks: ProjectLocks::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Every schedule item of a project, in execution order.
    pub async fn list_schedule(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<ScheduleItem>, EngineError> {
        let rows = self.store.list_by_project(project_id).await?;
        let mut items = rows
            .into_iter()
            .map(ScheduleItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        cascade::sort_by_rank(&mut items, &self.rules.order);
        Ok(items)
    }

    /// Alerts of a project ordered by date; dismissed ones only on request.
    pub async fn list_alerts(
        &self,
        project_id: Uuid,
        include_dismissed: bool,
    ) -> Result<Vec<ScheduleAlert>, EngineError> {
        self.store
            .list_alerts(project_id, include_dismissed)
            .await?
            .into_iter()
            .map(ScheduleAlert::try_from)
            .collect()
    }

    pub fn check_conflicts(&self, schedules: &[ScheduleItem]) -> Vec<ConflictReport> {
        check_conflicts(schedules, &self.rules)
    }

    pub async fn check_project_conflicts(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<ConflictReport>, EngineError> {
        let items = self.list_schedule(project_id).await?;
        Ok(self.check_conflicts(&items))
    }

    // -----------------------------------------------------------------------
    // Completion
    // -----------------------------------------------------------------------

    /// Mark a step completed today and cascade the new dates forward.
    ///
    /// # Errors
    /// [`EngineError::NotFound`] for an unknown id, [`EngineError::InvalidDuration`]
    /// for `actual_days` outside `1..=MAX_DURATION_DAYS`; nothing is written on error.
    #[instrument(skip(self), fields(schedule_id = %schedule_id))]
    pub async fn complete_step(
        &self,
        schedule_id: Uuid,
        actual_days: Option<i32>,
    ) -> Result<CompletionSummary, EngineError> {
        let actual_days = self.checked_actual_days(actual_days)?;
        let project_id = self.fetch_row(schedule_id).await?.project_id;
        let _guard = self.locks.acquire(project_id).await;

        let before = self.list_schedule(project_id).await?;
        self.complete_in(project_id, before.clone(), before, schedule_id, actual_days)
            .await
    }

    /// Complete a canonical step that may not have a row yet.
    ///
    /// A missing row is created in the same batch as the cascade, so a retry
    /// after any failure starts from exactly the same state.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn complete_step_by_step_id(
        &self,
        project_id: Uuid,
        step_id: &str,
        actual_days: Option<i32>,
    ) -> Result<CompletionSummary, EngineError> {
        let actual_days = self.checked_actual_days(actual_days)?;
        let canonical = self
            .rules
            .catalog
            .get(step_id)
            .ok_or_else(|| EngineError::UnknownStep(step_id.to_string()))?;
        let _guard = self.locks.acquire(project_id).await;

        let before = self.list_schedule(project_id).await?;
        let mut working = before.clone();
        let target_id = match working.iter().find(|i| i.step_id == step_id) {
            Some(existing) => existing.id,
            None => {
                let created = ScheduleItem::from_canonical(
                    project_id,
                    canonical,
                    self.rules.trade_color(&canonical.trade_type),
                );
                info!("creating row for step '{step_id}'");
                let id = created.id;
                working.push(created);
                id
            }
        };

        self.complete_in(project_id, before, working, target_id, actual_days)
            .await
    }

    async fn complete_in(
        &self,
        project_id: Uuid,
        before: Vec<ScheduleItem>,
        working: Vec<ScheduleItem>,
        target_id: Uuid,
        actual_days: i32,
    ) -> Result<CompletionSummary, EngineError> {
        let today = self.clock.today();
        let outcome = cascade::complete(
            working,
            target_id,
            actual_days,
            today,
            &self.rules,
            &self.config,
        )?;
        let days_ahead = outcome.days_ahead;
        let alerts_created = outcome.notices.len();

        let change = self.persist(project_id, &before, outcome).await?;
        info!(
            "completed step {target_id}: {days_ahead} business day(s) ahead, \
             {} row(s) updated, {alerts_created} notice(s)",
            change.items.len()
        );

        Ok(CompletionSummary {
            days_ahead,
            alerts_created,
            change,
        })
    }

    fn checked_actual_days(&self, actual_days: Option<i32>) -> Result<i32, EngineError> {
        cascade::check_duration(actual_days.unwrap_or(self.config.default_actual_days))
    }

    // -----------------------------------------------------------------------
    // Un-completion and edits
    // -----------------------------------------------------------------------

    /// Revert a step to pending and restore the original plan after it.
    #[instrument(skip(self), fields(schedule_id = %schedule_id))]
    pub async fn uncomplete_step(
        &self,
        schedule_id: Uuid,
    ) -> Result<ScheduleChange, EngineError> {
        let project_id = self.fetch_row(schedule_id).await?.project_id;
        let _guard = self.locks.acquire(project_id).await;

        let before = self.list_schedule(project_id).await?;
        let today = self.clock.today();
        let outcome = cascade::restore(before.clone(), schedule_id, today, &self.rules)?;
        let change = self.persist(project_id, &before, outcome).await?;
        info!("restored plan from step {schedule_id}: {} row(s) updated", change.items.len());
        Ok(change)
    }

    /// Apply a manual edit to one step, then cascade over the later steps.
    #[instrument(skip(self, edit), fields(schedule_id = %schedule_id))]
    pub async fn update_schedule_and_recalculate(
        &self,
        schedule_id: Uuid,
        edit: ScheduleEdit,
    ) -> Result<ScheduleChange, EngineError> {
        let project_id = self.fetch_row(schedule_id).await?.project_id;
        let _guard = self.locks.acquire(project_id).await;

        if edit.is_notes_only() {
            self.store
                .update_notes(schedule_id, edit.notes.clone())
                .await
                .map_err(|e| not_found_as(e, schedule_id))?;
            let item = ScheduleItem::try_from(self.fetch_row(schedule_id).await?)?;
            return Ok(ScheduleChange {
                items: vec![item],
                alerts: Vec::new(),
            });
        }

        // Always the authoritative state, read under the lock.
        let before = self.list_schedule(project_id).await?;
        let outcome = cascade::apply_edit(before.clone(), schedule_id, &edit, &self.rules)?;
        let change = self.persist(project_id, &before, outcome).await?;
        info!("edited step {schedule_id}: {} row(s) updated", change.items.len());
        Ok(change)
    }

    // -----------------------------------------------------------------------
    // Project-level operations
    // -----------------------------------------------------------------------

    /// Create any missing canonical rows and lay the whole plan out from `start`.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn plan_project(
        &self,
        project_id: Uuid,
        start: NaiveDate,
    ) -> Result<ScheduleChange, EngineError> {
        let _guard = self.locks.acquire(project_id).await;

        let before = self.list_schedule(project_id).await?;
        let present: HashSet<&str> = before.iter().map(|i| i.step_id.as_str()).collect();
        let mut working = before.clone();
        for step in self.rules.catalog.steps() {
            if !present.contains(step.id.as_str()) {
                working.push(ScheduleItem::from_canonical(
                    project_id,
                    step,
                    self.rules.trade_color(&step.trade_type),
                ));
            }
        }

        let outcome = cascade::plan(working, roll_forward(start), &self.rules);
        let change = self.persist(project_id, &before, outcome).await?;
        info!("planned project from {start}: {} row(s) written", change.items.len());
        Ok(change)
    }

    /// Lazily create the row of a canonical step, or return the existing one.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn add_step(
        &self,
        project_id: Uuid,
        step_id: &str,
    ) -> Result<ScheduleItem, EngineError> {
        let canonical = self
            .rules
            .catalog
            .get(step_id)
            .ok_or_else(|| EngineError::UnknownStep(step_id.to_string()))?;
        let _guard = self.locks.acquire(project_id).await;

        let item = ScheduleItem::from_canonical(
            project_id,
            canonical,
            self.rules.trade_color(&canonical.trade_type),
        );
        let stored = self.store.upsert(ScheduleRow::try_from(&item)?).await?;
        ScheduleItem::try_from(stored)
    }

    /// Explicit removal of a project step together with its alerts.
    #[instrument(skip(self), fields(schedule_id = %schedule_id))]
    pub async fn remove_step(&self, schedule_id: Uuid) -> Result<(), EngineError> {
        let project_id = self.fetch_row(schedule_id).await?.project_id;
        let _guard = self.locks.acquire(project_id).await;
        self.store
            .delete(schedule_id)
            .await
            .map_err(|e| not_found_as(e, schedule_id))?;
        info!("removed step {schedule_id}");
        Ok(())
    }

    /// Dismiss an alert. Dismissing twice is a no-op.
    pub async fn dismiss_alert(&self, alert_id: Uuid) -> Result<(), EngineError> {
        self.store.dismiss_alert(alert_id).await.map_err(|e| match e {
            DbError::NotFound => EngineError::alert_not_found(alert_id),
            other => other.into(),
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn fetch_row(&self, schedule_id: Uuid) -> Result<ScheduleRow, EngineError> {
        self.store
            .get(schedule_id)
            .await
            .map_err(|e| not_found_as(e, schedule_id))
    }

    /// Validate a pass and write its changed rows plus regenerated alerts
    /// in one batch.
    ///
    /// Unchanged rows whose measurement waits on a changed step get their
    /// alerts regenerated in the same batch; their stored cascade notices
    /// are carried over untouched.
    async fn persist(
        &self,
        project_id: Uuid,
        before: &[ScheduleItem],
        outcome: CascadeOutcome,
    ) -> Result<ScheduleChange, EngineError> {
        cascade::validate(&outcome.items)?;

        let mut changed = cascade::changed_items(before, &outcome.items);
        for notice in &outcome.notices {
            if !changed.iter().any(|i| i.id == notice.item_id) {
                if let Some(item) = outcome.items.iter().find(|i| i.id == notice.item_id) {
                    changed.push(item.clone());
                }
            }
        }
        cascade::sort_by_rank(&mut changed, &self.rules.order);

        let mut batch = ScheduleBatch::new(project_id);
        let mut alerts = Vec::new();
        for item in &changed {
            let mut item_alerts = plan_alerts(item, &outcome.items);
            item_alerts.extend(
                outcome
                    .notices
                    .iter()
                    .filter(|n| n.item_id == item.id)
                    .map(|n| notice_alert(item, n)),
            );
            batch.rows.push(ScheduleRow::try_from(item)?);
            batch.alerts.push(AlertReplacement {
                schedule_item_id: item.id,
                alerts: item_alerts.iter().map(AlertRow::from).collect(),
            });
            alerts.extend(item_alerts);
        }

        let dependents = measurement_dependents(&changed, &outcome.items);
        if !dependents.is_empty() {
            let stored = self.store.list_alerts(project_id, true).await?;
            for item in dependents {
                let item_alerts = plan_alerts(item, &outcome.items);
                let mut rows: Vec<AlertRow> = item_alerts.iter().map(AlertRow::from).collect();
                for row in stored.iter().filter(|a| a.schedule_item_id == item.id) {
                    let alert = ScheduleAlert::try_from(row.clone())?;
                    if alert.alert_type.is_cascade_notice() {
                        rows.push(row.clone());
                    }
                }
                batch.alerts.push(AlertReplacement {
                    schedule_item_id: item.id,
                    alerts: rows,
                });
                alerts.extend(item_alerts);
            }
        }

        if !batch.is_empty() {
            self.store.apply_batch(batch).await?;
        }

        Ok(ScheduleChange {
            items: changed,
            alerts,
        })
    }
}

/// Unchanged items whose measurement reference is one of `changed`.
fn measurement_dependents<'a>(
    changed: &[ScheduleItem],
    items: &'a [ScheduleItem],
) -> Vec<&'a ScheduleItem> {
    let changed_ids: HashSet<Uuid> = changed.iter().map(|i| i.id).collect();
    let changed_steps: HashSet<&str> = changed.iter().map(|i| i.step_id.as_str()).collect();
    items
        .iter()
        .filter(|i| !changed_ids.contains(&i.id))
        .filter(|i| {
            i.logistics
                .measurement_after_step_id
                .as_deref()
                .is_some_and(|after| changed_steps.contains(after))
        })
        .collect()
}

fn not_found_as(err: DbError, schedule_id: Uuid) -> EngineError {
    match err {
        DbError::NotFound => EngineError::schedule_not_found(schedule_id),
        other => other.into(),
    }
}
