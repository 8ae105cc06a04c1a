//! Pure recalculation passes over one project's schedule.
//!
//! Every function here takes the full project snapshot, returns the full
//! project state after the pass, and performs no I/O. Steps are always
//! walked in [`ExecutionOrder`] rank. Running a pass twice on its own output
//! (with the same `today`) yields the same state.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::calendar::{self, add_business_days, business_day_diff, roll_forward, span_end};
use crate::catalog::ExecutionOrder;
use crate::engine::EngineConfig;
use crate::models::{AlertType, ScheduleEdit, ScheduleItem, StepStatus};
use crate::rules::{DelayRuleTable, ScheduleRules};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// An alert the cascade wants raised about a rescheduled step.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub item_id: Uuid,
    pub alert_type: AlertType,
    pub alert_date: NaiveDate,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CascadeOutcome {
    /// Full project state after the pass, in execution order.
    pub items: Vec<ScheduleItem>,
    pub days_ahead: i64,
    pub notices: Vec<Notice>,
}

impl CascadeOutcome {
    fn quiet(items: Vec<ScheduleItem>) -> Self {
        Self { items, days_ahead: 0, notices: Vec::new() }
    }
}

/// Which duration a walk lays steps out with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DurationSource {
    /// `actual_days` when recorded, else `estimated_days`.
    Effective,
    /// Always `estimated_days`: the original plan.
    Estimated,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn sort_by_rank(items: &mut [ScheduleItem], order: &ExecutionOrder) {
    items.sort_by(|a, b| order.compare(&a.step_id, &b.step_id));
}

fn position(items: &[ScheduleItem], id: Uuid) -> Result<usize, EngineError> {
    items
        .iter()
        .position(|i| i.id == id)
        .ok_or_else(|| EngineError::schedule_not_found(id))
}

/// Longest duration, in business days, a single step may take.
pub const MAX_DURATION_DAYS: i32 = 2_500;

/// Reject a caller-supplied duration outside `1..=MAX_DURATION_DAYS`.
pub fn check_duration(days: i32) -> Result<i32, EngineError> {
    if (1..=MAX_DURATION_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(EngineError::InvalidDuration(days))
    }
}

fn clamp_duration(item: &ScheduleItem, source: DurationSource) -> i64 {
    let days = match source {
        DurationSource::Effective => item.effective_days(),
        DurationSource::Estimated => item.estimated_days,
    };
    if days < 1 {
        warn!("step '{}' has non-positive duration {days}, using 1", item.step_id);
        1
    } else if days > MAX_DURATION_DAYS {
        warn!("step '{}' has duration {days}, using {MAX_DURATION_DAYS}", item.step_id);
        i64::from(MAX_DURATION_DAYS)
    } else {
        i64::from(days)
    }
}

/// End dates of every dated step strictly before `before`.
fn seed_end_dates(items: &[ScheduleItem], before: usize) -> HashMap<String, NaiveDate> {
    items[..before]
        .iter()
        .filter_map(|i| i.end_date.map(|end| (i.step_id.clone(), end)))
        .collect()
}

/// Lay out every non-completed step from `from` onward, starting at `cursor`.
///
/// Completed steps keep their dates but feed the delay-rule lookup and push
/// the cursor forward when they end later than it. Returns the indices of
/// the steps that were (re)dated.
fn walk_forward(
    items: &mut [ScheduleItem],
    from: usize,
    mut cursor: NaiveDate,
    end_dates: &mut HashMap<String, NaiveDate>,
    delays: &DelayRuleTable,
    source: DurationSource,
) -> Vec<usize> {
    let mut placed = Vec::new();

    for (index, item) in items.iter_mut().enumerate().skip(from) {
        if item.is_completed() {
            if let Some(end) = item.end_date {
                end_dates.insert(item.step_id.clone(), end);
                cursor = cursor.max(add_business_days(end, 1));
            }
            continue;
        }

        let mut start = roll_forward(cursor);
        if let Some(earliest) = delays.earliest_start(&item.step_id, end_dates) {
            if earliest > start {
                debug!("step '{}' held back to {earliest} by delay rule", item.step_id);
                start = earliest;
            }
        }
        let end = span_end(start, clamp_duration(item, source));

        item.start_date = Some(start);
        item.end_date = Some(end);
        item.planned_start_date = Some(start);
        item.status = StepStatus::Scheduled;

        end_dates.insert(item.step_id.clone(), end);
        cursor = add_business_days(end, 1);
        placed.push(index);
    }

    placed
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

/// Mark `target_id` completed today after `actual_days` business days and
/// cascade the result over every later non-completed step.
///
/// `days_ahead` compares the planned end with today; when the step had no
/// planned end it falls back to `estimated_days - actual_days`.
pub fn complete(
    mut items: Vec<ScheduleItem>,
    target_id: Uuid,
    actual_days: i32,
    today: NaiveDate,
    rules: &ScheduleRules,
    config: &EngineConfig,
) -> Result<CascadeOutcome, EngineError> {
    check_duration(actual_days)?;
    sort_by_rank(&mut items, &rules.order);
    let idx = position(&items, target_id)?;

    let actual_end = today;
    let actual_start = calendar::sub_business_days(today, i64::from(actual_days) - 1);

    let days_ahead = {
        let target = &items[idx];
        match target.end_date {
            Some(planned_end) => business_day_diff(planned_end, actual_end),
            None => i64::from(target.estimated_days - actual_days),
        }
    };

    {
        let target = &mut items[idx];
        target.status = StepStatus::Completed;
        target.actual_days = Some(actual_days);
        target.start_date = Some(actual_start);
        target.end_date = Some(actual_end);
    }

    let previous_starts: HashMap<Uuid, Option<NaiveDate>> =
        items.iter().map(|i| (i.id, i.start_date)).collect();

    let mut end_dates = seed_end_dates(&items, idx);
    end_dates.insert(items[idx].step_id.clone(), actual_end);
    let placed = walk_forward(
        &mut items,
        idx + 1,
        add_business_days(actual_end, 1),
        &mut end_dates,
        &rules.delays,
        DurationSource::Effective,
    );

    let notices = placed
        .into_iter()
        .filter_map(|i| {
            let item = &items[i];
            let before = previous_starts.get(&item.id).copied().flatten();
            supplier_notice(item, before, days_ahead, today, config)
        })
        .collect();

    Ok(CascadeOutcome { items, days_ahead, notices })
}

fn supplier_notice(
    item: &ScheduleItem,
    previous_start: Option<NaiveDate>,
    days_ahead: i64,
    today: NaiveDate,
    config: &EngineConfig,
) -> Option<Notice> {
    let lead = item.logistics.supplier_lead_days?;
    let start = item.start_date?;
    let supplier = item.logistics.supplier_name.as_deref().unwrap_or("the supplier");

    if days_ahead > 0 && previous_start.map_or(true, |p| start < p) {
        let call_date = calendar::sub_business_days(start, i64::from(lead));
        let offset = business_day_diff(call_date, today);
        if offset <= config.urgent_window_ahead && offset >= -config.urgent_window_past {
            return Some(Notice {
                item_id: item.id,
                alert_type: AlertType::UrgentSupplierCall,
                alert_date: today,
                message: format!(
                    "Project is {days_ahead} business day(s) ahead: \
                     call {supplier} by {} to confirm {} for {}",
                    calendar::format_date(call_date),
                    item.step_name,
                    calendar::format_date(start),
                ),
            });
        }
    }

    if days_ahead < 0 {
        if let Some(previous) = previous_start.filter(|p| start > *p) {
            return Some(Notice {
                item_id: item.id,
                alert_type: AlertType::ScheduleDelayed,
                alert_date: today,
                message: format!(
                    "{} slipped from {} to {}: notify {supplier} of the delay",
                    item.step_name,
                    calendar::format_date(previous),
                    calendar::format_date(start),
                ),
            });
        }
    }

    None
}

/// Revert `target_id` to `pending` and restore the original plan
/// (`estimated_days` only) after the nearest preceding completed step.
///
/// With no completed step before the target, the whole project is replanned
/// from its earliest known start date, or from today when nothing is dated.
pub fn restore(
    mut items: Vec<ScheduleItem>,
    target_id: Uuid,
    today: NaiveDate,
    rules: &ScheduleRules,
) -> Result<CascadeOutcome, EngineError> {
    sort_by_rank(&mut items, &rules.order);
    let idx = position(&items, target_id)?;

    {
        let target = &mut items[idx];
        target.status = StepStatus::Pending;
        target.actual_days = None;
    }

    let anchor = items[..idx]
        .iter()
        .rposition(|i| i.is_completed() && i.end_date.is_some());

    match anchor {
        Some(p) => {
            let mut end_dates = seed_end_dates(&items, p + 1);
            let cursor = items[p]
                .end_date
                .map(|end| add_business_days(end, 1))
                .unwrap_or(today);
            walk_forward(
                &mut items,
                p + 1,
                cursor,
                &mut end_dates,
                &rules.delays,
                DurationSource::Estimated,
            );
        }
        None => {
            let first_start = earliest_planned_start(&items, target_id).unwrap_or(today);
            let mut end_dates = HashMap::new();
            walk_forward(
                &mut items,
                0,
                first_start,
                &mut end_dates,
                &rules.delays,
                DurationSource::Estimated,
            );
        }
    }

    Ok(CascadeOutcome::quiet(items))
}

/// Apply a manual edit to `target_id`, recompute its end date, and cascade
/// over later non-completed steps when the edit moves dates.
pub fn apply_edit(
    mut items: Vec<ScheduleItem>,
    target_id: Uuid,
    edit: &ScheduleEdit,
    rules: &ScheduleRules,
) -> Result<CascadeOutcome, EngineError> {
    for days in [edit.estimated_days, edit.actual_days].into_iter().flatten() {
        check_duration(days)?;
    }
    sort_by_rank(&mut items, &rules.order);
    let idx = position(&items, target_id)?;

    {
        let target = &mut items[idx];
        if let Some(days) = edit.estimated_days {
            target.estimated_days = days;
        }
        if let Some(days) = edit.actual_days {
            target.actual_days = Some(days);
        }
        if let Some(trade) = &edit.trade_type {
            target.trade_color = rules.trade_color(trade).to_string();
            target.trade_type = trade.clone();
        }
        if let Some(logistics) = &edit.logistics {
            target.logistics = logistics.clone();
        }
        if let Some(notes) = &edit.notes {
            target.notes = Some(notes.clone());
        }
        if let Some(start) = edit.start_date {
            target.start_date = Some(roll_forward(start));
        }
        if let Some(start) = target.start_date {
            let duration = clamp_duration(target, DurationSource::Effective);
            target.end_date = Some(span_end(start, duration));
            if !target.is_completed() {
                target.planned_start_date = Some(start);
                target.status = StepStatus::Scheduled;
            }
        }
    }

    if edit.affects_dates() {
        if let Some(end) = items[idx].end_date {
            let mut end_dates = seed_end_dates(&items, idx);
            end_dates.insert(items[idx].step_id.clone(), end);
            walk_forward(
                &mut items,
                idx + 1,
                add_business_days(end, 1),
                &mut end_dates,
                &rules.delays,
                DurationSource::Effective,
            );
        }
    }

    Ok(CascadeOutcome::quiet(items))
}

/// Lay every non-completed step out from `start` using `estimated_days`.
pub fn plan(
    mut items: Vec<ScheduleItem>,
    start: NaiveDate,
    rules: &ScheduleRules,
) -> CascadeOutcome {
    sort_by_rank(&mut items, &rules.order);
    let mut end_dates = HashMap::new();
    walk_forward(
        &mut items,
        0,
        start,
        &mut end_dates,
        &rules.delays,
        DurationSource::Estimated,
    );
    CascadeOutcome::quiet(items)
}

/// Earliest start of the project's estimated plan.
///
/// Completed steps and `target_id` only contribute their planned start: their
/// `start_date` holds the realised start written at completion.
fn earliest_planned_start(items: &[ScheduleItem], target_id: Uuid) -> Option<NaiveDate> {
    items
        .iter()
        .filter_map(|i| {
            if i.id == target_id || i.is_completed() {
                i.planned_start_date
            } else {
                i.planned_start_date.or(i.start_date)
            }
        })
        .min()
}

// ---------------------------------------------------------------------------
// Post-pass checks
// ---------------------------------------------------------------------------

/// Reject states that break a schedule invariant before anything is written.
pub fn validate(items: &[ScheduleItem]) -> Result<(), EngineError> {
    let mut steps = HashSet::new();
    for item in items {
        if item.has_inverted_dates() {
            return Err(EngineError::IntegrityViolation(format!(
                "step '{}' would end before it starts",
                item.step_id
            )));
        }
        if !steps.insert(item.step_id.as_str()) {
            return Err(EngineError::IntegrityViolation(format!(
                "duplicate row for step '{}'",
                item.step_id
            )));
        }
    }
    Ok(())
}

/// Items of `after` that differ from (or are missing in) `before`.
pub fn changed_items(before: &[ScheduleItem], after: &[ScheduleItem]) -> Vec<ScheduleItem> {
    let previous: HashMap<Uuid, &ScheduleItem> = before.iter().map(|i| (i.id, i)).collect();
    after
        .iter()
        .filter(|item| previous.get(&item.id).map_or(true, |old| *old != *item))
        .cloned()
        .collect()
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CanonicalStep;
    use crate::rules::{DelayRule, RulesConfig};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// A(5) → B(3) → C(4), no delay rules.
    fn abc_rules() -> ScheduleRules {
        let step = |id: &str, days| CanonicalStep {
            id: id.into(),
            title: id.to_uppercase(),
            trade_type: "framing".into(),
            estimated_days: days,
            supplier_lead_days: None,
            fabrication_lead_days: None,
            measurement_after: None,
        };
        ScheduleRules::from_config(RulesConfig {
            steps: Some(vec![step("a", 5), step("b", 3), step("c", 4)]),
            delay_rules: Some(vec![]),
            ..Default::default()
        })
        .unwrap()
    }

    fn item(rules: &ScheduleRules, step_id: &str) -> ScheduleItem {
        let step = rules.catalog.get(step_id).unwrap();
        ScheduleItem::from_canonical(Uuid::nil(), step, "#000000")
    }

    /// A planned from Monday 2024-03-04: A 03-04..03-08, B 03-11..03-13, C 03-14..03-19.
    fn planned_abc(rules: &ScheduleRules) -> Vec<ScheduleItem> {
        let items = vec![item(rules, "c"), item(rules, "a"), item(rules, "b")];
        plan(items, date(2024, 3, 4), rules).items
    }

    fn finish(
        items: Vec<ScheduleItem>,
        id: Uuid,
        actual_days: i32,
        today: NaiveDate,
        rules: &ScheduleRules,
    ) -> CascadeOutcome {
        complete(items, id, actual_days, today, rules, &EngineConfig::default()).unwrap()
    }

    fn dates(items: &[ScheduleItem], step: &str) -> (NaiveDate, NaiveDate) {
        let i = items.iter().find(|i| i.step_id == step).unwrap();
        (i.start_date.unwrap(), i.end_date.unwrap())
    }

    #[test]
    fn plan_walks_in_rank_order_not_storage_order() {
        let rules = abc_rules();
        let items = planned_abc(&rules);

        let order: Vec<_> = items.iter().map(|i| i.step_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(dates(&items, "a"), (date(2024, 3, 4), date(2024, 3, 8)));
        assert_eq!(dates(&items, "b"), (date(2024, 3, 11), date(2024, 3, 13)));
        assert_eq!(dates(&items, "c"), (date(2024, 3, 14), date(2024, 3, 19)));
        assert!(items.iter().all(|i| i.status == StepStatus::Scheduled));
    }

    #[test]
    fn on_time_completion_keeps_successors_back_to_back() {
        let rules = abc_rules();
        let items = planned_abc(&rules);
        let a = items[0].id;

        let out = finish(items, a, 5, date(2024, 3, 8), &rules);

        assert_eq!(out.days_ahead, 0);
        assert_eq!(dates(&out.items, "a"), (date(2024, 3, 4), date(2024, 3, 8)));
        assert_eq!(dates(&out.items, "b"), (date(2024, 3, 11), date(2024, 3, 13)));
        assert_eq!(dates(&out.items, "c"), (date(2024, 3, 14), date(2024, 3, 19)));
        assert_eq!(out.items[0].status, StepStatus::Completed);
    }

    #[test]
    fn early_finish_pulls_successors_forward() {
        let rules = abc_rules();
        let items = planned_abc(&rules);
        let a = items[0].id;

        // Two business days early: done Wednesday after 3 days.
        let out = finish(items, a, 3, date(2024, 3, 6), &rules);

        assert_eq!(out.days_ahead, 2);
        assert_eq!(dates(&out.items, "a"), (date(2024, 3, 4), date(2024, 3, 6)));
        assert_eq!(dates(&out.items, "b"), (date(2024, 3, 7), date(2024, 3, 11)));
        assert_eq!(dates(&out.items, "c"), (date(2024, 3, 12), date(2024, 3, 15)));
    }

    #[test]
    fn late_finish_pushes_successors_back() {
        let rules = abc_rules();
        let items = planned_abc(&rules);
        let a = items[0].id;

        let out = finish(items, a, 6, date(2024, 3, 11), &rules);

        assert_eq!(out.days_ahead, -1);
        assert_eq!(dates(&out.items, "b"), (date(2024, 3, 12), date(2024, 3, 14)));
    }

    #[test]
    fn completion_without_plan_uses_duration_fallback() {
        let rules = abc_rules();
        let items = vec![item(&rules, "a"), item(&rules, "b")];
        let a = items[0].id;

        let out = finish(items, a, 2, date(2024, 3, 5), &rules);

        assert_eq!(out.days_ahead, 3);
        assert_eq!(dates(&out.items, "a"), (date(2024, 3, 4), date(2024, 3, 5)));
        assert_eq!(dates(&out.items, "b"), (date(2024, 3, 6), date(2024, 3, 8)));
    }

    #[test]
    fn rerunning_completion_does_not_double_shift() {
        let rules = abc_rules();
        let items = planned_abc(&rules);
        let a = items[0].id;
        let config = EngineConfig::default();

        let first = complete(items, a, 3, date(2024, 3, 6), &rules, &config).unwrap();
        let second =
            complete(first.items.clone(), a, 3, date(2024, 3, 6), &rules, &config).unwrap();

        assert_eq!(first.items, second.items);
        assert!(changed_items(&first.items, &second.items).is_empty());
    }

    #[test]
    fn completed_successor_is_never_overrun() {
        let rules = abc_rules();
        let mut items = planned_abc(&rules);
        // B already finished far in the future relative to A's new end.
        items[1].status = StepStatus::Completed;
        items[1].start_date = Some(date(2024, 3, 18));
        items[1].end_date = Some(date(2024, 3, 20));
        let a = items[0].id;

        let out = finish(items, a, 1, date(2024, 3, 4), &rules);

        assert_eq!(dates(&out.items, "b"), (date(2024, 3, 18), date(2024, 3, 20)));
        assert_eq!(dates(&out.items, "c"), (date(2024, 3, 21), date(2024, 3, 26)));
    }

    #[test]
    fn delay_rule_beats_natural_cascade() {
        let rules = ScheduleRules::default();
        let items = vec![item(&rules, "excavation-fondation"), item(&rules, "structure")];
        let foundation = items[0].id;

        // Foundation done Friday 2024-03-01; framing may not start before 03-22.
        let out = finish(items, foundation, 5, date(2024, 3, 1), &rules);

        let (start, _) = dates(&out.items, "structure");
        assert_eq!(start, date(2024, 3, 22));
        assert!(start >= calendar::add_calendar_days(date(2024, 3, 1), 21));
    }

    #[test]
    fn restore_uses_estimated_days_and_is_idempotent() {
        let rules = abc_rules();
        let planned = planned_abc(&rules);
        let a = planned[0].id;
        let b = planned[1].id;
        let config = EngineConfig::default();

        let done_a = complete(planned.clone(), a, 5, date(2024, 3, 8), &rules, &config).unwrap();
        // B takes a single day and finishes early.
        let done_b =
            complete(done_a.items.clone(), b, 1, date(2024, 3, 11), &rules, &config).unwrap();
        assert_eq!(dates(&done_b.items, "c"), (date(2024, 3, 12), date(2024, 3, 15)));

        let once = restore(done_b.items, b, date(2024, 3, 11), &rules).unwrap();
        let twice = restore(once.items.clone(), b, date(2024, 3, 11), &rules).unwrap();

        let b_item = once.items.iter().find(|i| i.id == b).unwrap();
        assert_eq!(b_item.actual_days, None);
        assert_ne!(b_item.status, StepStatus::Completed);
        assert_eq!(dates(&once.items, "b"), dates(&planned, "b"));
        assert_eq!(dates(&once.items, "c"), dates(&planned, "c"));
        assert_eq!(once.items, twice.items);
    }

    #[test]
    fn restore_without_completed_predecessor_replans_from_first_start() {
        let rules = abc_rules();
        let planned = planned_abc(&rules);
        let a = planned[0].id;

        let done = finish(planned.clone(), a, 5, date(2024, 3, 8), &rules);
        let restored = restore(done.items, a, date(2024, 3, 8), &rules).unwrap();

        for step in ["a", "b", "c"] {
            assert_eq!(dates(&restored.items, step), dates(&planned, step), "{step}");
        }
    }

    #[test]
    fn restore_ignores_the_realised_start_of_an_overrun_step() {
        let rules = abc_rules();
        let planned = planned_abc(&rules);
        let a = planned[0].id;

        // Ten days ending 03-08 started 02-26, a week before the plan.
        let done = finish(planned.clone(), a, 10, date(2024, 3, 8), &rules);
        assert_eq!(dates(&done.items, "a").0, date(2024, 2, 26));
        assert_eq!(done.items[0].planned_start_date, Some(date(2024, 3, 4)));

        let restored = restore(done.items, a, date(2024, 3, 8), &rules).unwrap();
        for step in ["a", "b", "c"] {
            assert_eq!(dates(&restored.items, step), dates(&planned, step), "{step}");
        }
    }

    #[test]
    fn restore_reapplies_delay_rules() {
        let rules = ScheduleRules::default();
        let mut items = vec![item(&rules, "excavation-fondation"), item(&rules, "structure")];
        items[0].status = StepStatus::Completed;
        items[0].start_date = Some(date(2024, 2, 26));
        items[0].end_date = Some(date(2024, 3, 1));
        items[1].status = StepStatus::Completed;
        items[1].actual_days = Some(2);
        items[1].start_date = Some(date(2024, 3, 21));
        items[1].end_date = Some(date(2024, 3, 22));
        let framing = items[1].id;

        let out = restore(items, framing, date(2024, 3, 22), &rules).unwrap();
        assert_eq!(dates(&out.items, "structure").0, date(2024, 3, 22));
    }

    #[test]
    fn edit_moves_step_and_cascades() {
        let rules = abc_rules();
        let items = planned_abc(&rules);
        let b = items[1].id;

        let edit = ScheduleEdit {
            start_date: Some(date(2024, 3, 16)), // Saturday → Monday 03-18
            estimated_days: Some(2),
            ..Default::default()
        };
        let out = apply_edit(items.clone(), b, &edit, &rules).unwrap();

        assert_eq!(dates(&out.items, "a"), dates(&items, "a"));
        assert_eq!(dates(&out.items, "b"), (date(2024, 3, 18), date(2024, 3, 19)));
        assert_eq!(dates(&out.items, "c"), (date(2024, 3, 20), date(2024, 3, 25)));

        let again = apply_edit(out.items.clone(), b, &edit, &rules).unwrap();
        assert_eq!(out.items, again.items);
    }

    #[test]
    fn non_positive_durations_are_rejected_or_clamped() {
        let rules = abc_rules();
        let items = planned_abc(&rules);
        let a = items[0].id;
        let config = EngineConfig::default();

        assert!(matches!(
            complete(items.clone(), a, 0, date(2024, 3, 8), &rules, &config),
            Err(EngineError::InvalidDuration(0))
        ));
        let bad_edit = ScheduleEdit { estimated_days: Some(-2), ..Default::default() };
        assert!(apply_edit(items.clone(), a, &bad_edit, &rules).is_err());

        let mut zero = items;
        zero[2].estimated_days = 0;
        let out = plan(zero, date(2024, 3, 4), &rules);
        let (start, end) = dates(&out.items, "c");
        assert_eq!(start, end);
    }

    #[test]
    fn oversized_durations_are_rejected_or_capped() {
        let rules = abc_rules();
        let items = planned_abc(&rules);
        let a = items[0].id;

        assert!(matches!(check_duration(MAX_DURATION_DAYS), Ok(MAX_DURATION_DAYS)));
        let config = EngineConfig::default();
        assert!(matches!(
            complete(items.clone(), a, i32::MAX, date(2024, 3, 8), &rules, &config),
            Err(EngineError::InvalidDuration(i32::MAX))
        ));
        let huge_edit = ScheduleEdit {
            actual_days: Some(MAX_DURATION_DAYS + 1),
            ..Default::default()
        };
        assert!(apply_edit(items.clone(), a, &huge_edit, &rules).is_err());

        // A stored estimate beyond the cap is laid out at the cap.
        let mut stored = items;
        stored[0].estimated_days = i32::MAX;
        let out = plan(stored, date(2024, 3, 4), &rules);
        let (start, end) = dates(&out.items, "a");
        assert_eq!(
            calendar::business_day_diff(end, start),
            i64::from(MAX_DURATION_DAYS) - 1
        );
    }

    #[test]
    fn unknown_target_is_not_found() {
        let rules = abc_rules();
        let items = planned_abc(&rules);
        assert!(matches!(
            restore(items, Uuid::new_v4(), date(2024, 3, 4), &rules),
            Err(EngineError::NotFound { .. })
        ));
    }

    /// A(10) → B(3) where B's supplier needs `lead` business days of notice.
    fn supplier_rules(lead: i32) -> ScheduleRules {
        let step = |id: &str, trade: &str, days, supplier| CanonicalStep {
            id: id.into(),
            title: id.to_uppercase(),
            trade_type: trade.into(),
            estimated_days: days,
            supplier_lead_days: supplier,
            fabrication_lead_days: None,
            measurement_after: None,
        };
        ScheduleRules::from_config(RulesConfig {
            steps: Some(vec![step("a", "framing", 10, None), step("b", "roofing", 3, Some(lead))]),
            delay_rules: Some(Vec::<DelayRule>::new()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn urgent_call_raised_when_running_ahead() {
        let rules = supplier_rules(2);
        let items = plan(vec![item(&rules, "a"), item(&rules, "b")], date(2024, 3, 4), &rules)
            .items;
        let a = items[0].id;

        // A planned to end 03-15, done 03-07: B moves from 03-18 to 03-08 and
        // its supplier call date (03-06) is one business day in the past.
        let out = finish(items, a, 4, date(2024, 3, 7), &rules);

        assert_eq!(out.days_ahead, 6);
        assert_eq!(out.notices.len(), 1);
        assert_eq!(out.notices[0].alert_type, AlertType::UrgentSupplierCall);
        assert_eq!(out.notices[0].alert_date, date(2024, 3, 7));
        assert!(out.notices[0].message.contains("2024-03-06"));
    }

    #[test]
    fn no_urgent_call_outside_window() {
        let rules = supplier_rules(10);
        let items = plan(vec![item(&rules, "a"), item(&rules, "b")], date(2024, 3, 4), &rules)
            .items;
        let a = items[0].id;

        // Call date 02-23 is nine business days back: too late to be urgent.
        let out = finish(items, a, 4, date(2024, 3, 7), &rules);
        assert_eq!(out.days_ahead, 6);
        assert!(out.notices.is_empty());
    }

    #[test]
    fn delayed_notice_raised_when_running_behind() {
        let rules = ScheduleRules::default();
        let items = plan(
            vec![item(&rules, "preparation-terrain"), item(&rules, "excavation-fondation")],
            date(2024, 3, 4),
            &rules,
        )
        .items;
        let prep = items[0].id;

        // Prep planned 03-04..03-05, finished 03-07 (two days late).
        let out = finish(items, prep, 4, date(2024, 3, 7), &rules);
        assert_eq!(out.days_ahead, -2);
        assert_eq!(out.notices.len(), 1);
        assert_eq!(out.notices[0].alert_type, AlertType::ScheduleDelayed);
    }

    #[test]
    fn validate_rejects_inverted_and_duplicate_rows() {
        let rules = abc_rules();
        let mut items = planned_abc(&rules);
        assert!(validate(&items).is_ok());

        items[0].end_date = Some(date(2024, 3, 1));
        assert!(matches!(validate(&items), Err(EngineError::IntegrityViolation(_))));

        let mut dup = planned_abc(&rules);
        let mut copy = dup[0].clone();
        copy.id = Uuid::new_v4();
        dup.push(copy);
        assert!(validate(&dup).is_err());
    }
}
