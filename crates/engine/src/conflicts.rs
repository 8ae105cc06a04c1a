//! Read-only diagnostic: business days on which incompatible trades overlap.
//!
//! Nothing here blocks scheduling; the reports are surfaced as warnings.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::calendar::business_days_between;
use crate::cascade::sort_by_rank;
use crate::models::{ConflictReport, ScheduleItem};
use crate::rules::ScheduleRules;

/// Report every business day where at least one pair of the steps active
/// that day may not overlap. Items missing either date are ignored.
pub fn check_conflicts(schedules: &[ScheduleItem], rules: &ScheduleRules) -> Vec<ConflictReport> {
    let mut items: Vec<ScheduleItem> = schedules.to_vec();
    sort_by_rank(&mut items, &rules.order);

    let mut occupancy: BTreeMap<NaiveDate, Vec<&ScheduleItem>> = BTreeMap::new();
    for item in &items {
        let (Some(start), Some(end)) = (item.start_date, item.end_date) else {
            continue;
        };
        for day in business_days_between(start, end) {
            occupancy.entry(day).or_default().push(item);
        }
    }

    occupancy
        .into_iter()
        .filter(|(_, present)| present.len() > 1 && has_conflict(present, rules))
        .map(|(date, present)| ConflictReport {
            date,
            trades: present
                .iter()
                .map(|i| i.trade_type.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            step_ids: present.iter().map(|i| i.step_id.clone()).collect(),
        })
        .collect()
}

fn has_conflict(present: &[&ScheduleItem], rules: &ScheduleRules) -> bool {
    present.iter().enumerate().any(|(i, a)| {
        present[i + 1..]
            .iter()
            .any(|b| !rules.compatibility.can_overlap(&a.trade_type, &b.trade_type))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn span(rules: &ScheduleRules, step: &str, start: NaiveDate, end: NaiveDate) -> ScheduleItem {
        let mut item =
            ScheduleItem::from_canonical(Uuid::nil(), rules.catalog.get(step).unwrap(), "#000");
        item.start_date = Some(start);
        item.end_date = Some(end);
        item
    }

    #[test]
    fn two_interior_finishing_trades_conflict() {
        let rules = ScheduleRules::default();
        let schedule = vec![
            span(&rules, "revetements-sol", date(2024, 3, 6), date(2024, 3, 8)),
            span(&rules, "peinture", date(2024, 3, 4), date(2024, 3, 6)),
        ];

        let reports = check_conflicts(&schedule, &rules);

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].date, date(2024, 3, 6));
        assert_eq!(reports[0].trades, vec!["flooring", "painting"]);
        assert_eq!(reports[0].step_ids, vec!["peinture", "revetements-sol"]);
    }

    #[test]
    fn exterior_and_interior_finishing_may_overlap() {
        let rules = ScheduleRules::default();
        let schedule = vec![
            span(&rules, "revetement-exterieur", date(2024, 3, 4), date(2024, 3, 15)),
            span(&rules, "peinture", date(2024, 3, 4), date(2024, 3, 8)),
        ];
        assert!(check_conflicts(&schedule, &rules).is_empty());
    }

    #[test]
    fn one_bad_pair_flags_the_whole_day() {
        let rules = ScheduleRules::default();
        let schedule = vec![
            span(&rules, "revetement-exterieur", date(2024, 3, 4), date(2024, 3, 4)),
            span(&rules, "peinture", date(2024, 3, 4), date(2024, 3, 4)),
            span(&rules, "gypse", date(2024, 3, 4), date(2024, 3, 4)),
        ];

        let reports = check_conflicts(&schedule, &rules);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].trades, vec!["drywall", "exterior-cladding", "painting"]);
    }

    #[test]
    fn same_trade_twice_conflicts_and_weekends_are_skipped() {
        let rules = ScheduleRules::default();
        // Friday through Monday; the overlap on the weekend is not reported.
        let schedule = vec![
            span(&rules, "plomberie-brute", date(2024, 3, 1), date(2024, 3, 4)),
            span(&rules, "finition-plomberie", date(2024, 3, 2), date(2024, 3, 4)),
        ];

        let reports = check_conflicts(&schedule, &rules);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].date, date(2024, 3, 4));
        assert_eq!(reports[0].trades, vec!["plumbing"]);
    }

    #[test]
    fn undated_items_are_ignored() {
        let rules = ScheduleRules::default();
        let mut undated = span(&rules, "gypse", date(2024, 3, 4), date(2024, 3, 4));
        undated.end_date = None;
        let schedule = vec![undated, span(&rules, "peinture", date(2024, 3, 4), date(2024, 3, 4))];
        assert!(check_conflicts(&schedule, &rules).is_empty());
    }
}
