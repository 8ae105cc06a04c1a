//! Swappable rule tables: minimum delays between steps, trade compatibility,
//! and the bundle ([`ScheduleRules`]) the engine is configured with.
//!
//! The bundle can be loaded from JSON; anything omitted from the file falls
//! back to the built-in tables.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::EngineError;
use crate::calendar;
use crate::catalog::{self, CanonicalStep, ExecutionOrder, StepCatalog, FALLBACK_TRADE_COLOR};

// ---------------------------------------------------------------------------
// Delay rules
// ---------------------------------------------------------------------------

/// `step_id` may not start before `after_step_id` ends + `min_calendar_days`.
///
/// Calendar days, not business days: concrete cures on weekends too.
/// `min_calendar_days` must lie in `0..=MAX_DELAY_DAYS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayRule {
    pub step_id: String,
    pub after_step_id: String,
    pub min_calendar_days: i64,
    pub reason: String,
}

pub const MAX_DELAY_DAYS: i64 = 3_650;

#[derive(Debug, Clone, Default)]
pub struct DelayRuleTable {
    by_step: HashMap<String, DelayRule>,
}

impl DelayRuleTable {
    pub fn new(rules: Vec<DelayRule>) -> Self {
        let by_step = rules.into_iter().map(|r| (r.step_id.clone(), r)).collect();
        Self { by_step }
    }

    pub fn rule_for(&self, step_id: &str) -> Option<&DelayRule> {
        self.by_step.get(step_id)
    }

    /// Earliest business day `step_id` may start given the known end dates,
    /// or `None` when no rule applies yet.
    pub fn earliest_start(
        &self,
        step_id: &str,
        end_dates: &HashMap<String, NaiveDate>,
    ) -> Option<NaiveDate> {
        let rule = self.rule_for(step_id)?;
        let after_end = end_dates.get(&rule.after_step_id)?;
        Some(calendar::roll_forward(calendar::add_calendar_days(
            *after_end,
            rule.min_calendar_days,
        )))
    }
}

pub fn builtin_delay_rules() -> Vec<DelayRule> {
    vec![
        DelayRule {
            step_id: "structure".into(),
            after_step_id: "excavation-fondation".into(),
            min_calendar_days: 21,
            reason: "Foundation concrete must cure before framing loads it".into(),
        },
        DelayRule {
            step_id: "comptoirs".into(),
            after_step_id: "armoires".into(),
            min_calendar_days: 10,
            reason: "Countertops are templated on installed cabinets, then fabricated".into(),
        },
        DelayRule {
            step_id: "revetements-sol".into(),
            after_step_id: "peinture".into(),
            min_calendar_days: 2,
            reason: "Paint must dry before flooring goes down".into(),
        },
    ]
}

// ---------------------------------------------------------------------------
// Trade compatibility
// ---------------------------------------------------------------------------

/// A named, disjoint set of trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeGroup {
    pub name: String,
    pub trades: Vec<String>,
}

/// Decides whether two trades may work on the same business day.
///
/// Only cross-group pairs explicitly declared compatible may overlap.
/// Same-group pairs, undeclared pairs, and unknown trades always conflict.
#[derive(Debug, Clone, Default)]
pub struct TradeCompatibility {
    group_of: HashMap<String, String>,
    compatible: HashSet<(String, String)>,
}

impl TradeCompatibility {
    pub fn new(
        groups: Vec<TradeGroup>,
        compatible_groups: Vec<(String, String)>,
    ) -> Result<Self, EngineError> {
        let mut group_of = HashMap::new();
        for group in groups {
            for trade in group.trades {
                if let Some(previous) = group_of.insert(trade.clone(), group.name.clone()) {
                    return Err(EngineError::InvalidRules(format!(
                        "trade '{trade}' is in both '{previous}' and '{}'",
                        group.name
                    )));
                }
            }
        }
        let compatible = compatible_groups
            .into_iter()
            .filter(|(a, b)| a != b)
            .map(|(a, b)| ordered(a, b))
            .collect();
        Ok(Self { group_of, compatible })
    }

    pub fn group_of(&self, trade: &str) -> Option<&str> {
        self.group_of.get(trade).map(String::as_str)
    }

    pub fn can_overlap(&self, trade_a: &str, trade_b: &str) -> bool {
        match (self.group_of(trade_a), self.group_of(trade_b)) {
            (Some(a), Some(b)) if a != b => {
                self.compatible.contains(&ordered(a.to_string(), b.to_string()))
            }
            _ => false,
        }
    }
}

fn ordered(a: String, b: String) -> (String, String) {
    if a <= b { (a, b) } else { (b, a) }
}

pub fn builtin_trade_groups() -> Vec<TradeGroup> {
    let group = |name: &str, trades: &[&str]| TradeGroup {
        name: name.into(),
        trades: trades.iter().map(|t| t.to_string()).collect(),
    };
    vec![
        group("site-work", &["excavation", "foundation"]),
        group("structure", &["framing", "roofing"]),
        group("exterior", &["windows", "exterior-cladding", "landscaping"]),
        group("mechanical", &["plumbing", "electrical", "hvac"]),
        group(
            "interior-finishing",
            &["insulation", "drywall", "painting", "cabinetry", "countertops", "flooring"],
        ),
        group("inspection", &["inspection"]),
    ]
}

pub fn builtin_compatible_groups() -> Vec<(String, String)> {
    vec![
        ("exterior".into(), "interior-finishing".into()),
        ("exterior".into(), "mechanical".into()),
    ]
}

// ---------------------------------------------------------------------------
// RulesConfig / ScheduleRules
// ---------------------------------------------------------------------------

/// On-disk shape of the rule bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Canonical steps in execution order.
    pub steps: Option<Vec<CanonicalStep>>,
    pub delay_rules: Option<Vec<DelayRule>>,
    pub trade_groups: Option<Vec<TradeGroup>>,
    pub compatible_groups: Option<Vec<(String, String)>>,
    pub trade_colors: Option<HashMap<String, String>>,
}

/// Process-wide read-only configuration the engine consults.
#[derive(Debug, Clone)]
pub struct ScheduleRules {
    pub catalog: StepCatalog,
    pub order: ExecutionOrder,
    pub delays: DelayRuleTable,
    pub compatibility: TradeCompatibility,
    trade_colors: HashMap<String, String>,
}

impl ScheduleRules {
    /// Validate and index a rule bundle.
    ///
    /// # Errors
    /// [`EngineError::InvalidRules`] for duplicate step ids, delay rules that
    /// name unknown steps or carry an out-of-range delay, or a trade listed in
    /// two groups.
    pub fn from_config(config: RulesConfig) -> Result<Self, EngineError> {
        let steps = config.steps.unwrap_or_else(catalog::builtin_steps);
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.id.as_str()) {
                return Err(EngineError::InvalidRules(format!(
                    "duplicate canonical step '{}'",
                    step.id
                )));
            }
        }

        let delay_rules = config.delay_rules.unwrap_or_else(builtin_delay_rules);
        for rule in &delay_rules {
            for id in [&rule.step_id, &rule.after_step_id] {
                if !seen.contains(id.as_str()) {
                    return Err(EngineError::InvalidRules(format!(
                        "delay rule references unknown step '{id}'"
                    )));
                }
            }
            if !(0..=MAX_DELAY_DAYS).contains(&rule.min_calendar_days) {
                return Err(EngineError::InvalidRules(format!(
                    "delay rule for '{}' has min_calendar_days {} outside 0..={MAX_DELAY_DAYS}",
                    rule.step_id, rule.min_calendar_days
                )));
            }
        }

        let compatibility = TradeCompatibility::new(
            config.trade_groups.unwrap_or_else(builtin_trade_groups),
            config.compatible_groups.unwrap_or_else(builtin_compatible_groups),
        )?;

        let order = ExecutionOrder::new(steps.iter().map(|s| s.id.clone()));
        Ok(Self {
            catalog: StepCatalog::new(steps),
            order,
            delays: DelayRuleTable::new(delay_rules),
            compatibility,
            trade_colors: config.trade_colors.unwrap_or_else(catalog::builtin_trade_colors),
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: RulesConfig = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidRules(format!("invalid rules JSON: {e}")))?;
        Self::from_config(config)
    }

    pub fn trade_color(&self, trade: &str) -> &str {
        self.trade_colors
            .get(trade)
            .map(String::as_str)
            .unwrap_or(FALLBACK_TRADE_COLOR)
    }
}

impl Default for ScheduleRules {
    fn default() -> Self {
        let delay_rules = builtin_delay_rules();
        let steps = catalog::builtin_steps();
        Self {
            order: ExecutionOrder::new(steps.iter().map(|s| s.id.clone())),
            catalog: StepCatalog::new(steps),
            delays: DelayRuleTable::new(delay_rules),
            compatibility: TradeCompatibility {
                group_of: builtin_trade_groups()
                    .into_iter()
                    .flat_map(|g| {
                        let name = g.name;
                        g.trades.into_iter().map(move |t| (t, name.clone()))
                    })
                    .collect(),
                compatible: builtin_compatible_groups()
                    .into_iter()
                    .map(|(a, b)| ordered(a, b))
                    .collect(),
            },
            trade_colors: catalog::builtin_trade_colors(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn delay_rule_counts_calendar_days_and_rolls_to_business_day() {
        let table = DelayRuleTable::new(builtin_delay_rules());
        let mut ends = HashMap::new();

        assert_eq!(table.earliest_start("structure", &ends), None);

        // Friday + 21 calendar days = Friday.
        ends.insert("excavation-fondation".to_string(), date(2024, 3, 1));
        assert_eq!(table.earliest_start("structure", &ends), Some(date(2024, 3, 22)));

        // Thursday + 2 calendar days is a Saturday, rolled to Monday.
        ends.insert("peinture".to_string(), date(2024, 3, 7));
        assert_eq!(table.earliest_start("revetements-sol", &ends), Some(date(2024, 3, 11)));

        assert_eq!(table.earliest_start("toiture", &ends), None);
    }

    #[test]
    fn same_group_trades_conflict() {
        let rules = ScheduleRules::default();
        assert!(!rules.compatibility.can_overlap("painting", "flooring"));
        assert!(!rules.compatibility.can_overlap("plumbing", "plumbing"));
    }

    #[test]
    fn declared_cross_group_pairs_overlap_both_ways() {
        let rules = ScheduleRules::default();
        assert!(rules.compatibility.can_overlap("exterior-cladding", "painting"));
        assert!(rules.compatibility.can_overlap("painting", "exterior-cladding"));
        assert!(rules.compatibility.can_overlap("landscaping", "electrical"));
    }

    #[test]
    fn undeclared_and_unknown_pairs_conflict() {
        let rules = ScheduleRules::default();
        assert!(!rules.compatibility.can_overlap("framing", "plumbing"));
        assert!(!rules.compatibility.can_overlap("painting", "solar-panels"));
        assert!(!rules.compatibility.can_overlap("mystery", "mystery"));
    }

    #[test]
    fn default_matches_builtin_config() {
        let built = ScheduleRules::from_config(RulesConfig::default()).unwrap();
        let default = ScheduleRules::default();
        assert_eq!(built.catalog.steps(), default.catalog.steps());
        assert_eq!(built.order.rank("gypse"), default.order.rank("gypse"));
        assert_eq!(built.trade_color("roofing"), default.trade_color("roofing"));
        assert_eq!(default.trade_color("solar-panels"), FALLBACK_TRADE_COLOR);
    }

    #[test]
    fn json_config_replaces_only_given_tables() {
        let rules = ScheduleRules::from_json_str(
            r#"{
                "delay_rules": [
                    { "step_id": "toiture", "after_step_id": "structure",
                      "min_calendar_days": 3, "reason": "inspection of framing" }
                ]
            }"#,
        )
        .unwrap();
        assert!(rules.delays.rule_for("structure").is_none());
        assert_eq!(rules.delays.rule_for("toiture").unwrap().min_calendar_days, 3);
        assert!(rules.catalog.get("gypse").is_some());
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let unknown_step = r#"{ "delay_rules": [
            { "step_id": "spa", "after_step_id": "structure", "min_calendar_days": 1, "reason": "" }
        ] }"#;
        assert!(matches!(
            ScheduleRules::from_json_str(unknown_step),
            Err(EngineError::InvalidRules(_))
        ));

        let overlapping_groups = r#"{ "trade_groups": [
            { "name": "a", "trades": ["painting"] },
            { "name": "b", "trades": ["painting"] }
        ] }"#;
        assert!(ScheduleRules::from_json_str(overlapping_groups).is_err());

        let negative_delay = r#"{ "delay_rules": [
            { "step_id": "toiture", "after_step_id": "structure", "min_calendar_days": -1,
              "reason": "" }
        ] }"#;
        assert!(ScheduleRules::from_json_str(negative_delay).is_err());

        assert!(ScheduleRules::from_json_str("not json").is_err());
    }
}
