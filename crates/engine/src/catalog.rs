//! Canonical construction steps and their execution order.
//!
//! The catalog is listed in the physically required construction sequence
//! (site prep → foundation → structure → envelope → rough-ins → finishes →
//! inspection). That listing *is* the execution order: recalculation always
//! walks steps by [`ExecutionOrder::rank`], never by storage or date order.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CanonicalStep
// ---------------------------------------------------------------------------

/// One entry of the fixed trade pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalStep {
    pub id: String,
    pub title: String,
    pub trade_type: String,
    /// Planned duration in business days.
    pub estimated_days: i32,
    /// Business days of notice the supplier needs before the step starts.
    #[serde(default)]
    pub supplier_lead_days: Option<i32>,
    /// Business days of off-site fabrication before the step starts.
    #[serde(default)]
    pub fabrication_lead_days: Option<i32>,
    /// Step after which on-site measurements must be taken.
    #[serde(default)]
    pub measurement_after: Option<String>,
}

impl CanonicalStep {
    fn builtin(id: &str, title: &str, trade_type: &str, estimated_days: i32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            trade_type: trade_type.into(),
            estimated_days,
            supplier_lead_days: None,
            fabrication_lead_days: None,
            measurement_after: None,
        }
    }

    fn supplier(mut self, lead_days: i32) -> Self {
        self.supplier_lead_days = Some(lead_days);
        self
    }

    fn fabrication(mut self, lead_days: i32) -> Self {
        self.fabrication_lead_days = Some(lead_days);
        self
    }

    fn measured_after(mut self, step_id: &str) -> Self {
        self.measurement_after = Some(step_id.into());
        self
    }
}

/// The built-in residential pipeline.
pub fn builtin_steps() -> Vec<CanonicalStep> {
    vec![
        CanonicalStep::builtin("preparation-terrain", "Site preparation", "excavation", 2),
        CanonicalStep::builtin("excavation-fondation", "Excavation and foundation", "foundation", 5)
            .supplier(5),
        CanonicalStep::builtin("structure", "Framing", "framing", 10).supplier(10),
        CanonicalStep::builtin("toiture", "Roofing", "roofing", 3).supplier(5),
        CanonicalStep::builtin("fenetres-portes", "Windows and exterior doors", "windows", 2)
            .supplier(10)
            .fabrication(20)
            .measured_after("structure"),
        CanonicalStep::builtin("revetement-exterieur", "Exterior cladding", "exterior-cladding", 8)
            .supplier(5),
        CanonicalStep::builtin("plomberie-brute", "Rough plumbing", "plumbing", 3),
        CanonicalStep::builtin("electricite-brute", "Rough electrical", "electrical", 3),
        CanonicalStep::builtin("cvac", "HVAC rough-in", "hvac", 3),
        CanonicalStep::builtin("isolation", "Insulation", "insulation", 3).supplier(3),
        CanonicalStep::builtin("gypse", "Drywall", "drywall", 8).supplier(3),
        CanonicalStep::builtin("peinture", "Painting", "painting", 5),
        CanonicalStep::builtin("armoires", "Kitchen and bath cabinets", "cabinetry", 3)
            .supplier(5)
            .fabrication(25)
            .measured_after("gypse"),
        CanonicalStep::builtin("comptoirs", "Countertops", "countertops", 1)
            .fabrication(10)
            .measured_after("armoires"),
        CanonicalStep::builtin("revetements-sol", "Flooring", "flooring", 4).supplier(5),
        CanonicalStep::builtin("finition-plomberie", "Plumbing finish", "plumbing", 2),
        CanonicalStep::builtin("finition-electricite", "Electrical finish", "electrical", 2),
        CanonicalStep::builtin("amenagement-exterieur", "Landscaping", "landscaping", 4),
        CanonicalStep::builtin("inspection-finale", "Final inspection", "inspection", 1),
    ]
}

// ---------------------------------------------------------------------------
// StepCatalog
// ---------------------------------------------------------------------------

/// Lookup over the canonical steps by id.
#[derive(Debug, Clone)]
pub struct StepCatalog {
    steps: Vec<CanonicalStep>,
    index: HashMap<String, usize>,
}

impl StepCatalog {
    /// Build a catalog; the first occurrence wins on duplicate ids.
    pub fn new(steps: Vec<CanonicalStep>) -> Self {
        let mut index = HashMap::with_capacity(steps.len());
        for (pos, step) in steps.iter().enumerate() {
            index.entry(step.id.clone()).or_insert(pos);
        }
        Self { steps, index }
    }

    pub fn get(&self, step_id: &str) -> Option<&CanonicalStep> {
        self.index.get(step_id).map(|&pos| &self.steps[pos])
    }

    pub fn steps(&self) -> &[CanonicalStep] {
        &self.steps
    }
}

// ---------------------------------------------------------------------------
// ExecutionOrder
// ---------------------------------------------------------------------------

/// A strict total order over canonical step ids.
#[derive(Debug, Clone)]
pub struct ExecutionOrder {
    ranks: HashMap<String, usize>,
}

impl ExecutionOrder {
    /// `ids` in execution order; duplicates keep their first rank.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ranks = HashMap::new();
        for id in ids {
            let next = ranks.len();
            ranks.entry(id.into()).or_insert(next);
        }
        Self { ranks }
    }

    pub fn rank(&self, step_id: &str) -> Option<usize> {
        self.ranks.get(step_id).copied()
    }

    /// Known steps by rank, then unknown steps by id.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match (self.rank(a), self.rank(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Trade colours
// ---------------------------------------------------------------------------

/// Colour used for trades missing from the table.
pub const FALLBACK_TRADE_COLOR: &str = "#9ca3af";

pub fn builtin_trade_colors() -> HashMap<String, String> {
    [
        ("excavation", "#92400e"),
        ("foundation", "#78716c"),
        ("framing", "#d97706"),
        ("roofing", "#7c2d12"),
        ("windows", "#0ea5e9"),
        ("exterior-cladding", "#0369a1"),
        ("plumbing", "#2563eb"),
        ("electrical", "#eab308"),
        ("hvac", "#14b8a6"),
        ("insulation", "#f472b6"),
        ("drywall", "#a3a3a3"),
        ("painting", "#8b5cf6"),
        ("cabinetry", "#b45309"),
        ("countertops", "#475569"),
        ("flooring", "#a16207"),
        ("landscaping", "#16a34a"),
        ("inspection", "#dc2626"),
    ]
    .into_iter()
    .map(|(trade, color)| (trade.to_string(), color.to_string()))
    .collect()
}
