//! `engine` crate: schedule domain models, rule tables, and the recalculation engine.

pub mod models;
pub mod error;
pub mod calendar;
pub mod catalog;
pub mod rules;
pub mod cascade;
pub mod alerts;
pub mod conflicts;
pub mod clock;
pub mod engine;

pub use models::{
    AlertType, CompletionSummary, ConflictReport, ScheduleAlert, ScheduleChange, ScheduleEdit,
    ScheduleItem, StepLogistics, StepStatus,
};
pub use error::EngineError;
pub use rules::{RulesConfig, ScheduleRules};
pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{EngineConfig, ScheduleEngine};
