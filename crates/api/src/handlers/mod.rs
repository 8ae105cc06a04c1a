pub mod alerts;
pub mod projects;
pub mod schedule;

use super::AppState;
