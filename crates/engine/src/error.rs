//! Engine-level error types.

use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the scheduling engine.
///
/// Every error aborts the whole operation before anything is written.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Unknown schedule item, alert or project.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// A step id that is not in the canonical catalog.
    #[error("unknown canonical step '{0}'")]
    UnknownStep(String),

    /// A caller-supplied duration that is not positive.
    #[error("duration must be at least one business day, got {0}")]
    InvalidDuration(i32),

    /// The computed state would break a schedule invariant.
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    /// A stored row could not be mapped onto the domain model.
    #[error("malformed schedule row {id}: {message}")]
    MalformedRow { id: Uuid, message: String },

    /// The rule bundle failed validation.
    #[error("invalid schedule rules: {0}")]
    InvalidRules(String),

    /// Persistence error from the db crate.
    #[error("database error: {0}")]
    Persistence(db::DbError),
}

impl EngineError {
    pub fn schedule_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "schedule item", id: id.to_string() }
    }

    pub fn alert_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "alert", id: id.to_string() }
    }
}

impl From<db::DbError> for EngineError {
    fn from(err: db::DbError) -> Self {
        match err {
            db::DbError::NotFound => Self::NotFound {
                entity: "row",
                id: String::from("?"),
            },
            db::DbError::DuplicateStep { project_id, step_id } => Self::IntegrityViolation(
                format!("project {project_id} already has a row for step '{step_id}'"),
            ),
            db::DbError::Integrity(message) => Self::IntegrityViolation(message),
            other => Self::Persistence(other),
        }
    }
}
