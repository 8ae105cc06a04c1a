//! Typed error type for the db crate.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("row not found")]
    NotFound,

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A second row for the same (project, step) pair was about to be written.
    #[error("project {project_id} already has a row for step '{step_id}'")]
    DuplicateStep { project_id: Uuid, step_id: String },

    /// A batch was rejected before any of it was applied.
    #[error("integrity violation: {0}")]
    Integrity(String),
}
