//! `api` crate: HTTP REST API over the schedule engine.
//!
//! Exposes:
//!   GET    /api/v1/projects/{project_id}/schedule
//!   GET    /api/v1/projects/{project_id}/alerts?include_dismissed=
//!   GET    /api/v1/projects/{project_id}/conflicts
//!   POST   /api/v1/projects/{project_id}/plan
//!   POST   /api/v1/projects/{project_id}/steps/{step_id}
//!   POST   /api/v1/projects/{project_id}/steps/{step_id}/complete
//!   POST   /api/v1/schedule/conflicts
//!   POST   /api/v1/schedule/{id}/complete
//!   POST   /api/v1/schedule/{id}/uncomplete
//!   PATCH  /api/v1/schedule/{id}
//!   DELETE /api/v1/schedule/{id}
//!   POST   /api/v1/alerts/{id}/dismiss

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};
use engine::ScheduleEngine;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ScheduleEngine>,
}

impl AppState {
    pub fn new(engine: ScheduleEngine) -> Self {
        Self { engine: Arc::new(engine) }
    }
}

pub fn router(state: AppState) -> Router {
    use handlers::{alerts, projects, schedule};

    Router::new()
        .route("/api/v1/projects/:project_id/schedule", get(projects::schedule))
        .route("/api/v1/projects/:project_id/alerts", get(projects::alerts))
        .route("/api/v1/projects/:project_id/conflicts", get(projects::conflicts))
        .route("/api/v1/projects/:project_id/plan", post(projects::plan))
        .route("/api/v1/projects/:project_id/steps/:step_id", post(projects::add_step))
        .route(
            "/api/v1/projects/:project_id/steps/:step_id/complete",
            post(projects::complete_step),
        )
        .route("/api/v1/schedule/conflicts", post(schedule::check_conflicts))
        .route("/api/v1/schedule/:id/complete", post(schedule::complete))
        .route("/api/v1/schedule/:id/uncomplete", post(schedule::uncomplete))
        .route("/api/v1/schedule/:id", patch(schedule::update).delete(schedule::remove))
        .route("/api/v1/alerts/:id/dismiss", post(alerts::dismiss))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `bind` and serve the API until the process stops.
pub async fn serve(bind: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

#[cfg(test)]
mod tests;
