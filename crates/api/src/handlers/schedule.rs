use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use engine::{CompletionSummary, ConflictReport, ScheduleChange, ScheduleEdit, ScheduleItem};
use serde::Deserialize;
use uuid::Uuid;

use super::AppState;
use crate::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct CompleteStepDto {
    pub actual_days: Option<i32>,
}

pub async fn complete(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    payload: Option<Json<CompleteStepDto>>,
) -> Result<Json<CompletionSummary>, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let summary = state.engine.complete_step(id, payload.actual_days).await?;
    Ok(Json(summary))
}

pub async fn uncomplete(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ScheduleChange>, ApiError> {
    Ok(Json(state.engine.uncomplete_step(id).await?))
}

pub async fn update(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(edit): Json<ScheduleEdit>,
) -> Result<Json<ScheduleChange>, ApiError> {
    Ok(Json(state.engine.update_schedule_and_recalculate(id, edit).await?))
}

pub async fn remove(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.engine.remove_step(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Conflict check over a caller-supplied schedule; nothing is read or written.
pub async fn check_conflicts(
    State(state): State<AppState>,
    Json(schedules): Json<Vec<ScheduleItem>>,
) -> Json<Vec<ConflictReport>> {
    Json(state.engine.check_conflicts(&schedules))
}
