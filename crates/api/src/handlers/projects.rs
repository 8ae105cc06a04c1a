use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use engine::{CompletionSummary, ConflictReport, ScheduleAlert, ScheduleChange, ScheduleItem};
use serde::Deserialize;
use uuid::Uuid;

use super::schedule::CompleteStepDto;
use super::AppState;
use crate::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct AlertQuery {
    #[serde(default)]
    pub include_dismissed: bool,
}

#[derive(Debug, Deserialize)]
pub struct PlanProjectDto {
    pub start_date: NaiveDate,
}

pub async fn schedule(
    Path(project_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ScheduleItem>>, ApiError> {
    Ok(Json(state.engine.list_schedule(project_id).await?))
}

pub async fn alerts(
    Path(project_id): Path<Uuid>,
    Query(query): Query<AlertQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ScheduleAlert>>, ApiError> {
    Ok(Json(
        state
            .engine
            .list_alerts(project_id, query.include_dismissed)
            .await?,
    ))
}

pub async fn conflicts(
    Path(project_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ConflictReport>>, ApiError> {
    Ok(Json(state.engine.check_project_conflicts(project_id).await?))
}

pub async fn plan(
    Path(project_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<PlanProjectDto>,
) -> Result<Json<ScheduleChange>, ApiError> {
    Ok(Json(
        state
            .engine
            .plan_project(project_id, payload.start_date)
            .await?,
    ))
}

pub async fn add_step(
    Path((project_id, step_id)): Path<(Uuid, String)>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ScheduleItem>), ApiError> {
    let item = state.engine.add_step(project_id, &step_id).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn complete_step(
    Path((project_id, step_id)): Path<(Uuid, String)>,
    State(state): State<AppState>,
    payload: Option<Json<CompleteStepDto>>,
) -> Result<Json<CompletionSummary>, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let summary = state
        .engine
        .complete_step_by_step_id(project_id, &step_id, payload.actual_days)
        .await?;
    Ok(Json(summary))
}
