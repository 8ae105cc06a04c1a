use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::AppState;
use crate::ApiError;

pub async fn dismiss(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.engine.dismiss_alert(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
