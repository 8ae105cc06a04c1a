//! `schedule_alerts` operations.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{DbError, models::AlertRow};

/// Alerts of a project, oldest `alert_date` first.
pub async fn list_alerts<'e>(
    exec: impl PgExecutor<'e>,
    project_id: Uuid,
    include_dismissed: bool,
) -> Result<Vec<AlertRow>, DbError> {
    let rows = sqlx::query_as::<_, AlertRow>(
        r#"
        SELECT id, project_id, schedule_item_id, alert_type, alert_date, message, is_dismissed
        FROM schedule_alerts
        WHERE project_id = $1 AND ($2 OR NOT is_dismissed)
        ORDER BY alert_date ASC, id ASC
        "#,
    )
    .bind(project_id)
    .bind(include_dismissed)
    .fetch_all(exec)
    .await?;
    Ok(rows)
}

/// Remove every alert tied to one schedule item.
pub async fn delete_for_item<'e>(
    exec: impl PgExecutor<'e>,
    schedule_item_id: Uuid,
) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM schedule_alerts WHERE schedule_item_id = $1")
        .bind(schedule_item_id)
        .execute(exec)
        .await?;
    Ok(result.rows_affected())
}

pub async fn insert_alert<'e>(exec: impl PgExecutor<'e>, alert: &AlertRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO schedule_alerts
            (id, project_id, schedule_item_id, alert_type, alert_date, message, is_dismissed)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(alert.id)
    .bind(alert.project_id)
    .bind(alert.schedule_item_id)
    .bind(&alert.alert_type)
    .bind(alert.alert_date)
    .bind(&alert.message)
    .bind(alert.is_dismissed)
    .execute(exec)
    .await?;
    Ok(())
}

/// Set `is_dismissed`. Already-dismissed alerts still count as found.
pub async fn dismiss_alert<'e>(exec: impl PgExecutor<'e>, alert_id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE schedule_alerts SET is_dismissed = TRUE WHERE id = $1")
        .bind(alert_id)
        .execute(exec)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
