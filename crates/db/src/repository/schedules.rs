//! `schedule_items` operations.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
    DbError,
    models::ScheduleRow,
};

const COLUMNS: &str = "id, project_id, step_id, step_name, trade_type, trade_color, \
     estimated_days, actual_days, start_date, end_date, status, logistics, notes, \
     planned_start_date";

/// Every row belonging to `project_id`.
pub async fn list_by_project<'e>(
    exec: impl PgExecutor<'e>,
    project_id: Uuid,
) -> Result<Vec<ScheduleRow>, DbError> {
    let sql = format!("SELECT {COLUMNS} FROM schedule_items WHERE project_id = $1");
    let rows = sqlx::query_as::<_, ScheduleRow>(&sql)
        .bind(project_id)
        .fetch_all(exec)
        .await?;
    Ok(rows)
}

/// Fetch a single row by its primary key.
pub async fn get_schedule<'e>(exec: impl PgExecutor<'e>, id: Uuid) -> Result<ScheduleRow, DbError> {
    let sql = format!("SELECT {COLUMNS} FROM schedule_items WHERE id = $1");
    sqlx::query_as::<_, ScheduleRow>(&sql)
        .bind(id)
        .fetch_optional(exec)
        .await?
        .ok_or(DbError::NotFound)
}

/// Insert a row unless one already exists for its (project, step) pair.
///
/// The no-op `DO UPDATE` makes `RETURNING` yield the existing row.
pub async fn insert_or_get<'e>(
    exec: impl PgExecutor<'e>,
    row: &ScheduleRow,
) -> Result<ScheduleRow, DbError> {
    let sql = format!(
        r#"
        INSERT INTO schedule_items ({COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        ON CONFLICT (project_id, step_id) DO UPDATE SET step_id = EXCLUDED.step_id
        RETURNING {COLUMNS}
        "#
    );
    let stored = bind_row(sqlx::query_as::<_, ScheduleRow>(&sql), row)
        .fetch_one(exec)
        .await?;
    Ok(stored)
}

/// Insert a row or overwrite every column of the row with the same `id`.
pub async fn write_schedule<'e>(
    exec: impl PgExecutor<'e>,
    row: &ScheduleRow,
) -> Result<(), DbError> {
    let sql = format!(
        r#"
        INSERT INTO schedule_items ({COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        ON CONFLICT (id) DO UPDATE SET
            step_id = EXCLUDED.step_id,
            step_name = EXCLUDED.step_name,
            trade_type = EXCLUDED.trade_type,
            trade_color = EXCLUDED.trade_color,
            estimated_days = EXCLUDED.estimated_days,
            actual_days = EXCLUDED.actual_days,
            start_date = EXCLUDED.start_date,
            end_date = EXCLUDED.end_date,
            status = EXCLUDED.status,
            logistics = EXCLUDED.logistics,
            notes = EXCLUDED.notes,
            planned_start_date = EXCLUDED.planned_start_date
        WHERE schedule_items.project_id = EXCLUDED.project_id
        RETURNING {COLUMNS}
        "#
    );
    bind_row(sqlx::query_as::<_, ScheduleRow>(&sql), row)
        .fetch_optional(exec)
        .await?
        .map(|_| ())
        .ok_or_else(|| DbError::Integrity(format!("row {} cannot move between projects", row.id)))
}

/// Replace the free-form notes of one row.
pub async fn update_notes<'e>(
    exec: impl PgExecutor<'e>,
    id: Uuid,
    notes: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE schedule_items SET notes = $2 WHERE id = $1")
        .bind(id)
        .bind(notes)
        .execute(exec)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Permanently delete a row. Alerts follow through `ON DELETE CASCADE`.
///
/// Returns `DbError::NotFound` if no row was deleted.
pub async fn delete_schedule<'e>(exec: impl PgExecutor<'e>, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM schedule_items WHERE id = $1")
        .bind(id)
        .execute(exec)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

type PgQueryAs<'q> =
    sqlx::query::QueryAs<'q, sqlx::Postgres, ScheduleRow, sqlx::postgres::PgArguments>;

fn bind_row<'q>(query: PgQueryAs<'q>, row: &'q ScheduleRow) -> PgQueryAs<'q> {
    query
        .bind(row.id)
        .bind(row.project_id)
        .bind(&row.step_id)
        .bind(&row.step_name)
        .bind(&row.trade_type)
        .bind(&row.trade_color)
        .bind(row.estimated_days)
        .bind(row.actual_days)
        .bind(row.start_date)
        .bind(row.end_date)
        .bind(&row.status)
        .bind(&row.logistics)
        .bind(&row.notes)
        .bind(row.planned_start_date)
}
